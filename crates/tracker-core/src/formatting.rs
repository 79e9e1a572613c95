/// Format an integer count with thousands separators.
///
/// # Examples
///
/// ```
/// use tracker_core::formatting::format_count;
///
/// assert_eq!(format_count(12_345), "12,345");
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(-1_234), "-1,234");
/// ```
pub fn format_count(value: i64) -> String {
    let grouped = group_thousands(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_count ─────────────────────────────────────────────────────────

    #[test]
    fn test_format_count_small() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(7), "7");
        assert_eq!(format_count(999), "999");
    }

    #[test]
    fn test_format_count_thousands() {
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(12_345), "12,345");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_count_negative() {
        assert_eq!(format_count(-5), "-5");
        assert_eq!(format_count(-1_234), "-1,234");
    }

    #[test]
    fn test_format_count_extremes() {
        assert_eq!(format_count(i64::MAX), "9,223,372,036,854,775,807");
        assert_eq!(format_count(i64::MIN), "-9,223,372,036,854,775,808");
    }
}
