//! Lenient number recognition for table cells and `key: value` lines.

use regex::Regex;
use std::sync::LazyLock;

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?[0-9.,]*[0-9][0-9.,]*$").expect("BUG: invalid NUMERIC_RE regex literal")
});

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₽', '₸', '₴', '₹', '₩', '₺', '¢'];

/// Parses text such as `1 234,56`, `$1,234.56`, `1.234.567` or `15%`.
///
/// When both `,` and `.` appear, whichever comes last is the decimal
/// separator. A lone comma is a decimal separator; repeated commas or repeated
/// periods are thousands separators. Anything else non-numeric means the text
/// is not a number.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed);
    let trimmed = trimmed.trim_matches(|c: char| CURRENCY_SYMBOLS.contains(&c) || c.is_whitespace());
    let cleaned: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    // A sign in front of a currency symbol: `-$5`.
    let cleaned = match cleaned.chars().next() {
        Some(sign @ ('+' | '-')) => {
            let rest = cleaned[1..].trim_start_matches(|c: char| CURRENCY_SYMBOLS.contains(&c));
            format!("{}{}", sign, rest)
        }
        _ => cleaned,
    };
    if !NUMERIC_RE.is_match(&cleaned) {
        return None;
    }

    let commas = cleaned.matches(',').count();
    let periods = cleaned.matches('.').count();
    let normalized = match (commas, periods) {
        (0, 0) | (0, 1) => cleaned,
        (0, _) => cleaned.replace('.', ""),
        (1, 0) => cleaned.replace(',', "."),
        (_, 0) => cleaned.replace(',', ""),
        _ => {
            let last_comma = cleaned.rfind(',').unwrap_or(0);
            let last_period = cleaned.rfind('.').unwrap_or(0);
            if last_comma > last_period {
                if commas > 1 {
                    return None;
                }
                cleaned.replace('.', "").replace(',', ".")
            } else {
                if periods > 1 {
                    return None;
                }
                cleaned.replace(',', "")
            }
        }
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_both_separator_orders() {
        assert!(close(parse_number("1.234,56"), 1234.56));
        assert!(close(parse_number("1,234.56"), 1234.56));
        assert!(close(parse_number("12.345.678,9"), 12345678.9));
    }

    #[test]
    fn test_single_separator_rules() {
        assert!(close(parse_number("3,5"), 3.5));
        assert!(close(parse_number("1,234,567"), 1234567.0));
        assert!(close(parse_number("1.234.567"), 1234567.0));
        assert!(close(parse_number("42.5"), 42.5));
        assert!(close(parse_number("-17"), -17.0));
    }

    #[test]
    fn test_decoration_is_ignored() {
        assert!(close(parse_number(" $1,200.00 "), 1200.0));
        assert!(close(parse_number("1 234,5 €"), 1234.5));
        assert!(close(parse_number("15%"), 15.0));
        assert!(close(parse_number("-$5"), -5.0));
    }

    #[test]
    fn test_non_numeric_text() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("12 apples"), None);
        assert_eq!(parse_number("2024-01-05"), None);
        assert_eq!(parse_number("1,2,3.4,5"), None);
        assert_eq!(parse_number("."), None);
    }
}
