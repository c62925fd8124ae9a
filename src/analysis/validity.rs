//! Validity predicates and value patterns.

use crate::types::DataType;
use chrono::{NaiveDate, NaiveDateTime};

/// Accepted date layouts, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Accepted timestamp layouts, tried in order
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Whether `value` is a valid instance of `data_type`.
///
/// Leading and trailing whitespace is ignored. Empty values are never valid;
/// callers classify them as empty before asking.
pub fn is_valid(value: &str, data_type: DataType) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    match data_type {
        DataType::String => true,
        DataType::Integer => value.parse::<i64>().is_ok(),
        DataType::Decimal => parse_number(value).is_some(),
        DataType::Boolean => {
            value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
        }
        DataType::Date => is_date(value),
    }
}

/// Parse a finite number. `NaN` and infinities are rejected.
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_date(value: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|f| NaiveDate::parse_from_str(value, f).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(value, f).is_ok())
}

/// Character-class pattern of a value: uppercase letters become `A`,
/// lowercase letters `a`, digits `9`; everything else is kept.
pub fn pattern_of(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_uppercase() {
                'A'
            } else if c.is_lowercase() {
                'a'
            } else if c.is_ascii_digit() {
                '9'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_validity() {
        assert!(is_valid("42", DataType::Integer));
        assert!(is_valid(" -7 ", DataType::Integer));
        assert!(!is_valid("4.2", DataType::Integer));
        assert!(!is_valid("abc", DataType::Integer));
        assert!(!is_valid("", DataType::Integer));
    }

    #[test]
    fn test_decimal_rejects_non_finite() {
        assert!(is_valid("3.14", DataType::Decimal));
        assert!(is_valid("10", DataType::Decimal));
        assert!(!is_valid("NaN", DataType::Decimal));
        assert!(!is_valid("inf", DataType::Decimal));
    }

    #[test]
    fn test_boolean_and_string() {
        assert!(is_valid("TRUE", DataType::Boolean));
        assert!(!is_valid("yes", DataType::Boolean));
        assert!(is_valid("anything", DataType::String));
    }

    #[test]
    fn test_dates() {
        assert!(is_valid("2024-02-29", DataType::Date));
        assert!(is_valid("31/12/2023", DataType::Date));
        assert!(is_valid("2024-01-01T10:00:00", DataType::Date));
        assert!(!is_valid("2023-02-30", DataType::Date));
        assert!(!is_valid("tomorrow", DataType::Date));
    }

    #[test]
    fn test_pattern_of() {
        assert_eq!(pattern_of("Ann-12"), "Aaa-99");
        assert_eq!(pattern_of(""), "");
        assert_eq!(pattern_of("a b"), "a a");
    }
}
