//! Column type inference for delimited text
//!
//! Every value of a column is tested, not a sample. A column is classified as
//! the narrowest of [`InferredType::Integer`], [`InferredType::Real`] and
//! [`InferredType::Timestamp`] that accepts all of its non-empty values;
//! anything else, including a column with no values at all, is
//! [`InferredType::Text`].
//!
//! ## Example
//!
//! ```
//! use dir_to_db::inference::{InferredType, infer_column_type};
//!
//! assert_eq!(infer_column_type(["1", "2", "3"]), InferredType::Integer);
//! assert_eq!(infer_column_type(["1.5", "2", "3.25"]), InferredType::Real);
//! assert_eq!(infer_column_type(["1", "2.5", "x"]), InferredType::Text);
//! ```

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Date-time layouts accepted for timestamp columns (`%.f` also matches no fraction)
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Date-only layouts accepted for timestamp columns
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Layout timestamps are rendered in for the bulk transfer
const TIMESTAMP_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Semantic type inferred for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredType {
    /// Free text; the fallback for mixed or empty columns
    #[default]
    Text,
    /// Whole numbers that fit a 32-bit `int` column
    Integer,
    /// Finite floating-point numbers
    Real,
    /// Dates and date-times
    Timestamp,
}

impl InferredType {
    /// Lowercase name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            InferredType::Text => "text",
            InferredType::Integer => "integer",
            InferredType::Real => "real",
            InferredType::Timestamp => "timestamp",
        }
    }
}

impl std::fmt::Display for InferredType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running tally of which types a column's values satisfy
#[derive(Debug, Clone, Default)]
pub struct TypeCandidate {
    non_empty: usize,
    integer_matches: usize,
    real_matches: usize,
    timestamp_matches: usize,
}

impl TypeCandidate {
    /// Create an empty candidate
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one raw value
    pub fn update(&mut self, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return;
        }

        self.non_empty += 1;

        if trimmed.parse::<i32>().is_ok() {
            self.integer_matches += 1;
        }
        if is_real(trimmed) {
            self.real_matches += 1;
        }
        if parse_timestamp(trimmed).is_some() {
            self.timestamp_matches += 1;
        }
    }

    /// Classify the column from the values seen so far
    pub fn decide(&self) -> InferredType {
        let all = |matches: usize| matches == self.non_empty;

        if self.non_empty == 0 {
            InferredType::Text
        } else if all(self.integer_matches) {
            InferredType::Integer
        } else if all(self.real_matches) {
            InferredType::Real
        } else if all(self.timestamp_matches) {
            InferredType::Timestamp
        } else {
            InferredType::Text
        }
    }
}

/// Infer the type of a single column from all of its values
pub fn infer_column_type<'a, I>(values: I) -> InferredType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidate = TypeCandidate::new();
    for value in values {
        candidate.update(value);
    }
    candidate.decide()
}

/// Infer the type of every column of a row-major table.
///
/// `width` is the number of header columns; rows are expected to match it.
pub fn infer_column_types<R: AsRef<[String]>>(rows: &[R], width: usize) -> Vec<InferredType> {
    let mut candidates = vec![TypeCandidate::new(); width];

    for row in rows {
        for (candidate, value) in candidates.iter_mut().zip(row.as_ref()) {
            candidate.update(value);
        }
    }

    candidates.iter().map(TypeCandidate::decide).collect()
}

/// Render a value the way the bulk-copy payload expects it for a column of `ty`.
///
/// Numbers are trimmed, timestamps are rewritten to `YYYY-MM-DD HH:MM:SS[.f]`
/// in UTC, and text is passed through untouched.
pub fn normalize_value(value: &str, ty: InferredType) -> Cow<'_, str> {
    match ty {
        InferredType::Text => Cow::Borrowed(value),
        InferredType::Integer | InferredType::Real => Cow::Borrowed(value.trim()),
        InferredType::Timestamp => {
            let trimmed = value.trim();
            match parse_timestamp(trimmed) {
                Some(ts) => Cow::Owned(ts.format(TIMESTAMP_OUTPUT_FORMAT).to_string()),
                None => Cow::Borrowed(trimmed),
            }
        }
    }
}

/// Parse a date or date-time in any accepted layout
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn is_real(value: &str) -> bool {
    // Rejects "inf"/"NaN" spellings, which parse but are not data
    value.bytes().any(|b| b.is_ascii_digit())
        && value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_columns() {
        assert_eq!(infer_column_type(["1", "2", "3"]), InferredType::Integer);
        assert_eq!(infer_column_type(["1.5", "2", "3.25"]), InferredType::Real);
        assert_eq!(infer_column_type(["1", "2.5", "x"]), InferredType::Text);
        assert_eq!(infer_column_type(["-4", "+7", "0"]), InferredType::Integer);
        assert_eq!(infer_column_type(["1e3", ".5"]), InferredType::Real);
    }

    #[test]
    fn test_empty_columns_are_text() {
        assert_eq!(infer_column_type(Vec::<&str>::new()), InferredType::Text);
        assert_eq!(infer_column_type(["", "", ""]), InferredType::Text);
        assert_eq!(infer_column_type(["  ", "\t"]), InferredType::Text);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        assert_eq!(infer_column_type(["1", "", "3"]), InferredType::Integer);
        assert_eq!(infer_column_type(["", "2.5"]), InferredType::Real);
    }

    #[test]
    fn test_whitespace_does_not_affect_classification() {
        assert_eq!(infer_column_type([" 1", "2 ", " 3 "]), InferredType::Integer);
        assert_eq!(infer_column_type([" 1.801 ", "201.411"]), InferredType::Real);
    }

    #[test]
    fn test_wide_integers_fall_back_to_real() {
        assert_eq!(
            infer_column_type(["1", "9999999999"]),
            InferredType::Real
        );
    }

    #[test]
    fn test_non_finite_spellings_are_text() {
        assert_eq!(infer_column_type(["inf", "NaN"]), InferredType::Text);
        assert_eq!(infer_column_type(["1.0", "infinity"]), InferredType::Text);
    }

    #[test]
    fn test_timestamp_columns() {
        assert_eq!(
            infer_column_type(["2024-01-05", "2024-02-29 13:45:00", "2024-03-01T08:00:00.125"]),
            InferredType::Timestamp
        );
        assert_eq!(
            infer_column_type(["2024/01/05", "2024-01-05T10:00:00+02:00"]),
            InferredType::Timestamp
        );
        assert_eq!(
            infer_column_type(["2024-01-05", "not a date"]),
            InferredType::Text
        );
        assert_eq!(infer_column_type(["2024-02-30"]), InferredType::Text);
    }

    #[test]
    fn test_durations_are_text() {
        assert_eq!(
            infer_column_type(["1 days 02:00:00", "0 days 00:30:00"]),
            InferredType::Text
        );
        assert_eq!(infer_column_type(["02:00:00", "00:30:00"]), InferredType::Text);
    }

    #[test]
    fn test_infer_column_types() {
        let rows = vec![
            vec!["1.801".to_string(), "a".to_string(), "3".to_string()],
            vec!["1990".to_string(), "b".to_string(), "".to_string()],
        ];
        assert_eq!(
            infer_column_types(&rows, 3),
            vec![InferredType::Real, InferredType::Text, InferredType::Integer]
        );
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value(" 42 ", InferredType::Integer), "42");
        assert_eq!(normalize_value(" 1.5", InferredType::Real), "1.5");
        assert_eq!(normalize_value(" keep ", InferredType::Text), " keep ");
        assert_eq!(
            normalize_value("2024/01/05", InferredType::Timestamp),
            "2024-01-05 00:00:00"
        );
        assert_eq!(
            normalize_value("2024-01-05T10:00:00+02:00", InferredType::Timestamp),
            "2024-01-05 08:00:00"
        );
        assert_eq!(
            normalize_value("2024-03-01T08:00:00.125", InferredType::Timestamp),
            "2024-03-01 08:00:00.125"
        );
        assert_eq!(normalize_value("", InferredType::Timestamp), "");
    }

    #[test]
    fn test_display() {
        assert_eq!(InferredType::Real.to_string(), "real");
        assert_eq!(InferredType::default(), InferredType::Text);
    }
}
