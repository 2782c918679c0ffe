//! Shared column helpers.
//!
//! Most transformations in this crate pull a column out into plain Rust
//! vectors, compute on them, and put a rebuilt [`Series`] back. These helpers
//! keep that round trip in one place.

use crate::error::{ProcessingError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Whether `df` has a column called `name`.
#[inline]
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Whether every name in `names` is a column of `df`.
pub fn has_columns(df: &DataFrame, names: &[&str]) -> bool {
    names.iter().all(|n| has_column(df, n))
}

/// Borrow a column as a materialized series, mapping absence to
/// [`ProcessingError::ColumnNotFound`].
pub fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    if !has_column(df, name) {
        return Err(ProcessingError::ColumnNotFound(name.to_string()));
    }
    Ok(df.column(name)?.as_materialized_series())
}

// =============================================================================
// Extraction
// =============================================================================

/// Read a column as optional floats.
pub fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    series_f64(series(df, name)?)
}

/// Read a series as optional floats, casting numerics and booleans.
///
/// A non-null value that does not parse as a number fails with
/// [`ProcessingError::TypeConversionFailed`] instead of becoming null.
pub fn series_f64(series: &Series) -> Result<Vec<Option<f64>>> {
    let cast = series
        .strict_cast(&DataType::Float64)
        .map_err(|e| ProcessingError::TypeConversionFailed {
            column: series.name().to_string(),
            target_type: "Float64".to_string(),
            reason: e.to_string(),
        })?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Read a column as optional strings.
pub fn column_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    series_strings(series(df, name)?)
}

/// Read a series as optional strings.
pub fn series_strings(series: &Series) -> Result<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Build a Float64 series.
pub fn f64_series(name: &str, values: Vec<Option<f64>>) -> Series {
    Series::new(name.into(), values)
}

/// Build a String series.
pub fn string_series(name: &str, values: Vec<Option<String>>) -> Series {
    Series::new(name.into(), values)
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Median of the non-null values, averaging the two middle values for even
/// counts.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Most frequent non-null value; ties resolve to the smallest value.
pub fn numeric_mode(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(f64::total_cmp);

    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < present.len() {
        let mut j = i;
        while j < present.len() && present[j] == present[i] {
            j += 1;
        }
        let run = j - i;
        if best.is_none_or(|(_, count)| run > count) {
            best = Some((present[i], run));
        }
        i = j.max(i + 1);
    }
    best.map(|(value, _)| value)
}

/// Most frequent non-null string; ties resolve to the lexicographically
/// smallest value.
pub fn string_mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> Result<Series> {
    let values = series_strings(series)?
        .into_iter()
        .map(|v| Some(v.unwrap_or_else(|| fill_value.to_string())))
        .collect::<Vec<_>>();
    Ok(Series::new(series.name().clone(), values))
}

/// Total null cells across the frame.
pub fn total_nulls(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|c| c.null_count()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_median_odd_even_and_nulls() {
        assert_eq!(median(&[Some(3.0), None, Some(1.0), Some(2.0)]), Some(2.0));
        assert_eq!(median(&[Some(4.0), Some(1.0), Some(3.0), Some(2.0)]), Some(2.5));
        assert_eq!(median(&[None, None]), None);
    }

    #[test]
    fn test_numeric_mode_prefers_smallest_on_tie() {
        assert_eq!(
            numeric_mode(&[Some(5.0), Some(0.0), Some(5.0), Some(0.0), None]),
            Some(0.0)
        );
        assert_eq!(numeric_mode(&[Some(7.0), Some(7.0), Some(1.0)]), Some(7.0));
        assert_eq!(numeric_mode(&[None]), None);
    }

    #[test]
    fn test_string_mode() {
        let values = vec![
            Some("a".to_string()),
            Some("b".to_string()),
            Some("a".to_string()),
            None,
        ];
        assert_eq!(string_mode(&values), Some("a".to_string()));

        let tie = vec![Some("No".to_string()), Some("Av".to_string())];
        assert_eq!(string_mode(&tie), Some("Av".to_string()));
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("Fence".into(), &[Some("GdPrv"), None]);
        let filled = fill_string_nulls(&series, "NF").unwrap();
        let values: Vec<_> = filled.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("GdPrv"), Some("NF")]);
    }

    #[test]
    fn test_text_column_does_not_become_nulls() {
        let df = df!["Neighborhood" => [Some("CollgCr"), None, Some("Veenker")]].unwrap();
        let err = column_f64(&df, "Neighborhood").unwrap_err();
        assert_eq!(err.error_code(), "TYPE_CONVERSION_FAILED");
        assert!(err.to_string().contains("Neighborhood"));

        let numeric_text = df!["LotArea" => [Some("8450"), None]].unwrap();
        assert_eq!(column_f64(&numeric_text, "LotArea").unwrap(), vec![Some(8450.0), None]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let df = df!["a" => [1i64, 2]].unwrap();
        let err = column_f64(&df, "b").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(has_column(&df, "a"));
    }
}
