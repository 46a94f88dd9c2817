//! Shared utilities for the preparation and aggregation layers.
//!
//! Column access in this crate goes through the helpers here so that null
//! and NaN are treated the same way everywhere: both count as missing.

use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for preprocessing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Other/unknown types
    Other,
}

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

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Column Presence
// =============================================================================

/// Check that every column in `required` exists in `df`.
///
/// Every optional derivation and aggregation declares its inputs as a list
/// and degrades (skip, empty table, NaN) when this returns false.
pub fn has_columns(df: &DataFrame, required: &[&str]) -> bool {
    required.iter().all(|name| df.column(name).is_ok())
}

/// Column names of `df` as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Values of a numeric or boolean series as `f64`, NaN mapped to `None`.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    Ok(float_series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Numeric values of a named column, or `None` if it is absent.
pub fn column_values(df: &DataFrame, name: &str) -> PolarsResult<Option<Vec<Option<f64>>>> {
    match df.column(name) {
        Ok(column) => numeric_values(column.as_materialized_series()).map(Some),
        Err(_) => Ok(None),
    }
}

/// Values of a series rendered as strings.
pub fn string_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let str_series = series.cast(&DataType::String)?;
    Ok(str_series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Number of missing values (null, or NaN for float columns).
pub fn missing_count(series: &Series) -> PolarsResult<usize> {
    if matches!(series.dtype(), DataType::Float32 | DataType::Float64) {
        Ok(numeric_values(series)?.iter().filter(|v| v.is_none()).count())
    } else {
        Ok(series.null_count())
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Sorted non-missing values.
pub fn sorted_present(values: &[Option<f64>]) -> Vec<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    present
}

/// Linear-interpolated quantile of already sorted values.
///
/// Returns NaN for an empty slice.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return values[lower];
    }
    let weight = pos - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}

/// Quantile of the non-missing values, `None` if there are none.
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let sorted = sorted_present(values);
    if sorted.is_empty() {
        None
    } else {
        Some(quantile_sorted(&sorted, q))
    }
}

/// Median of the non-missing values, `None` if there are none.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Mean of the non-missing values; NaN if there are none.
pub fn mean(values: &[Option<f64>]) -> f64 {
    let (sum, n) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Sample standard deviation (n - 1) of a slice; 0.0 for fewer than 2 values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    variance.sqrt()
}

/// Most frequent non-missing string; ties resolve to the smallest value.
pub fn string_mode(values: &[Option<String>]) -> Option<String> {
    let mut value_counts: HashMap<&str, usize> = HashMap::new();
    for val in values.iter().flatten() {
        *value_counts.entry(val.as_str()).or_insert(0) += 1;
    }

    value_counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(val, _)| val.to_string())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill missing values (null or NaN) in a numeric Series; returns `Float64`.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let filled: Vec<Option<f64>> = numeric_values(series)?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let filled: Vec<Option<String>> = string_values(series)?
        .into_iter()
        .map(|v| Some(v.unwrap_or_else(|| fill_value.to_string())))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Float64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(get_dtype_category(&DataType::Boolean), DtypeCategory::Boolean);
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::String);
    }

    #[test]
    fn test_has_columns() {
        let df = df!["a" => [1.0], "b" => [2.0]].unwrap();
        assert!(has_columns(&df, &["a", "b"]));
        assert!(has_columns(&df, &[]));
        assert!(!has_columns(&df, &["a", "c"]));
    }

    #[test]
    fn test_numeric_values_treats_nan_as_missing() {
        let series = Series::new("x".into(), &[Some(1.0), None, Some(f64::NAN)]);
        assert_eq!(numeric_values(&series).unwrap(), vec![Some(1.0), None, None]);
        assert_eq!(missing_count(&series).unwrap(), 2);
    }

    #[test]
    fn test_quantile_sorted_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&values, 0.0), 1.0);
        assert_eq!(quantile_sorted(&values, 1.0), 4.0);
        assert!((quantile_sorted(&values, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile_sorted(&values, 0.25) - 1.75).abs() < 1e-12);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_median_and_mean_skip_missing() {
        let values = [Some(5.0), None, Some(1.0), Some(3.0)];
        assert_eq!(median(&values), Some(3.0));
        assert_eq!(mean(&values), 3.0);
        assert_eq!(median(&[None]), None);
        assert!(mean(&[None]).is_nan());
    }

    #[test]
    fn test_sample_std() {
        let std = sample_std(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((std - 2.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(sample_std(&[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(sample_std(&[5.0]), 0.0);
    }

    #[test]
    fn test_string_mode_tie_breaks_lexicographically() {
        let values: Vec<Option<String>> = ["b", "a", "b", "a", "c"]
            .iter()
            .map(|s| Some(s.to_string()))
            .collect();
        assert_eq!(string_mode(&values), Some("a".to_string()));
        assert_eq!(string_mode(&[None, None]), None);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1.0), None, Some(f64::NAN)]);
        let filled = fill_numeric_nulls(&series, 0.0).unwrap();
        assert_eq!(
            numeric_values(&filled).unwrap(),
            vec![Some(1.0), Some(0.0), Some(0.0)]
        );
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("test".into(), &[Some("a"), None]);
        let filled = fill_string_nulls(&series, "Unknown").unwrap();
        assert_eq!(
            string_values(&filled).unwrap(),
            vec![Some("a".to_string()), Some("Unknown".to_string())]
        );
    }
}
