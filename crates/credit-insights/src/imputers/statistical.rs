//! Statistical imputation methods.

use crate::config::PrepConfig;
use crate::types::DatasetSchema;
use crate::utils::{
    fill_numeric_nulls, fill_string_nulls, median, missing_count, numeric_values, string_mode,
    string_values,
};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Fill value of a categorical column with no observed values.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Statistical imputation for filling missing values.
///
/// Only columns that actually contain missing values are touched, so a
/// column without gaps keeps its original dtype.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Impute every numeric and categorical column of the schema.
    ///
    /// Returns column -> fill description for each column that was filled.
    pub fn impute_all(
        df: &mut DataFrame,
        schema: &DatasetSchema,
        config: &PrepConfig,
        processing_steps: &mut Vec<String>,
    ) -> PolarsResult<BTreeMap<String, String>> {
        let mut fills = BTreeMap::new();

        for col in schema.numeric() {
            if config.impute_exempt.iter().any(|c| *c == col) {
                continue;
            }
            if let Some(value) = Self::apply_numeric_median(df, &col, processing_steps)? {
                fills.insert(col, format!("median={}", value));
            }
        }

        for col in schema.categorical() {
            if let Some(value) = Self::apply_mode_imputation(df, &col, processing_steps)? {
                fills.insert(col, format!("mode={}", value));
            }
        }

        debug!("Imputed {} columns", fills.len());
        Ok(fills)
    }

    /// Fill a numeric column with the median of its non-missing values.
    ///
    /// A column that is entirely missing has no median and is left as is.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> PolarsResult<Option<f64>> {
        let Ok(column) = df.column(col_name) else {
            return Ok(None);
        };
        let series = column.as_materialized_series();
        let missing = missing_count(series)?;
        if missing == 0 {
            return Ok(None);
        }

        let Some(median_val) = median(&numeric_values(series)?) else {
            debug!("'{}' has no observed values, skipping median fill", col_name);
            return Ok(None);
        };

        let filled = fill_numeric_nulls(series, median_val)?;
        df.replace(col_name, filled)?;
        processing_steps.push(format!(
            "Filled {} missing values in '{}' with median: {:.4}",
            missing, col_name, median_val
        ));
        Ok(Some(median_val))
    }

    /// Fill a categorical column with its most frequent value, or
    /// [`UNKNOWN_LABEL`] when it has none.
    pub fn apply_mode_imputation(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> PolarsResult<Option<String>> {
        let Ok(column) = df.column(col_name) else {
            return Ok(None);
        };
        let series = column.as_materialized_series();
        let missing = series.null_count();
        if missing == 0 {
            return Ok(None);
        }

        let mode_val = string_mode(&string_values(series)?)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        let filled = fill_string_nulls(series, &mode_val)?;
        df.replace(col_name, filled)?;

        processing_steps.push(format!(
            "Filled {} missing values in '{}' with mode: '{}'",
            missing, col_name, mode_val
        ));
        Ok(Some(mode_val))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_for(df: &DataFrame) -> DatasetSchema {
        DatasetSchema::infer(df, &PrepConfig::default())
    }

    #[test]
    fn test_numeric_median_fill() {
        let mut df = df!["AMT_ANNUITY" => [Some(1.0), None, Some(3.0), Some(10.0)]].unwrap();
        let mut steps = Vec::new();

        let value = StatisticalImputer::apply_numeric_median(&mut df, "AMT_ANNUITY", &mut steps)
            .unwrap();

        assert_eq!(value, Some(3.0));
        let values =
            numeric_values(df.column("AMT_ANNUITY").unwrap().as_materialized_series()).unwrap();
        assert_eq!(values, vec![Some(1.0), Some(3.0), Some(3.0), Some(10.0)]);
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_complete_column_untouched() {
        let mut df = df!["n" => [1i64, 2, 3]].unwrap();
        let mut steps = Vec::new();

        let value = StatisticalImputer::apply_numeric_median(&mut df, "n", &mut steps).unwrap();

        assert_eq!(value, None);
        assert_eq!(df.column("n").unwrap().dtype(), &DataType::Int64);
        assert!(steps.is_empty());
    }

    #[test]
    fn test_mode_fill_and_unknown_fallback() {
        let mut df = df![
            "NAME_TYPE_SUITE" => [Some("Family"), None, Some("Family"), Some("Alone")],
            "EMPTY" => [None::<&str>, None, None, None],
        ]
        .unwrap();
        let mut steps = Vec::new();

        let mode = StatisticalImputer::apply_mode_imputation(&mut df, "NAME_TYPE_SUITE", &mut steps)
            .unwrap();
        assert_eq!(mode.as_deref(), Some("Family"));

        let unknown =
            StatisticalImputer::apply_mode_imputation(&mut df, "EMPTY", &mut steps).unwrap();
        assert_eq!(unknown.as_deref(), Some(UNKNOWN_LABEL));
        assert_eq!(df.column("EMPTY").unwrap().null_count(), 0);
    }

    #[test]
    fn test_impute_all_respects_exempt_and_protected() {
        let mut df = df![
            "SK_ID_CURR" => [Some("1"), None, Some("3")],
            "TARGET" => [Some(0i64), None, Some(1)],
            "EMPLOYMENT_YEARS" => [Some(1.0), None, Some(3.0)],
            "AMT_CREDIT" => [Some(1.0), None, Some(3.0)],
            "CODE_GENDER" => [Some("M"), None, Some("M")],
        ]
        .unwrap();
        let schema = schema_for(&df);
        let mut steps = Vec::new();

        let fills =
            StatisticalImputer::impute_all(&mut df, &schema, &PrepConfig::default(), &mut steps)
                .unwrap();

        assert_eq!(fills.len(), 2);
        assert_eq!(fills.get("AMT_CREDIT").map(String::as_str), Some("median=2"));
        assert_eq!(fills.get("CODE_GENDER").map(String::as_str), Some("mode=M"));
        assert_eq!(df.column("EMPLOYMENT_YEARS").unwrap().null_count(), 1);
        assert_eq!(df.column("TARGET").unwrap().null_count(), 1);
        assert_eq!(df.column("SK_ID_CURR").unwrap().null_count(), 1);
    }
}
