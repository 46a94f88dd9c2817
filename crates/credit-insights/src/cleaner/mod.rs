//! Data cleaning module for the application table.
//!
//! This module provides functionality for:
//! - Normalizing identifier columns to strings
//! - Deriving ratio and tenure features
//! - Dropping columns with high missing rates
//! - Merging rare category labels

mod derived;
mod rare_labels;

pub use derived::{FeatureDeriver, RATIO_FEATURES, RatioFeature, guarded_ratio, guarded_ratio_series};
pub use rare_labels::{MISSING_KEY, OTHER_LABEL, RareLabelMerger};

use crate::config::PrepConfig;
use crate::types::MissingnessEntry;
use polars::prelude::*;
use tracing::debug;

/// Column-level cleaning operations.
pub struct DataCleaner;

impl DataCleaner {
    /// Cast identifier columns to their canonical string form.
    ///
    /// Float identifiers that hold whole numbers are printed without a
    /// fractional part, so `100002.0` and `100002` normalize identically.
    pub fn normalize_identifiers(
        df: &mut DataFrame,
        config: &PrepConfig,
        processing_steps: &mut Vec<String>,
    ) -> PolarsResult<()> {
        for id_col in &config.id_columns {
            let Ok(column) = df.column(id_col) else {
                continue;
            };
            let series = column.as_materialized_series();
            let normalized = match series.dtype() {
                DataType::Float32 | DataType::Float64 => {
                    let values: Vec<Option<String>> = series
                        .cast(&DataType::Float64)?
                        .f64()?
                        .into_iter()
                        .map(|v| {
                            v.map(|x| {
                                if x.fract() == 0.0 && x.is_finite() {
                                    format!("{}", x as i64)
                                } else {
                                    x.to_string()
                                }
                            })
                        })
                        .collect();
                    Series::new(id_col.as_str().into(), values)
                }
                _ => series.cast(&DataType::String)?,
            };
            df.replace(id_col, normalized)?;
            processing_steps.push(format!("Normalized identifier '{}' to string", id_col));
        }
        Ok(())
    }

    /// Drop columns whose missing percentage exceeds the threshold.
    ///
    /// Identifier and outcome columns are never dropped.
    pub fn drop_sparse_columns(
        df: DataFrame,
        missingness: &[MissingnessEntry],
        config: &PrepConfig,
        processing_steps: &mut Vec<String>,
    ) -> (DataFrame, Vec<String>) {
        let threshold_pct = config.missing_column_threshold * 100.0;
        let high_missing_cols: Vec<String> = missingness
            .iter()
            .filter(|entry| entry.missing_pct > threshold_pct && !config.is_protected(&entry.column))
            .map(|entry| entry.column.clone())
            .collect();

        if high_missing_cols.is_empty() {
            processing_steps.push(format!(
                "No columns with >{:.0}% missing values found",
                threshold_pct
            ));
            return (df, high_missing_cols);
        }

        let cols_ref: Vec<PlSmallStr> = high_missing_cols
            .iter()
            .map(|s| s.as_str().into())
            .collect();
        let df = df.drop_many(cols_ref);

        processing_steps.push(format!(
            "Removed {} columns with >{:.0}% missing values: {:?}",
            high_missing_cols.len(),
            threshold_pct,
            high_missing_cols
        ));
        debug!("Dropped sparse columns: {:?}", high_missing_cols);

        (df, high_missing_cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::string_values;

    #[test]
    fn test_normalize_identifiers() {
        let mut df = df![
            "SK_ID_CURR" => [100002.0, 100003.0],
            "AMT_CREDIT" => [1.0, 2.0],
        ]
        .unwrap();
        let mut steps = Vec::new();

        DataCleaner::normalize_identifiers(&mut df, &PrepConfig::default(), &mut steps).unwrap();

        let ids = string_values(df.column("SK_ID_CURR").unwrap().as_materialized_series()).unwrap();
        assert_eq!(ids, vec![Some("100002".to_string()), Some("100003".to_string())]);
        assert_eq!(df.column("SK_ID_CURR").unwrap().dtype(), &DataType::String);
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_normalize_integer_identifiers() {
        let mut df = df!["SK_ID_CURR" => [7i64, 8]].unwrap();
        let mut steps = Vec::new();

        DataCleaner::normalize_identifiers(&mut df, &PrepConfig::default(), &mut steps).unwrap();

        let ids = string_values(df.column("SK_ID_CURR").unwrap().as_materialized_series()).unwrap();
        assert_eq!(ids, vec![Some("7".to_string()), Some("8".to_string())]);
    }

    #[test]
    fn test_drop_sparse_columns_respects_protected() {
        let df = df![
            "TARGET" => [Some(1i64), None, None, None, None],
            "sparse" => [Some(1.0), None, None, None, None],
            "ok" => [1.0, 2.0, 3.0, 4.0, 5.0],
        ]
        .unwrap();
        let missingness = vec![
            MissingnessEntry { column: "TARGET".to_string(), missing_pct: 80.0 },
            MissingnessEntry { column: "sparse".to_string(), missing_pct: 80.0 },
            MissingnessEntry { column: "ok".to_string(), missing_pct: 0.0 },
        ];
        let mut steps = Vec::new();

        let (df, dropped) =
            DataCleaner::drop_sparse_columns(df, &missingness, &PrepConfig::default(), &mut steps);

        assert_eq!(dropped, vec!["sparse".to_string()]);
        assert!(df.column("TARGET").is_ok());
        assert!(df.column("sparse").is_err());
    }

    #[test]
    fn test_drop_threshold_is_strict() {
        let df = df!["edge" => [Some(1.0), Some(2.0), None, None, None]].unwrap();
        let missingness = vec![MissingnessEntry {
            column: "edge".to_string(),
            missing_pct: 60.0,
        }];
        let mut steps = Vec::new();

        let (df, dropped) =
            DataCleaner::drop_sparse_columns(df, &missingness, &PrepConfig::default(), &mut steps);

        assert!(dropped.is_empty());
        assert_eq!(df.width(), 1);
    }
}
