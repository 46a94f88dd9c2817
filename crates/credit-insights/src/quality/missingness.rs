//! Missingness reporting.

use crate::types::{Artifacts, MissingnessEntry};
use crate::utils::missing_count;
use polars::prelude::*;

/// Computes per-column missing-value percentages.
pub struct MissingnessReporter;

impl MissingnessReporter {
    /// Missing percentage of every column, sorted descending.
    ///
    /// Ties keep the dataset's column order. An empty dataset reports 0% for
    /// every column.
    pub fn summarize(df: &DataFrame) -> PolarsResult<Vec<MissingnessEntry>> {
        let rows = df.height();
        let mut entries = Vec::with_capacity(df.width());

        for column in df.get_columns() {
            let missing = missing_count(column.as_materialized_series())?;
            let missing_pct = if rows > 0 {
                missing as f64 / rows as f64 * 100.0
            } else {
                0.0
            };
            entries.push(MissingnessEntry {
                column: column.name().to_string(),
                missing_pct,
            });
        }

        entries.sort_by(|a, b| {
            b.missing_pct
                .partial_cmp(&a.missing_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(entries)
    }

    /// Top-k columns by missing percentage.
    ///
    /// Prefers the pre-cleaning table recorded in the artifacts; falls back to
    /// computing it on `df` when the artifacts carry none.
    pub fn top_k(
        artifacts: Option<&Artifacts>,
        df: &DataFrame,
        k: usize,
    ) -> PolarsResult<Vec<MissingnessEntry>> {
        let mut entries = match artifacts {
            Some(artifacts) if !artifacts.missingness_before.is_empty() => {
                let mut entries = artifacts.missingness_before.clone();
                entries.sort_by(|a, b| {
                    b.missing_pct
                        .partial_cmp(&a.missing_pct)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                entries
            }
            _ => Self::summarize(df)?,
        };
        entries.truncate(k);
        Ok(entries)
    }

    /// Average missing percentage across columns; NaN for a frame without columns.
    pub fn average_pct(df: &DataFrame) -> PolarsResult<f64> {
        let entries = Self::summarize(df)?;
        if entries.is_empty() {
            return Ok(f64::NAN);
        }
        Ok(entries.iter().map(|e| e.missing_pct).sum::<f64>() / entries.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_sorted_descending() {
        let df = df![
            "full" => [1.0, 2.0, 3.0, 4.0],
            "half" => [Some(1.0), None, Some(f64::NAN), Some(4.0)],
            "text" => [None, None, None, Some("a")],
        ]
        .unwrap();

        let report = MissingnessReporter::summarize(&df).unwrap();

        let columns: Vec<&str> = report.iter().map(|e| e.column.as_str()).collect();
        assert_eq!(columns, vec!["text", "half", "full"]);
        assert_eq!(report[0].missing_pct, 75.0);
        assert_eq!(report[1].missing_pct, 50.0);
        assert_eq!(report[2].missing_pct, 0.0);
    }

    #[test]
    fn test_summarize_empty_frame() {
        let df = DataFrame::empty();
        assert!(MissingnessReporter::summarize(&df).unwrap().is_empty());
        assert!(MissingnessReporter::average_pct(&df).unwrap().is_nan());
    }

    #[test]
    fn test_top_k_prefers_artifacts() {
        let df = df!["a" => [1.0]].unwrap();
        let artifacts = Artifacts {
            missingness_before: vec![
                MissingnessEntry { column: "x".to_string(), missing_pct: 10.0 },
                MissingnessEntry { column: "y".to_string(), missing_pct: 90.0 },
            ],
            ..Artifacts::default()
        };

        let top = MissingnessReporter::top_k(Some(&artifacts), &df, 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].column, "y");

        let fallback = MissingnessReporter::top_k(None, &df, 5).unwrap();
        assert_eq!(fallback[0].column, "a");
    }
}
