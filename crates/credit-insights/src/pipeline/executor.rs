//! Preprocessing executor module.
//!
//! Contains the ordered steps that turn a raw application table into the
//! cleaned dataset and its artifacts.

use crate::cleaner::{DataCleaner, FeatureDeriver, RareLabelMerger};
use crate::config::PrepConfig;
use crate::imputers::StatisticalImputer;
use crate::pipeline::outliers::{INCOME_BRACKET_COLUMN, Winsorizer, income_brackets};
use crate::quality::MissingnessReporter;
use crate::types::{Artifacts, DatasetSchema, PIPELINE_NOTES, PreparedDataset};
use polars::prelude::*;
use tracing::{debug, info, warn};

const INCOME_COLUMN: &str = "AMT_INCOME_TOTAL";

/// Executes the preprocessing steps on a DataFrame.
pub struct PreprocessingExecutor;

impl PreprocessingExecutor {
    /// Run every step in order.
    ///
    /// Steps whose source columns are absent are skipped; none of them fail
    /// because of the dataset's shape.
    pub fn execute(&self, mut df: DataFrame, config: &PrepConfig) -> PolarsResult<PreparedDataset> {
        let mut artifacts = Artifacts::default();
        let steps = &mut artifacts.processing_steps;

        info!("Step 1: Normalizing identifier columns...");
        DataCleaner::normalize_identifiers(&mut df, config, steps)?;

        info!("Step 2: Tagging column kinds...");
        let schema = DatasetSchema::infer(&df, config);
        debug!(
            "{} numeric, {} categorical columns",
            schema.numeric().len(),
            schema.categorical().len()
        );

        info!("Step 3: Deriving features...");
        artifacts.derived_columns =
            FeatureDeriver::new(config.employment_sentinel).derive_all(&mut df, steps)?;

        info!("Step 4: Recording missingness before cleaning...");
        artifacts.missingness_before = MissingnessReporter::summarize(&df)?;

        info!("Step 5: Dropping sparse columns...");
        let (dropped_df, dropped) =
            DataCleaner::drop_sparse_columns(df, &artifacts.missingness_before, config, steps);
        df = dropped_df;
        artifacts.dropped_columns = dropped;

        info!("Step 6: Re-deriving column kinds...");
        let schema = DatasetSchema::infer(&df, config);

        info!("Step 7: Imputing missing values...");
        artifacts.imputations = StatisticalImputer::impute_all(&mut df, &schema, config, steps)?;

        info!("Step 8: Merging rare category labels...");
        let merger = RareLabelMerger::new(config.rare_min_share, config.rare_protected_label.as_str());
        for col in schema.categorical() {
            let series = df.column(&col)?.as_materialized_series().clone();
            let (merged, mapping) = merger.merge(&series)?;
            let merged_count = mapping
                .iter()
                .filter(|(value, label)| value != label)
                .count();
            if merged_count > 0 {
                steps.push(format!(
                    "Merged {} rare labels of '{}' into '{}'",
                    merged_count,
                    col,
                    crate::cleaner::OTHER_LABEL
                ));
            }
            df.replace(&col, merged)?;
            artifacts.rare_label_maps.insert(col, mapping);
        }

        info!("Step 9: Winsorizing skewed numeric columns...");
        let winsorizer = Winsorizer::new(config.winsor_lower, config.winsor_upper);
        for (col, bounds) in winsorizer.apply(&mut df, &config.winsor_columns, steps)? {
            artifacts.winsor_bounds.insert(col, bounds);
        }

        info!("Step 10: Assigning income brackets...");
        let brackets = match df.column(INCOME_COLUMN) {
            Ok(income) => {
                let brackets =
                    income_brackets(income.as_materialized_series(), config.income_bracket_quantiles)?;
                if brackets.is_none() {
                    warn!("{} has no observed values, brackets skipped", INCOME_COLUMN);
                }
                brackets
            }
            Err(_) => {
                debug!("{} absent, brackets skipped", INCOME_COLUMN);
                None
            }
        };
        if let Some(brackets) = brackets {
            df.with_column(brackets)?;
            artifacts.derived_columns.push(INCOME_BRACKET_COLUMN.to_string());
            steps.push(format!("Derived {} from {}", INCOME_BRACKET_COLUMN, INCOME_COLUMN));
        }

        info!("Step 11: Recording missingness after cleaning...");
        artifacts.missingness_after = MissingnessReporter::summarize(&df)?;
        artifacts.notes = PIPELINE_NOTES.iter().map(|n| n.to_string()).collect();

        let schema = DatasetSchema::infer(&df, config);
        info!(
            "Preprocessing completed: {} rows x {} columns ({} dropped, {} derived)",
            df.height(),
            df.width(),
            artifacts.dropped_columns.len(),
            artifacts.derived_columns.len()
        );

        Ok(PreparedDataset {
            clean: df,
            schema,
            artifacts,
        })
    }
}
