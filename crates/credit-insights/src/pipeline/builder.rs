//! Main preprocessing pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the data preparation workflow.

use crate::config::{ConfigValidationError, PrepConfig};
use crate::error::{ResultExt, Result};
use crate::pipeline::PreprocessingExecutor;
use crate::types::PreparedDataset;
use polars::prelude::*;
use std::time::Instant;
use tracing::{error, info};

/// The main preprocessing pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use credit_insights::{Pipeline, PrepConfig};
///
/// let prepared = Pipeline::builder()
///     .config(PrepConfig::builder().rare_min_share(0.02).build()?)
///     .build()?
///     .process(raw_df)?;
///
/// println!("dropped: {:?}", prepared.artifacts.dropped_columns);
/// ```
pub struct Pipeline {
    config: PrepConfig,
    executor: PreprocessingExecutor,
}

// Pipelines are built on one thread and may run on another.
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Process a raw DataFrame into the cleaned dataset plus artifacts.
    ///
    /// The input is consumed; callers that need the raw table afterwards
    /// pass a clone (cheap, columns are reference counted).
    pub fn process(&self, df: DataFrame) -> Result<PreparedDataset> {
        let start_time = Instant::now();
        info!(
            "Starting preprocessing pipeline on {} rows x {} columns...",
            df.height(),
            df.width()
        );

        match self
            .executor
            .execute(df, &self.config)
            .context("Preprocessing failed")
        {
            Ok(prepared) => {
                info!(
                    "Pipeline completed in {:.2}s",
                    start_time.elapsed().as_secs_f64()
                );
                Ok(prepared)
            }
            Err(e) => {
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }
}

/// Builder for creating a [`Pipeline`] with custom configuration.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PrepConfig>,
}

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PrepConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            executor: PreprocessingExecutor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config(), &PrepConfig::default());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = PrepConfig {
            winsor_lower: 0.99,
            winsor_upper: 0.01,
            ..PrepConfig::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_process_is_deterministic() {
        let df = df![
            "SK_ID_CURR" => [1i64, 2, 3, 4],
            "TARGET" => [0i64, 1, 0, 0],
            "AMT_INCOME_TOTAL" => [Some(10.0), None, Some(30.0), Some(40.0)],
            "NAME_CONTRACT_TYPE" => [Some("Cash loans"), Some("Cash loans"), None, Some("Revolving loans")],
        ]
        .unwrap();
        let pipeline = Pipeline::builder().build().unwrap();

        let first = pipeline.process(df.clone()).unwrap();
        let second = pipeline.process(df).unwrap();

        assert!(first.clean.equals_missing(&second.clean));
        assert_eq!(first.artifacts, second.artifacts);
    }
}
