use crate::analysis::{PageKpis, uniform_sample};
use crate::config::AnalysisOptions;
use crate::error::{InsightsError, Result, ResultExt};
use crate::filters::{AppliedConstraint, FilterSelections};
use crate::session::AnalysisContext;
use crate::types::Artifacts;
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

// ============================================================================
// Report Types
// ============================================================================

/// Everything one dashboard refresh displays.
///
/// KPIs that cannot be computed on the filtered subset are NaN and serialize
/// as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Name of the dataset source
    pub source: String,
    pub target_column: String,
    pub dataset: DatasetSummary,
    /// Constraints the filter engine actually applied, by column
    pub filters: BTreeMap<String, AppliedConstraint>,
    pub artifacts: Artifacts,
    pub pages: PageKpis,
}

/// Shape of the dataset at each stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub rows_raw: usize,
    pub columns_raw: usize,
    pub rows_clean: usize,
    pub columns_clean: usize,
    pub rows_filtered: usize,
    /// Rows kept in the plot-scale sample of the filtered subset
    pub rows_sampled: usize,
}

impl DashboardReport {
    /// Filter the cleaned dataset and compute every page on the subset.
    pub fn build(
        context: &AnalysisContext,
        source: &str,
        selections: &FilterSelections,
        options: &AnalysisOptions,
    ) -> Result<Self> {
        options
            .validate()
            .map_err(|e| InsightsError::InvalidConfig(e.to_string()))?;

        let (filtered, filters) = context.filtered(selections)?;
        debug!(
            "Filters kept {} of {} rows",
            filtered.height(),
            context.clean().height()
        );

        let sample = uniform_sample(&filtered, options.sample_size, options.sample_seed)
            .context("Sampling filtered subset")?;
        let pages = PageKpis::compute(
            &filtered,
            Some(context.artifacts()),
            context.target_column(),
            options,
        )
        .context("Computing page KPIs")?;

        Ok(Self {
            generated_at: Local::now().to_rfc3339(),
            source: source.to_string(),
            target_column: context.target_column().to_string(),
            dataset: DatasetSummary {
                rows_raw: context.raw().height(),
                columns_raw: context.raw().width(),
                rows_clean: context.clean().height(),
                columns_clean: context.clean().width(),
                rows_filtered: filtered.height(),
                rows_sampled: sample.height(),
            },
            filters,
            artifacts: context.artifacts().clone(),
            pages,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Report Writer
// ============================================================================

/// Writes dashboard reports to an output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new(PathBuf::from("./outputs"))
    }
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Write `report` as `<stem>_report.json` and return the path.
    pub fn write_report_to_file(&self, report: &DashboardReport, stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let report_path = self.output_dir.join(format!("{}_report.json", stem));

        let mut file = File::create(&report_path)?;
        file.write_all(report.to_json_pretty()?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }
}
