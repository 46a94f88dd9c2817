//! Credit Application Analytics Engine
//!
//! Preparation, filtering and aggregation core behind a credit-risk
//! dashboard, built on Polars.
//!
//! # Overview
//!
//! - **Preprocessing**: identifier normalization, derived features (age,
//!   employment tenure, DTI / LTI / annuity-to-credit), sparse-column
//!   removal, median / mode imputation, 1% tail winsorization, rare-label
//!   merging and income brackets, with an audit [`Artifacts`] record
//! - **Filtering**: cumulative global filters over demographic and
//!   financial columns, each resolved against the current subset
//! - **Aggregation**: outcome rates, rate-by-category tables, guarded
//!   correlation matrices, fixed-seed samples and per-page KPI blocks
//! - **Session**: cached dataset loading and one immutable
//!   [`AnalysisContext`] shared by every page
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use credit_insights::{
//!     AnalysisOptions, DashboardReport, DataSource, FilterSelections, PrepConfig, Selection,
//!     Session,
//! };
//!
//! let session = Session::new(PrepConfig::default())?;
//! let context = session.load_and_prepare(&DataSource::Path("application_train.csv".into()))?;
//!
//! let selections = FilterSelections::new().with(
//!     "CODE_GENDER",
//!     Selection::Categories { values: vec!["F".to_string()] },
//! );
//! let report = DashboardReport::build(
//!     &context,
//!     "application_train.csv",
//!     &selections,
//!     &AnalysisOptions::default(),
//! )?;
//!
//! println!("Default rate: {:.2}%", report.pages.overview.default_rate);
//! ```
//!
//! # Configuration
//!
//! Use [`PrepConfig`] to customize preprocessing thresholds:
//!
//! ```rust,ignore
//! use credit_insights::PrepConfig;
//!
//! let config = PrepConfig::builder()
//!     .missing_column_threshold(0.5)   // Drop columns with >50% missing
//!     .rare_min_share(0.02)            // Merge categories under 2%
//!     .winsor_quantiles(0.05, 0.95)
//!     .build()?;
//! ```

pub mod analysis;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod filters;
pub mod imputers;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod session;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analysis::{
    DemographicsKpis, DriverKpis, FinancialKpis, OverviewKpis, PageKpis, SegmentationKpis,
    compute_correlations, outcome_rate, rate_by_category, top_k_by_abs, uniform_sample,
};
pub use cleaner::{DataCleaner, FeatureDeriver, RareLabelMerger, guarded_ratio};
pub use config::{
    AnalysisOptions, ConfigValidationError, CorrelationMethod, PrepConfig, PrepConfigBuilder,
};
pub use error::{InsightsError, Result as InsightsResult, ResultExt};
pub use filters::{
    AppliedConstraint, DEFAULT_FILTERS, FilterEngine, FilterKind, FilterSelections, FilterSpec,
    Selection,
};
pub use imputers::StatisticalImputer;
pub use pipeline::{Pipeline, PipelineBuilder, PreprocessingExecutor, Winsorizer};
pub use quality::MissingnessReporter;
pub use reporting::{DashboardReport, DatasetSummary, ReportGenerator};
pub use session::{AnalysisContext, DataSource, DatasetLoader, Session};
pub use types::{
    Artifacts, CategoryRate, ColumnKind, CorrelationMatrix, DatasetSchema, MissingnessEntry,
    PreparedDataset, StatusCount, TargetCorrelation, WinsorBounds,
};
pub use utils::{DtypeCategory, get_dtype_category, has_columns, is_numeric_dtype};
