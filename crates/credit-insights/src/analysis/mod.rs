//! Aggregation helpers over a filtered subset.
//!
//! - [`rates`]: outcome rates, rate-by-category, outcome counts, segment shares
//! - [`correlation`]: guarded correlation matrices and top-K drivers
//! - [`sampling`]: fixed-seed uniform sampling for plot-scale frames
//! - [`kpis`]: the KPI blocks of each dashboard page

pub mod correlation;
pub mod kpis;
pub mod rates;
pub mod sampling;

pub use correlation::{average_ranks, compute_correlations, pearson, spearman, top_k_by_abs};
pub use kpis::{
    DemographicsKpis, DriverKpis, FinancialKpis, OverviewKpis, PageKpis, SegmentationKpis,
    skewness,
};
pub use rates::{
    STATUS_COLUMN, UNKNOWN_STATUS, add_status_column, category_share_pct, group_mean, max_rate,
    numeric_share_pct, outcome_counts, outcome_rate, rate_by_category, share_pct,
};
pub use sampling::uniform_sample;
