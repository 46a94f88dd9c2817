//! Dashboard report generation.
//!
//! [`DashboardReport`] bundles everything one dashboard refresh shows: the
//! resolved filters, row counts before and after filtering, the
//! preprocessing artifacts and the KPI blocks of every page. It serves:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access in library mode
//!
//! # Example
//!
//! ```rust,ignore
//! use credit_insights::reporting::{DashboardReport, ReportGenerator};
//!
//! let report = DashboardReport::build(&context, "applications.csv", &selections, &options)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new(PathBuf::from("output"));
//! generator.write_report_to_file(&report, "applications")?;
//! ```

mod dashboard;

pub use dashboard::{DashboardReport, DatasetSummary, ReportGenerator};
