//! Data quality module.
//!
//! This module reports missing values per column, both for the audit trail of
//! the pipeline and for the overview page.

mod missingness;

pub use missingness::MissingnessReporter;
