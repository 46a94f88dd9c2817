//! Imputation module for handling missing values.
//!
//! Numeric columns are filled with their median and categorical columns with
//! their mode, falling back to "Unknown" when a column has no values at all.

mod statistical;

pub use statistical::{StatisticalImputer, UNKNOWN_LABEL};
