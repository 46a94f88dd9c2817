//! Pipeline module.
//!
//! This module provides the preprocessing pipeline and its winsorization step.

mod builder;
mod executor;
pub mod outliers;

pub use builder::{Pipeline, PipelineBuilder};
pub use executor::PreprocessingExecutor;
pub use outliers::{INCOME_BRACKET_COLUMN, INCOME_BRACKETS, Winsorizer, income_brackets};
