//! Declarations of the filterable columns.

use serde::Serialize;

/// How a column is filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Multi-value membership; options sorted lexicographically.
    Categorical,
    /// Multi-value membership with a fixed preferred option order.
    OrderedCategorical(&'static [&'static str]),
    /// Inclusive numeric range; rows with missing values never pass.
    Range,
    /// Inclusive numeric range plus an include-missing toggle.
    RangeWithMissing,
}

/// A filterable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub column: &'static str,
    pub label: &'static str,
    pub kind: FilterKind,
}

impl FilterSpec {
    pub const fn new(column: &'static str, label: &'static str, kind: FilterKind) -> Self {
        Self {
            column,
            label,
            kind,
        }
    }
}

/// The global filters, in application order.
pub const DEFAULT_FILTERS: [FilterSpec; 7] = [
    FilterSpec::new("CODE_GENDER", "Gender", FilterKind::Categorical),
    FilterSpec::new("NAME_EDUCATION_TYPE", "Education", FilterKind::Categorical),
    FilterSpec::new("NAME_FAMILY_STATUS", "Family Status", FilterKind::Categorical),
    FilterSpec::new("NAME_HOUSING_TYPE", "Housing Type", FilterKind::Categorical),
    FilterSpec::new("AGE_YEARS", "Age (years)", FilterKind::Range),
    FilterSpec::new(
        "INCOME_BRACKET",
        "Income Bracket",
        FilterKind::OrderedCategorical(&crate::pipeline::INCOME_BRACKETS),
    ),
    FilterSpec::new(
        "EMPLOYMENT_YEARS",
        "Employment Tenure (years)",
        FilterKind::RangeWithMissing,
    ),
];
