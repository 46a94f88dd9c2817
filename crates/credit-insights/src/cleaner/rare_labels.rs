//! Rare-category merging.

use crate::utils::string_values;
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Final label of merged categories.
pub const OTHER_LABEL: &str = "Other";

/// Mapping key used for the missing-value bucket.
pub const MISSING_KEY: &str = "<NA>";

/// Collapses low-frequency category values into [`OTHER_LABEL`].
#[derive(Debug, Clone)]
pub struct RareLabelMerger {
    min_share: f64,
    protected_label: String,
}

impl Default for RareLabelMerger {
    fn default() -> Self {
        Self::new(0.01, "XNA")
    }
}

impl RareLabelMerger {
    pub fn new(min_share: f64, protected_label: impl Into<String>) -> Self {
        Self {
            min_share,
            protected_label: protected_label.into(),
        }
    }

    /// Map every observed value to its final label.
    ///
    /// Shares are computed over all rows with missing values counted as their
    /// own category. A share strictly below the threshold maps to "Other",
    /// except the protected code which always maps to itself.
    pub fn build_mapping(&self, values: &[Option<String>]) -> BTreeMap<String, String> {
        let total = values.len();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in values {
            let key = value.as_deref().unwrap_or(MISSING_KEY);
            *counts.entry(key).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(value, count)| {
                let share = count as f64 / total as f64;
                let label = if value == self.protected_label || share >= self.min_share {
                    value.to_string()
                } else {
                    OTHER_LABEL.to_string()
                };
                (value.to_string(), label)
            })
            .collect()
    }

    /// Remap a categorical series, returning the new series and the mapping.
    ///
    /// Missing values stay missing unless the missing bucket itself is rare.
    pub fn merge(&self, series: &Series) -> PolarsResult<(Series, BTreeMap<String, String>)> {
        let values = string_values(series)?;
        let mapping = self.build_mapping(&values);

        let merged: Vec<Option<String>> = values
            .into_iter()
            .map(|value| match value {
                Some(v) => Some(mapping.get(&v).cloned().unwrap_or(v)),
                None => mapping
                    .get(MISSING_KEY)
                    .filter(|label| label.as_str() == OTHER_LABEL)
                    .cloned(),
            })
            .collect();

        Ok((Series::new(series.name().clone(), merged), mapping))
    }
}
