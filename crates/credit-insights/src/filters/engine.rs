//! Cumulative application of filter selections.

use super::definitions::{DEFAULT_FILTERS, FilterKind, FilterSpec};
use crate::error::{InsightsError, Result};
use crate::utils::{numeric_values, sorted_present, string_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// A caller's choice for one filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selection {
    /// Allowed category values. Empty means "no filter".
    Categories { values: Vec<String> },
    /// Inclusive numeric bounds.
    Range { min: f64, max: f64 },
    /// Inclusive numeric bounds; missing values pass when `include_missing`.
    RangeWithMissing {
        min: f64,
        max: f64,
        include_missing: bool,
    },
}

/// Column -> selection. Columns without a selection use their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSelections(HashMap<String, Selection>);

impl FilterSelections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the selection of `column`.
    pub fn with(mut self, column: impl Into<String>, selection: Selection) -> Self {
        self.0.insert(column.into(), selection);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Selection> {
        self.0.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Load selections from a JSON object keyed by column.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// The constraint a filter actually applied, for display and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppliedConstraint {
    Categories {
        /// Values observed when the filter ran.
        options: Vec<String>,
        selected: Vec<String>,
    },
    Range {
        min: f64,
        max: f64,
    },
    RangeWithMissing {
        min: f64,
        max: f64,
        include_missing: bool,
    },
}

/// Applies a list of filters cumulatively (logical AND).
#[derive(Debug, Clone)]
pub struct FilterEngine {
    specs: Vec<FilterSpec>,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FILTERS.to_vec())
    }
}

impl FilterEngine {
    pub fn new(specs: Vec<FilterSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[FilterSpec] {
        &self.specs
    }

    /// Filter `df` and return the subset plus the resolved constraints.
    ///
    /// Filters whose column is absent are skipped. An empty input is returned
    /// unchanged with no constraints. The input frame is never modified.
    pub fn apply(
        &self,
        df: &DataFrame,
        selections: &FilterSelections,
    ) -> Result<(DataFrame, BTreeMap<String, AppliedConstraint>)> {
        let mut resolved = BTreeMap::new();
        if df.height() == 0 {
            return Ok((df.clone(), resolved));
        }

        for column in selections.0.keys() {
            if !self.specs.iter().any(|spec| spec.column == column.as_str()) {
                warn!("Ignoring selection for non-filterable column '{}'", column);
            }
        }

        let mut filtered = df.clone();
        for spec in &self.specs {
            let Ok(column) = filtered.column(spec.column) else {
                continue;
            };
            let series = column.as_materialized_series().clone();
            let selection = selections.get(spec.column);

            let outcome = match spec.kind {
                FilterKind::Categorical => Self::categorical(&series, None, selection, spec)?,
                FilterKind::OrderedCategorical(order) => {
                    Self::categorical(&series, Some(order), selection, spec)?
                }
                FilterKind::Range => Self::range(&series, selection, spec)?,
                FilterKind::RangeWithMissing => Self::range_with_missing(&series, selection, spec)?,
            };

            let Some((mask, constraint)) = outcome else {
                continue;
            };
            if let Some(mask) = mask {
                let before = filtered.height();
                filtered = filtered.filter(&BooleanChunked::from_slice("mask".into(), &mask))?;
                debug!(
                    "Filter '{}' kept {} of {} rows",
                    spec.column,
                    filtered.height(),
                    before
                );
            }
            resolved.insert(spec.column.to_string(), constraint);
        }

        Ok((filtered, resolved))
    }

    fn mismatch(spec: &FilterSpec, selection: &Selection) -> InsightsError {
        InsightsError::InvalidFilter {
            column: spec.column.to_string(),
            reason: format!("{:?} filter cannot take selection {:?}", spec.kind, selection),
        }
    }

    fn check_bounds(spec: &FilterSpec, min: f64, max: f64) -> Result<()> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(InsightsError::InvalidFilter {
                column: spec.column.to_string(),
                reason: format!("invalid range [{}, {}]", min, max),
            });
        }
        Ok(())
    }

    /// Membership filter. A `None` mask means every row passes.
    #[allow(clippy::type_complexity)]
    fn categorical(
        series: &Series,
        order: Option<&[&str]>,
        selection: Option<&Selection>,
        spec: &FilterSpec,
    ) -> Result<Option<(Option<Vec<bool>>, AppliedConstraint)>> {
        let values = string_values(series)?;
        let observed: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
        let options: Vec<String> = match order {
            Some(order) => order
                .iter()
                .filter(|value| observed.contains(**value))
                .map(|value| value.to_string())
                .collect(),
            None => observed.iter().map(|value| value.to_string()).collect(),
        };

        let selected = match selection {
            None => options.clone(),
            Some(Selection::Categories { values }) => values.clone(),
            Some(other) => return Err(Self::mismatch(spec, other)),
        };

        let mask = if selected.is_empty() {
            None
        } else {
            let allowed: BTreeSet<&str> = selected.iter().map(String::as_str).collect();
            Some(
                values
                    .iter()
                    .map(|v| v.as_deref().is_some_and(|v| allowed.contains(v)))
                    .collect(),
            )
        };

        Ok(Some((mask, AppliedConstraint::Categories { options, selected })))
    }

    /// Floor of the minimum and ceiling of the maximum of the observed values.
    fn default_bounds(values: &[Option<f64>]) -> Option<(f64, f64)> {
        let sorted = sorted_present(values);
        let min = sorted.first()?;
        let max = sorted.last()?;
        Some((min.floor(), max.ceil()))
    }

    #[allow(clippy::type_complexity)]
    fn range(
        series: &Series,
        selection: Option<&Selection>,
        spec: &FilterSpec,
    ) -> Result<Option<(Option<Vec<bool>>, AppliedConstraint)>> {
        let values = numeric_values(series)?;
        let (min, max) = match selection {
            Some(Selection::Range { min, max }) => (*min, *max),
            Some(other) => return Err(Self::mismatch(spec, other)),
            None => match Self::default_bounds(&values) {
                Some(bounds) => bounds,
                None => {
                    debug!("'{}' has no observed values, range filter skipped", spec.column);
                    return Ok(None);
                }
            },
        };
        Self::check_bounds(spec, min, max)?;

        let mask = values
            .iter()
            .map(|v| v.is_some_and(|x| x >= min && x <= max))
            .collect();
        Ok(Some((Some(mask), AppliedConstraint::Range { min, max })))
    }

    #[allow(clippy::type_complexity)]
    fn range_with_missing(
        series: &Series,
        selection: Option<&Selection>,
        spec: &FilterSpec,
    ) -> Result<Option<(Option<Vec<bool>>, AppliedConstraint)>> {
        let values = numeric_values(series)?;
        let (min, max, include_missing) = match selection {
            Some(Selection::RangeWithMissing {
                min,
                max,
                include_missing,
            }) => (*min, *max, *include_missing),
            Some(other) => return Err(Self::mismatch(spec, other)),
            None => {
                let (min, max) = Self::default_bounds(&values).unwrap_or((0.0, 0.0));
                (min, max, true)
            }
        };
        Self::check_bounds(spec, min, max)?;

        let mask = values
            .iter()
            .map(|v| match v {
                Some(x) => *x >= min && *x <= max,
                None => include_missing,
            })
            .collect();
        Ok(Some((
            Some(mask),
            AppliedConstraint::RangeWithMissing {
                min,
                max,
                include_missing,
            },
        )))
    }
}
