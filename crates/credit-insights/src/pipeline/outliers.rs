//! Outlier handling module.
//!
//! Contains the quantile-based clipping of skewed numeric columns and the
//! income bracketing that runs on the clipped income.

use crate::types::WinsorBounds;
use crate::utils::{numeric_values, quantile};
use polars::prelude::*;
use tracing::debug;

/// Bracket labels in their natural order.
pub const INCOME_BRACKETS: [&str; 3] = ["Low", "Mid", "High"];

/// Name of the derived bracket column.
pub const INCOME_BRACKET_COLUMN: &str = "INCOME_BRACKET";

/// Clips numeric columns to quantile bounds.
#[derive(Debug, Clone, Copy)]
pub struct Winsorizer {
    lower: f64,
    upper: f64,
}

impl Default for Winsorizer {
    fn default() -> Self {
        Self::new(0.01, 0.99)
    }
}

impl Winsorizer {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Compute the bounds on the non-missing values of `series` and clip to them.
    ///
    /// Returns `None` for the bounds when the column has no observed values;
    /// the series is then returned unchanged.
    pub fn winsorize(&self, series: &Series) -> PolarsResult<(Series, Option<WinsorBounds>)> {
        let values = numeric_values(series)?;
        let (Some(low), Some(high)) = (quantile(&values, self.lower), quantile(&values, self.upper))
        else {
            return Ok((series.clone(), None));
        };
        let bounds = WinsorBounds { low, high };
        Ok((Self::clip_values(series.name(), values, bounds), Some(bounds)))
    }

    /// Clip `series` into previously computed bounds. Missing values stay missing.
    pub fn clip_to_bounds(series: &Series, bounds: WinsorBounds) -> PolarsResult<Series> {
        let values = numeric_values(series)?;
        Ok(Self::clip_values(series.name(), values, bounds))
    }

    fn clip_values(name: &PlSmallStr, values: Vec<Option<f64>>, bounds: WinsorBounds) -> Series {
        let clipped: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.map(|x| x.clamp(bounds.low, bounds.high)))
            .collect();
        Series::new(name.clone(), clipped)
    }

    /// Winsorize each listed column present in `df`, returning the recorded bounds.
    pub fn apply(
        &self,
        df: &mut DataFrame,
        columns: &[String],
        processing_steps: &mut Vec<String>,
    ) -> PolarsResult<Vec<(String, WinsorBounds)>> {
        let mut recorded = Vec::new();

        for col_name in columns {
            let Ok(column) = df.column(col_name) else {
                continue;
            };
            let (clipped, bounds) = self.winsorize(column.as_materialized_series())?;
            let Some(bounds) = bounds else {
                debug!("'{}' has no observed values, not winsorized", col_name);
                continue;
            };
            df.replace(col_name, clipped)?;
            processing_steps.push(format!(
                "Winsorized '{}' to [{:.4}, {:.4}] ({}/{} quantiles)",
                col_name, bounds.low, bounds.high, self.lower, self.upper
            ));
            recorded.push((col_name.clone(), bounds));
        }

        Ok(recorded)
    }
}

/// Assign Low / Mid / High brackets from two income quantiles.
///
/// `Low` is at or below the lower quantile, `High` strictly above the upper
/// one, `Mid` in between. Missing income yields a missing bracket.
pub fn income_brackets(income: &Series, quantiles: (f64, f64)) -> PolarsResult<Option<Series>> {
    let values = numeric_values(income)?;
    let (Some(q_low), Some(q_high)) = (quantile(&values, quantiles.0), quantile(&values, quantiles.1))
    else {
        return Ok(None);
    };

    let brackets: Vec<Option<&str>> = values
        .iter()
        .map(|v| {
            v.map(|x| {
                if x <= q_low {
                    INCOME_BRACKETS[0]
                } else if x > q_high {
                    INCOME_BRACKETS[2]
                } else {
                    INCOME_BRACKETS[1]
                }
            })
        })
        .collect();

    Ok(Some(Series::new(INCOME_BRACKET_COLUMN.into(), brackets)))
}
