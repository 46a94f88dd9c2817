//! Derived numeric features.
//!
//! Each feature declares the raw columns it needs; a feature whose inputs are
//! absent is skipped without error.

use crate::utils::{has_columns, numeric_values};
use polars::prelude::*;
use tracing::debug;

const DAYS_PER_YEAR: f64 = 365.25;

/// Division that maps invalid operands to missing.
///
/// An infinite numerator, a zero or infinite denominator, or a missing
/// operand yields `None`. The result is never infinite.
#[inline]
pub fn guarded_ratio(numer: Option<f64>, denom: Option<f64>) -> Option<f64> {
    let numer = numer.filter(|n| n.is_finite())?;
    let denom = denom.filter(|d| d.is_finite() && *d != 0.0)?;
    Some(numer / denom).filter(|r| r.is_finite())
}

/// Element-wise [`guarded_ratio`] over two series of equal length.
pub fn guarded_ratio_series(
    name: &str,
    numer: &Series,
    denom: &Series,
) -> PolarsResult<Series> {
    let numer = numeric_values(numer)?;
    let denom = numeric_values(denom)?;
    let ratio: Vec<Option<f64>> = numer
        .into_iter()
        .zip(denom)
        .map(|(n, d)| guarded_ratio(n, d))
        .collect();
    Ok(Series::new(name.into(), ratio))
}

/// A ratio feature: `name = numerator / denominator`.
#[derive(Debug, Clone, Copy)]
pub struct RatioFeature {
    pub name: &'static str,
    pub numerator: &'static str,
    pub denominator: &'static str,
}

/// Debt-to-income, loan-to-income and annuity-to-credit.
pub const RATIO_FEATURES: [RatioFeature; 3] = [
    RatioFeature {
        name: "DTI",
        numerator: "AMT_ANNUITY",
        denominator: "AMT_INCOME_TOTAL",
    },
    RatioFeature {
        name: "LTI",
        numerator: "AMT_CREDIT",
        denominator: "AMT_INCOME_TOTAL",
    },
    RatioFeature {
        name: "ANNUITY_TO_CREDIT",
        numerator: "AMT_ANNUITY",
        denominator: "AMT_CREDIT",
    },
];

/// Computes the derived numeric columns of the application table.
pub struct FeatureDeriver {
    employment_sentinel: f64,
}

impl FeatureDeriver {
    pub fn new(employment_sentinel: f64) -> Self {
        Self {
            employment_sentinel,
        }
    }

    /// Append every derivable feature to `df`. Returns the names added.
    pub fn derive_all(
        &self,
        df: &mut DataFrame,
        processing_steps: &mut Vec<String>,
    ) -> PolarsResult<Vec<String>> {
        let mut derived = Vec::new();

        if has_columns(df, &["DAYS_BIRTH"]) {
            let days = numeric_values(df.column("DAYS_BIRTH")?.as_materialized_series())?;
            df.with_column(Self::days_to_years("AGE_YEARS", &days))?;
            derived.push("AGE_YEARS".to_string());
            processing_steps.push("Derived AGE_YEARS from DAYS_BIRTH".to_string());
        }

        if has_columns(df, &["DAYS_EMPLOYED"]) {
            let sentinel = self.employment_sentinel;
            let raw = numeric_values(df.column("DAYS_EMPLOYED")?.as_materialized_series())?;
            let sentinel_hits = raw.iter().filter(|v| **v == Some(sentinel)).count();
            let days: Vec<Option<f64>> = raw
                .into_iter()
                .map(|v| v.filter(|d| *d != sentinel))
                .collect();

            df.replace("DAYS_EMPLOYED", Series::new("DAYS_EMPLOYED".into(), days.clone()))?;
            df.with_column(Self::days_to_years("EMPLOYMENT_YEARS", &days))?;
            derived.push("EMPLOYMENT_YEARS".to_string());
            processing_steps.push(format!(
                "Derived EMPLOYMENT_YEARS from DAYS_EMPLOYED ({} sentinel values set to missing)",
                sentinel_hits
            ));
            debug!("Replaced {} DAYS_EMPLOYED sentinel values", sentinel_hits);
        }

        for feature in RATIO_FEATURES {
            if !has_columns(df, &[feature.numerator, feature.denominator]) {
                debug!(
                    "Skipping {}: requires {} and {}",
                    feature.name, feature.numerator, feature.denominator
                );
                continue;
            }
            let ratio = guarded_ratio_series(
                feature.name,
                df.column(feature.numerator)?.as_materialized_series(),
                df.column(feature.denominator)?.as_materialized_series(),
            )?;
            df.with_column(ratio)?;
            derived.push(feature.name.to_string());
            processing_steps.push(format!(
                "Derived {} = {} / {}",
                feature.name, feature.numerator, feature.denominator
            ));
        }

        Ok(derived)
    }

    fn days_to_years(name: &str, days: &[Option<f64>]) -> Series {
        let years: Vec<Option<f64>> = days.iter().map(|d| d.map(|v| -v / DAYS_PER_YEAR)).collect();
        Series::new(name.into(), years)
    }
}
