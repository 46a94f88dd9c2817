//! Correlation matrices and outcome drivers.

use crate::config::CorrelationMethod;
use crate::types::{CorrelationMatrix, TargetCorrelation};
use crate::utils::{is_numeric_dtype, numeric_values, sample_std};
use polars::prelude::*;
use tracing::debug;

/// Minimum non-missing values a column needs to enter the matrix (exclusive).
const MIN_OBSERVED: usize = 2;

/// Pearson correlation of two equally long slices.
///
/// NaN for fewer than 2 points or when either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// 1-based ranks; tied values share the average of their ranks.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end (0-based) hold ranks start+1..=end
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Spearman rank correlation: Pearson on average ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    pearson(&average_ranks(x), &average_ranks(y))
}

/// Correlation of two columns over their pairwise-complete observations.
fn pairwise(a: &[Option<f64>], b: &[Option<f64>], method: CorrelationMethod) -> f64 {
    let (x, y): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip();
    match method {
        CorrelationMethod::Pearson => pearson(&x, &y),
        CorrelationMethod::Spearman => spearman(&x, &y),
    }
}

/// Compute the correlation matrix of the qualifying numeric columns and the
/// outcome's correlation with every other retained column.
///
/// A column qualifies with more than 2 non-missing values and a non-zero
/// standard deviation. Both outputs are empty when no column qualifies; the
/// outcome vector is empty when the outcome column did not qualify.
pub fn compute_correlations(
    df: &DataFrame,
    method: CorrelationMethod,
    target: &str,
) -> PolarsResult<(CorrelationMatrix, Vec<(String, f64)>)> {
    let mut columns = Vec::new();
    let mut series_values: Vec<Vec<Option<f64>>> = Vec::new();

    for column in df.get_columns() {
        if !is_numeric_dtype(column.dtype()) {
            continue;
        }
        let values = numeric_values(column.as_materialized_series())?;
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.len() <= MIN_OBSERVED || sample_std(&present) <= 0.0 {
            debug!("Excluding '{}' from correlations", column.name());
            continue;
        }
        columns.push(column.name().to_string());
        series_values.push(values);
    }

    let size = columns.len();
    let mut values = vec![vec![f64::NAN; size]; size];
    for i in 0..size {
        values[i][i] = 1.0;
        for j in (i + 1)..size {
            let corr = pairwise(&series_values[i], &series_values[j], method);
            values[i][j] = corr;
            values[j][i] = corr;
        }
    }

    let matrix = CorrelationMatrix { columns, values };
    let target_corr = matrix.column_vector(target);
    Ok((matrix, target_corr))
}

/// Rank outcome correlations by absolute value and keep the top `k`.
///
/// NaN correlations are dropped; ties keep their input order.
pub fn top_k_by_abs(target_corr: &[(String, f64)], k: usize) -> Vec<TargetCorrelation> {
    let mut ranked: Vec<TargetCorrelation> = target_corr
        .iter()
        .filter(|(_, corr)| !corr.is_nan())
        .map(|(feature, corr)| TargetCorrelation {
            feature: feature.clone(),
            corr: *corr,
            abs_corr: corr.abs(),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.abs_corr
            .partial_cmp(&a.abs_corr)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(k);
    ranked
}
