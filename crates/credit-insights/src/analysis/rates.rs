//! Outcome rates, counts and segment shares.
//!
//! Every helper takes the outcome column name explicitly and degrades to an
//! empty table or NaN when a required column is absent.

use crate::types::{CategoryRate, DEFAULT_LABEL, REPAID_LABEL, StatusCount};
use crate::utils::{column_values, has_columns, mean, string_values};
use polars::prelude::*;
use std::collections::HashMap;

/// Label counted for outcome values other than 0 and 1.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Name of the column appended by [`add_status_column`].
pub const STATUS_COLUMN: &str = "Status";

fn status_label(outcome: Option<f64>) -> Option<&'static str> {
    match outcome {
        Some(v) if v == 0.0 => Some(REPAID_LABEL),
        Some(v) if v == 1.0 => Some(DEFAULT_LABEL),
        _ => None,
    }
}

/// Mean of the outcome values as a percentage; NaN if absent or empty.
pub fn outcome_rate(df: &DataFrame, target: &str) -> PolarsResult<f64> {
    Ok(match column_values(df, target)? {
        Some(values) => mean(&values) * 100.0,
        None => f64::NAN,
    })
}

/// Outcome rate and group size per category of `column`.
///
/// Missing values form their own group. Rows are sorted by rate descending;
/// groups without outcome values (NaN rate) come last.
pub fn rate_by_category(
    df: &DataFrame,
    column: &str,
    target: &str,
) -> PolarsResult<Vec<CategoryRate>> {
    if !has_columns(df, &[column, target]) {
        return Ok(Vec::new());
    }
    let categories = string_values(df.column(column)?.as_materialized_series())?;
    let outcomes = column_values(df, target)?.unwrap_or_default();

    let mut groups: HashMap<Option<String>, Vec<Option<f64>>> = HashMap::new();
    for (category, outcome) in categories.into_iter().zip(outcomes) {
        groups.entry(category).or_default().push(outcome);
    }

    let mut rates: Vec<CategoryRate> = groups
        .into_iter()
        .map(|(category, outcomes)| CategoryRate {
            category,
            default_pct: mean(&outcomes) * 100.0,
            count: outcomes.len(),
        })
        .collect();

    // Deterministic order among equal rates: by category, missing last.
    rates.sort_by(|a, b| {
        a.category
            .is_none()
            .cmp(&b.category.is_none())
            .then_with(|| a.category.cmp(&b.category))
    });
    rates.sort_by(|a, b| match (a.default_pct.is_nan(), b.default_pct.is_nan()) {
        (false, false) => b
            .default_pct
            .partial_cmp(&a.default_pct)
            .unwrap_or(std::cmp::Ordering::Equal),
        (nan_a, nan_b) => nan_a.cmp(&nan_b),
    });
    Ok(rates)
}

/// Highest rate of a [`rate_by_category`] table; NaN when the table is empty.
pub fn max_rate(rates: &[CategoryRate]) -> f64 {
    rates.first().map(|r| r.default_pct).unwrap_or(f64::NAN)
}

/// Row counts per outcome label, most frequent first.
///
/// Only labels that occur are listed. Values other than 0/1, including
/// missing ones, are counted under [`UNKNOWN_STATUS`].
pub fn outcome_counts(df: &DataFrame, target: &str) -> PolarsResult<Vec<StatusCount>> {
    let Some(outcomes) = column_values(df, target)? else {
        return Ok(Vec::new());
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for outcome in outcomes {
        let label = status_label(outcome).unwrap_or(UNKNOWN_STATUS);
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut rows: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
    Ok(rows)
}

/// Copy of `df` with a `Status` column (Repaid / Default) mapped from the outcome.
///
/// Returns an unchanged copy when the outcome column is absent.
pub fn add_status_column(df: &DataFrame, target: &str) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    let Some(outcomes) = column_values(df, target)? else {
        return Ok(out);
    };
    let labels: Vec<Option<&str>> = outcomes.into_iter().map(status_label).collect();
    out.with_column(Series::new(STATUS_COLUMN.into(), labels))?;
    Ok(out)
}

/// Mean of `column` over rows whose outcome equals `outcome`; NaN if either
/// column is absent or no such row has a value.
pub fn group_mean(df: &DataFrame, column: &str, target: &str, outcome: f64) -> PolarsResult<f64> {
    let (Some(values), Some(outcomes)) = (column_values(df, column)?, column_values(df, target)?)
    else {
        return Ok(f64::NAN);
    };
    let selected: Vec<Option<f64>> = values
        .into_iter()
        .zip(outcomes)
        .filter(|(_, o)| *o == Some(outcome))
        .map(|(v, _)| v)
        .collect();
    Ok(mean(&selected))
}

/// Percentage of all rows whose numeric `column` satisfies `predicate`.
///
/// Missing values never match. NaN if the column is absent or `df` is empty.
pub fn numeric_share_pct<F>(df: &DataFrame, column: &str, predicate: F) -> PolarsResult<f64>
where
    F: Fn(f64) -> bool,
{
    let Some(values) = column_values(df, column)? else {
        return Ok(f64::NAN);
    };
    let matches = values.iter().filter(|v| v.is_some_and(&predicate)).count();
    Ok(share_pct(matches, values.len()))
}

/// Percentage of all rows whose categorical `column` is one of `accepted`.
pub fn category_share_pct(df: &DataFrame, column: &str, accepted: &[&str]) -> PolarsResult<f64> {
    let Ok(col) = df.column(column) else {
        return Ok(f64::NAN);
    };
    let values = string_values(col.as_materialized_series())?;
    let matches = values
        .iter()
        .filter(|v| v.as_deref().is_some_and(|v| accepted.contains(&v)))
        .count();
    Ok(share_pct(matches, values.len()))
}

/// `part / total` as a percentage; NaN when `total` is zero.
pub fn share_pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn applicants() -> DataFrame {
        df![
            "TARGET" => [1i64, 0, 0, 1, 0],
            "CODE_GENDER" => ["M", "F", "M", "F", "M"],
            "AMT_CREDIT" => [100.0, 200.0, 300.0, 400.0, 500.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_outcome_rate() {
        assert!((outcome_rate(&applicants(), "TARGET").unwrap() - 40.0).abs() < 1e-9);
        assert!(outcome_rate(&applicants(), "missing").unwrap().is_nan());
        assert!(outcome_rate(&applicants().head(Some(0)), "TARGET").unwrap().is_nan());
    }

    #[test]
    fn test_rate_by_category_scenario() {
        // Two of the three M rows default, neither F row does
        let df = df![
            "TARGET" => [1i64, 0, 0, 0, 1],
            "CODE_GENDER" => ["M", "F", "M", "F", "M"],
        ]
        .unwrap();

        let rates = rate_by_category(&df, "CODE_GENDER", "TARGET").unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].category.as_deref(), Some("M"));
        assert!((rates[0].default_pct - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(rates[0].count, 3);
        assert_eq!(rates[1].category.as_deref(), Some("F"));
        assert_eq!(rates[1].default_pct, 0.0);
        assert_eq!(rates[1].count, 2);

        let counts = outcome_counts(&df, "TARGET").unwrap();
        assert_eq!(counts[0], StatusCount { status: "Repaid".to_string(), count: 3 });
        assert_eq!(counts[1], StatusCount { status: "Default".to_string(), count: 2 });
    }

    #[test]
    fn test_rate_by_category_missing_group_and_absent_columns() {
        let df = df![
            "TARGET" => [1i64, 0, 1],
            "NAME_HOUSING_TYPE" => [Some("House / apartment"), None, None],
        ]
        .unwrap();

        let rates = rate_by_category(&df, "NAME_HOUSING_TYPE", "TARGET").unwrap();
        assert_eq!(rates.iter().map(|r| r.count).sum::<usize>(), 3);
        assert!(rates.iter().any(|r| r.category.is_none() && r.count == 2));

        assert!(rate_by_category(&df, "CODE_GENDER", "TARGET").unwrap().is_empty());
        assert!(rate_by_category(&df, "NAME_HOUSING_TYPE", "Y").unwrap().is_empty());
        assert!(max_rate(&[]).is_nan());
    }

    #[test]
    fn test_outcome_counts() {
        let counts = outcome_counts(&applicants(), "TARGET").unwrap();
        assert_eq!(
            counts,
            vec![
                StatusCount { status: "Repaid".to_string(), count: 3 },
                StatusCount { status: "Default".to_string(), count: 2 },
            ]
        );
        assert!(outcome_counts(&applicants(), "missing").unwrap().is_empty());
    }

    #[test]
    fn test_outcome_counts_unknown_values() {
        let df = df!["TARGET" => [Some(1i64), Some(2), None, Some(0)]].unwrap();
        let counts = outcome_counts(&df, "TARGET").unwrap();
        let unknown = counts.iter().find(|c| c.status == UNKNOWN_STATUS).unwrap();
        assert_eq!(unknown.count, 2);
        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), 4);
    }

    #[test]
    fn test_add_status_column() {
        let df = add_status_column(&applicants(), "TARGET").unwrap();
        let status = string_values(df.column(STATUS_COLUMN).unwrap().as_materialized_series())
            .unwrap();
        assert_eq!(status[0].as_deref(), Some("Default"));
        assert_eq!(status[1].as_deref(), Some("Repaid"));

        let unchanged = add_status_column(&applicants(), "missing").unwrap();
        assert_eq!(unchanged.width(), 3);
    }

    #[test]
    fn test_group_mean_and_shares() {
        let df = applicants();
        assert_eq!(group_mean(&df, "AMT_CREDIT", "TARGET", 1.0).unwrap(), 250.0);
        assert_eq!(group_mean(&df, "AMT_CREDIT", "TARGET", 0.0).unwrap(), 1000.0 / 3.0);
        assert!(group_mean(&df, "AMT_ANNUITY", "TARGET", 1.0).unwrap().is_nan());

        assert_eq!(numeric_share_pct(&df, "AMT_CREDIT", |v| v > 250.0).unwrap(), 60.0);
        assert_eq!(category_share_pct(&df, "CODE_GENDER", &["F"]).unwrap(), 40.0);
        assert!(category_share_pct(&df, "NAME_FAMILY_STATUS", &["Married"]).unwrap().is_nan());
        assert!(share_pct(0, 0).is_nan());
    }
}
