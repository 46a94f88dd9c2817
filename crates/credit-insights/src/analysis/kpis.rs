//! Page-level KPI blocks.
//!
//! Each block is a pure function of a filtered subset. A KPI that cannot be
//! computed (absent column, no rows) is NaN, which serializes as `null`.

use super::correlation::{compute_correlations, top_k_by_abs};
use super::rates::{
    category_share_pct, group_mean, max_rate, numeric_share_pct, outcome_counts, outcome_rate,
    rate_by_category, share_pct,
};
use crate::config::{AnalysisOptions, CorrelationMethod};
use crate::pipeline::{INCOME_BRACKET_COLUMN, INCOME_BRACKETS};
use crate::quality::MissingnessReporter;
use crate::types::{
    Artifacts, CategoryRate, CorrelationMatrix, MissingnessEntry, StatusCount, TargetCorrelation,
};
use crate::utils::{
    DtypeCategory, column_values, get_dtype_category, mean, median, numeric_values, string_values,
};
use polars::prelude::*;
use serde::Serialize;

const INCOME: &str = "AMT_INCOME_TOTAL";
const CREDIT: &str = "AMT_CREDIT";
const ANNUITY: &str = "AMT_ANNUITY";
const GOODS_PRICE: &str = "AMT_GOODS_PRICE";
const AGE: &str = "AGE_YEARS";
const EMPLOYMENT: &str = "EMPLOYMENT_YEARS";
const GENDER: &str = "CODE_GENDER";
const EDUCATION: &str = "NAME_EDUCATION_TYPE";
const FAMILY_STATUS: &str = "NAME_FAMILY_STATUS";
const HOUSING: &str = "NAME_HOUSING_TYPE";
const OCCUPATION: &str = "OCCUPATION_TYPE";
const CHILDREN: &str = "CNT_CHILDREN";
const FAMILY_SIZE: &str = "CNT_FAM_MEMBERS";

/// Rows listed in the overview's missingness table.
const MISSINGNESS_TOP_K: usize = 20;

fn column_mean(df: &DataFrame, column: &str) -> PolarsResult<f64> {
    Ok(column_values(df, column)?.map_or(f64::NAN, |v| mean(&v)))
}

fn column_median(df: &DataFrame, column: &str) -> PolarsResult<f64> {
    Ok(column_values(df, column)?
        .and_then(|v| median(&v))
        .unwrap_or(f64::NAN))
}

// ============================================================================
// Overview & data quality
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewKpis {
    pub applicants: usize,
    pub default_rate: f64,
    pub repaid_rate: f64,
    pub total_features: usize,
    pub numeric_features: usize,
    pub categorical_features: usize,
    pub avg_missing_pct: f64,
    pub median_age: f64,
    pub median_income: f64,
    pub avg_credit: f64,
    /// Skewness of income; above 1 reads as right-skewed.
    pub income_skew: f64,
    pub outcome_counts: Vec<StatusCount>,
    pub top_missingness: Vec<MissingnessEntry>,
}

impl OverviewKpis {
    pub fn compute(df: &DataFrame, artifacts: Option<&Artifacts>, target: &str) -> PolarsResult<Self> {
        let default_rate = outcome_rate(df, target)?;
        let categories: Vec<DtypeCategory> = df
            .get_columns()
            .iter()
            .map(|c| get_dtype_category(c.dtype()))
            .collect();

        Ok(Self {
            applicants: df.height(),
            default_rate,
            repaid_rate: 100.0 - default_rate,
            total_features: df.width(),
            numeric_features: categories.iter().filter(|c| **c == DtypeCategory::Numeric).count(),
            categorical_features: categories.iter().filter(|c| **c == DtypeCategory::String).count(),
            avg_missing_pct: MissingnessReporter::average_pct(df)?,
            median_age: column_median(df, AGE)?,
            median_income: column_median(df, INCOME)?,
            avg_credit: column_mean(df, CREDIT)?,
            income_skew: match df.column(INCOME) {
                Ok(column) => skewness(column.as_materialized_series())?,
                Err(_) => f64::NAN,
            },
            outcome_counts: outcome_counts(df, target)?,
            top_missingness: MissingnessReporter::top_k(artifacts, df, MISSINGNESS_TOP_K)?,
        })
    }
}

// ============================================================================
// Target & segmentation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentationKpis {
    pub total_defaults: usize,
    pub default_rate: f64,
    pub by_gender: Vec<CategoryRate>,
    pub by_education: Vec<CategoryRate>,
    pub by_family_status: Vec<CategoryRate>,
    pub by_housing: Vec<CategoryRate>,
    pub max_gender_rate: f64,
    pub max_education_rate: f64,
    pub max_family_status_rate: f64,
    pub max_housing_rate: f64,
    pub avg_income_defaulters: f64,
    pub avg_credit_defaulters: f64,
    pub avg_annuity_defaulters: f64,
    pub avg_employment_years_defaulters: f64,
}

impl SegmentationKpis {
    pub fn compute(df: &DataFrame, target: &str) -> PolarsResult<Self> {
        let total_defaults = column_values(df, target)?
            .map(|v| v.iter().filter(|o| **o == Some(1.0)).count())
            .unwrap_or(0);
        let by_gender = rate_by_category(df, GENDER, target)?;
        let by_education = rate_by_category(df, EDUCATION, target)?;
        let by_family_status = rate_by_category(df, FAMILY_STATUS, target)?;
        let by_housing = rate_by_category(df, HOUSING, target)?;

        Ok(Self {
            total_defaults,
            default_rate: outcome_rate(df, target)?,
            max_gender_rate: max_rate(&by_gender),
            max_education_rate: max_rate(&by_education),
            max_family_status_rate: max_rate(&by_family_status),
            max_housing_rate: max_rate(&by_housing),
            by_gender,
            by_education,
            by_family_status,
            by_housing,
            avg_income_defaulters: group_mean(df, INCOME, target, 1.0)?,
            avg_credit_defaulters: group_mean(df, CREDIT, target, 1.0)?,
            avg_annuity_defaulters: group_mean(df, ANNUITY, target, 1.0)?,
            avg_employment_years_defaulters: group_mean(df, EMPLOYMENT, target, 1.0)?,
        })
    }
}

// ============================================================================
// Demographics & household
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemographicsKpis {
    /// Share of "M" among rows with a known gender.
    pub male_pct: f64,
    /// Share of "F" among rows with a known gender.
    pub female_pct: f64,
    pub avg_age_defaulters: f64,
    pub avg_age_repaid: f64,
    pub with_children_pct: f64,
    pub avg_family_size: f64,
    pub married_pct: f64,
    pub single_pct: f64,
    pub higher_education_pct: f64,
    pub with_parents_pct: f64,
    pub currently_working_pct: f64,
    pub avg_employment_years: f64,
}

impl DemographicsKpis {
    pub fn compute(df: &DataFrame, target: &str) -> PolarsResult<Self> {
        let (male_pct, female_pct) = match df.column(GENDER) {
            Ok(column) => {
                let values = string_values(column.as_materialized_series())?;
                let known = values.iter().flatten().count();
                let count = |label: &str| values.iter().flatten().filter(|v| *v == label).count();
                // No known gender gives 0 / 0; report 0% like an empty value count
                if known == 0 {
                    (0.0, 0.0)
                } else {
                    (share_pct(count("M"), known), share_pct(count("F"), known))
                }
            }
            Err(_) => (f64::NAN, f64::NAN),
        };

        Ok(Self {
            male_pct,
            female_pct,
            avg_age_defaulters: group_mean(df, AGE, target, 1.0)?,
            avg_age_repaid: group_mean(df, AGE, target, 0.0)?,
            with_children_pct: numeric_share_pct(df, CHILDREN, |v| v > 0.0)?,
            avg_family_size: column_mean(df, FAMILY_SIZE)?,
            married_pct: category_share_pct(df, FAMILY_STATUS, &["Married"])?,
            single_pct: category_share_pct(df, FAMILY_STATUS, &["Single / not married"])?,
            higher_education_pct: category_share_pct(
                df,
                EDUCATION,
                &["Higher education", "Academic degree"],
            )?,
            with_parents_pct: category_share_pct(df, HOUSING, &["With parents"])?,
            currently_working_pct: Self::currently_working_pct(df)?,
            avg_employment_years: column_mean(df, EMPLOYMENT)?,
        })
    }

    /// Rows with positive tenure, or with a known occupation while tenure is
    /// missing.
    fn currently_working_pct(df: &DataFrame) -> PolarsResult<f64> {
        let Some(tenure) = column_values(df, EMPLOYMENT)? else {
            return Ok(f64::NAN);
        };
        let occupation = match df.column(OCCUPATION) {
            Ok(column) => Some(string_values(column.as_materialized_series())?),
            Err(_) => None,
        };

        let working = tenure
            .iter()
            .enumerate()
            .filter(|(i, years)| match years {
                Some(y) => *y > 0.0,
                None => occupation
                    .as_ref()
                    .is_some_and(|occ| occ[*i].is_some()),
            })
            .count();
        Ok(share_pct(working, tenure.len()))
    }
}

// ============================================================================
// Financial health
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialKpis {
    pub avg_income: f64,
    pub median_income: f64,
    pub avg_credit: f64,
    pub avg_annuity: f64,
    pub avg_goods_price: f64,
    pub avg_dti: f64,
    pub avg_lti: f64,
    /// Mean income of repaid minus mean income of defaulted loans.
    pub income_gap: f64,
    /// Mean credit of repaid minus mean credit of defaulted loans.
    pub credit_gap: f64,
    pub high_credit_threshold: f64,
    pub high_credit_pct: f64,
    /// Default rate per income bracket, in Low / Mid / High order.
    pub by_income_bracket: Vec<CategoryRate>,
}

impl FinancialKpis {
    pub fn compute(df: &DataFrame, target: &str, high_credit_threshold: f64) -> PolarsResult<Self> {
        let gap = |column: &str| -> PolarsResult<f64> {
            Ok(group_mean(df, column, target, 0.0)? - group_mean(df, column, target, 1.0)?)
        };

        let mut by_income_bracket = rate_by_category(df, INCOME_BRACKET_COLUMN, target)?;
        by_income_bracket.retain(|r| r.category.is_some());
        by_income_bracket.sort_by_key(|r| {
            INCOME_BRACKETS
                .iter()
                .position(|b| Some(*b) == r.category.as_deref())
                .unwrap_or(INCOME_BRACKETS.len())
        });

        Ok(Self {
            avg_income: column_mean(df, INCOME)?,
            median_income: column_median(df, INCOME)?,
            avg_credit: column_mean(df, CREDIT)?,
            avg_annuity: column_mean(df, ANNUITY)?,
            avg_goods_price: column_mean(df, GOODS_PRICE)?,
            avg_dti: column_mean(df, "DTI")?,
            avg_lti: column_mean(df, "LTI")?,
            income_gap: gap(INCOME)?,
            credit_gap: gap(CREDIT)?,
            high_credit_threshold,
            high_credit_pct: numeric_share_pct(df, CREDIT, |v| v > high_credit_threshold)?,
            by_income_bracket,
        })
    }
}

// ============================================================================
// Correlations & drivers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverKpis {
    pub method: CorrelationMethod,
    /// Retained numeric columns and their pairwise correlations.
    pub matrix: CorrelationMatrix,
    /// Top-K features by |corr| with the outcome.
    pub top_drivers: Vec<TargetCorrelation>,
    /// Five strongest positive outcome correlations, strongest first.
    pub top_positive: Vec<TargetCorrelation>,
    /// Five strongest negative outcome correlations, strongest first.
    pub top_negative: Vec<TargetCorrelation>,
    pub most_correlated_with_income: Option<TargetCorrelation>,
    pub most_correlated_with_credit: Option<TargetCorrelation>,
    pub income_credit_corr: f64,
    pub age_target_corr: f64,
    pub employment_target_corr: f64,
    pub family_size_target_corr: f64,
    /// Share of the total |corr| carried by the top five features.
    pub top5_abs_share_pct: f64,
    /// Features with |corr| > 0.5.
    pub strong_count: usize,
}

impl DriverKpis {
    pub fn compute(df: &DataFrame, target: &str, method: CorrelationMethod, top_k: usize) -> PolarsResult<Self> {
        let (matrix, target_corr) = compute_correlations(df, method, target)?;

        let mut signed: Vec<TargetCorrelation> = target_corr
            .iter()
            .filter(|(_, corr)| !corr.is_nan())
            .map(|(feature, corr)| TargetCorrelation {
                feature: feature.clone(),
                corr: *corr,
                abs_corr: corr.abs(),
            })
            .collect();
        signed.sort_by(|a, b| b.corr.partial_cmp(&a.corr).unwrap_or(std::cmp::Ordering::Equal));
        let top_positive: Vec<_> = signed.iter().take(5).cloned().collect();
        let top_negative: Vec<_> = signed.iter().rev().take(5).cloned().collect();

        let ranked = top_k_by_abs(&target_corr, target_corr.len());
        let total_abs: f64 = ranked.iter().map(|t| t.abs_corr).sum();
        let top5_abs_share_pct = if total_abs > 0.0 {
            ranked.iter().take(5).map(|t| t.abs_corr).sum::<f64>() / total_abs * 100.0
        } else {
            f64::NAN
        };

        let target_lookup = |feature: &str| {
            target_corr
                .iter()
                .find(|(name, _)| name == feature)
                .map_or(f64::NAN, |(_, corr)| *corr)
        };

        Ok(Self {
            method,
            top_drivers: ranked.iter().take(top_k).cloned().collect(),
            top_positive,
            top_negative,
            most_correlated_with_income: Self::most_correlated(&matrix, INCOME),
            most_correlated_with_credit: Self::most_correlated(&matrix, CREDIT),
            income_credit_corr: matrix.get(INCOME, CREDIT).unwrap_or(f64::NAN),
            age_target_corr: target_lookup(AGE),
            employment_target_corr: target_lookup(EMPLOYMENT),
            family_size_target_corr: target_lookup(FAMILY_SIZE),
            top5_abs_share_pct,
            strong_count: ranked.iter().filter(|t| t.abs_corr > 0.5).count(),
            matrix,
        })
    }

    /// Column with the largest |corr| against `column`, if any.
    fn most_correlated(matrix: &CorrelationMatrix, column: &str) -> Option<TargetCorrelation> {
        top_k_by_abs(&matrix.column_vector(column), 1).into_iter().next()
    }
}

/// All five page blocks computed on one filtered subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageKpis {
    pub overview: OverviewKpis,
    pub segmentation: SegmentationKpis,
    pub demographics: DemographicsKpis,
    pub financial: FinancialKpis,
    pub drivers: DriverKpis,
}

impl PageKpis {
    pub fn compute(
        df: &DataFrame,
        artifacts: Option<&Artifacts>,
        target: &str,
        options: &AnalysisOptions,
    ) -> PolarsResult<Self> {
        Ok(Self {
            overview: OverviewKpis::compute(df, artifacts, target)?,
            segmentation: SegmentationKpis::compute(df, target)?,
            demographics: DemographicsKpis::compute(df, target)?,
            financial: FinancialKpis::compute(df, target, options.high_credit_threshold)?,
            drivers: DriverKpis::compute(df, target, options.correlation_method, options.top_k)?,
        })
    }
}

/// Skewness of a numeric column (adjusted Fisher-Pearson); NaN below 3 values.
pub fn skewness(series: &Series) -> PolarsResult<f64> {
    let values: Vec<f64> = numeric_values(series)?.into_iter().flatten().collect();
    let n = values.len() as f64;
    if values.len() < 3 {
        return Ok(f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    if m2 == 0.0 {
        return Ok(0.0);
    }
    Ok((n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5))
}
