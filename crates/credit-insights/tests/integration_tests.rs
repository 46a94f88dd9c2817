//! Integration tests for the credit insights engine.
//!
//! These tests run the load -> preprocess -> filter -> aggregate chain end to
//! end, on the CSV fixture and on in-memory frames.

use credit_insights::analysis::{max_rate, outcome_counts};
use credit_insights::utils::{column_values, string_values};
use credit_insights::{
    AnalysisOptions, AppliedConstraint, CorrelationMethod, DashboardReport, DataSource,
    FilterEngine, FilterSelections, PageKpis, Pipeline, PrepConfig, Selection, Session,
    outcome_rate, rate_by_category, uniform_sample,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_source() -> DataSource {
    DataSource::Path(fixtures_path().join("applications.csv"))
}

fn prepared_session() -> Session {
    let session = Session::new(PrepConfig::default()).unwrap();
    session.load_and_prepare(&fixture_source()).unwrap();
    session
}

fn categories(values: &[&str]) -> Selection {
    Selection::Categories {
        values: values.iter().map(|v| v.to_string()).collect(),
    }
}

// ============================================================================
// Preprocessing
// ============================================================================

#[test]
fn test_fixture_pipeline_shapes_and_artifacts() {
    let session = prepared_session();
    let context = session.context().unwrap();

    assert_eq!(context.raw().height(), 10);
    assert_eq!(context.clean().height(), 10);

    let artifacts = context.artifacts();
    assert_eq!(artifacts.dropped_columns, vec!["OWN_CAR_AGE".to_string()]);
    assert!(context.clean().column("OWN_CAR_AGE").is_err());
    assert_eq!(
        artifacts.derived_columns,
        vec![
            "AGE_YEARS",
            "EMPLOYMENT_YEARS",
            "DTI",
            "LTI",
            "ANNUITY_TO_CREDIT",
            "INCOME_BRACKET"
        ]
    );
    assert_eq!(artifacts.missingness_before[0].column, "OWN_CAR_AGE");
    assert!((artifacts.missingness_before[0].missing_pct - 70.0).abs() < 1e-9);
    assert!(artifacts.winsor_bounds.contains_key("AMT_INCOME_TOTAL"));
}

#[test]
fn test_fixture_sentinel_tenure_stays_missing() {
    let context = prepared_session().context().unwrap();
    let clean = context.clean();

    let tenure = column_values(clean, "EMPLOYMENT_YEARS").unwrap().unwrap();
    assert_eq!(tenure.iter().filter(|v| v.is_none()).count(), 3);
    assert!(tenure.iter().flatten().all(|years| *years > 0.0));

    let occupation =
        string_values(clean.column("OCCUPATION_TYPE").unwrap().as_materialized_series()).unwrap();
    assert_eq!(occupation.iter().filter(|v| v.is_none()).count(), 0);
    assert_eq!(occupation[7].as_deref(), Some("Laborers"));
}

#[test]
fn test_fixture_identifiers_and_outcome_untouched() {
    let context = prepared_session().context().unwrap();
    let clean = context.clean();

    let ids = string_values(clean.column("SK_ID_CURR").unwrap().as_materialized_series()).unwrap();
    assert_eq!(ids[0].as_deref(), Some("100002"));
    assert_eq!(ids[9].as_deref(), Some("100012"));

    let raw_target = column_values(context.raw(), "TARGET").unwrap().unwrap();
    let clean_target = column_values(clean, "TARGET").unwrap().unwrap();
    assert_eq!(raw_target, clean_target);
}

#[test]
fn test_winsorized_columns_within_bounds() {
    let context = prepared_session().context().unwrap();
    for (column, bounds) in &context.artifacts().winsor_bounds {
        let values = column_values(context.clean(), column).unwrap().unwrap();
        assert!(
            values
                .iter()
                .flatten()
                .all(|v| *v >= bounds.low && *v <= bounds.high),
            "{} escapes its bounds",
            column
        );
    }
}

#[test]
fn test_pipeline_is_deterministic() {
    let session = Session::new(PrepConfig::default()).unwrap();
    let raw = session.loader().load(&fixture_source()).unwrap();
    let pipeline = Pipeline::builder().config(PrepConfig::default()).build().unwrap();

    let first = pipeline.process(raw.clone()).unwrap();
    let second = pipeline.process(raw).unwrap();

    assert!(first.clean.equals_missing(&second.clean));
    assert_eq!(first.artifacts, second.artifacts);
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn test_employment_toggle_excludes_unemployed() {
    let context = prepared_session().context().unwrap();

    let excluded = FilterSelections::new().with(
        "EMPLOYMENT_YEARS",
        Selection::RangeWithMissing {
            min: 0.0,
            max: 50.0,
            include_missing: false,
        },
    );
    let (filtered, _) = context.filtered(&excluded).unwrap();
    assert_eq!(filtered.height(), 7);

    let included = FilterSelections::new().with(
        "EMPLOYMENT_YEARS",
        Selection::RangeWithMissing {
            min: 0.0,
            max: 50.0,
            include_missing: true,
        },
    );
    let (filtered, _) = context.filtered(&included).unwrap();
    assert_eq!(filtered.height(), 10);
}

#[test]
fn test_cumulative_filters_narrow_options() {
    let context = prepared_session().context().unwrap();
    let selections = FilterSelections::new()
        .with("CODE_GENDER", categories(&["F"]))
        .with("NAME_EDUCATION_TYPE", categories(&["Higher education"]));

    let (filtered, resolved) = context.filtered(&selections).unwrap();

    assert_eq!(filtered.height(), 2);
    let AppliedConstraint::Categories { options, .. } = &resolved["NAME_FAMILY_STATUS"] else {
        panic!("family status should resolve to a category constraint");
    };
    assert_eq!(options, &vec!["Married".to_string()]);
}

#[test]
fn test_filtered_default_rate() {
    let context = prepared_session().context().unwrap();
    let selections = FilterSelections::new().with("CODE_GENDER", categories(&["M"]));

    let (filtered, _) = context.filtered(&selections).unwrap();

    assert_eq!(filtered.height(), 6);
    let rate = outcome_rate(&filtered, "TARGET").unwrap();
    assert!((rate - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_invalid_filter_is_reported() {
    let context = prepared_session().context().unwrap();
    let selections = FilterSelections::new().with(
        "AGE_YEARS",
        Selection::Range {
            min: 60.0,
            max: 20.0,
        },
    );

    let err = context.filtered(&selections).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_FILTER");
    assert!(err.is_recoverable());
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_gender_rate_scenario() {
    let df = df![
        "CODE_GENDER" => ["M", "F", "M", "F", "M"],
        "TARGET" => [1i64, 0, 0, 0, 1],
    ]
    .unwrap();

    let (filtered, _) = FilterEngine::default()
        .apply(&df, &FilterSelections::new())
        .unwrap();
    let rates = rate_by_category(&filtered, "CODE_GENDER", "TARGET").unwrap();

    assert_eq!(rates[0].category.as_deref(), Some("M"));
    assert!((rates[0].default_pct - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(rates[1].category.as_deref(), Some("F"));
    assert_eq!(rates[1].default_pct, 0.0);
    assert_eq!(max_rate(&rates), rates[0].default_pct);
}

#[test]
fn test_fixture_page_kpis() {
    let context = prepared_session().context().unwrap();
    let (filtered, _) = context.filtered(&FilterSelections::new()).unwrap();

    let kpis = PageKpis::compute(
        &filtered,
        Some(context.artifacts()),
        "TARGET",
        &AnalysisOptions::default(),
    )
    .unwrap();

    assert_eq!(kpis.overview.applicants, 10);
    assert!((kpis.overview.default_rate - 20.0).abs() < 1e-9);
    assert!((kpis.overview.repaid_rate - 80.0).abs() < 1e-9);
    assert_eq!(kpis.segmentation.total_defaults, 2);
    assert!((kpis.demographics.male_pct - 60.0).abs() < 1e-9);
    assert!((kpis.demographics.with_children_pct - 10.0).abs() < 1e-9);
    assert!((kpis.demographics.with_parents_pct - 10.0).abs() < 1e-9);
    assert_eq!(kpis.drivers.method, CorrelationMethod::Spearman);
    assert!(!kpis.drivers.matrix.is_empty());

    let brackets: Vec<&str> = kpis
        .financial
        .by_income_bracket
        .iter()
        .filter_map(|rate| rate.category.as_deref())
        .collect();
    assert_eq!(brackets, vec!["Low", "Mid", "High"]);

    let counts = outcome_counts(&filtered, "TARGET").unwrap();
    assert_eq!(counts[0].status, "Repaid");
    assert_eq!(counts[0].count, 8);
}

#[test]
fn test_sampling_is_reproducible_and_bounded() {
    let context = prepared_session().context().unwrap();
    let clean = context.clean();

    let first = uniform_sample(clean, 4, 42).unwrap();
    let second = uniform_sample(clean, 4, 42).unwrap();

    assert_eq!(first.height(), 4);
    assert!(first.equals_missing(&second));
    assert_eq!(uniform_sample(clean, 50, 42).unwrap().height(), 10);
}

// ============================================================================
// Session & Reporting
// ============================================================================

#[test]
fn test_analysis_before_preparation_fails() {
    let session = Session::new(PrepConfig::default()).unwrap();
    let err = session.context().unwrap_err();
    assert!(err.is_not_prepared());
    assert_eq!(err.error_code(), "NOT_PREPARED");
}

#[test]
fn test_loader_cache_reuses_fixture() {
    let session = prepared_session();
    session.load_and_prepare(&fixture_source()).unwrap();
    assert_eq!(session.loader().cached_sources(), 1);
}

#[test]
fn test_dashboard_report_from_fixture() {
    let context = prepared_session().context().unwrap();
    let selections = FilterSelections::new().with("CODE_GENDER", categories(&["F"]));
    let options = AnalysisOptions {
        correlation_method: CorrelationMethod::Pearson,
        top_k: 5,
        ..AnalysisOptions::default()
    };

    let report = DashboardReport::build(&context, "applications.csv", &selections, &options).unwrap();

    assert_eq!(report.dataset.rows_filtered, 4);
    assert_eq!(report.pages.overview.applicants, 4);
    assert_eq!(report.pages.overview.default_rate, 0.0);
    assert!(report.pages.drivers.top_drivers.len() <= 5);

    let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["filters"]["CODE_GENDER"]["type"], "categories");
    assert_eq!(json["artifacts"]["dropped_columns"][0], "OWN_CAR_AGE");
}

#[test]
fn test_missing_file_error() {
    let session = Session::new(PrepConfig::default()).unwrap();
    let err = session
        .load_and_prepare(&DataSource::Path(fixtures_path().join("absent.csv")))
        .unwrap_err();
    assert_eq!(err.error_code(), "LOAD_FAILED");
}
