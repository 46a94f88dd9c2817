//! CLI entry point for the credit insights engine.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use credit_insights::{
    AnalysisOptions, CategoryRate, CorrelationMethod, DashboardReport, DataSource,
    FilterSelections, PrepConfig, ReportGenerator, Session, TargetCorrelation,
};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// CLI-compatible correlation method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCorrelationMethod {
    /// Rank correlation, robust to skewed amounts
    Spearman,
    /// Linear correlation
    Pearson,
}

impl From<CliCorrelationMethod> for CorrelationMethod {
    fn from(cli: CliCorrelationMethod) -> Self {
        match cli {
            CliCorrelationMethod::Spearman => CorrelationMethod::Spearman,
            CliCorrelationMethod::Pearson => CorrelationMethod::Pearson,
        }
    }
}

/// Dashboard page shown in the human-readable summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Page {
    Overview,
    Segmentation,
    Demographics,
    Financial,
    Drivers,
    All,
}

impl Page {
    fn shows(self, page: Page) -> bool {
        self == Page::All || self == page
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Credit application analytics engine",
    long_about = "Prepares a credit-application table and computes the KPIs of every dashboard page.\n\n\
                  EXAMPLES:\n  \
                  # Overview of the full dataset\n  \
                  credit-insights -i application_train.csv\n\n  \
                  # Drivers page on a filtered subset, Pearson correlation\n  \
                  credit-insights -i application_train.csv --filters filters.json --page drivers --method pearson\n\n  \
                  # Machine-readable report\n  \
                  credit-insights -i application_train.csv --json | jq .pages.overview"
)]
struct Args {
    /// Path to the application table (CSV, or Parquet by extension)
    #[arg(short, long)]
    input: PathBuf,

    /// JSON file overriding the preprocessing configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file with filter selections keyed by column
    #[arg(short, long)]
    filters: Option<PathBuf>,

    /// Page to print in the summary
    #[arg(short, long, value_enum, default_value = "all")]
    page: Page,

    /// Correlation method for the drivers page
    #[arg(long, value_enum, default_value = "spearman")]
    method: CliCorrelationMethod,

    /// Number of outcome drivers ranked by |corr|
    #[arg(long, default_value = "20")]
    top_k: usize,

    /// Maximum rows kept for plot-scale samples
    #[arg(long, default_value = "50000")]
    sample_size: usize,

    /// Seed of the uniform sampler
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Missing column threshold (0.0 - 1.0), overrides the config file
    ///
    /// Columns with a missing fraction above this are dropped
    #[arg(long)]
    missing_col_threshold: Option<f64>,

    /// Credit amount above which a loan counts as high credit
    #[arg(long, default_value = "1000000")]
    high_credit_threshold: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only outputs the report.
    #[arg(long)]
    json: bool,

    /// Write the JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Output directory for --emit-report
    #[arg(short, long, default_value = "./outputs")]
    output: PathBuf,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Load environment variables (RUST_LOG) from .env file
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let config = build_config(&args)?;
    let options = AnalysisOptions {
        sample_size: args.sample_size,
        sample_seed: args.seed,
        top_k: args.top_k,
        correlation_method: args.method.into(),
        high_credit_threshold: args.high_credit_threshold,
    };
    let selections = match &args.filters {
        Some(path) => FilterSelections::from_json_file(path)
            .with_context(|| format!("Failed to read filters from {}", path.display()))?,
        None => FilterSelections::new(),
    };

    let session = Session::new(config)?;
    info!("Loading dataset from: {}", args.input.display());
    let context = match session.load_and_prepare(&DataSource::Path(args.input.clone())) {
        Ok(context) => context,
        Err(e) => {
            error!("Preparation failed: {}", e);
            return Err(anyhow!("Preparation failed: {}", e));
        }
    };

    let source = args.input.display().to_string();
    let report = DashboardReport::build(&context, &source, &selections, &options)?;

    if args.json {
        println!("{}", report.to_json_pretty()?);
        return Ok(());
    }

    if args.emit_report {
        let generator = ReportGenerator::new(args.output.clone());
        let report_path = generator.write_report_to_file(&report, &extract_file_stem(&args.input))?;
        info!("Report written to: {}", report_path.display());
    }

    print_human_readable_summary(&report, args.page);
    Ok(())
}

/// Merge the optional config file with CLI overrides.
fn build_config(args: &Args) -> Result<PrepConfig> {
    let mut config = match &args.config {
        Some(path) => PrepConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?,
        None => PrepConfig::default(),
    };
    if let Some(threshold) = args.missing_col_threshold {
        config.missing_column_threshold = threshold;
    }
    config.validate()?;
    Ok(config)
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Format a KPI value, showing "n/a" for NaN.
fn fmt_value(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.*}", decimals, value)
    }
}

fn fmt_pct(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.2}%", value)
    }
}

fn print_rates(title: &str, rates: &[CategoryRate]) {
    if rates.is_empty() {
        return;
    }
    println!("  {}:", title);
    for rate in rates {
        println!(
            "    {:<36} {:>8} ({} rows)",
            rate.category.as_deref().unwrap_or("<missing>"),
            fmt_pct(rate.default_pct),
            rate.count
        );
    }
}

fn print_correlations(title: &str, correlations: &[TargetCorrelation]) {
    if correlations.is_empty() {
        return;
    }
    println!("  {}:", title);
    for corr in correlations {
        println!("    {:<36} {:>8.3}", corr.feature, corr.corr);
    }
}

/// Print a human-readable summary of the selected pages.
fn print_human_readable_summary(report: &DashboardReport, page: Page) {
    let dataset = &report.dataset;
    let pages = &report.pages;

    println!();
    println!("{}", "=".repeat(80));
    println!("CREDIT INSIGHTS");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Input:    {} ({} rows x {} columns)",
        report.source, dataset.rows_raw, dataset.columns_raw
    );
    println!(
        "Cleaned:  {} rows x {} columns ({} dropped)",
        dataset.rows_clean,
        dataset.columns_clean,
        report.artifacts.dropped_columns.len()
    );
    println!(
        "Filtered: {} rows ({} sampled for plots)",
        dataset.rows_filtered, dataset.rows_sampled
    );
    for (column, constraint) in &report.filters {
        println!("  - {}: {:?}", column, constraint);
    }
    println!();

    if page.shows(Page::Overview) {
        let o = &pages.overview;
        println!("OVERVIEW & DATA QUALITY");
        println!("{}", "-".repeat(40));
        println!("  Applicants:        {}", o.applicants);
        println!("  Default rate:      {}", fmt_pct(o.default_rate));
        println!("  Repaid rate:       {}", fmt_pct(o.repaid_rate));
        println!(
            "  Features:          {} ({} numeric, {} categorical)",
            o.total_features, o.numeric_features, o.categorical_features
        );
        println!("  Avg missing:       {}", fmt_pct(o.avg_missing_pct));
        println!("  Median age:        {}", fmt_value(o.median_age, 1));
        println!("  Median income:     {}", fmt_value(o.median_income, 0));
        println!("  Avg credit:        {}", fmt_value(o.avg_credit, 0));
        for entry in o.top_missingness.iter().take(5) {
            println!("    {:<36} {:>8}", entry.column, fmt_pct(entry.missing_pct));
        }
        println!();
    }

    if page.shows(Page::Segmentation) {
        let s = &pages.segmentation;
        println!("TARGET & RISK SEGMENTATION");
        println!("{}", "-".repeat(40));
        println!("  Total defaults:    {}", s.total_defaults);
        println!("  Default rate:      {}", fmt_pct(s.default_rate));
        print_rates("By gender", &s.by_gender);
        print_rates("By education", &s.by_education);
        print_rates("By family status", &s.by_family_status);
        print_rates("By housing", &s.by_housing);
        println!();
    }

    if page.shows(Page::Demographics) {
        let d = &pages.demographics;
        println!("DEMOGRAPHICS & HOUSEHOLD");
        println!("{}", "-".repeat(40));
        println!(
            "  Gender split:      {} M / {} F",
            fmt_pct(d.male_pct),
            fmt_pct(d.female_pct)
        );
        println!(
            "  Avg age:           {} defaulters / {} repaid",
            fmt_value(d.avg_age_defaulters, 1),
            fmt_value(d.avg_age_repaid, 1)
        );
        println!("  With children:     {}", fmt_pct(d.with_children_pct));
        println!("  Avg family size:   {}", fmt_value(d.avg_family_size, 2));
        println!(
            "  Married / single:  {} / {}",
            fmt_pct(d.married_pct),
            fmt_pct(d.single_pct)
        );
        println!("  Higher education:  {}", fmt_pct(d.higher_education_pct));
        println!("  Currently working: {}", fmt_pct(d.currently_working_pct));
        println!();
    }

    if page.shows(Page::Financial) {
        let f = &pages.financial;
        println!("FINANCIAL HEALTH & AFFORDABILITY");
        println!("{}", "-".repeat(40));
        println!("  Avg income:        {}", fmt_value(f.avg_income, 0));
        println!("  Avg credit:        {}", fmt_value(f.avg_credit, 0));
        println!("  Avg DTI / LTI:     {} / {}", fmt_value(f.avg_dti, 3), fmt_value(f.avg_lti, 2));
        println!("  Income gap:        {}", fmt_value(f.income_gap, 0));
        println!("  Credit gap:        {}", fmt_value(f.credit_gap, 0));
        println!(
            "  Credit > {}:  {}",
            fmt_value(f.high_credit_threshold, 0),
            fmt_pct(f.high_credit_pct)
        );
        print_rates("By income bracket", &f.by_income_bracket);
        println!();
    }

    if page.shows(Page::Drivers) {
        let c = &pages.drivers;
        println!("CORRELATIONS & DRIVERS ({})", c.method);
        println!("{}", "-".repeat(40));
        print_correlations("Top drivers", &c.top_drivers);
        println!("  Corr(income, credit): {}", fmt_value(c.income_credit_corr, 3));
        println!("  Drivers with |corr| > 0.5: {}", c.strong_count);
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save the JSON report");
    println!("{}", "=".repeat(80));
}
