//! Configuration types for preprocessing and analysis.
//!
//! [`PrepConfig`] fixes every threshold the preprocessing pipeline uses, so a
//! given input and config always produce the same cleaned dataset.
//! [`AnalysisOptions`] carries the knobs of the aggregation layer.

use crate::error::{InsightsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Identifier column of the application table.
pub const DEFAULT_ID_COLUMN: &str = "SK_ID_CURR";

/// Binary outcome column: 1 = default, 0 = repaid.
pub const DEFAULT_TARGET_COLUMN: &str = "TARGET";

/// `DAYS_EMPLOYED` value meaning "not currently employed".
pub const EMPLOYMENT_SENTINEL: f64 = 365_243.0;

/// Skew-prone numeric columns that are winsorized when present.
pub const DEFAULT_WINSOR_COLUMNS: [&str; 6] = [
    "AMT_INCOME_TOTAL",
    "AMT_CREDIT",
    "AMT_ANNUITY",
    "AMT_GOODS_PRICE",
    "DTI",
    "LTI",
];

/// Correlation method used by the drivers analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Rank-based correlation, robust to skewed distributions.
    #[default]
    Spearman,
    /// Linear correlation.
    Pearson,
}

impl std::fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spearman => write!(f, "spearman"),
            Self::Pearson => write!(f, "pearson"),
        }
    }
}

/// Configuration for the preprocessing pipeline.
///
/// Use [`PrepConfig::builder()`] to override individual values.
///
/// # Example
///
/// ```rust,ignore
/// use credit_insights::config::PrepConfig;
///
/// let config = PrepConfig::builder()
///     .missing_column_threshold(0.5)
///     .rare_min_share(0.02)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Identifier columns. Normalized to strings and never transformed again.
    pub id_columns: Vec<String>,

    /// Binary outcome column. Never dropped, imputed or merged.
    pub target_column: String,

    /// Columns with a missing fraction strictly above this are dropped.
    /// Default: 0.6 (60%)
    pub missing_column_threshold: f64,

    /// Categories with a share strictly below this are merged into "Other".
    /// Default: 0.01 (1%)
    pub rare_min_share: f64,

    /// Category code that is never merged, however rare.
    /// Default: "XNA"
    pub rare_protected_label: String,

    /// Lower winsorization quantile. Default: 0.01
    pub winsor_lower: f64,

    /// Upper winsorization quantile. Default: 0.99
    pub winsor_upper: f64,

    /// Columns clipped to their winsorization bounds when present.
    pub winsor_columns: Vec<String>,

    /// Raw employment-days value replaced by missing before deriving tenure.
    /// Default: 365243
    pub employment_sentinel: f64,

    /// Numeric columns whose missing values carry meaning and are kept.
    /// Default: `DAYS_EMPLOYED`, `EMPLOYMENT_YEARS`
    pub impute_exempt: Vec<String>,

    /// Income quantiles separating the Low / Mid / High brackets.
    /// Default: (0.25, 0.75)
    pub income_bracket_quantiles: (f64, f64),
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            id_columns: vec![DEFAULT_ID_COLUMN.to_string()],
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            missing_column_threshold: 0.6,
            rare_min_share: 0.01,
            rare_protected_label: "XNA".to_string(),
            winsor_lower: 0.01,
            winsor_upper: 0.99,
            winsor_columns: DEFAULT_WINSOR_COLUMNS.iter().map(|c| c.to_string()).collect(),
            employment_sentinel: EMPLOYMENT_SENTINEL,
            impute_exempt: vec!["DAYS_EMPLOYED".to_string(), "EMPLOYMENT_YEARS".to_string()],
            income_bracket_quantiles: (0.25, 0.75),
        }
    }
}

impl PrepConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PrepConfigBuilder {
        PrepConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: PrepConfig = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| InsightsError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Whether `column` is an identifier or the outcome.
    pub fn is_protected(&self, column: &str) -> bool {
        column == self.target_column || self.id_columns.iter().any(|c| c == column)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        for (field, value) in [
            ("missing_column_threshold", self.missing_column_threshold),
            ("rare_min_share", self.rare_min_share),
            ("winsor_lower", self.winsor_lower),
            ("winsor_upper", self.winsor_upper),
            ("income_bracket_quantiles.0", self.income_bracket_quantiles.0),
            ("income_bracket_quantiles.1", self.income_bracket_quantiles.1),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidFraction {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.winsor_lower >= self.winsor_upper {
            return Err(ConfigValidationError::InvertedQuantiles {
                field: "winsor".to_string(),
                lower: self.winsor_lower,
                upper: self.winsor_upper,
            });
        }

        let (low, high) = self.income_bracket_quantiles;
        if low > high {
            return Err(ConfigValidationError::InvertedQuantiles {
                field: "income_bracket_quantiles".to_string(),
                lower: low,
                upper: high,
            });
        }

        if self.target_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyTargetColumn);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid fraction for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidFraction { field: String, value: f64 },

    #[error("Quantiles for '{field}' are inverted: lower {lower} must be below upper {upper}")]
    InvertedQuantiles { field: String, lower: f64, upper: f64 },

    #[error("Target column name must not be empty")]
    EmptyTargetColumn,

    #[error("Sample size must be at least 1")]
    ZeroSampleSize,
}

/// Builder for [`PrepConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PrepConfigBuilder {
    id_columns: Option<Vec<String>>,
    target_column: Option<String>,
    missing_column_threshold: Option<f64>,
    rare_min_share: Option<f64>,
    rare_protected_label: Option<String>,
    winsor_quantiles: Option<(f64, f64)>,
    winsor_columns: Option<Vec<String>>,
    employment_sentinel: Option<f64>,
    impute_exempt: Option<Vec<String>>,
    income_bracket_quantiles: Option<(f64, f64)>,
}

impl PrepConfigBuilder {
    /// Set the identifier columns.
    pub fn id_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the binary outcome column.
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Set the threshold for dropping columns with missing values.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.6 = 60%)
    pub fn missing_column_threshold(mut self, threshold: f64) -> Self {
        self.missing_column_threshold = Some(threshold);
        self
    }

    /// Set the minimum share below which a category is merged into "Other".
    pub fn rare_min_share(mut self, share: f64) -> Self {
        self.rare_min_share = Some(share);
        self
    }

    /// Set the category code that is never merged.
    pub fn rare_protected_label(mut self, label: impl Into<String>) -> Self {
        self.rare_protected_label = Some(label.into());
        self
    }

    /// Set the winsorization quantiles.
    pub fn winsor_quantiles(mut self, lower: f64, upper: f64) -> Self {
        self.winsor_quantiles = Some((lower, upper));
        self
    }

    /// Set the columns to winsorize.
    pub fn winsor_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.winsor_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the raw employment-days sentinel.
    pub fn employment_sentinel(mut self, sentinel: f64) -> Self {
        self.employment_sentinel = Some(sentinel);
        self
    }

    /// Set the numeric columns exempt from imputation.
    pub fn impute_exempt<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.impute_exempt = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the income bracket quantiles.
    pub fn income_bracket_quantiles(mut self, low: f64, high: f64) -> Self {
        self.income_bracket_quantiles = Some((low, high));
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PrepConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PrepConfig, ConfigValidationError> {
        let defaults = PrepConfig::default();
        let (winsor_lower, winsor_upper) = self
            .winsor_quantiles
            .unwrap_or((defaults.winsor_lower, defaults.winsor_upper));

        let config = PrepConfig {
            id_columns: self.id_columns.unwrap_or(defaults.id_columns),
            target_column: self.target_column.unwrap_or(defaults.target_column),
            missing_column_threshold: self
                .missing_column_threshold
                .unwrap_or(defaults.missing_column_threshold),
            rare_min_share: self.rare_min_share.unwrap_or(defaults.rare_min_share),
            rare_protected_label: self
                .rare_protected_label
                .unwrap_or(defaults.rare_protected_label),
            winsor_lower,
            winsor_upper,
            winsor_columns: self.winsor_columns.unwrap_or(defaults.winsor_columns),
            employment_sentinel: self
                .employment_sentinel
                .unwrap_or(defaults.employment_sentinel),
            impute_exempt: self.impute_exempt.unwrap_or(defaults.impute_exempt),
            income_bracket_quantiles: self
                .income_bracket_quantiles
                .unwrap_or(defaults.income_bracket_quantiles),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Options for the aggregation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Maximum rows kept for plot-scale samples. Default: 50 000
    pub sample_size: usize,
    /// Seed of the uniform sampler. Default: 42
    pub sample_seed: u64,
    /// Number of outcome drivers ranked by |corr|. Default: 20
    pub top_k: usize,
    /// Correlation method for the drivers page. Default: Spearman
    pub correlation_method: CorrelationMethod,
    /// Credit amount above which a loan counts as "high credit". Default: 1 000 000
    pub high_credit_threshold: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            sample_size: 50_000,
            sample_seed: 42,
            top_k: 20,
            correlation_method: CorrelationMethod::default(),
            high_credit_threshold: 1_000_000.0,
        }
    }
}

impl AnalysisOptions {
    /// Validate the options.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.sample_size == 0 {
            return Err(ConfigValidationError::ZeroSampleSize);
        }
        Ok(())
    }
}
