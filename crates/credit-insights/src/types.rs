use crate::config::PrepConfig;
use crate::utils::{get_dtype_category, DtypeCategory};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label of outcome value 0.
pub const REPAID_LABEL: &str = "Repaid";
/// Label of outcome value 1.
pub const DEFAULT_LABEL: &str = "Default";

// ============================================================================
// Typed schema
// ============================================================================

/// Role-and-type tag of a column, fixed when the pipeline sees the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Row identifier, kept as a string.
    Identifier,
    /// Binary outcome (0 = repaid, 1 = default).
    Outcome,
    /// Numeric feature.
    Numeric,
    /// Text feature treated as categorical.
    Categorical,
    /// Boolean feature.
    Boolean,
    /// Anything else (dates, nested types).
    Other,
}

/// Ordered `(column, kind)` list describing a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub columns: Vec<(String, ColumnKind)>,
}

impl DatasetSchema {
    /// Tag every column of `df` using the configured roles and its dtype.
    pub fn infer(df: &DataFrame, config: &PrepConfig) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|column| {
                let name = column.name().to_string();
                let kind = if config.id_columns.iter().any(|c| *c == name) {
                    ColumnKind::Identifier
                } else if name == config.target_column {
                    ColumnKind::Outcome
                } else {
                    match get_dtype_category(column.dtype()) {
                        DtypeCategory::Numeric => ColumnKind::Numeric,
                        DtypeCategory::String => ColumnKind::Categorical,
                        DtypeCategory::Boolean => ColumnKind::Boolean,
                        _ => ColumnKind::Other,
                    }
                };
                (name, kind)
            })
            .collect();
        Self { columns }
    }

    /// Kind of `column`, if present.
    pub fn kind(&self, column: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, kind)| *kind)
    }

    /// Names of columns with the given kind, in column order.
    pub fn columns_of(&self, kind: ColumnKind) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Numeric feature columns (identifier and outcome excluded).
    pub fn numeric(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Numeric)
    }

    /// Categorical feature columns (identifier and outcome excluded).
    pub fn categorical(&self) -> Vec<String> {
        self.columns_of(ColumnKind::Categorical)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// One row of a missingness table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessEntry {
    pub column: String,
    /// Missing values as a percentage of rows (0 - 100).
    pub missing_pct: f64,
}

/// Clip bounds recorded by the winsorizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinsorBounds {
    pub low: f64,
    pub high: f64,
}

/// Audit metadata produced alongside the cleaned dataset.
///
/// Immutable once the pipeline returns; reporting views only read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    /// Columns dropped for excess missingness.
    pub dropped_columns: Vec<String>,
    /// Winsorization bounds per clipped column.
    pub winsor_bounds: BTreeMap<String, WinsorBounds>,
    /// Missingness after derivation, before any cleaning.
    pub missingness_before: Vec<MissingnessEntry>,
    /// Missingness of the final cleaned dataset.
    pub missingness_after: Vec<MissingnessEntry>,
    /// Value -> final label mapping per categorical column.
    pub rare_label_maps: BTreeMap<String, BTreeMap<String, String>>,
    /// Derived columns appended by the pipeline.
    pub derived_columns: Vec<String>,
    /// Column -> fill value description for every imputed column.
    pub imputations: BTreeMap<String, String>,
    /// Step-by-step log of what the pipeline did.
    pub processing_steps: Vec<String>,
    /// Fixed human-readable notes on the cleaning rules.
    pub notes: Vec<String>,
}

/// Fixed notes describing the cleaning rules.
pub const PIPELINE_NOTES: [&str; 5] = [
    "IDs excluded from categorical/rare-merge.",
    "Imputed numeric=median; categorical=mode.",
    "Winsorized 1% tails for income/credit/annuity/goods, DTI, LTI.",
    "DAYS_EMPLOYED==365243 treated as missing (unemployed).",
    "Ratios guard against invalid denominators.",
];

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    /// The cleaned, analysis-ready dataset.
    pub clean: DataFrame,
    /// Schema of `clean`.
    pub schema: DatasetSchema,
    /// Audit metadata.
    pub artifacts: Artifacts,
}

// ============================================================================
// Aggregation outputs
// ============================================================================

/// Outcome rate of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRate {
    /// Category value; `None` groups the missing values.
    pub category: Option<String>,
    /// Outcome rate in percent; NaN when the group has no outcome values.
    pub default_pct: f64,
    /// Rows in the group.
    pub count: usize,
}

/// Pairwise correlation matrix over the retained numeric columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major values; `values[i][j]` = corr(columns[i], columns[j]).
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Correlation between two columns, if both were retained.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.values[i][j])
    }

    /// Correlations of `column` with every other retained column.
    pub fn column_vector(&self, column: &str) -> Vec<(String, f64)> {
        let Some(i) = self.index_of(column) else {
            return Vec::new();
        };
        self.columns
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, name)| (name.clone(), self.values[i][j]))
            .collect()
    }
}

/// Feature / signed correlation / absolute correlation triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCorrelation {
    pub feature: String,
    pub corr: f64,
    pub abs_corr: f64,
}

/// Row count of one outcome label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Count")]
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_infer_roles() {
        let df = df![
            "SK_ID_CURR" => ["1", "2"],
            "TARGET" => [0i64, 1],
            "AMT_CREDIT" => [1.0, 2.0],
            "CODE_GENDER" => ["M", "F"],
            "FLAG" => [true, false],
        ]
        .unwrap();

        let schema = DatasetSchema::infer(&df, &PrepConfig::default());
        assert_eq!(schema.kind("SK_ID_CURR"), Some(ColumnKind::Identifier));
        assert_eq!(schema.kind("TARGET"), Some(ColumnKind::Outcome));
        assert_eq!(schema.kind("AMT_CREDIT"), Some(ColumnKind::Numeric));
        assert_eq!(schema.kind("CODE_GENDER"), Some(ColumnKind::Categorical));
        assert_eq!(schema.kind("FLAG"), Some(ColumnKind::Boolean));
        assert_eq!(schema.kind("missing"), None);
        assert_eq!(schema.numeric(), vec!["AMT_CREDIT".to_string()]);
        assert_eq!(schema.categorical(), vec!["CODE_GENDER".to_string()]);
    }

    #[test]
    fn test_correlation_matrix_lookup() {
        let matrix = CorrelationMatrix {
            columns: vec!["a".to_string(), "b".to_string()],
            values: vec![vec![1.0, 0.5], vec![0.5, 1.0]],
        };
        assert_eq!(matrix.get("a", "b"), Some(0.5));
        assert_eq!(matrix.get("a", "c"), None);
        assert_eq!(matrix.column_vector("a"), vec![("b".to_string(), 0.5)]);
        assert!(matrix.column_vector("c").is_empty());
    }

    #[test]
    fn test_status_count_serializes_fixed_names() {
        let row = StatusCount {
            status: DEFAULT_LABEL.to_string(),
            count: 2,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"Status":"Default","Count":2}"#);
    }
}
