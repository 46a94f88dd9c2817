//! Custom error types for the credit insights engine.
//!
//! Almost every data condition (missing columns, invalid denominators, empty
//! subsets) is resolved locally into an empty table or a NaN value. The errors
//! here cover the remaining cases: I/O, malformed input files, invalid
//! configuration, and requesting an analysis before the dataset was prepared.
//!
//! Errors are serializable so a presentation layer can show them as
//! `{ code, message }` pairs.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the engine.
#[derive(Error, Debug)]
pub enum InsightsError {
    /// An analysis was requested before load + preprocess produced a context.
    #[error("Cleaned data not found: load and preprocess the dataset first")]
    NotPrepared,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A filter selection does not fit the column it targets.
    #[error("Invalid filter for column '{column}': {reason}")]
    InvalidFilter { column: String, reason: String },

    /// The dataset source could not be parsed.
    #[error("Failed to load dataset '{source_name}': {reason}")]
    LoadFailed { source_name: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<InsightsError>,
    },
}

impl InsightsError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        InsightsError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotPrepared => "NOT_PREPARED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidFilter { .. } => "INVALID_FILTER",
            Self::LoadFailed { .. } => "LOAD_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error only asks the user to run the load step first.
    pub fn is_not_prepared(&self) -> bool {
        match self {
            Self::NotPrepared => true,
            Self::WithContext { source, .. } => source.is_not_prepared(),
            _ => false,
        }
    }

    /// Check if this error is recoverable (i.e., not a fundamental failure).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotPrepared | Self::InvalidConfig(_) | Self::InvalidFilter { .. }
        )
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for InsightsError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("InsightsError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, InsightsError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| InsightsError::Polars(e).with_context(context))
    }
}
