//! Error types for the iotsentry library.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape information attached to transform and prediction failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    /// Number of rows handed to the failing stage.
    pub rows: usize,
    /// Number of columns handed to the failing stage.
    pub columns: usize,
    /// Column names, in the order the stage saw them.
    pub column_names: Vec<String>,
}

impl DiagnosticContext {
    pub fn new(rows: usize, column_names: Vec<String>) -> Self {
        Self {
            rows,
            columns: column_names.len(),
            column_names,
        }
    }
}

impl fmt::Display for DiagnosticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows x {} columns", self.rows, self.columns)?;
        if !self.column_names.is_empty() {
            write!(f, " [{}]", self.column_names.join(", "))?;
        }
        Ok(())
    }
}

/// Main error type for iotsentry operations.
#[derive(Debug, Error)]
pub enum SentryError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing delimited input.
    #[error("Parse error at row {row}, column {column}: {message}")]
    Parse {
        row: usize,
        column: usize,
        message: String,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid delimiter detected or specified.
    #[error("Invalid delimiter: {0}")]
    InvalidDelimiter(String),

    /// Empty file or no rows to classify.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A model artifact is absent from the bundle directory.
    #[error("Model artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    /// A model artifact exists but could not be deserialized or is inconsistent.
    #[error("Model artifact '{}' is corrupt: {message}", path.display())]
    ArtifactCorrupt { path: PathBuf, message: String },

    /// A feature list is unusable (empty or with duplicate names).
    #[error("Invalid feature schema: {0}")]
    InvalidSchema(String),

    /// The uploaded table lacks features the transform was fitted on.
    #[error("Missing required features: {}", join_set(missing))]
    MissingFeatures { missing: BTreeSet<String> },

    /// The normalized feature matrix could not be produced.
    #[error("Transform error: {message} ({context})")]
    Transform {
        message: String,
        context: DiagnosticContext,
    },

    /// The classifier failed on the normalized matrix.
    #[error("Prediction error: {message} ({context})")]
    Prediction {
        message: String,
        context: DiagnosticContext,
    },

    /// A stage produced a row count that disagrees with its input.
    #[error("Internal shape mismatch: expected {expected} rows, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

impl SentryError {
    /// Stable snake_case tag for this error, used at the diagnostic boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            SentryError::Io { .. } => "io",
            SentryError::Parse { .. } => "parse",
            SentryError::Csv(_) => "csv",
            SentryError::InvalidDelimiter(_) => "invalid_delimiter",
            SentryError::EmptyData(_) => "empty_data",
            SentryError::Config(_) => "config",
            SentryError::Json(_) => "json",
            SentryError::ArtifactNotFound { .. } => "artifact_not_found",
            SentryError::ArtifactCorrupt { .. } => "artifact_corrupt",
            SentryError::InvalidSchema(_) => "invalid_schema",
            SentryError::MissingFeatures { .. } => "missing_features",
            SentryError::Transform { .. } => "transform",
            SentryError::Prediction { .. } => "prediction",
            SentryError::ShapeMismatch { .. } => "shape_mismatch",
        }
    }

    /// True for errors that indicate a defect rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, SentryError::ShapeMismatch { .. })
    }

    pub(crate) fn transform(message: impl Into<String>, context: DiagnosticContext) -> Self {
        SentryError::Transform {
            message: message.into(),
            context,
        }
    }

    pub(crate) fn prediction(message: impl Into<String>, context: DiagnosticContext) -> Self {
        SentryError::Prediction {
            message: message.into(),
            context,
        }
    }
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Result type alias for iotsentry operations.
pub type Result<T> = std::result::Result<T, SentryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_features_message_lists_columns() {
        let missing: BTreeSet<String> = ["rate", "ack_count"].iter().map(|s| s.to_string()).collect();
        let err = SentryError::MissingFeatures { missing };

        assert_eq!(err.to_string(), "Missing required features: ack_count, rate");
        assert_eq!(err.kind(), "missing_features");
        assert!(!err.is_internal());
    }

    #[test]
    fn test_transform_message_includes_context() {
        let ctx = DiagnosticContext::new(3, vec!["a".to_string(), "b".to_string()]);
        let err = SentryError::transform("non-numeric value 'x'", ctx);

        assert_eq!(
            err.to_string(),
            "Transform error: non-numeric value 'x' (3 rows x 2 columns [a, b])"
        );
    }

    #[test]
    fn test_shape_mismatch_is_internal() {
        let err = SentryError::ShapeMismatch {
            expected: 4,
            actual: 3,
        };
        assert!(err.is_internal());
        assert_eq!(err.kind(), "shape_mismatch");
    }
}
