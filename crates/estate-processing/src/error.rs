//! Error types for the housing preprocessing crate.
//!
//! Every fallible operation in this crate returns [`Result`], whose error
//! type is [`ProcessingError`]. Errors serialize as `{code, message}` so the
//! CLI can emit them as JSON.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the preprocessing crate.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// A column the fitted state refers to is absent from the input.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The input frame has no rows to learn from.
    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    /// Input file extension is not one we can read.
    #[error("Unsupported file format '{extension}' for {path}")]
    UnsupportedFormat { path: String, extension: String },

    /// A column could not be converted to the type an operation needs.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// A persisted artifact could not be found on disk.
    #[error("Artifact not found: {0}")]
    ArtifactMissing(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Spreadsheet could not be opened or read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Binary artifact encoding error.
    #[error("Artifact encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::EmptyDataset(_) => "EMPTY_DATASET",
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::ArtifactMissing(_) => "ARTIFACT_MISSING",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Spreadsheet(_) => "SPREADSHEET_ERROR",
            Self::Encoding(_) => "ENCODING_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error means the input does not match the fitted schema.
    pub fn is_schema_mismatch(&self) -> bool {
        match self {
            Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_schema_mismatch(),
            _ => false,
        }
    }
}

impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

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
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ProcessingError::ColumnNotFound("LotArea".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            ProcessingError::UnsupportedFormat {
                path: "train.ods".to_string(),
                extension: "ods".to_string(),
            }
            .error_code(),
            "UNSUPPORTED_FORMAT"
        );
    }

    #[test]
    fn test_schema_mismatch_survives_context() {
        let error = ProcessingError::ColumnNotFound("GarageArea".to_string())
            .with_context("While selecting features");
        assert!(error.is_schema_mismatch());
        assert!(!ProcessingError::InvalidConfig("x".to_string()).is_schema_mismatch());
    }

    #[test]
    fn test_error_serialization() {
        let error = ProcessingError::ColumnNotFound("Neighborhood".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Neighborhood"));
    }

    #[test]
    fn test_with_context() {
        let error =
            ProcessingError::EmptyDataset("train.csv".to_string()).with_context("During fit");
        assert!(error.to_string().contains("During fit"));
        assert_eq!(error.error_code(), "EMPTY_DATASET");
    }
}
