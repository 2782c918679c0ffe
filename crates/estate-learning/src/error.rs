//! Error types for the estate-learning crate.
//!
//! [`LearningError`] is the error type of every public operation in the
//! crate. Preprocessing failures from `estate-processing` are wrapped
//! unchanged in [`LearningError::Processing`] so callers can still tell a
//! schema mismatch apart from a training failure.

use estate_processing::ProcessingError;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// The main error type for estate-learning operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration or hyperparameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data given to a model: shape mismatch, empty matrix,
    /// non-finite target.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Training could not produce a model.
    ///
    /// Raised when a fold fit fails during final training, or when every
    /// optimizer trial failed.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// No promoted model exists for the requested family.
    #[error("No trained {family} model found at {path}")]
    ArtifactNotFound {
        /// Model family name.
        family: String,
        /// The path that was not found.
        path: String,
    },

    /// Preprocessing failed; see the wrapped error.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// I/O error during artifact save/load.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A model artifact could not be encoded or decoded.
    #[error("Model encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

impl LearningError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            LearningError::InvalidConfig(_) => "INVALID_CONFIG",
            LearningError::InvalidData(_) => "INVALID_DATA",
            LearningError::TrainingFailed(_) => "TRAINING_FAILED",
            LearningError::ArtifactNotFound { .. } => "ARTIFACT_NOT_FOUND",
            LearningError::Processing(inner) => inner.error_code(),
            LearningError::Io(_) => "IO_ERROR",
            LearningError::Encoding(_) => "ENCODING_ERROR",
        }
    }

    /// Whether the input rows did not match the fitted schema.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, LearningError::Processing(inner) if inner.is_schema_mismatch())
    }
}

impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

pub type Result<T> = std::result::Result<T, LearningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_not_found_message() {
        let err = LearningError::ArtifactNotFound {
            family: "XGBRegressor".into(),
            path: "artifacts/models/XGBRegressor/best_fold.model".into(),
        };
        assert_eq!(err.error_code(), "ARTIFACT_NOT_FOUND");
        assert!(err.to_string().contains("XGBRegressor"));
    }

    #[test]
    fn test_processing_errors_keep_their_code() {
        let err: LearningError = ProcessingError::ColumnNotFound("LotArea".into()).into();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.is_schema_mismatch());
        assert_eq!(err.to_string(), "Column 'LotArea' not found in dataset");
    }

    #[test]
    fn test_serializes_code_and_message() {
        let err = LearningError::TrainingFailed("fold 2 diverged".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "TRAINING_FAILED");
        assert_eq!(json["message"], "Training failed: fold 2 diverged");
    }
}
