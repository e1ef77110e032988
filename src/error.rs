//! Error types for the churn pipeline

use thiserror::Error;

/// Result type alias for churnpipe operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Main error type for the churn pipeline
#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Artifact error: {0}")]
    ArtifactError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature schema mismatch: expected [{expected}], got [{actual}]")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ChurnError {
    /// Whether the error only affects the single request that raised it.
    ///
    /// Serving loops use this to report the failure and keep running.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ChurnError::ValidationError(_)
                | ChurnError::UnknownCategory { .. }
                | ChurnError::FeatureNotFound(_)
        )
    }
}

impl From<polars::error::PolarsError> for ChurnError {
    fn from(err: polars::error::PolarsError) -> Self {
        ChurnError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(err: serde_json::Error) -> Self {
        ChurnError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ChurnError {
    fn from(err: ndarray::ShapeError) -> Self {
        ChurnError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
