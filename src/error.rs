//! Error types for the MUSE classifier

use thiserror::Error;

/// Result type alias for Kolosal operations
pub type Result<T> = std::result::Result<T, KolosalError>;

/// Main error type for the MUSE pipeline
#[derive(Error, Debug)]
pub enum KolosalError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Fit failed in {stage}: {source}")]
    FitError {
        stage: String,
        #[source]
        source: Box<KolosalError>,
    },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl KolosalError {
    /// Wrap an error raised while fitting one stage of the pipeline
    pub fn fit(stage: impl Into<String>, source: KolosalError) -> Self {
        KolosalError::FitError {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// True for errors raised by invalid configuration
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            KolosalError::ConfigError(_) | KolosalError::InvalidParameter { .. }
        )
    }
}

impl From<serde_json::Error> for KolosalError {
    fn from(err: serde_json::Error) -> Self {
        KolosalError::SerializationError(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for KolosalError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        KolosalError::ThreadPoolError(err.to_string())
    }
}
