//! Error types for the vitafit_core library.

use serde::Serialize;
use std::fmt;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vitafit_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Model artifacts are missing, corrupt, or inconsistent with each other
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Prediction requested before a successful model load
    #[error("Models not loaded: {0}")]
    ModelsNotLoaded(String),

    /// A label encoder required by the pipeline is missing or has the wrong categories
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Caller supplied a category value the models were not trained on
    #[error("Invalid {column} value: '{value}'. Must be one of: {}", .valid.join(", "))]
    InvalidCategory {
        column: String,
        value: String,
        valid: Vec<String>,
    },

    /// Failure inside the classifier/regressor call or while decoding its output
    #[error("Inference error: {0}")]
    Inference(String),

    /// A user-supplied field is out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Machine-readable error category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ModelLoad,
    ModelsNotLoaded,
    Encoding,
    InvalidCategory,
    Inference,
    InvalidInput,
    Io,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ModelLoad => "model_load",
            ErrorKind::ModelsNotLoaded => "models_not_loaded",
            ErrorKind::Encoding => "encoding",
            ErrorKind::InvalidCategory => "invalid_category",
            ErrorKind::Inference => "inference",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ModelLoad(_) => ErrorKind::ModelLoad,
            Error::ModelsNotLoaded(_) => ErrorKind::ModelsNotLoaded,
            Error::Encoding(_) => ErrorKind::Encoding,
            Error::InvalidCategory { .. } => ErrorKind::InvalidCategory,
            Error::Inference(_) => ErrorKind::Inference,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Io(_) | Error::Csv(_) => ErrorKind::Io,
            Error::Json(_) | Error::Toml(_) | Error::Config(_) => ErrorKind::Config,
        }
    }

    /// True when the caller's input caused the failure (HTTP 4xx semantics)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidCategory | ErrorKind::InvalidInput
        )
    }

    /// True when the same request may succeed later (service unavailable)
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ModelsNotLoaded
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Structured error handed back to callers of the prediction operation
#[derive(Clone, Debug, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}
