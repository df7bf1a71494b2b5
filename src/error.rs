//! Error types for the benchmark pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that can occur while collecting, judging or aggregating results.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON-lines file contains a line that is not a valid record.
    #[error("Malformed record in '{path}' at line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The report artifact does not exist.
    #[error("Report not found at '{0}'")]
    ReportNotFound(PathBuf),

    /// Configuration file or missing credentials.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid target id selection.
    #[error("Invalid id selection '{0}'")]
    InvalidIds(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM API returned a non-success status.
    #[error("LLM API error ({status}): {message}")]
    LlmStatus { status: u16, message: String },

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// Search provider returned a non-success status.
    #[error("{provider} API error ({status}): {body}")]
    ProviderApi {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Search provider answered with an unexpected payload.
    #[error("{provider} returned an unexpected response: {message}")]
    ProviderResponse {
        provider: &'static str,
        message: String,
    },

    /// HTTP transport error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Tokenizer could not be loaded.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

impl BenchError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a retry of the same request could succeed.
    ///
    /// Transport failures, rate limiting and server errors are transient;
    /// anything the remote end rejected outright is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            BenchError::Http(_) => true,
            BenchError::ProviderApi { status, .. } => *status == 429 || *status >= 500,
            BenchError::LlmStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BenchError {
    fn from(err: reqwest::Error) -> Self {
        BenchError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::LlmParse(err.to_string())
    }
}
