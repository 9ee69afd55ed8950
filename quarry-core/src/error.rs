//! Error types for the Quarry research core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering model invocation, search backends, configuration, and chart output.
//! Pipeline stages absorb these errors into their fallbacks; they only escape
//! from the lower-level collaborators (providers, backends, config loading).

use std::path::PathBuf;

/// Top-level error type for the Quarry core library.
#[derive(Debug, thiserror::Error)]
pub enum QuarryError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chart error: {0}")]
    Chart(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from text-model invocations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Unsupported provider: {provider}")]
    UnsupportedProvider { provider: String },
}

/// Errors from individual search backends.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Backend '{backend}' is not configured: {reason}")]
    NotConfigured { backend: String, reason: String },

    #[error("Backend '{backend}' request failed: {message}")]
    Request { backend: String, message: String },

    #[error("Backend '{backend}' returned HTTP {status}")]
    Status { backend: String, status: u16 },

    #[error("Backend '{backend}' response parse error: {message}")]
    Parse { backend: String, message: String },
}

impl SearchError {
    /// Name of the backend that produced this error.
    pub fn backend(&self) -> &str {
        match self {
            SearchError::NotConfigured { backend, .. }
            | SearchError::Request { backend, .. }
            | SearchError::Status { backend, .. }
            | SearchError::Parse { backend, .. } => backend,
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `QuarryError`.
pub type Result<T> = std::result::Result<T, QuarryError>;
