//! Error types for language model providers.

use thiserror::Error;

/// Errors that can occur when calling a language model provider.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Connection error - unable to reach the provider.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The requested model is not available.
    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    /// Ollama server is not running.
    #[error("Ollama server is not running at {host}. Start it with 'ollama serve'.")]
    ServerNotRunning { host: String },

    /// Provider refused the credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Provider asked us to slow down.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Response carried no generated text.
    #[error("Provider returned no content")]
    EmptyResponse,

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No constructor registered under this key.
    #[error("Unsupported LLM provider '{name}'. Available providers: {available}")]
    UnknownProvider { name: String, available: String },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for provider operations.
pub type LlmResult<T> = Result<T, LlmError>;
