//! Error types for the numerologist bot.

use reqwest::StatusCode;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Chat transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Completion service errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The endpoint could not be reached at all.
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    /// Non-retryable status from the endpoint.
    #[error("API error status {status}, type: {kind}: {message}")]
    Api {
        status: StatusCode,
        kind: String,
        message: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("No choices found in response")]
    NoChoices,

    #[error("Retries exceeded: {last}")]
    RetriesExceeded { last: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation failures on profile data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("invalid date {input:?}, expected dd.mm.yyyy")]
    InvalidDate { input: String },

    #[error("required field '{field}' is empty")]
    MissingRequired { field: &'static str },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
