//! Error types for the feedback dashboard.

use std::time::Duration;

/// Top-level error type for the dashboard.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Conversation {0} not found")]
    ConversationNotFound(String),
}

/// Configuration-related errors. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Document store errors.
///
/// Every variant is recoverable: the next request (or an explicit refresh)
/// retries the connection and the query.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Connection(String),

    #[error("Query on collection {collection} failed: {reason}")]
    Query { collection: String, reason: String },

    #[error("Query on collection {collection} timed out after {timeout:?}")]
    Timeout {
        collection: String,
        timeout: Duration,
    },

    #[error("Malformed document in collection {collection}: {reason}")]
    Decode { collection: String, reason: String },
}

/// Data-shape and projection errors raised while building tables.
///
/// None of these are per-row anomalies: each one aborts the whole build.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("{context} is missing required field `{field}`")]
    MissingField { context: String, field: String },

    #[error("{context} has an invalid `{field}`: {reason}")]
    InvalidField {
        context: String,
        field: String,
        reason: String,
    },

    #[error("Cannot parse timestamp `{field}` of {context}: {value}")]
    TimestampParse {
        context: String,
        field: String,
        value: String,
    },

    #[error("Message {message_id} appears more than once in conversation {conversation_id}")]
    DuplicateMessage {
        conversation_id: String,
        message_id: String,
    },

    #[error("Column `{column}` does not exist (available: {available})")]
    UnknownColumn { column: String, available: String },
}

impl PipelineError {
    pub(crate) fn missing(context: impl Into<String>, field: &str) -> Self {
        Self::MissingField {
            context: context.into(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(
        context: impl Into<String>,
        field: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            context: context.into(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for the dashboard.
pub type Result<T> = std::result::Result<T, Error>;
