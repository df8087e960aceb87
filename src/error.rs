//! Error types for the financial agent

use std::time::Duration;
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Core Loop Errors
    // =============================

    #[error("LLM provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),
}

/// Failures of a single completion round-trip
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Argument and record validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("amount must be greater than zero (got {0})")]
    NonPositiveAmount(f64),

    #[error("amount must be a finite number")]
    InvalidAmount,

    #[error("amount must have at most 2 decimal places (got {0})")]
    TooPrecise(f64),

    #[error("field '{field}' is required for table '{table}'")]
    MissingField { table: &'static str, field: &'static str },

    #[error("field '{field}' must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("{field} must be at least 1 (got {value})")]
    OutOfRange { field: &'static str, value: i64 },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("No valid data provided for insertion")]
    NoValidFields,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Faults inside a known tool; always folded into a failure envelope
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search provider returned {0}")]
    Status(u16),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}
