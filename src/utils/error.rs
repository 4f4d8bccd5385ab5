//! Error Handling
//!
//! Unified error types for the tool execution core.
//! Uses thiserror for ergonomic error definitions.
//!
//! Tool argument problems and benign conflicts are NOT errors in this
//! taxonomy: they are reported back to the model as `ToolResponse::error`
//! values so the conversation can continue. `AppError` covers the
//! infrastructural failures that abort a tool call.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Database errors outside rusqlite itself (pooling, schema)
    #[error("Database error: {0}")]
    Database(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required ambient value (session or message id) was absent
    #[error("Missing call context: {0}")]
    MissingContext(String),

    /// The user (or a stored decision) denied the operation
    #[error("Permission denied")]
    PermissionDenied,

    /// The call context was cancelled before the operation could run
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a missing-context error
    pub fn missing_context(msg: impl Into<String>) -> Self {
        Self::MissingContext(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
