//! Error types for doccheck.
//!
//! Defines the main error enum used throughout the application. Only
//! connection, configuration and document errors abort a run; the rest are
//! recorded against individual examples.

use thiserror::Error;

/// Main error type for doccheck operations.
#[derive(Error, Debug)]
pub enum DocCheckError {
    /// Malformed example block (unterminated fence, missing expected output, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Database connection errors (host unreachable, auth failed, connection lost, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, timeouts, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Actual output differs from the documented output.
    #[error("Mismatch: {0}")]
    Mismatch(String),

    /// Configuration errors (invalid config file, missing connection, bad flags, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input document could not be read.
    #[error("Document error: {0}")]
    Document(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocCheckError {
    /// Creates a parse error with the given message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a mismatch error with the given message.
    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::Mismatch(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a document error with the given message.
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Parse(_) => "Parse Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Mismatch(_) => "Mismatch",
            Self::Config(_) => "Configuration Error",
            Self::Document(_) => "Document Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Parse(msg)
            | Self::Connection(msg)
            | Self::Query(msg)
            | Self::Mismatch(msg)
            | Self::Config(msg)
            | Self::Document(msg)
            | Self::Internal(msg) => msg,
        }
    }

    /// Returns true if this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Config(_) | Self::Document(_)
        )
    }
}

/// Result type alias using DocCheckError.
pub type Result<T> = std::result::Result<T, DocCheckError>;
