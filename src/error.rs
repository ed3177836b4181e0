//! Error types for ChatBranch
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.
//!
//! Only the write side (the message store, configuration loading) produces
//! these errors. Tree building, path resolution and token accounting degrade
//! instead of failing.

use std::fmt;
use thiserror::Error;

/// Kind of entity referenced by a [`ChatBranchError::NotFound`] error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A conversation thread
    Thread,
    /// A message inside a thread
    Message,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Thread => write!(f, "Thread"),
            EntityKind::Message => write!(f, "Message"),
        }
    }
}

/// Main error type for ChatBranch operations
#[derive(Error, Debug)]
pub enum ChatBranchError {
    /// Referenced thread or message does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up
        kind: EntityKind,
        /// The identifier that could not be resolved
        id: i64,
    },

    /// Input rejected before persistence (empty name, empty content, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Message store errors that are not plain SQLite failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ChatBranchError {
    /// Shorthand for a missing thread
    pub fn thread_not_found(id: i64) -> Self {
        ChatBranchError::NotFound {
            kind: EntityKind::Thread,
            id,
        }
    }

    /// Shorthand for a missing message
    pub fn message_not_found(id: i64) -> Self {
        ChatBranchError::NotFound {
            kind: EntityKind::Message,
            id,
        }
    }

    /// Returns true for [`ChatBranchError::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChatBranchError::NotFound { .. })
    }

    /// Returns true for [`ChatBranchError::Validation`]
    pub fn is_validation(&self) -> bool {
        matches!(self, ChatBranchError::Validation(_))
    }
}

/// Result type alias for ChatBranch operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. The typed
/// failure is recovered with `err.downcast_ref::<ChatBranchError>()`.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_not_found_display() {
        let error = ChatBranchError::thread_not_found(7);
        assert_eq!(error.to_string(), "Thread not found: 7");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_message_not_found_display() {
        let error = ChatBranchError::message_not_found(42);
        assert_eq!(error.to_string(), "Message not found: 42");
    }

    #[test]
    fn test_validation_error_display() {
        let error = ChatBranchError::Validation("thread name cannot be empty".to_string());
        assert_eq!(
            error.to_string(),
            "Validation error: thread name cannot be empty"
        );
        assert!(error.is_validation());
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_config_error_display() {
        let error = ChatBranchError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_storage_error_display() {
        let error = ChatBranchError::Storage("database connection failed".to_string());
        assert_eq!(
            error.to_string(),
            "Storage error: database connection failed"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ChatBranchError = io_error.into();
        assert!(matches!(error, ChatBranchError::Io(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: ChatBranchError = yaml_error.into();
        assert!(matches!(error, ChatBranchError::Yaml(_)));
    }

    #[test]
    fn test_not_found_survives_anyhow_roundtrip() {
        let err: anyhow::Error = ChatBranchError::message_not_found(3).into();
        let typed = err.downcast_ref::<ChatBranchError>().expect("typed error");
        assert!(typed.is_not_found());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatBranchError>();
    }
}
