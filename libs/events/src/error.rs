//! Error types for event handling.

use thiserror::Error;

/// Errors that can occur when handling events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The reason code is unknown.
    #[error("unknown event reason: {0}")]
    UnknownReason(String),

    /// The subject kind is unknown.
    #[error("unknown event kind: {0}")]
    UnknownKind(String),

    /// The severity is unknown.
    #[error("unknown event severity: {0}")]
    UnknownSeverity(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::Serialization(err.to_string())
    }
}
