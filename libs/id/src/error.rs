//! Error types for name parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The name is empty.
    #[error("name cannot be empty")]
    Empty,

    /// The name is longer than a DNS label allows.
    #[error("name too long: {length} characters (max {max})")]
    TooLong { length: usize, max: usize },

    /// The name contains a character outside `[a-z0-9-]`.
    #[error("invalid character '{character}' in name '{name}'")]
    InvalidCharacter { name: String, character: char },

    /// The name starts or ends with a hyphen.
    #[error("name must start and end with an alphanumeric character: '{0}'")]
    InvalidBoundary(String),
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }
}
