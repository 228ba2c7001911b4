//! Domain error types.

use thiserror::Error;

/// Validation errors for value objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("identifier must not be empty")]
    Empty,

    #[error("identifier is too long ({actual} > {max})")]
    TooLong { max: usize, actual: usize },

    #[error("identifier contains invalid character '{0}'")]
    InvalidCharacter(char),
}

/// Errors reported by a room repository
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("room '{0}' already exists")]
    AlreadyExists(String),

    #[error("room '{0}' not found or expired")]
    NotFound(String),
}
