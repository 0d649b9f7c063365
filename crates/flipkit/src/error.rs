use std::fmt;

use crate::key::Key;

/// Errors surfaced by group preparation and node registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlipError {
    /// The requested sequence carried the same key twice.
    DuplicateKey { key: Key },
    /// A second, distinct element tried to bind to a key that is still
    /// mounted.
    DuplicateRegistration { key: Key },
    /// A node named a parent flip key that no registered node carries.
    MissingParentReference { key: Key, parent: Key },
}

impl fmt::Display for FlipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlipError::DuplicateKey { key } => {
                write!(f, "duplicate key `{key}` in requested items")
            }
            FlipError::DuplicateRegistration { key } => {
                write!(f, "node already registered for key `{key}`")
            }
            FlipError::MissingParentReference { key, parent } => {
                write!(f, "node `{key}` references unknown parent flip `{parent}`")
            }
        }
    }
}

impl std::error::Error for FlipError {}
