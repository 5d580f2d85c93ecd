//! Datastore error types.

use thiserror::Error;

/// Result type for datastore operations
pub type Result<T> = std::result::Result<T, DatastoreError>;

/// Datastore operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatastoreError {
    /// Key path has no elements
    #[error("Key path must contain at least one element")]
    EmptyKeyPath,

    /// Kind name rejected by the backend
    #[error("Invalid kind '{kind}': {reason}")]
    InvalidKind { kind: String, reason: &'static str },

    /// Backend refused or could not serve the request
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
