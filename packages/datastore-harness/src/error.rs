//! Harness error types.

use std::fmt;
use std::time::Duration;

use datastore_core::{DatastoreError, Key};
use thiserror::Error;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Point in a test's lifecycle where an isolation check ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before the test body
    Setup,
    /// While waiting for deletes to converge
    Teardown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "before test"),
            Phase::Teardown => write!(f, "after test"),
        }
    }
}

/// Harness errors.
///
/// Everything except `Store` and `Config` signals a test isolation bug and
/// is never retried.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Backend request failed
    #[error("Datastore error: {0}")]
    Store(#[from] DatastoreError),

    /// Provisioning found an entity where a fresh one was expected
    #[error("Entity already exists at {key}")]
    EntityAlreadyExists { key: Key },

    /// Entities present that no test asked to delete
    #[error("Unexpected entities {phase}: {}", format_keys(.keys))]
    UnexpectedLeftovers { phase: Phase, keys: Vec<Key> },

    /// Deleted entities still visible when the deadline passed
    #[error(
        "Entities taking too long to delete ({attempts} scans in {elapsed:?}): {}",
        format_keys(.keys)
    )]
    ConvergenceTimeout {
        elapsed: Duration,
        attempts: u32,
        keys: Vec<Key>,
    },

    /// Invalid harness configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Joins keys for diagnostics.
pub fn format_keys(keys: &[Key]) -> String {
    if keys.is_empty() {
        return "[]".to_string();
    }
    let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}
