//! Per-test cleanup and convergence polling for eventually consistent datastores.
//!
//! Tests run inside a [`TestScope`] obtained from a [`HarnessSession`]:
//!
//! - before the test, the scope checks that nothing is left in the store
//!   except entities already known to be deleted
//! - during the test, [`TestScope::make_entity`] and [`TestScope::dispose_of`]
//!   queue keys for deletion
//! - after the test, queued keys are deleted, recorded in the session's
//!   [`DeletedKeyLedger`], and the store is polled until scans come back empty
//!
//! Polling is built on [`poll_until`], which is independent of the store and
//! driven by an injectable [`Clock`](datastore_core::Clock).

pub mod config;
pub mod context;
pub mod convergence;
pub mod error;
pub mod ledger;
pub mod poll;
pub mod scan;
pub mod session;

pub use config::HarnessConfig;
pub use context::ClientContext;
pub use convergence::{await_convergence, ConvergenceReport};
pub use error::{HarnessError, Phase, Result};
pub use ledger::{DeletedKeyLedger, PendingDeletions};
pub use poll::{poll_until, Attempt, PollError, PollOutcome, PollPolicy};
pub use scan::Scanner;
pub use session::{HarnessSession, TestScope};

pub use datastore_core;
