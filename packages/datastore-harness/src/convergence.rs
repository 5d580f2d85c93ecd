//! Waits for deletes to show up in scans.
//!
//! A delete acknowledgment does not mean the entity is gone from the next
//! query. The poller rescans until both namespaces come back empty, failing
//! at once if an entity shows up that nobody deleted.

use std::time::Duration;

use datastore_core::{Clock, DatastoreClient, Entity, Key};

use crate::error::{format_keys, HarnessError, Phase, Result};
use crate::ledger::DeletedKeyLedger;
use crate::poll::{poll_until, Attempt, PollError, PollPolicy};
use crate::scan::Scanner;

/// Statistics from a successful convergence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceReport {
    /// Number of scans performed
    pub attempts: u32,
    /// Clock time spent waiting
    pub elapsed: Duration,
}

/// Scans until nothing is visible or the policy's deadline passes.
///
/// # Arguments
/// * `client` - Backend to scan
/// * `scanner` - Namespaces and kind to scan
/// * `ledger` - Keys deletion was requested for; must already contain the
///   keys of the deletes being waited on
/// * `clock` - Time source for the interval and deadline
/// * `policy` - Poll interval and deadline
///
/// # Returns
/// `HarnessError::UnexpectedLeftovers` as soon as a scan returns a key
/// outside the ledger, `HarnessError::ConvergenceTimeout` if deleted
/// entities are still visible at the deadline.
pub fn await_convergence<C>(
    client: &C,
    scanner: &Scanner,
    ledger: &DeletedKeyLedger,
    clock: &dyn Clock,
    policy: PollPolicy,
) -> Result<ConvergenceReport>
where
    C: DatastoreClient + ?Sized,
{
    let outcome = poll_until(clock, policy, || -> Result<Attempt<(), Vec<Key>>> {
        let visible = scanner.all_entities(client)?;
        tracing::debug!(
            "Convergence scan found {} entities: {}",
            visible.len(),
            format_keys(&entity_keys(&visible))
        );
        if visible.is_empty() {
            return Ok(Attempt::Done(()));
        }

        let unexpected = ledger.unaccounted(&visible);
        if !unexpected.is_empty() {
            tracing::warn!(
                "Unexpected entities while waiting for deletes: {}",
                format_keys(&unexpected)
            );
            return Err(HarnessError::UnexpectedLeftovers {
                phase: Phase::Teardown,
                keys: unexpected,
            });
        }

        Ok(Attempt::Retry(entity_keys(&visible)))
    });

    match outcome {
        Ok(outcome) => {
            tracing::info!(
                "Deletes converged after {} scans in {:?}",
                outcome.attempts,
                outcome.elapsed
            );
            Ok(ConvergenceReport {
                attempts: outcome.attempts,
                elapsed: outcome.elapsed,
            })
        }
        Err(PollError::Check(e)) => Err(e),
        Err(PollError::TimedOut {
            attempts,
            elapsed,
            last,
        }) => {
            tracing::warn!(
                "Deletes did not converge within {:?}: {}",
                policy.deadline,
                format_keys(&last)
            );
            Err(HarnessError::ConvergenceTimeout {
                elapsed,
                attempts,
                keys: last,
            })
        }
    }
}

fn entity_keys(entities: &[Entity]) -> Vec<Key> {
    entities.iter().map(|e| e.key().clone()).collect()
}
