//! Retry-until-condition-or-deadline loop.
//!
//! Store-agnostic: the caller supplies the check and the clock, so timeout
//! behaviour can be driven with a virtual clock.

use std::time::Duration;

use datastore_core::Clock;
use thiserror::Error;

/// Interval and deadline for [`poll_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between checks
    pub interval: Duration,
    /// Maximum time after the first check before giving up
    pub deadline: Duration,
}

impl PollPolicy {
    /// Creates a policy.
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }
}

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T, P> {
    /// Condition met
    Done(T),
    /// Not yet; carries what was observed
    Retry(P),
}

/// Successful poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome<T> {
    /// Value returned by the final check
    pub value: T,
    /// Number of checks performed
    pub attempts: u32,
    /// Clock time spent polling
    pub elapsed: Duration,
}

/// Failed poll.
#[derive(Error, Debug)]
pub enum PollError<E, P> {
    /// The check itself failed; polling stopped at once
    #[error("check failed: {0}")]
    Check(E),

    /// Deadline passed while the check kept asking for a retry
    #[error("condition not met after {attempts} attempts in {elapsed:?}")]
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        /// Observation from the last check
        last: P,
    },
}

/// Runs `check` until it reports `Done`, fails, or the deadline passes.
///
/// The deadline is tested after each `Retry`, so a check that succeeds
/// exactly at the deadline still counts as success.
///
/// # Arguments
/// * `clock` - Time source; `sleep` is called between checks
/// * `policy` - Poll interval and deadline
/// * `check` - Condition to evaluate
pub fn poll_until<T, P, E, F>(
    clock: &dyn Clock,
    policy: PollPolicy,
    mut check: F,
) -> Result<PollOutcome<T>, PollError<E, P>>
where
    F: FnMut() -> Result<Attempt<T, P>, E>,
{
    let start = clock.now();
    let deadline = start + policy.deadline;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match check().map_err(PollError::Check)? {
            Attempt::Done(value) => {
                return Ok(PollOutcome {
                    value,
                    attempts,
                    elapsed: clock.now().saturating_sub(start),
                });
            }
            Attempt::Retry(last) => {
                let now = clock.now();
                if now >= deadline {
                    return Err(PollError::TimedOut {
                        attempts,
                        elapsed: now.saturating_sub(start),
                        last,
                    });
                }
                clock.sleep(policy.interval);
            }
        }
    }
}
