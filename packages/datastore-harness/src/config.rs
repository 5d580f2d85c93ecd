//! Harness configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::poll::PollPolicy;

/// Kind scanned in the default namespace.
pub const DEFAULT_KIND: &str = "SomeKind";
/// Namespace scanned in full besides the default one.
pub const DEFAULT_OTHER_NAMESPACE: &str = "other-namespace";

/// Environment variable overriding [`HarnessConfig::kind`].
pub const ENV_KIND: &str = "DATASTORE_HARNESS_KIND";
/// Environment variable overriding [`HarnessConfig::other_namespace`].
pub const ENV_OTHER_NAMESPACE: &str = "DATASTORE_HARNESS_OTHER_NAMESPACE";
/// Environment variable overriding [`HarnessConfig::poll_interval_ms`].
pub const ENV_POLL_INTERVAL_MS: &str = "DATASTORE_HARNESS_POLL_INTERVAL_MS";
/// Environment variable overriding [`HarnessConfig::convergence_deadline_ms`].
pub const ENV_DEADLINE_MS: &str = "DATASTORE_HARNESS_DEADLINE_MS";

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Kind whose entities are scanned in the default namespace
    pub kind: String,
    /// Namespace whose entities are all scanned
    pub other_namespace: String,
    /// Pause between convergence scans in milliseconds
    pub poll_interval_ms: u64,
    /// How long deletes may take to show up in scans, in milliseconds
    pub convergence_deadline_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            kind: DEFAULT_KIND.to_string(),
            other_namespace: DEFAULT_OTHER_NAMESPACE.to_string(),
            poll_interval_ms: 1000,          // 1 second between scans
            convergence_deadline_ms: 120000, // 2 minutes
        }
    }
}

impl HarnessConfig {
    /// Pause between convergence scans.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Deadline for deletes to converge.
    pub fn convergence_deadline(&self) -> Duration {
        Duration::from_millis(self.convergence_deadline_ms)
    }

    /// Poll policy for the convergence poller.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(self.poll_interval(), self.convergence_deadline())
    }

    /// Checks the configuration for values the poller cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.kind.is_empty() {
            return Err(HarnessError::Config("kind must not be empty".to_string()));
        }
        if self.other_namespace.is_empty() {
            return Err(HarnessError::Config(
                "other_namespace must not be empty".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(HarnessError::Config(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.convergence_deadline_ms < self.poll_interval_ms {
            return Err(HarnessError::Config(format!(
                "convergence_deadline_ms ({}) is shorter than poll_interval_ms ({})",
                self.convergence_deadline_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }

    /// Loads a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            HarnessError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the defaults overridden by `DATASTORE_HARNESS_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(kind) = lookup(ENV_KIND) {
            config.kind = kind;
        }
        if let Some(namespace) = lookup(ENV_OTHER_NAMESPACE) {
            config.other_namespace = namespace;
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            config.poll_interval_ms = parse_millis(ENV_POLL_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_DEADLINE_MS) {
            config.convergence_deadline_ms = parse_millis(ENV_DEADLINE_MS, &value)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_millis(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| HarnessError::Config(format!("{} must be milliseconds: {}", name, e)))
}
