//! Session and per-test isolation guard.
//!
//! A [`HarnessSession`] lives for a whole test run and owns the ledger of
//! deleted keys. Each test gets a [`TestScope`] from
//! [`HarnessSession::begin_test`], which checks the store is clean before
//! handing it out and cleans up behind the test when finished or dropped.

use std::sync::Arc;

use datastore_core::{Clock, DatastoreClient, Entity, Key, KeyPath};
use serde_json::Value;

use crate::config::HarnessConfig;
use crate::context::ClientContext;
use crate::convergence::{await_convergence, ConvergenceReport};
use crate::error::{format_keys, HarnessError, Phase, Result};
use crate::ledger::{DeletedKeyLedger, PendingDeletions};
use crate::scan::Scanner;

/// Session-scoped harness state.
#[derive(Debug)]
pub struct HarnessSession<C: DatastoreClient> {
    client: C,
    clock: Arc<dyn Clock>,
    config: HarnessConfig,
    scanner: Scanner,
    ledger: DeletedKeyLedger,
}

impl<C: DatastoreClient> HarnessSession<C> {
    /// Creates a session after validating `config`.
    pub fn new(client: C, clock: Arc<dyn Clock>, config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        if client.namespace() == config.other_namespace {
            return Err(HarnessError::Config(format!(
                "other_namespace {:?} is the client's default namespace",
                config.other_namespace
            )));
        }
        let scanner = Scanner::from_config(&config);
        Ok(Self {
            client,
            clock,
            config,
            scanner,
            ledger: DeletedKeyLedger::new(),
        })
    }

    /// Returns the client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Returns the keys deleted so far in this session.
    pub fn ledger(&self) -> &DeletedKeyLedger {
        &self.ledger
    }

    /// Deletes everything visible in the scanned namespaces.
    ///
    /// Intended to run once before a group of tests. Deleted keys go into
    /// the ledger so their lagging query results do not trip the next
    /// isolation check.
    ///
    /// # Returns
    /// Number of entities deleted.
    pub fn initial_clean(&mut self) -> Result<usize> {
        let visible = self.scanner.all_entities(&self.client)?;
        let keys: Vec<Key> = visible.into_iter().map(Entity::into_key).collect();
        for key in &keys {
            self.client.delete(key)?;
        }
        self.ledger.record(keys.iter().cloned());
        tracing::info!("Initial clean deleted {} entities", keys.len());
        Ok(keys.len())
    }

    /// Checks the store is clean and opens a scope for one test.
    ///
    /// # Returns
    /// `HarnessError::UnexpectedLeftovers` if any visible entity was never
    /// deletion-requested.
    pub fn begin_test(&mut self) -> Result<TestScope<'_, C>> {
        self.check_isolation()?;
        Ok(TestScope {
            session: self,
            pending: PendingDeletions::new(),
            finished: false,
        })
    }

    fn check_isolation(&self) -> Result<()> {
        let visible = self.scanner.all_entities(&self.client)?;
        let unexpected = self.ledger.unaccounted(&visible);
        if unexpected.is_empty() {
            return Ok(());
        }
        tracing::warn!(
            "Store not clean before test: {}",
            format_keys(&unexpected)
        );
        Err(HarnessError::UnexpectedLeftovers {
            phase: Phase::Setup,
            keys: unexpected,
        })
    }

    fn teardown(&mut self, pending: &mut PendingDeletions) -> Result<ConvergenceReport> {
        let keys = pending.take();
        if !keys.is_empty() {
            self.client.delete_multi(&keys)?;
            let added = self.ledger.record(keys);
            tracing::debug!(
                "Queued deletes recorded, ledger grew by {} to {} keys",
                added,
                self.ledger.len()
            );
        }

        await_convergence(
            &self.client,
            &self.scanner,
            &self.ledger,
            self.clock.as_ref(),
            self.config.poll_policy(),
        )
    }
}

/// Per-test guard.
///
/// Tracks what the test created and, when finished or dropped, deletes it
/// and waits for the store to converge.
///
/// Dropping the scope without calling [`TestScope::finish`] runs the same
/// cleanup; a cleanup failure then panics, unless the thread is already
/// unwinding from a failed test, in which case it is logged.
#[derive(Debug)]
pub struct TestScope<'s, C: DatastoreClient> {
    session: &'s mut HarnessSession<C>,
    pending: PendingDeletions,
    finished: bool,
}

impl<'s, C: DatastoreClient> TestScope<'s, C> {
    /// Returns the client.
    pub fn client(&self) -> &C {
        &self.session.client
    }

    /// Builds a key in the client's default namespace unless the path names one.
    pub fn key(&self, path: KeyPath) -> Result<Key> {
        Ok(self.session.client.key(path)?)
    }

    /// Queues a key for deletion at teardown.
    pub fn dispose_of(&mut self, key: Key) {
        self.pending.push(key);
    }

    /// Keys queued for deletion so far.
    pub fn pending(&self) -> &[Key] {
        self.pending.keys()
    }

    /// Creates an entity that must not exist yet and queues it for deletion.
    ///
    /// # Arguments
    /// * `path` - Key-path arguments
    /// * `fields` - Field mapping to store
    ///
    /// # Returns
    /// `HarnessError::EntityAlreadyExists`, with nothing written, if the key
    /// is occupied.
    pub fn make_entity<I, K, V>(&mut self, path: KeyPath, fields: I) -> Result<Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let client = &self.session.client;
        let key = client.key(path)?;
        if client.get(&key)?.is_some() {
            tracing::warn!("Refusing to provision over existing entity {}", key);
            return Err(HarnessError::EntityAlreadyExists { key });
        }

        let mut entity = Entity::new(key.clone());
        entity.update(fields);
        client.put(entity.clone())?;
        self.pending.push(key);
        Ok(entity)
    }

    /// Returns a view of the client bound to `namespace`.
    pub fn client_context(&self, namespace: impl Into<String>) -> ClientContext<'_, C> {
        ClientContext::new(&self.session.client, namespace)
    }

    /// Deletes queued keys and waits for the store to converge.
    pub fn finish(mut self) -> Result<ConvergenceReport> {
        self.finished = true;
        self.session.teardown(&mut self.pending)
    }
}

impl<C: DatastoreClient> Drop for TestScope<'_, C> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.session.teardown(&mut self.pending) {
            if std::thread::panicking() {
                tracing::error!("Teardown failed while unwinding: {}", e);
            } else {
                panic!("Test teardown failed: {}", e);
            }
        }
    }
}
