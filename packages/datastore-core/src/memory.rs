//! In-process backend with eventually consistent queries.
//!
//! Lookups see every write immediately. Queries keep returning a deleted
//! entity until `query_lag_ms` of clock time has passed since the delete,
//! which mirrors how a cloud datastore acknowledges deletes before its
//! indexes catch up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::client::DatastoreClient;
use crate::clock::Clock;
use crate::entity::Entity;
use crate::error::{DatastoreError, Result};
use crate::key::Key;
use crate::query::Query;

/// Configuration for [`MemoryDatastore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreConfig {
    /// Default namespace of the first handle
    pub default_namespace: String,
    /// How long deleted entities stay visible to queries, in milliseconds
    pub query_lag_ms: u64,
}

/// Entity deleted but possibly still visible to queries.
#[derive(Debug, Clone)]
struct Tombstone {
    entity: Entity,
    deleted_at: Duration,
}

#[derive(Debug, Default)]
struct StoreState {
    /// Entities visible to lookups
    live: HashMap<Key, Entity>,
    /// Deleted entities, still visible to queries until their lag expires
    tombstones: HashMap<Key, Tombstone>,
    /// Set while the backend is simulating an outage
    outage: Option<String>,
}

/// Shared in-memory backend.
///
/// Clones are handles on the same data; [`MemoryDatastore::with_namespace`]
/// returns a handle with a different default namespace.
#[derive(Debug, Clone)]
pub struct MemoryDatastore {
    state: Arc<RwLock<StoreState>>,
    clock: Arc<dyn Clock>,
    namespace: String,
    query_lag: Duration,
}

impl MemoryDatastore {
    /// Creates an empty backend.
    pub fn new(clock: Arc<dyn Clock>, config: MemoryStoreConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            clock,
            namespace: config.default_namespace,
            query_lag: Duration::from_millis(config.query_lag_ms),
        }
    }

    /// Returns a handle on the same backend with another default namespace.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            namespace: namespace.into(),
            query_lag: self.query_lag,
        }
    }

    /// Returns how long deletes take to reach queries.
    pub fn query_lag(&self) -> Duration {
        self.query_lag
    }

    /// Returns the number of entities visible to lookups.
    pub fn live_count(&self) -> usize {
        self.state.read().live.len()
    }

    /// Returns the number of deleted entities queries may still return.
    pub fn lagging_count(&self) -> usize {
        let now = self.clock.now();
        let state = self.state.read();
        state
            .tombstones
            .values()
            .filter(|tombstone| self.still_visible(tombstone, now))
            .count()
    }

    /// Makes every subsequent request fail with `Unavailable` until cleared.
    pub fn set_outage(&self, reason: Option<String>) {
        self.state.write().outage = reason;
    }

    fn still_visible(&self, tombstone: &Tombstone, now: Duration) -> bool {
        now < tombstone.deleted_at + self.query_lag
    }

    fn check_available(state: &StoreState) -> Result<()> {
        match &state.outage {
            Some(reason) => Err(DatastoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn delete_locked(&self, state: &mut StoreState, key: &Key, now: Duration) {
        if let Some(entity) = state.live.remove(key) {
            if !self.query_lag.is_zero() {
                state.tombstones.insert(
                    key.clone(),
                    Tombstone {
                        entity,
                        deleted_at: now,
                    },
                );
            }
        }
    }

    fn prune_tombstones(&self, state: &mut StoreState, now: Duration) {
        let lag = self.query_lag;
        state
            .tombstones
            .retain(|_, tombstone| now < tombstone.deleted_at + lag);
    }
}

impl DatastoreClient for MemoryDatastore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn query(&self, query: &Query) -> Result<Vec<Entity>> {
        let now = self.clock.now();
        let state = self.state.read();
        Self::check_available(&state)?;

        let live = state
            .live
            .values()
            .filter(|entity| query.matches(entity.key(), &self.namespace));
        let lagging = state
            .tombstones
            .values()
            .filter(|tombstone| self.still_visible(tombstone, now))
            .map(|tombstone| &tombstone.entity)
            .filter(|entity| query.matches(entity.key(), &self.namespace));

        let mut results: Vec<Entity> = live.chain(lagging).cloned().collect();
        results.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(results)
    }

    fn get(&self, key: &Key) -> Result<Option<Entity>> {
        let state = self.state.read();
        Self::check_available(&state)?;
        Ok(state.live.get(key).cloned())
    }

    fn put(&self, entity: Entity) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state.write();
        Self::check_available(&state)?;
        self.prune_tombstones(&mut state, now);
        state.tombstones.remove(entity.key());
        state.live.insert(entity.key().clone(), entity);
        Ok(())
    }

    fn delete(&self, key: &Key) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state.write();
        Self::check_available(&state)?;
        self.prune_tombstones(&mut state, now);
        self.delete_locked(&mut state, key, now);
        Ok(())
    }

    fn delete_multi(&self, keys: &[Key]) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state.write();
        Self::check_available(&state)?;
        self.prune_tombstones(&mut state, now);
        for key in keys {
            self.delete_locked(&mut state, key, now);
        }
        tracing::debug!("Deleted {} keys in one batch", keys.len());
        Ok(())
    }
}
