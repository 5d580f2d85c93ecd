//! Scan of everything a test may have left behind.

use datastore_core::{DatastoreClient, Entity, Query, Result};

use crate::config::HarnessConfig;

/// Queries covering the configured kind in the default namespace and every
/// kind in the alternate namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanner {
    kind: String,
    other_namespace: String,
}

impl Scanner {
    /// Creates a scanner.
    pub fn new(kind: impl Into<String>, other_namespace: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            other_namespace: other_namespace.into(),
        }
    }

    /// Creates a scanner from harness configuration.
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.kind.clone(), config.other_namespace.clone())
    }

    /// The two queries run by [`Scanner::all_entities`].
    pub fn queries(&self) -> [Query; 2] {
        [
            Query::kind(self.kind.clone()),
            Query::kindless().in_namespace(self.other_namespace.clone()),
        ]
    }

    /// Returns every entity visible to either query.
    pub fn all_entities<C>(&self, client: &C) -> Result<Vec<Entity>>
    where
        C: DatastoreClient + ?Sized,
    {
        let mut entities = Vec::new();
        for query in self.queries() {
            entities.extend(client.query(&query)?);
        }
        Ok(entities)
    }
}
