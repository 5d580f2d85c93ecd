//! Client view bound to one namespace.

use datastore_core::{DatastoreClient, Entity, Key, KeyPath, Query};

use crate::error::Result;

/// Borrowed client whose keys and queries default to a fixed namespace.
#[derive(Debug)]
pub struct ClientContext<'a, C: ?Sized> {
    client: &'a C,
    namespace: String,
}

impl<'a, C: DatastoreClient + ?Sized> ClientContext<'a, C> {
    /// Binds `client` to `namespace`.
    pub fn new(client: &'a C, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// The bound namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Builds a key, in the bound namespace unless the path names one.
    pub fn key(&self, path: KeyPath) -> Result<Key> {
        Ok(path.into_key(&self.namespace)?)
    }

    /// Looks up an entity by key.
    pub fn get(&self, key: &Key) -> Result<Option<Entity>> {
        Ok(self.client.get(key)?)
    }

    /// Writes an entity.
    pub fn put(&self, entity: Entity) -> Result<()> {
        Ok(self.client.put(entity)?)
    }

    /// Queries the bound namespace, optionally for one kind.
    pub fn query(&self, kind: Option<&str>) -> Result<Vec<Entity>> {
        let query = match kind {
            Some(kind) => Query::kind(kind),
            None => Query::kindless(),
        }
        .in_namespace(self.namespace.clone());
        Ok(self.client.query(&query)?)
    }
}
