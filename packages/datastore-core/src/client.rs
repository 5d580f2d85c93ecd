//! Client surface consumed by the test harness.

use crate::entity::Entity;
use crate::error::Result;
use crate::key::{Key, KeyPath};
use crate::query::Query;

/// Datastore-style client.
///
/// Lookups by key are expected to be strongly consistent. Queries may lag
/// behind writes: a deleted entity can keep showing up in query results for
/// a while after `delete` returned.
pub trait DatastoreClient {
    /// Default namespace for keys and queries that do not name one.
    fn namespace(&self) -> &str;

    /// Builds a complete key from key-path arguments.
    fn key(&self, path: KeyPath) -> Result<Key> {
        path.into_key(self.namespace())
    }

    /// Runs a kind/namespace query.
    fn query(&self, query: &Query) -> Result<Vec<Entity>>;

    /// Looks up an entity by key.
    fn get(&self, key: &Key) -> Result<Option<Entity>>;

    /// Inserts or overwrites an entity.
    fn put(&self, entity: Entity) -> Result<()>;

    /// Deletes an entity. Deleting an absent key succeeds.
    fn delete(&self, key: &Key) -> Result<()>;

    /// Deletes several entities in one request.
    fn delete_multi(&self, keys: &[Key]) -> Result<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}
