//! Entities: a key plus a field mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::Key;

/// Record stored under a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    key: Key,
    fields: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an entity with no fields.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            fields: BTreeMap::new(),
        }
    }

    /// Returns the key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Consumes the entity, returning its key.
    pub fn into_key(self) -> Key {
        self.key
    }

    /// Returns all fields.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Returns a single field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a single field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Merges fields into the entity, overwriting existing names.
    pub fn update<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in fields {
            self.fields.insert(name.into(), value.into());
        }
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the entity has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
