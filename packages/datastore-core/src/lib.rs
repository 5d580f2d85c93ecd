//! Key, entity and client model for datastore-style backends.
//!
//! Provides the collaborator surface a test harness drives: keys scoped by
//! namespace and kind, entities holding a field mapping, kind/namespace
//! queries, the [`DatastoreClient`] trait, an injectable [`Clock`], and an
//! in-process eventually consistent backend for tests.

pub mod client;
pub mod clock;
pub mod entity;
pub mod error;
pub mod key;
pub mod memory;
pub mod query;

pub use client::DatastoreClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::Entity;
pub use error::{DatastoreError, Result};
pub use key::{Key, KeyId, KeyPath, PathElement};
pub use memory::{MemoryDatastore, MemoryStoreConfig};
pub use query::Query;
