//! Entity keys and the key-path arguments they are built from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DatastoreError, Result};

/// Identifier of a single path element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyId {
    /// Numeric id
    Id(i64),
    /// String name
    Name(String),
}

impl From<i64> for KeyId {
    fn from(id: i64) -> Self {
        KeyId::Id(id)
    }
}

impl From<i32> for KeyId {
    fn from(id: i32) -> Self {
        KeyId::Id(i64::from(id))
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        KeyId::Name(name.to_string())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        KeyId::Name(name)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Id(id) => write!(f, "{}", id),
            KeyId::Name(name) => write!(f, "{:?}", name),
        }
    }
}

/// One `(kind, id)` step of a key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathElement {
    /// Entity kind
    pub kind: String,
    /// Id or name within the kind
    pub id: KeyId,
}

impl PathElement {
    /// Creates a path element.
    pub fn new(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Complete key identifying one entity.
///
/// Ordering is by namespace first, then path, which keeps query results
/// grouped by partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    namespace: String,
    path: Vec<PathElement>,
}

impl Key {
    /// Creates a key after validating the path.
    ///
    /// # Arguments
    /// * `namespace` - Partition label (`""` is the default namespace)
    /// * `path` - Ancestor-first path, at least one element
    pub fn new(namespace: impl Into<String>, path: Vec<PathElement>) -> Result<Self> {
        if path.is_empty() {
            return Err(DatastoreError::EmptyKeyPath);
        }
        for element in &path {
            validate_kind(&element.kind)?;
        }
        Ok(Self {
            namespace: namespace.into(),
            path,
        })
    }

    /// Returns the namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the full path, ancestors first.
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// Returns the kind of the entity this key names.
    pub fn kind(&self) -> &str {
        &self.leaf().kind
    }

    /// Returns the id or name of the entity this key names.
    pub fn id(&self) -> &KeyId {
        &self.leaf().id
    }

    /// Returns the parent key, if this key has ancestors.
    pub fn parent(&self) -> Option<Key> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            namespace: self.namespace.clone(),
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    fn leaf(&self) -> &PathElement {
        // Construction guarantees a non-empty path
        &self.path[self.path.len() - 1]
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(")?;
        if !self.namespace.is_empty() {
            write!(f, "namespace={:?}, ", self.namespace)?;
        }
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}, {}", element.kind, element.id)?;
        }
        write!(f, ")")
    }
}

/// Kinds starting with `__` are reserved for backend metadata.
fn validate_kind(kind: &str) -> Result<()> {
    if kind.is_empty() {
        return Err(DatastoreError::InvalidKind {
            kind: kind.to_string(),
            reason: "kind must not be empty",
        });
    }
    if kind.starts_with("__") {
        return Err(DatastoreError::InvalidKind {
            kind: kind.to_string(),
            reason: "kinds starting with '__' are reserved",
        });
    }
    Ok(())
}

/// Caller-supplied key-path arguments, resolved into a [`Key`] by a client.
///
/// A path without an explicit namespace takes the resolving client's
/// default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    namespace: Option<String>,
    elements: Vec<PathElement>,
}

impl KeyPath {
    /// Starts a path at a root entity.
    pub fn root(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            namespace: None,
            elements: vec![PathElement::new(kind, id)],
        }
    }

    /// Appends a child element.
    pub fn child(mut self, kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        self.elements.push(PathElement::new(kind, id));
        self
    }

    /// Pins the path to an explicit namespace.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Returns the explicit namespace, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the path elements.
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Resolves the path into a key.
    ///
    /// # Arguments
    /// * `default_namespace` - Namespace used when the path has none
    pub fn into_key(self, default_namespace: &str) -> Result<Key> {
        let namespace = self
            .namespace
            .unwrap_or_else(|| default_namespace.to_string());
        Key::new(namespace, self.elements)
    }
}
