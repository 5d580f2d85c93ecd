//! Kind/namespace queries.

use crate::key::Key;

/// Query over one namespace, optionally restricted to one kind.
///
/// A query without a namespace runs against the client's default namespace.
/// A query without a kind is kindless and matches every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Kind filter
    pub kind: Option<String>,
    /// Namespace override
    pub namespace: Option<String>,
}

impl Query {
    /// Query for a single kind in the default namespace.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            namespace: None,
        }
    }

    /// Kindless query in the default namespace.
    pub fn kindless() -> Self {
        Self::default()
    }

    /// Restricts the query to a namespace.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Returns true if `key` falls within this query.
    pub fn matches(&self, key: &Key, default_namespace: &str) -> bool {
        let namespace = self.namespace.as_deref().unwrap_or(default_namespace);
        if key.namespace() != namespace {
            return false;
        }
        match &self.kind {
            Some(kind) => key.kind() == kind,
            None => true,
        }
    }
}
