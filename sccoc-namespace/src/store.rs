//! Namespace store trait for pluggable lookups

use async_trait::async_trait;
use sccoc_core::{Error, Namespace, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Where the policy provider reads namespaces from
///
/// The provider only needs to fetch a namespace by name when the caller
/// did not hand it one. [`InMemoryStore`] stands in for an API server.
#[async_trait]
pub trait NamespaceStore: Send + Sync {
    /// Fetch a namespace by name
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no such namespace exists
    async fn get(&self, name: &str) -> Result<Namespace>;

    /// Register a namespace
    ///
    /// # Errors
    /// Returns [`Error::AlreadyExists`] if the name is taken
    async fn create(&self, namespace: Namespace) -> Result<Namespace>;
}

/// In-memory namespace store
///
/// # Example
/// ```
/// use sccoc_core::Namespace;
/// use sccoc_namespace::{InMemoryStore, NamespaceStore};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let store = InMemoryStore::new();
/// store.create(Namespace::new("demo")).await.unwrap();
/// assert_eq!(store.get("demo").await.unwrap().name, "demo");
/// # });
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    namespaces: Arc<RwLock<BTreeMap<String, Namespace>>>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored namespaces
    pub async fn len(&self) -> usize {
        self.namespaces.read().await.len()
    }

    /// Check whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.namespaces.read().await.is_empty()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl NamespaceStore for InMemoryStore {
    async fn get(&self, name: &str) -> Result<Namespace> {
        self.namespaces
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: "namespace",
                name: name.to_string(),
            })
    }

    async fn create(&self, namespace: Namespace) -> Result<Namespace> {
        let mut namespaces = self.namespaces.write().await;

        if namespaces.contains_key(&namespace.name) {
            return Err(Error::AlreadyExists {
                kind: "namespace",
                name: namespace.name,
            });
        }

        tracing::debug!(
            namespace = %namespace.name,
            annotations = namespace.annotations.len(),
            "Stored namespace"
        );

        namespaces.insert(namespace.name.clone(), namespace.clone());
        Ok(namespace)
    }
}
