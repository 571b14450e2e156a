//! Moka store implementation.

use std::sync::Arc;

use afz_backend::{BackendResult, CacheStorage, DeleteStatus, Store};
use afz_core::{RequestKey, ResponseSnapshot, StoreName};
use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;

use crate::builder::{Limit, MokaStorageBuilder, NoCapacity};

/// One named in-memory store.
///
/// Snapshots are kept as they are, without serialization. Cloning is cheap
/// and every clone sees the same entries.
#[derive(Clone, Debug)]
pub struct MokaStore {
    name: StoreName,
    cache: Cache<RequestKey, ResponseSnapshot>,
}

impl MokaStore {
    pub(crate) fn new(name: StoreName, cache: Cache<RequestKey, ResponseSnapshot>) -> Self {
        Self { name, cache }
    }

    /// The underlying Moka cache.
    pub fn cache(&self) -> &Cache<RequestKey, ResponseSnapshot> {
        &self.cache
    }
}

#[async_trait]
impl Store for MokaStore {
    async fn read(&self, key: &RequestKey) -> BackendResult<Option<ResponseSnapshot>> {
        Ok(self.cache.get(key).await)
    }

    async fn write(&self, key: &RequestKey, value: ResponseSnapshot) -> BackendResult<()> {
        self.cache.insert(key.clone(), value).await;
        Ok(())
    }

    async fn remove(&self, key: &RequestKey) -> BackendResult<DeleteStatus> {
        match self.cache.remove(key).await {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn keys(&self) -> BackendResult<Vec<RequestKey>> {
        Ok(self.cache.iter().map(|(key, _)| (*key).clone()).collect())
    }

    fn name(&self) -> &StoreName {
        &self.name
    }
}

/// In-memory set of named stores powered by Moka.
///
/// Every store opened through [`CacheStorage::open`] gets its own Moka cache
/// with the capacity configured on the builder.
///
/// # Examples
///
/// ```
/// use afz_moka::MokaStorage;
///
/// let storage = MokaStorage::builder().max_entries(10_000).build();
/// ```
///
/// # Caveats
///
/// - Data is **not persisted**; every store is lost on process restart.
///   Use `afz-feoxdb` when stores must survive restarts.
/// - Capacity is **per store**, not shared between stores.
#[derive(Clone)]
pub struct MokaStorage {
    stores: Arc<DashMap<StoreName, MokaStore>>,
    limit: Limit,
}

impl std::fmt::Debug for MokaStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStorage")
            .field("stores", &self.stores.len())
            .finish()
    }
}

impl MokaStorage {
    /// Creates a new builder. Capacity must be set before `build()`.
    pub fn builder() -> MokaStorageBuilder<NoCapacity> {
        MokaStorageBuilder::default()
    }

    pub(crate) fn with_limit(limit: Limit) -> Self {
        Self {
            stores: Arc::new(DashMap::new()),
            limit,
        }
    }

    /// Returns the already opened store called `name`, if any.
    pub fn get(&self, name: &StoreName) -> Option<MokaStore> {
        self.stores.get(name).map(|store| store.clone())
    }
}

#[async_trait]
impl CacheStorage for MokaStorage {
    async fn open(&self, name: &StoreName) -> BackendResult<Arc<dyn Store>> {
        let store = self
            .stores
            .entry(name.clone())
            .or_insert_with(|| {
                tracing::debug!(store = %name, "creating in-memory store");
                MokaStore::new(name.clone(), self.limit.build_cache())
            })
            .clone();
        Ok(Arc::new(store))
    }

    async fn keys(&self) -> BackendResult<Vec<StoreName>> {
        let mut names: Vec<StoreName> = self.stores.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &StoreName) -> BackendResult<DeleteStatus> {
        match self.stores.remove(name) {
            Some((_, store)) => {
                store.cache.invalidate_all();
                Ok(DeleteStatus::Deleted(1))
            }
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn has(&self, name: &StoreName) -> BackendResult<bool> {
        Ok(self.stores.contains_key(name))
    }

    fn label(&self) -> &str {
        "moka"
    }
}
