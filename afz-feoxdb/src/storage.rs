//! Response stores kept in FeOxDB.
//!
//! Layout of the database keys:
//!
//! | Key | Value |
//! |-----|-------|
//! | `storage:names` | JSON list of store names |
//! | `store:{name}:index` | JSON list of request keys held by the store |
//! | `store:{name}:entry:{method} {url}` | snapshot encoded with the configured format |

use std::sync::Arc;

use afz_backend::{BackendResult, CacheStorage, DeleteStatus, Store};
use afz_core::{RequestKey, ResponseSnapshot, StoreName};
use async_trait::async_trait;

use crate::db::{Shared, blocking};

const NAMES_KEY: &str = "storage:names";

fn index_key(store: &StoreName) -> String {
    format!("store:{store}:index")
}

fn entry_key(store: &StoreName, key: &RequestKey) -> String {
    format!("store:{store}:entry:{key}")
}

/// Persistent set of named stores.
#[derive(Clone)]
pub struct FeOxDbStorage {
    shared: Arc<Shared>,
}

impl FeOxDbStorage {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl CacheStorage for FeOxDbStorage {
    async fn open(&self, name: &StoreName) -> BackendResult<Arc<dyn Store>> {
        let _guard = self.shared.index_lock.lock().await;
        let owned = name.clone();
        blocking(&self.shared, move |shared| {
            let mut names: Vec<StoreName> = shared.get_json(NAMES_KEY)?.unwrap_or_default();
            if !names.contains(&owned) {
                tracing::debug!(store = %owned, "creating persistent store");
                names.push(owned);
                shared.put_json(NAMES_KEY, &names)?;
            }
            Ok(())
        })
        .await?;

        Ok(Arc::new(FeOxDbStore {
            name: name.clone(),
            shared: self.shared.clone(),
        }))
    }

    async fn keys(&self) -> BackendResult<Vec<StoreName>> {
        blocking(&self.shared, |shared| {
            let mut names: Vec<StoreName> = shared.get_json(NAMES_KEY)?.unwrap_or_default();
            names.sort();
            Ok(names)
        })
        .await
    }

    async fn delete(&self, name: &StoreName) -> BackendResult<DeleteStatus> {
        let _guard = self.shared.index_lock.lock().await;
        let name = name.clone();
        blocking(&self.shared, move |shared| {
            let mut names: Vec<StoreName> = shared.get_json(NAMES_KEY)?.unwrap_or_default();
            let Some(position) = names.iter().position(|existing| *existing == name) else {
                return Ok(DeleteStatus::Missing);
            };

            let index: Vec<RequestKey> = shared.get_json(&index_key(&name))?.unwrap_or_default();
            for key in &index {
                shared.delete(&entry_key(&name, key))?;
            }
            shared.delete(&index_key(&name))?;

            names.remove(position);
            shared.put_json(NAMES_KEY, &names)?;
            tracing::debug!(store = %name, entries = index.len(), "deleted persistent store");
            Ok(DeleteStatus::Deleted(1))
        })
        .await
    }

    fn label(&self) -> &str {
        "feoxdb"
    }
}

/// One named store inside a [`FeOxDbStorage`].
#[derive(Clone)]
pub struct FeOxDbStore {
    name: StoreName,
    shared: Arc<Shared>,
}

#[async_trait]
impl Store for FeOxDbStore {
    async fn read(&self, key: &RequestKey) -> BackendResult<Option<ResponseSnapshot>> {
        let db_key = entry_key(&self.name, key);
        blocking(&self.shared, move |shared| {
            match shared.get_raw(&db_key)? {
                Some(raw) => Ok(Some(shared.format.decode(&raw)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn write(&self, key: &RequestKey, value: ResponseSnapshot) -> BackendResult<()> {
        let raw = self.shared.format.encode(&value)?;
        let _guard = self.shared.index_lock.lock().await;
        let (name, key) = (self.name.clone(), key.clone());
        blocking(&self.shared, move |shared| {
            shared.put_raw(&entry_key(&name, &key), &raw)?;
            let index_key = index_key(&name);
            let mut index: Vec<RequestKey> = shared.get_json(&index_key)?.unwrap_or_default();
            if !index.contains(&key) {
                index.push(key);
                shared.put_json(&index_key, &index)?;
            }
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &RequestKey) -> BackendResult<DeleteStatus> {
        let _guard = self.shared.index_lock.lock().await;
        let (name, key) = (self.name.clone(), key.clone());
        blocking(&self.shared, move |shared| {
            if !shared.delete(&entry_key(&name, &key))? {
                return Ok(DeleteStatus::Missing);
            }
            let index_key = index_key(&name);
            let mut index: Vec<RequestKey> = shared.get_json(&index_key)?.unwrap_or_default();
            index.retain(|existing| *existing != key);
            shared.put_json(&index_key, &index)?;
            Ok(DeleteStatus::Deleted(1))
        })
        .await
    }

    async fn keys(&self) -> BackendResult<Vec<RequestKey>> {
        let index_key = index_key(&self.name);
        blocking(&self.shared, move |shared| {
            Ok(shared.get_json(&index_key)?.unwrap_or_default())
        })
        .await
    }

    fn name(&self) -> &StoreName {
        &self.name
    }
}
