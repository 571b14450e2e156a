use std::{future::Future, sync::Arc};

use afz_core::{CachePolicy, FetchRequest, RequestKey, ResponseSnapshot, StoreName};
use async_trait::async_trait;
use http::Method;

use crate::{BackendError, DeleteStatus};

/// Result alias for store operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Outcome of [`CacheStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutStatus {
    /// The response was written.
    Stored,
    /// The request or response is not eligible for storage; nothing was written.
    Skipped,
}

/// A single named store of responses.
///
/// Implementations only move snapshots in and out. Deciding *what* may be
/// stored is the job of [`CacheStore`].
#[async_trait]
pub trait Store: Sync + Send {
    /// Reads the snapshot stored under `key`.
    async fn read(&self, key: &RequestKey) -> BackendResult<Option<ResponseSnapshot>>;

    /// Writes `value` under `key`, replacing any previous entry.
    async fn write(&self, key: &RequestKey, value: ResponseSnapshot) -> BackendResult<()>;

    /// Removes the entry stored under `key`.
    async fn remove(&self, key: &RequestKey) -> BackendResult<DeleteStatus>;

    /// Lists every key currently stored.
    async fn keys(&self) -> BackendResult<Vec<RequestKey>>;

    /// Name of this store.
    fn name(&self) -> &StoreName;
}

#[async_trait]
impl Store for &dyn Store {
    async fn read(&self, key: &RequestKey) -> BackendResult<Option<ResponseSnapshot>> {
        (*self).read(key).await
    }

    async fn write(&self, key: &RequestKey, value: ResponseSnapshot) -> BackendResult<()> {
        (*self).write(key, value).await
    }

    async fn remove(&self, key: &RequestKey) -> BackendResult<DeleteStatus> {
        (*self).remove(key).await
    }

    async fn keys(&self) -> BackendResult<Vec<RequestKey>> {
        (*self).keys().await
    }

    fn name(&self) -> &StoreName {
        (*self).name()
    }
}

#[async_trait]
impl Store for Box<dyn Store> {
    async fn read(&self, key: &RequestKey) -> BackendResult<Option<ResponseSnapshot>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &RequestKey, value: ResponseSnapshot) -> BackendResult<()> {
        (**self).write(key, value).await
    }

    async fn remove(&self, key: &RequestKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn keys(&self) -> BackendResult<Vec<RequestKey>> {
        (**self).keys().await
    }

    fn name(&self) -> &StoreName {
        (**self).name()
    }
}

#[async_trait]
impl Store for Arc<dyn Store> {
    async fn read(&self, key: &RequestKey) -> BackendResult<Option<ResponseSnapshot>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &RequestKey, value: ResponseSnapshot) -> BackendResult<()> {
        (**self).write(key, value).await
    }

    async fn remove(&self, key: &RequestKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn keys(&self) -> BackendResult<Vec<RequestKey>> {
        (**self).keys().await
    }

    fn name(&self) -> &StoreName {
        (**self).name()
    }
}

/// Request-level store operations.
///
/// This trait wraps the raw [`Store`] operations with the storage rules every
/// caller must follow:
///
/// - only `GET` requests are looked up or written
/// - only responses with status exactly `200` are written
///
/// Every type implementing [`Store`] gets these methods for free.
pub trait CacheStore: Store {
    /// Looks up the stored response for `request`.
    fn match_request(
        &self,
        request: &FetchRequest,
    ) -> impl Future<Output = BackendResult<Option<ResponseSnapshot>>> + Send {
        async move {
            if request.method != Method::GET {
                return Ok(None);
            }
            let result = self.read(&request.key()).await;
            if let Ok(Some(_)) = &result {
                tracing::trace!(store = %self.name(), url = %request.url, "store hit");
            }
            result
        }
    }

    /// Writes `response` for `request` if both are eligible.
    fn put(
        &self,
        request: &FetchRequest,
        response: &ResponseSnapshot,
    ) -> impl Future<Output = BackendResult<PutStatus>> + Send {
        async move {
            if request.method != Method::GET {
                return Ok(PutStatus::Skipped);
            }
            match response.clone().cache_policy() {
                CachePolicy::Cacheable(snapshot) => {
                    self.write(&request.key(), snapshot).await?;
                    tracing::trace!(store = %self.name(), url = %request.url, "stored response");
                    Ok(PutStatus::Stored)
                }
                CachePolicy::NonCacheable(snapshot) => {
                    tracing::trace!(
                        store = %self.name(),
                        url = %request.url,
                        status = snapshot.status().as_u16(),
                        "response not stored"
                    );
                    Ok(PutStatus::Skipped)
                }
            }
        }
    }

    /// Removes the stored response for `request`.
    fn delete(
        &self,
        request: &FetchRequest,
    ) -> impl Future<Output = BackendResult<DeleteStatus>> + Send {
        async move { self.remove(&request.key()).await }
    }
}

impl<T> CacheStore for T where T: Store + ?Sized {}

/// The set of named stores available to a worker.
///
/// Opening a name that does not exist yet creates an empty store. Deleting a
/// store drops every entry it holds.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Opens (creating if needed) the store called `name`.
    async fn open(&self, name: &StoreName) -> BackendResult<Arc<dyn Store>>;

    /// Lists the names of every existing store.
    async fn keys(&self) -> BackendResult<Vec<StoreName>>;

    /// Deletes the store called `name` with all of its entries.
    async fn delete(&self, name: &StoreName) -> BackendResult<DeleteStatus>;

    /// Returns `true` if a store called `name` exists.
    async fn has(&self, name: &StoreName) -> BackendResult<bool> {
        Ok(self.keys().await?.iter().any(|existing| existing == name))
    }

    /// Short label of the storage engine, used in logs.
    fn label(&self) -> &str {
        "storage"
    }
}

#[async_trait]
impl<T> CacheStorage for Arc<T>
where
    T: CacheStorage + ?Sized,
{
    async fn open(&self, name: &StoreName) -> BackendResult<Arc<dyn Store>> {
        (**self).open(name).await
    }

    async fn keys(&self) -> BackendResult<Vec<StoreName>> {
        (**self).keys().await
    }

    async fn delete(&self, name: &StoreName) -> BackendResult<DeleteStatus> {
        (**self).delete(name).await
    }

    async fn has(&self, name: &StoreName) -> BackendResult<bool> {
        (**self).has(name).await
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}
