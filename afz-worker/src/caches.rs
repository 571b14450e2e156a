//! Stores of the current generation.

use std::sync::Arc;

use afz_backend::{BackendResult, CacheStorage, CacheStore, PutStatus, Store};
use afz_core::{FetchRequest, Generation, RequestKey, ResponseSnapshot, StoreName};
use tokio::sync::OnceCell;
use url::Url;

/// Lazily opened static and runtime stores of one generation.
///
/// Both stores are opened on first use and the handles are reused after
/// that. Cloning is cheap.
#[derive(Clone)]
pub struct GenerationCaches {
    inner: Arc<Inner>,
}

struct Inner {
    generation: Generation,
    storage: Arc<dyn CacheStorage>,
    static_store: OnceCell<Arc<dyn Store>>,
    runtime_store: OnceCell<Arc<dyn Store>>,
}

impl GenerationCaches {
    pub fn new(generation: Generation, storage: Arc<dyn CacheStorage>) -> Self {
        Self {
            inner: Arc::new(Inner {
                generation,
                storage,
                static_store: OnceCell::new(),
                runtime_store: OnceCell::new(),
            }),
        }
    }

    pub fn generation(&self) -> &Generation {
        &self.inner.generation
    }

    /// The storage every generation lives in.
    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.inner.storage
    }

    pub async fn static_store(&self) -> BackendResult<&Arc<dyn Store>> {
        let name = self.inner.generation.static_store();
        self.inner
            .static_store
            .get_or_try_init(|| self.inner.storage.open(name))
            .await
    }

    pub async fn runtime_store(&self) -> BackendResult<&Arc<dyn Store>> {
        let name = self.inner.generation.runtime_store();
        self.inner
            .runtime_store
            .get_or_try_init(|| self.inner.storage.open(name))
            .await
    }

    /// Looks `request` up in the static store, then in the runtime store.
    ///
    /// Returns the response together with the name of the store it came from.
    pub async fn lookup(
        &self,
        request: &FetchRequest,
    ) -> BackendResult<Option<(ResponseSnapshot, StoreName)>> {
        for store in [self.static_store().await?, self.runtime_store().await?] {
            if let Some(response) = store.match_request(request).await? {
                return Ok(Some((response, store.name().clone())));
            }
        }
        Ok(None)
    }

    /// Reads `GET url` from the static store only.
    pub async fn lookup_static(&self, url: &Url) -> BackendResult<Option<ResponseSnapshot>> {
        self.static_store().await?.read(&RequestKey::get(url)).await
    }

    /// Writes `response` to the runtime store if it is eligible.
    pub async fn store_runtime(
        &self,
        request: &FetchRequest,
        response: &ResponseSnapshot,
    ) -> BackendResult<PutStatus> {
        self.runtime_store().await?.put(request, response).await
    }
}

impl std::fmt::Debug for GenerationCaches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationCaches")
            .field("generation", &self.inner.generation)
            .field("storage", &self.inner.storage.label())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afz_test::{MockStorage, get};

    #[tokio::test]
    async fn test_lookup_prefers_static_store() {
        let storage = MockStorage::new();
        let generation = Generation::new("afz", "v1");
        storage
            .seed("afz-cache-v1")
            .insert("https://afz.org/", ResponseSnapshot::ok("static"));
        storage
            .seed("afz-runtime-v1")
            .insert("https://afz.org/", ResponseSnapshot::ok("runtime"));

        let caches = GenerationCaches::new(generation, Arc::new(storage));
        let (response, store) = caches.lookup(&get("https://afz.org/")).await.unwrap().unwrap();

        assert_eq!(response.body_text(), "static");
        assert_eq!(store.as_str(), "afz-cache-v1");
    }

    #[tokio::test]
    async fn test_store_runtime_skips_errors() {
        let storage = MockStorage::new();
        let caches = GenerationCaches::new(Generation::new("afz", "v1"), Arc::new(storage.clone()));
        let request = get("https://afz.org/api/news");

        let status = caches
            .store_runtime(
                &request,
                &ResponseSnapshot::text(http::StatusCode::NOT_FOUND, "nope"),
            )
            .await
            .unwrap();

        assert_eq!(status, PutStatus::Skipped);
        assert!(storage.store("afz-runtime-v1").unwrap().is_empty());
    }
}
