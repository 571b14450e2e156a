//! Counting in-memory storage with injectable failures.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use afz_backend::{BackendError, BackendResult, CacheStorage, DeleteStatus, Store};
use afz_core::{RequestKey, ResponseSnapshot, StoreName};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use url::Url;

#[derive(Debug, Default)]
pub struct StoreCounters {
    pub read_count: AtomicUsize,
    pub read_hit_count: AtomicUsize,
    pub read_miss_count: AtomicUsize,
    pub write_count: AtomicUsize,
    pub remove_count: AtomicUsize,
}

impl StoreCounters {
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn read_hit_count(&self) -> usize {
        self.read_hit_count.load(Ordering::SeqCst)
    }

    pub fn read_miss_count(&self) -> usize {
        self.read_miss_count.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.remove_count.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.read_count.store(0, Ordering::SeqCst);
        self.read_hit_count.store(0, Ordering::SeqCst);
        self.read_miss_count.store(0, Ordering::SeqCst);
        self.write_count.store(0, Ordering::SeqCst);
        self.remove_count.store(0, Ordering::SeqCst);
    }
}

fn injected(what: &str) -> BackendError {
    BackendError::ConnectionError(Box::new(io::Error::other(format!("injected {what} failure"))))
}

/// One named store of [`MockStorage`].
#[derive(Clone, Debug)]
pub struct MockStore {
    name: StoreName,
    entries: Arc<DashMap<RequestKey, ResponseSnapshot>>,
    counters: Arc<StoreCounters>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MockStore {
    pub fn new(name: impl Into<StoreName>) -> Self {
        Self {
            name: name.into(),
            entries: Arc::new(DashMap::new()),
            counters: Arc::new(StoreCounters::default()),
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn counters(&self) -> &StoreCounters {
        &self.counters
    }

    /// Seeds `response` for `GET url` without touching the counters.
    pub fn insert(&self, url: &str, response: ResponseSnapshot) {
        let url = Url::parse(url).expect("absolute test URL");
        self.entries.insert(RequestKey::get(&url), response);
    }

    /// Stored response for `GET url`, without touching the counters.
    pub fn get(&self, url: &str) -> Option<ResponseSnapshot> {
        let url = Url::parse(url).expect("absolute test URL");
        self.entries.get(&RequestKey::get(&url)).map(|v| v.clone())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MockStore {
    async fn read(&self, key: &RequestKey) -> BackendResult<Option<ResponseSnapshot>> {
        self.counters.read_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        let result = self.entries.get(key).map(|v| v.value().clone());
        if result.is_some() {
            self.counters.read_hit_count.fetch_add(1, Ordering::SeqCst);
        } else {
            self.counters.read_miss_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(result)
    }

    async fn write(&self, key: &RequestKey, value: ResponseSnapshot) -> BackendResult<()> {
        self.counters.write_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        self.entries.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &RequestKey) -> BackendResult<DeleteStatus> {
        self.counters.remove_count.fetch_add(1, Ordering::SeqCst);
        match self.entries.remove(key) {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn keys(&self) -> BackendResult<Vec<RequestKey>> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }

    fn name(&self) -> &StoreName {
        &self.name
    }
}

#[derive(Debug, Default)]
struct Failures {
    listing: AtomicBool,
    open: DashSet<StoreName>,
    delete: DashSet<StoreName>,
}

/// In-memory [`CacheStorage`] for tests.
///
/// Stores can be pre-seeded with [`seed`](Self::seed) to simulate leftovers
/// from earlier generations, and individual operations can be made to fail.
#[derive(Clone, Debug, Default)]
pub struct MockStorage {
    stores: Arc<DashMap<StoreName, MockStore>>,
    failures: Arc<Failures>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or returns) the store called `name`.
    pub fn seed(&self, name: impl Into<StoreName>) -> MockStore {
        let name = name.into();
        self.stores
            .entry(name.clone())
            .or_insert_with(|| MockStore::new(name))
            .clone()
    }

    pub fn store(&self, name: &str) -> Option<MockStore> {
        self.stores.get(&StoreName::from(name)).map(|s| s.clone())
    }

    /// Existing store names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.iter().map(|e| e.key().to_string()).collect();
        names.sort();
        names
    }

    pub fn fail_listing(&self, fail: bool) {
        self.failures.listing.store(fail, Ordering::SeqCst);
    }

    pub fn fail_open(&self, name: &str) {
        self.failures.open.insert(StoreName::from(name));
    }

    pub fn fail_delete(&self, name: &str) {
        self.failures.delete.insert(StoreName::from(name));
    }
}

#[async_trait]
impl CacheStorage for MockStorage {
    async fn open(&self, name: &StoreName) -> BackendResult<Arc<dyn Store>> {
        if self.failures.open.contains(name) {
            return Err(BackendError::StoreUnavailable(name.clone()));
        }
        Ok(Arc::new(self.seed(name.clone())))
    }

    async fn keys(&self) -> BackendResult<Vec<StoreName>> {
        if self.failures.listing.load(Ordering::SeqCst) {
            return Err(injected("listing"));
        }
        let mut names: Vec<StoreName> = self.stores.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &StoreName) -> BackendResult<DeleteStatus> {
        if self.failures.delete.contains(name) {
            return Err(injected("delete"));
        }
        match self.stores.remove(name) {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    fn label(&self) -> &str {
        "mock"
    }
}
