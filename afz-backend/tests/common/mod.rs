//! Simple in-memory test store implementation using DashMap.

use std::sync::Arc;

use afz_backend::{BackendError, BackendResult, DeleteStatus, Store};
use afz_core::{RequestKey, ResponseSnapshot, StoreName};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory store for testing.
#[derive(Clone)]
pub struct TestStore {
    name: StoreName,
    entries: Arc<DashMap<RequestKey, ResponseSnapshot>>,
}

impl TestStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: StoreName::new(name),
            entries: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl Store for TestStore {
    async fn read(&self, key: &RequestKey) -> BackendResult<Option<ResponseSnapshot>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    async fn write(&self, key: &RequestKey, value: ResponseSnapshot) -> BackendResult<()> {
        self.entries.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &RequestKey) -> BackendResult<DeleteStatus> {
        Ok(match self.entries.remove(key) {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        })
    }

    async fn keys(&self) -> BackendResult<Vec<RequestKey>> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }

    fn name(&self) -> &StoreName {
        &self.name
    }
}

/// Store that always returns errors.
pub struct ErrorStore {
    name: StoreName,
}

impl ErrorStore {
    pub fn new() -> Self {
        Self {
            name: StoreName::new("broken"),
        }
    }
}

fn simulated() -> BackendError {
    BackendError::InternalError(Box::new(std::io::Error::other("simulated error")))
}

#[async_trait]
impl Store for ErrorStore {
    async fn read(&self, _key: &RequestKey) -> BackendResult<Option<ResponseSnapshot>> {
        Err(simulated())
    }

    async fn write(&self, _key: &RequestKey, _value: ResponseSnapshot) -> BackendResult<()> {
        Err(simulated())
    }

    async fn remove(&self, _key: &RequestKey) -> BackendResult<DeleteStatus> {
        Err(simulated())
    }

    async fn keys(&self) -> BackendResult<Vec<RequestKey>> {
        Err(simulated())
    }

    fn name(&self) -> &StoreName {
        &self.name
    }
}
