//! Pending form submissions.
//!
//! A [`SubmissionQueue`] keeps form payloads that could not be delivered
//! while the network was down. Each record gets an id from a counter that
//! starts at `1` and never goes back, so ids are not reused within one queue
//! even after records are removed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BackendResult, DeleteStatus};

/// A form payload waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSubmission {
    /// Queue-assigned identifier.
    pub id: u64,
    /// The submitted form fields, kept exactly as given.
    pub data: Value,
}

/// Durable list of undelivered submissions.
#[async_trait]
pub trait SubmissionQueue: Send + Sync {
    /// Appends `data` and returns the id assigned to it.
    async fn enqueue(&self, data: Value) -> BackendResult<u64>;

    /// Returns every pending record in ascending id order.
    async fn pending(&self) -> BackendResult<Vec<PendingSubmission>>;

    /// Removes the record with `id`.
    async fn remove(&self, id: u64) -> BackendResult<DeleteStatus>;

    /// Removes every record and returns how many were dropped.
    async fn clear(&self) -> BackendResult<usize>;
}

#[async_trait]
impl<T> SubmissionQueue for Arc<T>
where
    T: SubmissionQueue + ?Sized,
{
    async fn enqueue(&self, data: Value) -> BackendResult<u64> {
        (**self).enqueue(data).await
    }

    async fn pending(&self) -> BackendResult<Vec<PendingSubmission>> {
        (**self).pending().await
    }

    async fn remove(&self, id: u64) -> BackendResult<DeleteStatus> {
        (**self).remove(id).await
    }

    async fn clear(&self) -> BackendResult<usize> {
        (**self).clear().await
    }
}

/// In-memory [`SubmissionQueue`].
///
/// Cloning is cheap and every clone shares the same records.
#[derive(Clone, Debug)]
pub struct MemoryQueue {
    records: Arc<DashMap<u64, Value>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionQueue for MemoryQueue {
    async fn enqueue(&self, data: Value) -> BackendResult<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.records.insert(id, data);
        Ok(id)
    }

    async fn pending(&self) -> BackendResult<Vec<PendingSubmission>> {
        let mut records: Vec<PendingSubmission> = self
            .records
            .iter()
            .map(|entry| PendingSubmission {
                id: *entry.key(),
                data: entry.value().clone(),
            })
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    async fn remove(&self, id: u64) -> BackendResult<DeleteStatus> {
        Ok(match self.records.remove(&id) {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        })
    }

    async fn clear(&self) -> BackendResult<usize> {
        let count = self.records.len();
        self.records.clear();
        Ok(count)
    }
}
