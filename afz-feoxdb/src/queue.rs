//! Submission queue kept in FeOxDB.
//!
//! | Key | Value |
//! |-----|-------|
//! | `queue:next_id` | next id to hand out |
//! | `queue:index` | JSON list of pending ids, ascending |
//! | `queue:record:{id}` | JSON form data |

use std::sync::Arc;

use afz_backend::{BackendResult, DeleteStatus, PendingSubmission, SubmissionQueue};
use async_trait::async_trait;
use serde_json::Value;

use crate::db::{Shared, blocking};

const NEXT_ID_KEY: &str = "queue:next_id";
const INDEX_KEY: &str = "queue:index";

fn record_key(id: u64) -> String {
    format!("queue:record:{id}")
}

/// Persistent [`SubmissionQueue`].
///
/// The id counter is persisted with the records, so ids keep increasing
/// across restarts.
#[derive(Clone)]
pub struct FeOxDbQueue {
    shared: Arc<Shared>,
}

impl FeOxDbQueue {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl SubmissionQueue for FeOxDbQueue {
    async fn enqueue(&self, data: Value) -> BackendResult<u64> {
        let _guard = self.shared.index_lock.lock().await;
        blocking(&self.shared, move |shared| {
            let id: u64 = shared.get_json(NEXT_ID_KEY)?.unwrap_or(1);
            shared.put_json(&record_key(id), &data)?;

            let mut index: Vec<u64> = shared.get_json(INDEX_KEY)?.unwrap_or_default();
            index.push(id);
            shared.put_json(INDEX_KEY, &index)?;
            shared.put_json(NEXT_ID_KEY, &(id + 1))?;
            Ok(id)
        })
        .await
    }

    async fn pending(&self) -> BackendResult<Vec<PendingSubmission>> {
        blocking(&self.shared, |shared| {
            let index: Vec<u64> = shared.get_json(INDEX_KEY)?.unwrap_or_default();
            let mut records = Vec::with_capacity(index.len());
            for id in index {
                match shared.get_json::<Value>(&record_key(id))? {
                    Some(data) => records.push(PendingSubmission { id, data }),
                    None => tracing::warn!(id, "queue index points at a missing record"),
                }
            }
            records.sort_by_key(|record| record.id);
            Ok(records)
        })
        .await
    }

    async fn remove(&self, id: u64) -> BackendResult<DeleteStatus> {
        let _guard = self.shared.index_lock.lock().await;
        blocking(&self.shared, move |shared| {
            let existed = shared.delete(&record_key(id))?;
            let mut index: Vec<u64> = shared.get_json(INDEX_KEY)?.unwrap_or_default();
            let before = index.len();
            index.retain(|pending| *pending != id);
            if index.len() != before {
                shared.put_json(INDEX_KEY, &index)?;
            }
            Ok(if existed {
                DeleteStatus::Deleted(1)
            } else {
                DeleteStatus::Missing
            })
        })
        .await
    }

    async fn clear(&self) -> BackendResult<usize> {
        let _guard = self.shared.index_lock.lock().await;
        blocking(&self.shared, |shared| {
            let index: Vec<u64> = shared.get_json(INDEX_KEY)?.unwrap_or_default();
            for id in &index {
                shared.delete(&record_key(*id))?;
            }
            shared.put_json(INDEX_KEY, &Vec::<u64>::new())?;
            Ok(index.len())
        })
        .await
    }
}
