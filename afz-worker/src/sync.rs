//! Background delivery of form submissions.
//!
//! A contact form posted while offline is not lost: the payload goes into a
//! [`SubmissionQueue`] and is delivered later, when the browser fires the
//! sync tag. Records are sent one at a time in id order. A `2xx` answer
//! removes the record; anything else leaves it pending for the next sync.
//! There is no backoff and no retry limit; [`BackgroundSync::clear`] drops
//! records that will never go through.

use std::sync::Arc;

use afz_backend::{BackendResult, DeleteStatus, PendingSubmission, SubmissionQueue};
use afz_core::{FetchRequest, Network, NetworkError, ResponseSnapshot};
use bytes::Bytes;
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::error::WorkerError;

/// Result of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Ids delivered and removed, in delivery order.
    pub delivered: Vec<u64>,
    /// Ids still waiting after this pass.
    pub pending: Vec<u64>,
}

impl SyncReport {
    /// `true` when nothing is left to deliver.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

/// What happened to a submission handed to [`BackgroundSync::queue_submission`].
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// The endpoint answered right away; its response is returned as is.
    Sent(ResponseSnapshot),
    /// The network was down; the payload was queued under this id.
    Queued(u64),
}

#[derive(Debug, thiserror::Error)]
enum DeliveryError {
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Queue plus the delivery loop.
#[derive(Clone)]
pub struct BackgroundSync {
    queue: Arc<dyn SubmissionQueue>,
    network: Arc<dyn Network>,
    endpoint: Url,
    tag: String,
}

impl BackgroundSync {
    pub fn new(
        queue: Arc<dyn SubmissionQueue>,
        network: Arc<dyn Network>,
        endpoint: Url,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            network,
            endpoint,
            tag: tag.into(),
        }
    }

    /// Tag that triggers delivery.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Handles a sync event.
    ///
    /// Returns `None` when `tag` is not this queue's tag.
    pub async fn sync(&self, tag: &str) -> BackendResult<Option<SyncReport>> {
        if tag != self.tag {
            debug!(tag, expected = %self.tag, "ignoring sync tag");
            return Ok(None);
        }
        self.replay().await.map(Some)
    }

    /// Tries to deliver every pending submission once.
    pub async fn replay(&self) -> BackendResult<SyncReport> {
        let span = info_span!("afz.sync", tag = %self.tag, endpoint = %self.endpoint);
        self.deliver_pending().instrument(span).await
    }

    async fn deliver_pending(&self) -> BackendResult<SyncReport> {
        let mut report = SyncReport::default();
        for PendingSubmission { id, data } in self.queue.pending().await? {
            match self.deliver(&data).await {
                Ok(response) if response.status().is_success() => {
                    match self.queue.remove(id).await {
                        Ok(DeleteStatus::Deleted(_) | DeleteStatus::Missing) => {
                            info!(id, status = response.status().as_u16(), "submission delivered");
                            report.delivered.push(id);
                        }
                        Err(error) => {
                            warn!(id, %error, "submission delivered but not removed");
                            report.pending.push(id);
                        }
                    }
                }
                Ok(response) => {
                    warn!(
                        id,
                        status = response.status().as_u16(),
                        "submission rejected, kept for retry"
                    );
                    report.pending.push(id);
                }
                Err(error) => {
                    warn!(id, %error, "submission delivery failed, kept for retry");
                    report.pending.push(id);
                }
            }
        }
        crate::metrics::record_sync(&report);
        Ok(report)
    }

    /// Sends `data` now, or queues it when the network is unreachable.
    pub async fn queue_submission(&self, data: Value) -> Result<SubmissionOutcome, WorkerError> {
        match self.deliver(&data).await {
            Ok(response) => Ok(SubmissionOutcome::Sent(response)),
            Err(DeliveryError::Encode(error)) => Err(WorkerError::Encode(error)),
            Err(DeliveryError::Network(error)) => {
                let id = self.queue.enqueue(data).await?;
                info!(id, %error, "submission queued for background sync");
                Ok(SubmissionOutcome::Queued(id))
            }
        }
    }

    /// Appends `data` to the queue without trying to send it.
    pub async fn enqueue(&self, data: Value) -> BackendResult<u64> {
        self.queue.enqueue(data).await
    }

    pub async fn pending(&self) -> BackendResult<Vec<PendingSubmission>> {
        self.queue.pending().await
    }

    /// Drops every pending submission.
    pub async fn clear(&self) -> BackendResult<usize> {
        let dropped = self.queue.clear().await?;
        if dropped > 0 {
            warn!(dropped, "pending submissions cleared");
        }
        Ok(dropped)
    }

    async fn deliver(&self, data: &Value) -> Result<ResponseSnapshot, DeliveryError> {
        let body = Bytes::from(serde_json::to_vec(data)?);
        let request = FetchRequest::post_json(self.endpoint.clone(), body);
        Ok(self.network.fetch(request).await?)
    }
}

impl std::fmt::Debug for BackgroundSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundSync")
            .field("endpoint", &self.endpoint.as_str())
            .field("tag", &self.tag)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afz_backend::MemoryQueue;
    use afz_test::MockNetwork;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CONTACT: &str = "https://afz.org/api/contact";

    fn sync(network: &MockNetwork, queue: &MemoryQueue) -> BackgroundSync {
        BackgroundSync::new(
            Arc::new(queue.clone()),
            Arc::new(network.clone()),
            Url::parse(CONTACT).unwrap(),
            "contact-form-sync",
        )
    }

    #[tokio::test]
    async fn test_all_delivered() {
        let network = MockNetwork::new();
        let queue = MemoryQueue::new();
        network.respond(CONTACT, 200, r#"{"success":true}"#);
        let sync = sync(&network, &queue);
        sync.enqueue(json!({"name": "A"})).await.unwrap();
        sync.enqueue(json!({"name": "B"})).await.unwrap();

        let report = sync.sync("contact-form-sync").await.unwrap().unwrap();

        assert_eq!(report.delivered, vec![1, 2]);
        assert!(report.is_complete());
        assert!(sync.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_record_stays_unchanged() {
        let network = MockNetwork::new();
        let queue = MemoryQueue::new();
        network
            .respond(CONTACT, 200, "ok")
            .respond_once(CONTACT, 500, "error");
        let sync = sync(&network, &queue);
        let first = json!({"name": "A", "message": "Hallo"});
        sync.enqueue(first.clone()).await.unwrap();
        sync.enqueue(json!({"name": "B"})).await.unwrap();

        let report = sync.replay().await.unwrap();

        assert_eq!(report, SyncReport { delivered: vec![2], pending: vec![1] });
        assert_eq!(
            sync.pending().await.unwrap(),
            vec![PendingSubmission { id: 1, data: first }]
        );
    }

    #[tokio::test]
    async fn test_records_posted_as_json_in_id_order() {
        let network = MockNetwork::new();
        let queue = MemoryQueue::new();
        network.respond(CONTACT, 204, "");
        let sync = sync(&network, &queue);
        sync.enqueue(json!({"n": 1})).await.unwrap();
        sync.enqueue(json!({"n": 2})).await.unwrap();

        sync.replay().await.unwrap();

        let bodies: Vec<Value> = network
            .requests()
            .iter()
            .map(|r| serde_json::from_slice(r.body.as_ref().unwrap()).unwrap())
            .collect();
        assert_eq!(bodies, vec![json!({"n": 1}), json!({"n": 2})]);
        assert!(network.requests().iter().all(|r| r.method == http::Method::POST));
    }

    #[tokio::test]
    async fn test_other_tag_is_ignored() {
        let network = MockNetwork::new();
        let queue = MemoryQueue::new();
        let sync = sync(&network, &queue);
        sync.enqueue(json!({})).await.unwrap();

        assert_eq!(sync.sync("newsletter-sync").await.unwrap(), None);
        assert_eq!(network.total_calls(), 0);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_queue_submission_offline_then_online() {
        let network = MockNetwork::new();
        let queue = MemoryQueue::new();
        let sync = sync(&network, &queue);
        network.set_offline(true);

        let outcome = sync.queue_submission(json!({"email": "a@b.de"})).await.unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Queued(1)));

        network.set_offline(false);
        network.respond(CONTACT, 200, "ok");
        let outcome = sync.queue_submission(json!({"email": "c@d.de"})).await.unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Sent(ref r) if r.status() == 200));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let network = MockNetwork::new();
        let queue = MemoryQueue::new();
        let sync = sync(&network, &queue);
        sync.enqueue(json!({})).await.unwrap();
        assert_eq!(sync.clear().await.unwrap(), 1);
        assert!(queue.is_empty());
    }
}
