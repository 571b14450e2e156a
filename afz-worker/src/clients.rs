//! Controlled windows.
//!
//! Every open page of the site registers with the [`ClientRegistry`] and
//! gets a broadcast receiver. After activation the worker claims all
//! registered clients and tells them which version now controls them.

use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

const CHANNEL_CAPACITY: usize = 16;

/// Identifier of a registered client.
pub type ClientId = u64;

/// Messages the worker sends to every client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerNotification {
    /// A new version finished activating.
    Activated {
        /// Version tag of the active worker.
        version: String,
    },
}

/// A client's end of the broadcast channel.
///
/// Dropping the handle closes the window: the client leaves the registry.
#[derive(Debug)]
pub struct ClientHandle {
    id: ClientId,
    receiver: broadcast::Receiver<WorkerNotification>,
    registry: Weak<Inner>,
}

impl ClientHandle {
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Waits for the next notification.
    ///
    /// Returns `None` once the registry is gone. A client that fell behind
    /// skips what it missed.
    pub async fn recv(&mut self) -> Option<WorkerNotification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(client = self.id, skipped, "client lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next notification if one is already waiting.
    pub fn try_recv(&mut self) -> Option<WorkerNotification> {
        loop {
            match self.receiver.try_recv() {
                Ok(notification) => return Some(notification),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            inner.clients.remove(&self.id);
        }
    }
}

#[derive(Debug)]
struct Inner {
    sender: broadcast::Sender<WorkerNotification>,
    /// Client id to the version controlling it, if claimed.
    clients: DashMap<ClientId, Option<String>>,
    next_id: AtomicU64,
}

/// Registry of controlled windows. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct ClientRegistry {
    inner: Arc<Inner>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                sender,
                clients: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a new, not yet controlled client.
    pub fn register(&self) -> ClientHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let receiver = self.inner.sender.subscribe();
        self.inner.clients.insert(id, None);
        ClientHandle {
            id,
            receiver,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub fn unregister(&self, id: ClientId) -> bool {
        self.inner.clients.remove(&id).is_some()
    }

    /// Puts every registered client under the control of `version`.
    ///
    /// Returns the number of clients claimed.
    pub fn claim(&self, version: &str) -> usize {
        let mut claimed = 0;
        for mut client in self.inner.clients.iter_mut() {
            *client.value_mut() = Some(version.to_owned());
            claimed += 1;
        }
        claimed
    }

    /// Version controlling client `id`.
    pub fn controller(&self, id: ClientId) -> Option<String> {
        self.inner.clients.get(&id).and_then(|c| c.value().clone())
    }

    /// Number of clients controlled by a version other than `version`.
    pub fn controlled_by_other(&self, version: &str) -> usize {
        self.inner
            .clients
            .iter()
            .filter(|c| c.value().as_deref().is_some_and(|v| v != version))
            .count()
    }

    /// Sends `notification` to every client; returns how many received it.
    pub fn broadcast(&self, notification: WorkerNotification) -> usize {
        self.inner.sender.send(notification).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.inner.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.clients.is_empty()
    }
}
