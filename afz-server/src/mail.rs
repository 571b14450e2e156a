//! Outgoing mail.
//!
//! Handlers never talk to a mail provider directly. They build a
//! [`MailMessage`] and hand it to a [`Mailer`]; any error means the mail was
//! not delivered.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// A message ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Acknowledgement returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Provider-assigned message id.
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    /// The provider refused the message.
    #[error("mail rejected: {0}")]
    Rejected(String),
    /// The provider could not be reached.
    #[error("mail provider unavailable: {0}")]
    Unavailable(String),
}

/// Sends mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<DeliveryReceipt, MailError>;
}

/// Mailer that only records messages through `tracing`.
///
/// Used when no provider is configured, e.g. during local development.
#[derive(Debug, Default)]
pub struct LogMailer {
    sent: AtomicU64,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages accepted so far.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<DeliveryReceipt, MailError> {
        let seq = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        let message_id = format!("log-{seq}");
        info!(
            %message_id,
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            bytes = message.html_body.len(),
            "mail accepted"
        );
        Ok(DeliveryReceipt { message_id })
    }
}
