//! # afz-server
//!
//! The small HTTP backend behind the afz.org forms.
//!
//! Contact messages and newsletter sign-ups arrive as JSON, are validated,
//! and are turned into a [`MailMessage`] for a [`Mailer`]. The offline
//! worker's background sync delivers queued contact submissions to the same
//! `POST /api/contact` endpoint, so anything that answers `2xx` here is
//! considered delivered by the worker.

pub mod api;
pub mod config;
pub mod error;
pub mod mail;

pub use api::{AppState, router};
pub use config::{MailConfig, ServerConfig, ServerConfigError};
pub use error::ApiError;
pub use mail::{DeliveryReceipt, LogMailer, MailError, MailMessage, Mailer};
