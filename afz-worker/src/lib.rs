#![cfg_attr(docsrs, feature(doc_cfg))]
//! # afz-worker
//!
//! The offline engine of the afz.org service worker.
//!
//! A [`ServiceWorker`] intercepts every request a page makes and decides,
//! per request, whether to answer from a local store, from the network, or
//! from both. Each deployed build owns one *generation* of stores; installing
//! a new build pre-caches its assets and activating it removes the stores of
//! older builds.
//!
//! ## Pieces
//!
//! - [`config`]: settings, from YAML or a builder
//! - [`generation`]: install and activation of store generations
//! - [`router`]: maps each request to a strategy
//! - [`strategy`]: cache-first, network-first, network-first with offline
//!   fallback, stale-while-revalidate
//! - [`fallback`]: offline page, placeholder image or `503`
//! - [`sync`]: queued form submissions and their delivery
//! - [`clients`]: open pages and the activation broadcast
//! - [`offload`]: background revalidation tasks
//!
//! ## Storage rule
//!
//! Only `GET` requests answered with exactly `200 OK` are ever written to a
//! store. Error pages, redirects and partial responses pass through to the
//! page untouched but are never kept.

pub mod caches;
pub mod clients;
pub mod config;
pub mod error;
pub mod fallback;
pub mod generation;
pub mod lifecycle;

/// Metrics collection.
///
/// With the `metrics` feature enabled this module counts strategy outcomes,
/// fallbacks, offload tasks and background deliveries.
pub mod metrics;
pub mod network;

/// Background task offloading for stale-while-revalidate.
pub mod offload;
pub mod router;
pub mod strategy;
pub mod sync;
mod worker;

pub use caches::GenerationCaches;
pub use clients::{ClientHandle, ClientId, ClientRegistry, WorkerNotification};
pub use config::{ConfigError, WorkerConfig, WorkerConfigBuilder};
pub use error::WorkerError;
pub use fallback::OfflineFallback;
pub use generation::{ActivationReport, AssetError, AssetOutcome, InstallReport, VersionManager};
pub use lifecycle::{Lifecycle, WorkerState};
pub use network::TimeoutNetwork;
pub use offload::{OffloadConfig, OffloadManager, TimeoutPolicy};
pub use router::{Route, Router};
pub use strategy::{Strategies, StrategyError, StrategyKind};
pub use sync::{BackgroundSync, SubmissionOutcome, SyncReport};
pub use worker::{
    ClientMessage, Event, EventOutcome, FetchOutcome, ServiceWorker, ServiceWorkerBuilder,
};

pub use afz_core::{
    CacheStatus, FallbackKind, FetchContext, FetchRequest, Network, NetworkError, ResponseSnapshot,
    ResponseSource,
};
