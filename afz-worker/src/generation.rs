//! Installing and activating cache generations.
//!
//! Install fills the static store of the current generation from the asset
//! manifest. Activation removes every store left behind by older versions,
//! then takes control of the open windows.

use std::sync::Arc;

use afz_backend::{BackendError, Store};
use afz_core::{FetchRequest, Network, NetworkError, RequestKey, ResponseSnapshot, StoreName};
use futures::future::join_all;
use http::StatusCode;
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::caches::GenerationCaches;
use crate::clients::{ClientRegistry, WorkerNotification};
use crate::error::WorkerError;

/// Why a manifest entry was not cached.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Anything but `200 OK` is refused.
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Store(#[from] BackendError),
}

/// Result for one manifest entry.
#[derive(Debug)]
pub struct AssetOutcome {
    pub url: Url,
    pub result: Result<(), AssetError>,
}

/// What install did.
#[derive(Debug, Default)]
pub struct InstallReport {
    /// `true` when the whole manifest went in as one batch.
    pub batch: bool,
    /// One entry per manifest URL, in manifest order.
    pub outcomes: Vec<AssetOutcome>,
}

impl InstallReport {
    pub fn cached(&self) -> Vec<&Url> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| &o.url)
            .collect()
    }

    pub fn failed(&self) -> Vec<&Url> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| &o.url)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// What activation did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stale stores removed.
    pub deleted: Vec<StoreName>,
    /// Stale stores whose removal failed.
    pub failed: Vec<StoreName>,
    /// Store names could not be listed, so nothing was evicted.
    pub listing_failed: bool,
    /// Clients now controlled by this version.
    pub claimed: usize,
    /// Clients that received the `Activated` notification.
    pub notified: usize,
}

/// Installs and activates the current generation.
#[derive(Clone)]
pub struct VersionManager {
    caches: GenerationCaches,
    network: Arc<dyn Network>,
    clients: ClientRegistry,
}

impl VersionManager {
    pub fn new(caches: GenerationCaches, network: Arc<dyn Network>, clients: ClientRegistry) -> Self {
        Self {
            caches,
            network,
            clients,
        }
    }

    /// Populates the static store from `manifest`.
    ///
    /// The whole manifest is first tried as one batch: everything is fetched,
    /// and only when every response is a `200` is anything written. If the
    /// batch fails, each asset is retried on its own and failures are skipped.
    /// Only failing to open the static store aborts the install.
    pub async fn install(&self, manifest: &[Url]) -> Result<InstallReport, WorkerError> {
        let generation = self.caches.generation();
        let span = info_span!(
            "afz.install",
            version = generation.version(),
            assets = manifest.len()
        );
        self.populate(manifest).instrument(span).await
    }

    async fn populate(&self, manifest: &[Url]) -> Result<InstallReport, WorkerError> {
        let generation = self.caches.generation();
        let store = self
            .caches
            .static_store()
            .await
            .map_err(|source| WorkerError::StaticStore {
                store: generation.static_store().clone(),
                source,
            })?;

        match self.add_all(store, manifest).await {
            Ok(()) => {
                info!(store = %store.name(), "static assets cached");
                Ok(InstallReport {
                    batch: true,
                    outcomes: manifest
                        .iter()
                        .map(|url| AssetOutcome {
                            url: url.clone(),
                            result: Ok(()),
                        })
                        .collect(),
                })
            }
            Err(error) => {
                warn!(%error, "batch install failed, caching assets one by one");
                let mut outcomes = Vec::with_capacity(manifest.len());
                for url in manifest {
                    let result = self.add_one(store, url).await;
                    if let Err(error) = &result {
                        warn!(%url, %error, "asset not cached");
                    }
                    outcomes.push(AssetOutcome {
                        url: url.clone(),
                        result,
                    });
                }
                Ok(InstallReport {
                    batch: false,
                    outcomes,
                })
            }
        }
    }

    async fn add_all(&self, store: &Arc<dyn Store>, manifest: &[Url]) -> Result<(), AssetError> {
        let fetched = join_all(manifest.iter().map(|url| self.fetch_asset(url))).await;
        let responses = fetched.into_iter().collect::<Result<Vec<_>, _>>()?;
        for (url, response) in manifest.iter().zip(responses) {
            store.write(&RequestKey::get(url), response).await?;
        }
        Ok(())
    }

    async fn add_one(&self, store: &Arc<dyn Store>, url: &Url) -> Result<(), AssetError> {
        let response = self.fetch_asset(url).await?;
        store.write(&RequestKey::get(url), response).await?;
        Ok(())
    }

    async fn fetch_asset(&self, url: &Url) -> Result<ResponseSnapshot, AssetError> {
        let response = self
            .network
            .fetch(FetchRequest::new(http::Method::GET, url.clone()))
            .await?;
        if !response.is_cacheable() {
            return Err(AssetError::Status(response.status()));
        }
        Ok(response)
    }

    /// Evicts stale generations, claims clients and announces the version.
    ///
    /// Never fails: a store that cannot be deleted is reported and skipped,
    /// and clients are claimed even when store names cannot be listed.
    pub async fn activate(&self) -> ActivationReport {
        let generation = self.caches.generation();
        let span = info_span!("afz.activate", version = generation.version());
        async {
            let storage = self.caches.storage();
            let mut report = ActivationReport::default();

            match storage.keys().await {
                Ok(names) => {
                    for name in generation.stale_stores(&names) {
                        match storage.delete(&name).await {
                            Ok(status) => {
                                info!(store = %name, ?status, "stale store deleted");
                                report.deleted.push(name);
                            }
                            Err(error) => {
                                warn!(store = %name, %error, "cannot delete stale store");
                                report.failed.push(name);
                            }
                        }
                    }
                }
                Err(error) => {
                    warn!(%error, "cannot list stores, stale generations kept");
                    report.listing_failed = true;
                }
            }

            report.claimed = self.clients.claim(generation.version());
            report.notified = self.clients.broadcast(WorkerNotification::Activated {
                version: generation.version().to_owned(),
            });
            debug!(
                claimed = report.claimed,
                notified = report.notified,
                "clients claimed"
            );
            report
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for VersionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionManager")
            .field("caches", &self.caches)
            .field("clients", &self.clients.len())
            .finish()
    }
}
