//! The worker and its event dispatcher.

use std::sync::Arc;

use afz_backend::{CacheStorage, MemoryQueue, SubmissionQueue};
use afz_core::{FetchContext, FetchRequest, Network, ResponseSnapshot};
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tracing::{Instrument, debug, debug_span, field};
use url::Url;

use crate::caches::GenerationCaches;
use crate::clients::ClientRegistry;
use crate::config::{ConfigError, WorkerConfig};
use crate::error::WorkerError;
use crate::fallback::OfflineFallback;
use crate::generation::{ActivationReport, InstallReport, VersionManager};
use crate::lifecycle::{Lifecycle, WorkerState};
use crate::network::TimeoutNetwork;
use crate::offload::OffloadManager;
use crate::router::{Route, Router};
use crate::strategy::{Strategies, StrategyKind};
use crate::sync::{BackgroundSync, SubmissionOutcome, SyncReport};

/// Messages a page can post to the worker.
#[derive(Debug)]
pub enum ClientMessage {
    /// Activate now if installed, otherwise as soon as installed.
    SkipWaiting,
    /// Ask for the version tag.
    GetVersion {
        /// Where the answer goes.
        reply: oneshot::Sender<String>,
    },
}

/// Events the worker reacts to.
#[derive(Debug)]
pub enum Event {
    Install,
    Activate,
    Fetch(FetchRequest),
    Message(ClientMessage),
    Sync {
        /// Tag the sync was registered under.
        tag: String,
    },
}

/// Answer to a fetch event.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The worker produced this response.
    Respond {
        response: ResponseSnapshot,
        context: FetchContext,
        /// Strategy that handled the request.
        strategy: StrategyKind,
    },
    /// Not intercepted; the page goes to the network itself.
    Bypass,
}

impl FetchOutcome {
    /// The response, unless the request was bypassed.
    pub fn response(&self) -> Option<&ResponseSnapshot> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            FetchOutcome::Bypass => None,
        }
    }

    pub fn context(&self) -> Option<&FetchContext> {
        match self {
            FetchOutcome::Respond { context, .. } => Some(context),
            FetchOutcome::Bypass => None,
        }
    }

    pub fn into_response(self) -> Option<ResponseSnapshot> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            FetchOutcome::Bypass => None,
        }
    }
}

/// Result of [`ServiceWorker::dispatch`], one variant per event.
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivationReport),
    Fetched(FetchOutcome),
    /// The message needed no further work.
    MessageHandled,
    /// `None` when the tag was not the sync tag.
    Synced(Option<SyncReport>),
}

struct Inner {
    config: WorkerConfig,
    manifest: Vec<Url>,
    router: Router,
    strategies: Strategies,
    fallback: OfflineFallback,
    versions: VersionManager,
    sync: BackgroundSync,
    clients: ClientRegistry,
    offload: OffloadManager,
    lifecycle: Lifecycle,
}

/// An offline worker for one site version.
///
/// Everything the worker touches is injected: storage, network, queue and
/// client registry. Two workers built from separate parts never share
/// state, so tests can run many of them side by side. Cloning is cheap.
///
/// ```ignore
/// let worker = ServiceWorker::builder()
///     .config(WorkerConfig::from_file("worker.yaml")?)
///     .storage(MokaStorage::builder().max_entries(1024).build())
///     .network(ReqwestNetwork::default())
///     .build()?;
///
/// worker.install().await?;
/// worker.activate().await?;
/// let outcome = worker.fetch(FetchRequest::get("https://afz.org/")?.navigate()).await;
/// ```
#[derive(Clone)]
pub struct ServiceWorker {
    inner: Arc<Inner>,
}

impl ServiceWorker {
    pub fn builder() -> ServiceWorkerBuilder {
        ServiceWorkerBuilder::default()
    }

    /// Handles one event.
    pub async fn dispatch(&self, event: Event) -> Result<EventOutcome, WorkerError> {
        match event {
            Event::Install => self.install().await.map(EventOutcome::Installed),
            Event::Activate => self.activate().await.map(EventOutcome::Activated),
            Event::Fetch(request) => Ok(EventOutcome::Fetched(self.fetch(request).await)),
            Event::Message(message) => Ok(match self.message(message).await? {
                Some(report) => EventOutcome::Activated(report),
                None => EventOutcome::MessageHandled,
            }),
            Event::Sync { tag } => self.sync(&tag).await.map(EventOutcome::Synced),
        }
    }

    /// Pre-caches the asset manifest.
    ///
    /// Allowed only on a freshly built worker. On failure the worker becomes
    /// redundant. On success it skips waiting unless the config turns that
    /// off.
    pub async fn install(&self) -> Result<InstallReport, WorkerError> {
        let lifecycle = &self.inner.lifecycle;
        lifecycle.transition("install", WorkerState::Parsed, WorkerState::Installing)?;
        match self.inner.versions.install(&self.inner.manifest).await {
            Ok(report) => {
                if self.inner.config.skip_waiting {
                    lifecycle.skip_waiting();
                }
                lifecycle.set(WorkerState::Installed);
                Ok(report)
            }
            Err(error) => {
                lifecycle.set(WorkerState::Redundant);
                Err(error)
            }
        }
    }

    /// Evicts stale generations and takes control of open pages.
    ///
    /// A worker that does not skip waiting stays installed, failing with
    /// [`WorkerError::Waiting`], while pages controlled by another version
    /// are still open.
    pub async fn activate(&self) -> Result<ActivationReport, WorkerError> {
        let lifecycle = &self.inner.lifecycle;
        if !lifecycle.is_skip_waiting() && lifecycle.state() == WorkerState::Installed {
            let clients = self.inner.clients.controlled_by_other(self.version());
            if clients > 0 {
                debug!(clients, "activation waiting for old clients");
                return Err(WorkerError::Waiting { clients });
            }
        }
        lifecycle.transition("activate", WorkerState::Installed, WorkerState::Activating)?;
        let report = self.inner.versions.activate().await;
        lifecycle.set(WorkerState::Activated);
        Ok(report)
    }

    /// Serves an intercepted request.
    ///
    /// Never fails: when the chosen strategy gives up, the offline fallback
    /// answers instead. Requests reaching a worker that is not active yet
    /// are bypassed.
    pub async fn fetch(&self, request: FetchRequest) -> FetchOutcome {
        let span = debug_span!(
            "afz.fetch",
            method = %request.method,
            url = %request.url,
            strategy = field::Empty,
            cache.status = field::Empty,
            source = field::Empty,
        );
        self.serve(request, span.clone()).instrument(span).await
    }

    async fn serve(&self, request: FetchRequest, span: tracing::Span) -> FetchOutcome {
        let state = self.inner.lifecycle.state();
        if !state.can_intercept_fetch() {
            debug!(%state, "worker not active, bypassing");
            return FetchOutcome::Bypass;
        }
        let strategy = match self.inner.router.classify(&request) {
            Route::Bypass => return FetchOutcome::Bypass,
            Route::Strategy(kind) => kind,
        };
        span.record("strategy", strategy.as_str());

        let (response, context) = match self.inner.strategies.execute(strategy, &request).await {
            Ok(served) => served,
            Err(error) => {
                debug!(%error, "strategy failed, resolving fallback");
                let (response, kind) = self.inner.fallback.resolve(&request).await;
                crate::metrics::record_fallback(kind);
                (response, FetchContext::fallback(kind))
            }
        };
        span.record("cache.status", context.status.as_str());
        span.record("source", context.source.as_str());

        FetchOutcome::Respond {
            response,
            context,
            strategy,
        }
    }

    /// Handles a message posted by a page.
    ///
    /// `SkipWaiting` on an installed worker activates it and returns the
    /// activation report.
    pub async fn message(
        &self,
        message: ClientMessage,
    ) -> Result<Option<ActivationReport>, WorkerError> {
        match message {
            ClientMessage::SkipWaiting => {
                self.inner.lifecycle.skip_waiting();
                if self.state() == WorkerState::Installed {
                    return self.activate().await.map(Some);
                }
            }
            ClientMessage::GetVersion { reply } => {
                if reply.send(self.inner.config.version.clone()).is_err() {
                    debug!("version requested by a client that went away");
                }
            }
        }
        Ok(None)
    }

    /// Handles a background sync event.
    pub async fn sync(&self, tag: &str) -> Result<Option<SyncReport>, WorkerError> {
        Ok(self.inner.sync.sync(tag).await?)
    }

    /// Sends a contact form payload now or queues it for background sync.
    pub async fn queue_submission(&self, data: Value) -> Result<SubmissionOutcome, WorkerError> {
        self.inner.sync.queue_submission(data).await
    }

    /// Stops background work and retires the worker.
    pub fn shutdown(&self) {
        self.inner.offload.cancel_all();
        self.inner.lifecycle.set(WorkerState::Redundant);
    }

    pub fn state(&self) -> WorkerState {
        self.inner.lifecycle.state()
    }

    /// Receiver notified on every lifecycle change.
    pub fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.inner.lifecycle.subscribe()
    }

    pub fn is_skip_waiting(&self) -> bool {
        self.inner.lifecycle.is_skip_waiting()
    }

    pub fn version(&self) -> &str {
        &self.inner.config.version
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.inner.config
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.inner.clients
    }

    pub fn offload(&self) -> &OffloadManager {
        &self.inner.offload
    }

    pub fn background_sync(&self) -> &BackgroundSync {
        &self.inner.sync
    }
}

impl std::fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("version", &self.inner.config.version)
            .field("state", &self.state())
            .finish()
    }
}

/// Builder for [`ServiceWorker`].
///
/// Config, storage and network are required. The queue defaults to an
/// in-memory [`MemoryQueue`] and the client registry to a fresh one.
#[derive(Default)]
pub struct ServiceWorkerBuilder {
    config: Option<WorkerConfig>,
    storage: Option<Arc<dyn CacheStorage>>,
    network: Option<Arc<dyn Network>>,
    queue: Option<Arc<dyn SubmissionQueue>>,
    clients: Option<ClientRegistry>,
}

impl ServiceWorkerBuilder {
    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn storage<S>(mut self, storage: S) -> Self
    where
        S: CacheStorage + 'static,
    {
        self.storage = Some(Arc::new(storage));
        self
    }

    pub fn network<N>(mut self, network: N) -> Self
    where
        N: Network + 'static,
    {
        self.network = Some(Arc::new(network));
        self
    }

    pub fn queue<Q>(mut self, queue: Q) -> Self
    where
        Q: SubmissionQueue + 'static,
    {
        self.queue = Some(Arc::new(queue));
        self
    }

    pub fn clients(mut self, clients: ClientRegistry) -> Self {
        self.clients = Some(clients);
        self
    }

    pub fn build(self) -> Result<ServiceWorker, WorkerError> {
        let config = self.config.ok_or(ConfigError::Missing("config"))?;
        let storage = self.storage.ok_or(ConfigError::Missing("storage"))?;
        let network = self.network.ok_or(ConfigError::Missing("network"))?;
        config.validate()?;

        let network = TimeoutNetwork::wrap(network, config.network_timeout);
        let queue = self
            .queue
            .unwrap_or_else(|| Arc::new(MemoryQueue::new()) as Arc<dyn SubmissionQueue>);
        let clients = self.clients.unwrap_or_default();
        let offload = OffloadManager::new(config.offload.clone());
        let caches = GenerationCaches::new(config.generation(), storage);

        let inner = Inner {
            manifest: config.manifest()?,
            router: Router::from_config(&config)?,
            strategies: Strategies::new(
                caches.clone(),
                network.clone(),
                offload.clone(),
                config.offline_page_url()?,
            ),
            fallback: OfflineFallback::new(
                caches.clone(),
                config.offline_page_url()?,
                config.placeholder_url()?,
            ),
            versions: VersionManager::new(caches, network.clone(), clients.clone()),
            sync: BackgroundSync::new(queue, network, config.contact_url()?, config.sync_tag.clone()),
            clients,
            offload,
            lifecycle: Lifecycle::new(),
            config,
        };
        tracing::debug!(version = %inner.config.version, "worker built");
        Ok(ServiceWorker {
            inner: Arc::new(inner),
        })
    }
}
