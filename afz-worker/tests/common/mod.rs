//! Shared fixtures for the worker integration tests.
#![allow(dead_code)]

use afz_backend::{CacheStorage, Store};
use afz_core::{RequestKey, ResponseSnapshot, StoreName};
use afz_moka::MokaStorage;
use afz_test::MockNetwork;
use afz_worker::{ServiceWorker, WorkerConfig};
use url::Url;

pub const ORIGIN: &str = "https://afz.org";
pub const HOME: &str = "https://afz.org/";
pub const OFFLINE_PAGE: &str = "https://afz.org/offline.html";
pub const PLACEHOLDER: &str = "https://afz.org/images/placeholder.svg";
pub const STYLESHEET: &str = "https://afz.org/css/site.css";

pub const OFFLINE_HTML: &str = "<h1>You are offline</h1>";
pub const PLACEHOLDER_SVG: &str = "<svg/>";

pub fn config(version: &str) -> WorkerConfig {
    WorkerConfig::builder()
        .version(version)
        .origin(Url::parse(ORIGIN).unwrap())
        .static_assets(["/", "/offline.html", "/images/placeholder.svg", "/css/site.css"])
        .build()
        .unwrap()
}

/// A network that serves the whole install manifest.
pub fn site_network() -> MockNetwork {
    let network = MockNetwork::new();
    network
        .respond(HOME, 200, "<h1>Home</h1>")
        .respond(OFFLINE_PAGE, 200, OFFLINE_HTML)
        .respond(PLACEHOLDER, 200, PLACEHOLDER_SVG)
        .respond(STYLESHEET, 200, "body { margin: 0 }");
    network
}

pub fn storage() -> MokaStorage {
    MokaStorage::builder().max_entries(1024).build()
}

pub struct Site {
    pub worker: ServiceWorker,
    pub storage: MokaStorage,
    pub network: MockNetwork,
}

impl Site {
    pub fn new(version: &str) -> Self {
        let storage = storage();
        let network = site_network();
        let worker = ServiceWorker::builder()
            .config(config(version))
            .storage(storage.clone())
            .network(network.clone())
            .build()
            .unwrap();
        Self {
            worker,
            storage,
            network,
        }
    }

    /// Installs and activates the worker.
    pub async fn activated(version: &str) -> Self {
        let site = Self::new(version);
        site.worker.install().await.unwrap();
        site.worker.activate().await.unwrap();
        site
    }

    /// Reads `url` straight from the named store, bypassing the worker.
    pub async fn stored(&self, store: &str, url: &str) -> Option<ResponseSnapshot> {
        let store = self.storage.open(&StoreName::from(store)).await.unwrap();
        let key = RequestKey::get(&Url::parse(url).unwrap());
        store.read(&key).await.unwrap()
    }
}
