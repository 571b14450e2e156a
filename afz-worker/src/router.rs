//! Request classification.
//!
//! Every intercepted request is either left to the browser
//! ([`Route::Bypass`]) or handed to one of four strategies. The rules are
//! checked in a fixed order and the first match wins:
//!
//! | # | Matches | Strategy |
//! |---|---|---|
//! | 1 | path ends in a static extension | cache-first |
//! | 2 | navigation, path ending in `/`, `.html` or `.htm` | network-first with offline fallback |
//! | 3 | path starts with the API prefix | network-first |
//! | 4 | origin differs from the worker origin | stale-while-revalidate |
//! | 5 | anything else | network-first |
//!
//! Non-`GET` requests and non-`http(s)` schemes always bypass.

use http::Method;
use regex::Regex;
use url::Url;

use crate::config::{ConfigError, WorkerConfig};
use crate::strategy::StrategyKind;

/// Result of classifying a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; the request goes straight to the network.
    Bypass,
    /// Served by the given strategy.
    Strategy(StrategyKind),
}

/// Maps requests to strategies.
#[derive(Debug, Clone)]
pub struct Router {
    origin: Url,
    static_asset: Option<Regex>,
    api_prefix: String,
}

impl Router {
    /// Builds the router for `origin` with the given extension list and API
    /// prefix.
    pub fn new<I, S>(
        origin: Url,
        extensions: I,
        api_prefix: impl Into<String>,
    ) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = extensions
            .into_iter()
            .map(|ext| regex::escape(ext.as_ref().trim_start_matches('.')))
            .filter(|ext| !ext.is_empty())
            .collect();
        let static_asset = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"(?i)\.(?:{})$",
                alternatives.join("|")
            ))?)
        };
        Ok(Self {
            origin,
            static_asset,
            api_prefix: api_prefix.into(),
        })
    }

    pub fn from_config(config: &WorkerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.origin.clone(),
            &config.static_extensions,
            config.api_prefix.clone(),
        )?)
    }

    fn is_static_asset(&self, path: &str) -> bool {
        self.static_asset
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(path))
    }

    fn is_html_page(path: &str) -> bool {
        let path = path.to_ascii_lowercase();
        path.ends_with('/') || path.ends_with(".html") || path.ends_with(".htm")
    }

    /// Picks the route for `request`.
    ///
    /// Depends on nothing but the request and the router's settings, so
    /// classifying the same request twice gives the same answer.
    pub fn classify(&self, request: &afz_core::FetchRequest) -> Route {
        if request.method != Method::GET || !request.is_http() {
            return Route::Bypass;
        }

        let path = request.url.path();
        let kind = if self.is_static_asset(path) {
            StrategyKind::CacheFirst
        } else if request.is_navigation() || Self::is_html_page(path) {
            StrategyKind::NetworkFirstOffline
        } else if path.starts_with(&self.api_prefix) {
            StrategyKind::NetworkFirst
        } else if request.is_cross_origin(&self.origin) {
            StrategyKind::StaleWhileRevalidate
        } else {
            StrategyKind::NetworkFirst
        };
        Route::Strategy(kind)
    }
}
