//! Worker configuration.
//!
//! A [`WorkerConfig`] is read from YAML or assembled with
//! [`WorkerConfig::builder`]. Only `version` and `origin` are required; every
//! other field has a default matching the afz.org deployment.
//!
//! ```yaml
//! version: v2
//! origin: https://afz.org
//! static_assets:
//!   - /
//!   - /index.html
//!   - /css/site.css
//!   - /offline.html
//! network_timeout: 8s
//! offload:
//!   timeout_policy:
//!     cancel: 30s
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use afz_core::Generation;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::offload::OffloadConfig;

/// File extensions served cache-first.
pub const DEFAULT_STATIC_EXTENSIONS: [&str; 14] = [
    "css", "js", "mjs", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "woff", "woff2", "ttf",
    "eot",
];

/// Errors raised while loading or checking a [`WorkerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The YAML document did not describe a config.
    #[error("invalid config: {0}")]
    Parse(String),
    /// A required field is empty.
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    /// The origin is not an `http` or `https` URL.
    #[error("origin must be an http(s) URL, got {0}")]
    Origin(Url),
    /// A path could not be resolved against the origin.
    #[error("cannot resolve {path:?}: {source}")]
    Path {
        /// The offending path.
        path: String,
        /// Parse error.
        #[source]
        source: url::ParseError,
    },
    /// The static extension list does not form a valid pattern.
    #[error("invalid static extension pattern: {0}")]
    Pattern(#[from] regex::Error),
    /// A required builder field was never set.
    #[error("`{0}` is required")]
    Missing(&'static str),
}

fn default_prefix() -> String {
    "afz".to_owned()
}

fn default_offline_page() -> String {
    "/offline.html".to_owned()
}

fn default_placeholder_image() -> String {
    "/images/placeholder.svg".to_owned()
}

fn default_api_prefix() -> String {
    "/api/".to_owned()
}

fn default_static_extensions() -> Vec<String> {
    DEFAULT_STATIC_EXTENSIONS
        .iter()
        .map(|ext| (*ext).to_owned())
        .collect()
}

fn default_contact_endpoint() -> String {
    "/api/contact".to_owned()
}

fn default_sync_tag() -> String {
    "contact-form-sync".to_owned()
}

fn default_skip_waiting() -> bool {
    true
}

/// Settings of one worker instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Version tag of the deployed build, e.g. `v2`.
    pub version: String,
    /// Naming prefix of every store this worker owns.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Origin the worker serves; relative paths resolve against it.
    pub origin: Url,
    /// Paths pre-cached into the static store at install.
    #[serde(default)]
    pub static_assets: Vec<String>,
    /// Page served to navigations when offline.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,
    /// Image served for image requests when offline.
    #[serde(default = "default_placeholder_image")]
    pub placeholder_image: String,
    /// Path prefix of the dynamic API.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Extensions routed cache-first, without the leading dot.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,
    /// Where queued form submissions are delivered.
    #[serde(default = "default_contact_endpoint")]
    pub contact_endpoint: String,
    /// Sync tag that triggers delivery of queued submissions.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,
    /// Skip waiting right after install. When off, activation waits until
    /// no page is controlled by another version or a page posts
    /// `SkipWaiting`.
    #[serde(default = "default_skip_waiting")]
    pub skip_waiting: bool,
    /// Upper bound on a single network fetch, applied by the network client.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub network_timeout: Option<Duration>,
    /// Background revalidation settings.
    #[serde(default)]
    pub offload: OffloadConfig,
}

impl WorkerConfig {
    /// Starts a config for `version` served from `origin`.
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder::default()
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_saphyr::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Checks the invariants the worker relies on.
    ///
    /// A fallback page missing from `static_assets` is allowed but can never
    /// be served, so it is reported with a warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::Empty("version"));
        }
        if self.prefix.trim().is_empty() {
            return Err(ConfigError::Empty("prefix"));
        }
        if !matches!(self.origin.scheme(), "http" | "https") {
            return Err(ConfigError::Origin(self.origin.clone()));
        }

        let manifest = self.manifest()?;
        for (field, path) in [
            ("offline_page", &self.offline_page),
            ("placeholder_image", &self.placeholder_image),
        ] {
            let url = self.resolve(path)?;
            if !manifest.contains(&url) {
                tracing::warn!(field, %url, "fallback resource is not pre-cached");
            }
        }
        Ok(())
    }

    /// The current store generation.
    pub fn generation(&self) -> Generation {
        Generation::new(self.prefix.as_str(), self.version.as_str())
    }

    /// Resolves `path` against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.origin.join(path).map_err(|source| ConfigError::Path {
            path: path.to_owned(),
            source,
        })
    }

    /// Absolute URLs of the install manifest, in declaration order.
    pub fn manifest(&self) -> Result<Vec<Url>, ConfigError> {
        self.static_assets.iter().map(|p| self.resolve(p)).collect()
    }

    /// Absolute URL of the offline page.
    pub fn offline_page_url(&self) -> Result<Url, ConfigError> {
        self.resolve(&self.offline_page)
    }

    /// Absolute URL of the placeholder image.
    pub fn placeholder_url(&self) -> Result<Url, ConfigError> {
        self.resolve(&self.placeholder_image)
    }

    /// Absolute URL of the contact endpoint.
    pub fn contact_url(&self) -> Result<Url, ConfigError> {
        self.resolve(&self.contact_endpoint)
    }
}

/// Builder for [`WorkerConfig`].
#[derive(Debug, Default)]
pub struct WorkerConfigBuilder {
    version: Option<String>,
    origin: Option<Url>,
    prefix: Option<String>,
    static_assets: Vec<String>,
    offline_page: Option<String>,
    placeholder_image: Option<String>,
    api_prefix: Option<String>,
    static_extensions: Option<Vec<String>>,
    contact_endpoint: Option<String>,
    sync_tag: Option<String>,
    skip_waiting: Option<bool>,
    network_timeout: Option<Duration>,
    offload: OffloadConfig,
}

impl WorkerConfigBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn origin(mut self, origin: Url) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Adds paths to the install manifest.
    pub fn static_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_assets.extend(assets.into_iter().map(Into::into));
        self
    }

    pub fn offline_page(mut self, path: impl Into<String>) -> Self {
        self.offline_page = Some(path.into());
        self
    }

    pub fn placeholder_image(mut self, path: impl Into<String>) -> Self {
        self.placeholder_image = Some(path.into());
        self
    }

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = Some(prefix.into());
        self
    }

    pub fn static_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn contact_endpoint(mut self, path: impl Into<String>) -> Self {
        self.contact_endpoint = Some(path.into());
        self
    }

    pub fn sync_tag(mut self, tag: impl Into<String>) -> Self {
        self.sync_tag = Some(tag.into());
        self
    }

    pub fn skip_waiting(mut self, skip: bool) -> Self {
        self.skip_waiting = Some(skip);
        self
    }

    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    pub fn offload(mut self, offload: OffloadConfig) -> Self {
        self.offload = offload;
        self
    }

    /// Builds and validates the config.
    pub fn build(self) -> Result<WorkerConfig, ConfigError> {
        let config = WorkerConfig {
            version: self.version.ok_or(ConfigError::Missing("version"))?,
            origin: self.origin.ok_or(ConfigError::Missing("origin"))?,
            prefix: self.prefix.unwrap_or_else(default_prefix),
            static_assets: self.static_assets,
            offline_page: self.offline_page.unwrap_or_else(default_offline_page),
            placeholder_image: self
                .placeholder_image
                .unwrap_or_else(default_placeholder_image),
            api_prefix: self.api_prefix.unwrap_or_else(default_api_prefix),
            static_extensions: self
                .static_extensions
                .unwrap_or_else(default_static_extensions),
            contact_endpoint: self
                .contact_endpoint
                .unwrap_or_else(default_contact_endpoint),
            sync_tag: self.sync_tag.unwrap_or_else(default_sync_tag),
            skip_waiting: self.skip_waiting.unwrap_or_else(default_skip_waiting),
            network_timeout: self.network_timeout,
            offload: self.offload,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offload::TimeoutPolicy;
    use pretty_assertions::assert_eq;

    const YAML: &str = r#"
version: v2
origin: https://afz.org
static_assets:
  - /
  - /index.html
  - /offline.html
network_timeout: 8s
offload:
  timeout_policy:
    cancel: 30s
"#;

    #[test]
    fn test_yaml_with_defaults() {
        let config = WorkerConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.prefix, "afz");
        assert_eq!(config.sync_tag, "contact-form-sync");
        assert_eq!(config.api_prefix, "/api/");
        assert!(config.skip_waiting);
        assert_eq!(config.static_extensions.len(), DEFAULT_STATIC_EXTENSIONS.len());
        assert_eq!(config.network_timeout, Some(Duration::from_secs(8)));
        assert_eq!(
            config.offload.timeout_policy,
            TimeoutPolicy::Cancel(Duration::from_secs(30))
        );
        assert_eq!(
            config.generation().static_store().as_str(),
            "afz-cache-v2"
        );
    }

    #[test]
    fn test_manifest_resolves_against_origin() {
        let config = WorkerConfig::from_yaml(YAML).unwrap();
        let manifest: Vec<String> = config
            .manifest()
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            manifest,
            vec![
                "https://afz.org/",
                "https://afz.org/index.html",
                "https://afz.org/offline.html",
            ]
        );
        assert_eq!(
            config.contact_url().unwrap().as_str(),
            "https://afz.org/api/contact"
        );
    }

    #[test]
    fn test_rejects_empty_version() {
        let err = WorkerConfig::from_yaml("version: ''\norigin: https://afz.org\n").unwrap_err();
        assert!(matches!(err, ConfigError::Empty("version")));
    }

    #[test]
    fn test_rejects_non_http_origin() {
        let err = WorkerConfig::builder()
            .version("v1")
            .origin(Url::parse("file:///srv/www").unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Origin(_)));
    }

    #[test]
    fn test_builder_requires_origin() {
        let err = WorkerConfig::builder().version("v1").build().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("origin")));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.yaml");
        std::fs::write(&path, YAML).unwrap();
        let config = WorkerConfig::from_file(&path).unwrap();
        assert_eq!(config.version, "v2");

        let missing = WorkerConfig::from_file(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
