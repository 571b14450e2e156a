//! Cache generations.
//!
//! A generation is the set of stores that belongs to one deployed build of
//! the site's static assets. Every generation owns two stores:
//!
//! - the **static** store, `{prefix}-cache-{version}`, filled at install time
//!   from the asset manifest
//! - the **runtime** store, `{prefix}-runtime-{version}`, filled
//!   opportunistically while pages are being served
//!
//! Exactly one generation is current for a worker. Any other store whose name
//! carries the same prefix is stale and is removed on activation.
//!
//! ```
//! use afz_core::{Generation, StoreName};
//!
//! let current = Generation::new("afz", "v2");
//! assert_eq!(current.static_store().as_str(), "afz-cache-v2");
//! assert_eq!(current.runtime_store().as_str(), "afz-runtime-v2");
//!
//! assert!(current.is_stale(&StoreName::new("afz-cache-v1")));
//! assert!(!current.is_stale(&StoreName::new("afz-runtime-v2")));
//! assert!(!current.is_stale(&StoreName::new("unrelated-store")));
//! ```

use std::fmt;

use smol_str::SmolStr;

use crate::label::StoreName;

/// One versioned set of response stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Generation {
    prefix: SmolStr,
    version: SmolStr,
    static_store: StoreName,
    runtime_store: StoreName,
}

impl Generation {
    /// Creates the generation identified by `prefix` and `version`.
    pub fn new(prefix: impl Into<SmolStr>, version: impl Into<SmolStr>) -> Self {
        let prefix = prefix.into();
        let version = version.into();
        let static_store = StoreName::from(format!("{prefix}-cache-{version}"));
        let runtime_store = StoreName::from(format!("{prefix}-runtime-{version}"));
        Self {
            prefix,
            version,
            static_store,
            runtime_store,
        }
    }

    /// Naming prefix shared by every generation of this worker.
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Version tag of this generation.
    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the store holding the install-time asset manifest.
    #[inline]
    pub fn static_store(&self) -> &StoreName {
        &self.static_store
    }

    /// Name of the store holding responses cached while serving.
    #[inline]
    pub fn runtime_store(&self) -> &StoreName {
        &self.runtime_store
    }

    /// Returns `true` if `name` is one of this generation's own stores.
    pub fn owns(&self, name: &StoreName) -> bool {
        name == &self.static_store || name == &self.runtime_store
    }

    /// Returns `true` if `name` belongs to this worker's naming family but
    /// not to this generation.
    pub fn is_stale(&self, name: &StoreName) -> bool {
        name.has_prefix(&self.prefix) && !self.owns(name)
    }

    /// Filters `names` down to the stale ones, preserving order.
    pub fn stale_stores<'a, I>(&self, names: I) -> Vec<StoreName>
    where
        I: IntoIterator<Item = &'a StoreName>,
    {
        names
            .into_iter()
            .filter(|name| self.is_stale(name))
            .cloned()
            .collect()
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.prefix, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_stores_keeps_exactly_old_generation() {
        let current = Generation::new("afz", "v2");
        let names: Vec<StoreName> = [
            "afz-cache-v1",
            "afz-runtime-v1",
            "afz-cache-v2",
            "afz-runtime-v2",
            "unrelated-store",
        ]
        .into_iter()
        .map(StoreName::from)
        .collect();

        let stale = current.stale_stores(&names);
        assert_eq!(
            stale,
            vec![
                StoreName::new("afz-cache-v1"),
                StoreName::new("afz-runtime-v1")
            ]
        );
    }

    #[test]
    fn test_version_with_build_label() {
        let generation = Generation::new("afz", "v1.4.0-build.12");
        assert_eq!(generation.static_store().as_str(), "afz-cache-v1.4.0-build.12");
        assert_eq!(generation.version(), "v1.4.0-build.12");
        assert_eq!(generation.to_string(), "afz@v1.4.0-build.12");
    }
}
