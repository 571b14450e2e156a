//! Fetch context types for tracking where a response came from.

use crate::label::StoreName;

/// Whether the response was served from a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
    /// A stored response was returned.
    Hit,
    /// Nothing usable was stored; the network answered.
    #[default]
    Miss,
    /// A stored response was returned while a background refresh runs.
    Stale,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Stale => "stale",
        }
    }
}

/// Substitute responses produced when neither the network nor a store could
/// answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    /// The pre-cached offline page.
    OfflinePage,
    /// The pre-cached placeholder image.
    PlaceholderImage,
    /// The synthetic `503 Service Unavailable` text response.
    Unavailable,
}

impl FallbackKind {
    /// Returns the kind as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FallbackKind::OfflinePage => "offline-page",
            FallbackKind::PlaceholderImage => "placeholder-image",
            FallbackKind::Unavailable => "unavailable",
        }
    }
}

/// Source of the response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseSource {
    /// Response came from the network.
    #[default]
    Network,
    /// Response came from the named store.
    Store(StoreName),
    /// Response was substituted after every strategy failed.
    Fallback(FallbackKind),
}

impl ResponseSource {
    /// Returns the source as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Store(name) => name.as_str(),
            ResponseSource::Fallback(kind) => kind.as_str(),
        }
    }
}

/// Context information about a handled fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchContext {
    /// Whether the response came from a store.
    pub status: CacheStatus,
    /// Where the response came from.
    pub source: ResponseSource,
}

impl FetchContext {
    /// Context for a fresh network response.
    pub fn network() -> Self {
        Self::default()
    }

    /// Context for a response read from `store`.
    pub fn hit(store: StoreName) -> Self {
        Self {
            status: CacheStatus::Hit,
            source: ResponseSource::Store(store),
        }
    }

    /// Context for a stored response served while revalidating.
    pub fn stale(store: StoreName) -> Self {
        Self {
            status: CacheStatus::Stale,
            source: ResponseSource::Store(store),
        }
    }

    /// Context for a substituted response.
    pub fn fallback(kind: FallbackKind) -> Self {
        Self {
            status: CacheStatus::Miss,
            source: ResponseSource::Fallback(kind),
        }
    }

    /// Returns `true` if the response was served from a store.
    pub fn from_store(&self) -> bool {
        matches!(self.source, ResponseSource::Store(_))
    }
}
