//! Builder for configuring [`MokaStorage`].

use afz_core::{RequestKey, ResponseSnapshot};
use moka::future::{Cache, CacheBuilder};
use moka::policy::EvictionPolicy;

use crate::store::MokaStorage;

/// Marker type: capacity has not been configured yet.
///
/// You must call either [`max_entries()`](MokaStorageBuilder::max_entries) or
/// [`max_bytes()`](MokaStorageBuilder::max_bytes) before calling `build()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: entry-count capacity has been configured.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: byte-based capacity has been configured.
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Per-store cache settings resolved by the builder.
#[derive(Clone)]
pub(crate) enum Limit {
    Entries(u64, EvictionPolicy),
    Bytes(u64, EvictionPolicy),
}

impl Limit {
    pub(crate) fn build_cache(&self) -> Cache<RequestKey, ResponseSnapshot> {
        match self {
            Limit::Entries(capacity, policy) => CacheBuilder::new(*capacity)
                .eviction_policy(policy.clone())
                .build(),
            Limit::Bytes(bytes, policy) => CacheBuilder::new(*bytes)
                .weigher(byte_weigher)
                .eviction_policy(policy.clone())
                .build(),
        }
    }
}

/// Approximate byte cost of one entry.
fn byte_weigher(key: &RequestKey, value: &ResponseSnapshot) -> u32 {
    (key.memory_size() + value.memory_size()).min(u32::MAX as usize) as u32
}

/// Builder for creating a [`MokaStorage`].
///
/// Capacity is set with exactly one of
/// [`max_entries(n)`](Self::max_entries) or [`max_bytes(n)`](Self::max_bytes);
/// `build()` only exists once one of them was called.
///
/// ```
/// use afz_moka::MokaStorage;
///
/// // 16 MB per store
/// let storage = MokaStorage::builder()
///     .max_bytes(16 * 1024 * 1024)
///     .build();
/// ```
#[derive(Default)]
pub struct MokaStorageBuilder<Cap> {
    capacity: Cap,
    eviction_policy: Option<EvictionPolicy>,
}

impl MokaStorageBuilder<NoCapacity> {
    /// Limits every store to `capacity` entries.
    pub fn max_entries(self, capacity: u64) -> MokaStorageBuilder<EntryCapacity> {
        MokaStorageBuilder {
            capacity: EntryCapacity(capacity),
            eviction_policy: self.eviction_policy,
        }
    }

    /// Limits every store to roughly `bytes` bytes of keys and snapshots.
    pub fn max_bytes(self, bytes: u64) -> MokaStorageBuilder<ByteCapacity> {
        MokaStorageBuilder {
            capacity: ByteCapacity(bytes),
            eviction_policy: self.eviction_policy,
        }
    }
}

impl<Cap> MokaStorageBuilder<Cap> {
    /// Sets the eviction policy used by every store.
    ///
    /// # Default
    ///
    /// - entry-based capacity: [`EvictionPolicy::tiny_lfu()`]
    /// - byte-based capacity: [`EvictionPolicy::lru()`], since TinyLFU
    ///   admission can reject large entries even when eviction could make room
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }
}

impl MokaStorageBuilder<EntryCapacity> {
    /// Builds the storage with entry-count based capacity.
    pub fn build(self) -> MokaStorage {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::tiny_lfu);
        MokaStorage::with_limit(Limit::Entries(self.capacity.0, policy))
    }
}

impl MokaStorageBuilder<ByteCapacity> {
    /// Builds the storage with byte-based capacity.
    pub fn build(self) -> MokaStorage {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        MokaStorage::with_limit(Limit::Bytes(self.capacity.0, policy))
    }
}
