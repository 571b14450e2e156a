//! Store write decisions.
//!
//! [`CachePolicy`] represents the outcome of deciding whether a response may
//! be written to a store. Both variants carry the response, so the caller
//! can always hand it back to the page regardless of the decision.

/// Result of a store write decision.
///
/// # Type Parameters
///
/// * `C` - Type of the cacheable entity
/// * `N` - Type of the non-cacheable entity
///
/// # Example
///
/// ```
/// use afz_core::{CachePolicy, ResponseSnapshot};
/// use http::{HeaderMap, StatusCode};
///
/// let missing = ResponseSnapshot::new(StatusCode::NOT_FOUND, HeaderMap::new(), "gone");
/// match missing.cache_policy() {
///     CachePolicy::Cacheable(_) => unreachable!("404 is never stored"),
///     CachePolicy::NonCacheable(response) => assert_eq!(response.status(), 404),
/// }
/// ```
#[derive(Debug)]
pub enum CachePolicy<C, N> {
    /// Entity may be stored.
    Cacheable(C),
    /// Entity must not be stored; pass it through directly.
    NonCacheable(N),
}

impl<T> CachePolicy<T, T> {
    /// Returns the wrapped entity whatever the decision was.
    pub fn into_inner(self) -> T {
        match self {
            CachePolicy::Cacheable(value) | CachePolicy::NonCacheable(value) => value,
        }
    }

    /// Returns `true` for [`CachePolicy::Cacheable`].
    pub fn is_cacheable(&self) -> bool {
        matches!(self, CachePolicy::Cacheable(_))
    }
}
