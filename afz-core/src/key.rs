//! Store keys.
//!
//! A [`RequestKey`] identifies a stored response by the request that
//! produced it: the HTTP method and the absolute URL with its fragment
//! removed. Query strings are part of the key.
//!
//! ```
//! use afz_core::RequestKey;
//! use http::Method;
//! use url::Url;
//!
//! let url = Url::parse("https://afz.org/css/site.css?v=3#top").unwrap();
//! let key = RequestKey::new(&Method::GET, &url);
//! assert_eq!(key.to_string(), "GET https://afz.org/css/site.css?v=3");
//! ```
//!
//! ## Performance
//!
//! [`RequestKey`] uses `Arc` internally for cheap cloning: keys are cloned
//! into background revalidation tasks and store indexes, and copying one only
//! increments a reference count.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use http::Method;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use url::Url;

/// Inner structure containing the actual key data.
/// Wrapped in Arc for cheap cloning.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
struct RequestKeyInner {
    method: SmolStr,
    url: SmolStr,
}

/// Key under which a response snapshot is stored.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "RequestKeyInner", into = "RequestKeyInner")]
pub struct RequestKey {
    inner: Arc<RequestKeyInner>,
}

impl PartialEq for RequestKey {
    fn eq(&self, other: &Self) -> bool {
        // Fast path: same Arc pointer
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for RequestKey {}

impl Hash for RequestKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl From<RequestKeyInner> for RequestKey {
    fn from(inner: RequestKeyInner) -> Self {
        RequestKey {
            inner: Arc::new(inner),
        }
    }
}

impl From<RequestKey> for RequestKeyInner {
    fn from(key: RequestKey) -> Self {
        Arc::try_unwrap(key.inner).unwrap_or_else(|arc| (*arc).clone())
    }
}

impl RequestKey {
    /// Builds the key for `method` + `url`, dropping the URL fragment.
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        RequestKey::from(RequestKeyInner {
            method: SmolStr::new(method.as_str()),
            url: SmolStr::from(url.as_str()),
        })
    }

    /// Shorthand for a `GET` key.
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::GET, url)
    }

    /// Returns the request method.
    pub fn method(&self) -> &str {
        &self.inner.method
    }

    /// Returns the request URL (without fragment).
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns the estimated memory usage of this key in bytes.
    ///
    /// SmolStr stores strings of up to 23 bytes inline, only longer ones
    /// allocate and are counted on top of the Arc allocation.
    pub fn memory_size(&self) -> usize {
        use std::mem::size_of;

        let heap_size = |len: usize| len.saturating_sub(23);
        let arc_overhead = 2 * size_of::<usize>() + size_of::<RequestKeyInner>();

        arc_overhead + heap_size(self.inner.method.len()) + heap_size(self.inner.url.len())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.inner.method, self.inner.url)
    }
}
