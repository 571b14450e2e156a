//! Response snapshots.
//!
//! A [`ResponseSnapshot`] is a fully buffered response: status, headers and
//! body. It is what the network layer returns, what stores keep, and what
//! the worker finally hands back to the page. Cloning is cheap because the
//! body is reference counted.

use std::mem::size_of;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::policy::CachePolicy;

/// A buffered response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SerializableSnapshot", try_from = "SerializableSnapshot")]
pub struct ResponseSnapshot {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ResponseSnapshot {
    /// Creates a snapshot from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// `200 OK` with the given body and no headers.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, HeaderMap::new(), body)
    }

    /// A `text/plain` response with the given status.
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(status, HeaderMap::new(), body).with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain"),
        )
    }

    /// Adds or replaces a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Response status.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consumes the snapshot and returns its parts.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Only an exact `200 OK` may be written to a store.
    ///
    /// Redirects, partial content, client and server errors are returned to
    /// the caller as they are but never persisted.
    #[inline]
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Wraps the snapshot in a [`CachePolicy`] according to [`is_cacheable`](Self::is_cacheable).
    pub fn cache_policy(self) -> CachePolicy<Self, Self> {
        if self.is_cacheable() {
            CachePolicy::Cacheable(self)
        } else {
            CachePolicy::NonCacheable(self)
        }
    }

    /// Returns the estimated memory usage of this snapshot in bytes.
    pub fn memory_size(&self) -> usize {
        let headers: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.as_str().len() + value.len())
            .sum();
        size_of::<Self>() + headers + self.body.len()
    }
}

/// Plain representation used for persistence.
///
/// Headers are kept as ordered `(name, raw value)` pairs so that every
/// binary format can encode them without self-describing support.
#[derive(Serialize, Deserialize)]
struct SerializableSnapshot {
    status: u16,
    headers: Vec<(String, ByteBuf)>,
    body: ByteBuf,
}

impl From<ResponseSnapshot> for SerializableSnapshot {
    fn from(snapshot: ResponseSnapshot) -> Self {
        let headers = snapshot
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_owned(), ByteBuf::from(value.as_bytes())))
            .collect();
        Self {
            status: snapshot.status.as_u16(),
            headers,
            body: ByteBuf::from(snapshot.body.to_vec()),
        }
    }
}

/// Error produced when a persisted snapshot does not describe a valid response.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Status outside of `100..=999`.
    #[error("invalid status code: {0}")]
    Status(#[from] http::status::InvalidStatusCode),
    /// Header name with forbidden characters.
    #[error("invalid header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),
    /// Header value with forbidden bytes.
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),
}

impl TryFrom<SerializableSnapshot> for ResponseSnapshot {
    type Error = SnapshotError;

    fn try_from(value: SerializableSnapshot) -> Result<Self, Self::Error> {
        let status = StatusCode::from_u16(value.status)?;
        let mut headers = HeaderMap::with_capacity(value.headers.len());
        for (name, raw) in value.headers {
            headers.append(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_bytes(&raw)?,
            );
        }
        Ok(Self {
            status,
            headers,
            body: Bytes::from(value.body.into_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_200_is_cacheable() {
        for code in [201u16, 204, 206, 301, 304, 404, 500, 503] {
            let snapshot = ResponseSnapshot::new(
                StatusCode::from_u16(code).unwrap(),
                HeaderMap::new(),
                "x",
            );
            assert!(!snapshot.is_cacheable(), "{code} must not be cacheable");
            assert!(matches!(
                snapshot.cache_policy(),
                CachePolicy::NonCacheable(_)
            ));
        }
        assert!(ResponseSnapshot::ok("x").is_cacheable());
    }

    #[test]
    fn test_serde_preserves_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        let snapshot = ResponseSnapshot::new(StatusCode::OK, headers, "body");

        let json = serde_json::to_vec(&snapshot).unwrap();
        let decoded: ResponseSnapshot = serde_json::from_slice(&json).unwrap();

        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.headers().get_all(header::SET_COOKIE).iter().count(), 2);
    }

    #[test]
    fn test_invalid_status_is_rejected() {
        let json = r#"{"status":42,"headers":[],"body":[]}"#;
        assert!(serde_json::from_str::<ResponseSnapshot>(json).is_err());
    }

    #[test]
    fn test_text_sets_content_type() {
        let snapshot = ResponseSnapshot::text(StatusCode::SERVICE_UNAVAILABLE, "offline");
        assert_eq!(
            snapshot.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        assert_eq!(snapshot.body_text(), "offline");
    }
}
