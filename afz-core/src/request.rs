//! Intercepted requests.
//!
//! [`FetchRequest`] is what a controlled page hands to the worker: method,
//! absolute URL, headers, an optional body, plus the two browser hints the
//! routing and fallback logic depend on:
//!
//! - [`RequestMode`] tells whether the request loads a whole page
//!   (`Navigate`) or a sub-resource.
//! - [`Destination`] tells what the response will be used for
//!   (document, image, script, ...).
//!
//! ```
//! use afz_core::{Destination, FetchRequest};
//!
//! let page = FetchRequest::get("https://afz.org/about.html").unwrap().navigate();
//! assert!(page.is_navigation());
//!
//! let logo = FetchRequest::get("https://afz.org/img/logo.png")
//!     .unwrap()
//!     .with_destination(Destination::Image);
//! assert!(logo.is_image());
//! assert!(!logo.is_navigation());
//! ```

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, header};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::key::RequestKey;

/// How the request was issued by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page load.
    Navigate,
    /// Same-origin sub-resource.
    SameOrigin,
    /// Opaque cross-origin sub-resource.
    NoCors,
    /// CORS sub-resource.
    #[default]
    Cors,
}

/// What the response is going to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    /// A full HTML document.
    Document,
    /// An image element or CSS background.
    Image,
    /// A script.
    Script,
    /// A stylesheet.
    Style,
    /// A web font.
    Font,
    /// A `fetch()` / XHR call with no specific destination.
    #[default]
    Empty,
}

/// A request intercepted from a controlled page.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body, if any.
    pub body: Option<Bytes>,
    /// Page-load vs sub-resource hint.
    pub mode: RequestMode,
    /// Destination hint.
    pub destination: Destination,
}

impl FetchRequest {
    /// Creates a request with empty headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            mode: RequestMode::default(),
            destination: Destination::default(),
        }
    }

    /// Parses `url` and creates a `GET` request for it.
    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Method::GET, Url::parse(url)?))
    }

    /// Creates a `POST` request carrying `payload` as a JSON body.
    pub fn post_json(url: Url, payload: Bytes) -> Self {
        let mut request = Self::new(Method::POST, url);
        request.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        request.body = Some(payload);
        request
    }

    /// Marks the request as a page navigation.
    pub fn navigate(mut self) -> Self {
        self.mode = RequestMode::Navigate;
        self.destination = Destination::Document;
        self
    }

    /// Sets the request mode.
    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the request destination.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns `true` for requests that load a whole page.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate || self.destination == Destination::Document
    }

    /// Returns `true` for requests whose response is rendered as an image.
    pub fn is_image(&self) -> bool {
        self.destination == Destination::Image
    }

    /// Returns `true` for `http` and `https` URLs.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// Returns `true` if the request originates from somewhere other than
    /// `origin`.
    pub fn is_cross_origin(&self, origin: &Url) -> bool {
        self.url.origin() != origin.origin()
    }

    /// Store key of this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    /// Clones the routing-relevant parts of the request without its body,
    /// used for background revalidation.
    pub fn clone_without_body(&self) -> Self {
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: None,
            mode: self.mode,
            destination: self.destination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_destination_counts_as_navigation() {
        let request = FetchRequest::get("https://afz.org/")
            .unwrap()
            .with_destination(Destination::Document);
        assert!(request.is_navigation());
    }

    #[test]
    fn test_cross_origin_compares_scheme_host_port() {
        let origin = Url::parse("https://afz.org").unwrap();
        let same = FetchRequest::get("https://afz.org:443/x").unwrap();
        let other_port = FetchRequest::get("https://afz.org:8443/x").unwrap();
        let cdn = FetchRequest::get("https://fonts.gstatic.com/s/font.woff2").unwrap();
        assert!(!same.is_cross_origin(&origin));
        assert!(other_port.is_cross_origin(&origin));
        assert!(cdn.is_cross_origin(&origin));
    }

    #[test]
    fn test_non_http_scheme() {
        let request = FetchRequest::new(
            Method::GET,
            Url::parse("chrome-extension://abcdef/script.js").unwrap(),
        );
        assert!(!request.is_http());
    }

    #[test]
    fn test_post_json_sets_content_type() {
        let url = Url::parse("https://afz.org/api/contact").unwrap();
        let request = FetchRequest::post_json(url, Bytes::from_static(b"{}"));
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.headers.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
