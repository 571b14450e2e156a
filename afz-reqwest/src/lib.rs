#![warn(missing_docs)]
//! Network access for the afz offline worker.
//!
//! [`ReqwestNetwork`] implements `afz_core::Network` on top of
//! [`reqwest`]. Any response the server sends back, whatever its status,
//! is returned as a `ResponseSnapshot`; only transport failures become a
//! `NetworkError`.

mod network;

pub use network::{ReqwestNetwork, ReqwestNetworkBuilder};

/// Re-export of the client type for convenience in type annotations.
pub use reqwest::Client as ReqwestClient;
