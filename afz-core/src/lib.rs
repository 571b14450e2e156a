#![warn(missing_docs)]
//! # afz-core
//!
//! Core types for the afz offline worker.
//!
//! This crate holds the vocabulary shared by every other crate in the
//! workspace. It knows nothing about where responses are stored or how the
//! network is reached; it only describes *what* flows between the pieces:
//!
//! - **Requests** intercepted from controlled pages ([`FetchRequest`])
//! - **Keys** under which responses are stored ([`RequestKey`])
//! - **Snapshots** of responses kept in a store ([`ResponseSnapshot`])
//! - **Generations** of named stores tied to one deployed build ([`Generation`], [`StoreName`])
//! - **Network** access for fetching fresh responses ([`Network`])
//! - **Offload** of background work such as revalidation ([`Offload`])
//!
//! ## Storage invariant
//!
//! Only `GET` requests are ever keyed, and only responses whose status is
//! exactly `200 OK` are ever written to a store. [`ResponseSnapshot::cache_policy`]
//! is the single place that decision is made.

pub mod context;
pub mod generation;
pub mod key;
pub mod label;
pub mod offload;
pub mod policy;
pub mod request;
pub mod response;
pub mod upstream;

pub use context::{CacheStatus, FallbackKind, FetchContext, ResponseSource};
pub use generation::Generation;
pub use key::RequestKey;
pub use label::StoreName;
pub use offload::Offload;
pub use policy::CachePolicy;
pub use request::{Destination, FetchRequest, RequestMode};
pub use response::{ResponseSnapshot, SnapshotError};
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use upstream::{Network, NetworkError};

/// Raw byte data type used for response bodies and serialized values.
/// Using `Bytes` provides cheap cloning via reference counting.
pub type Raw = bytes::Bytes;
