//! Value formats for persisting [`ResponseSnapshot`]s.
//!
//! In-memory stores keep snapshots as they are. Stores that persist raw bytes
//! pick a [`Format`] to turn a snapshot into bytes and back.

use std::fmt::Debug;

use afz_core::{Raw, ResponseSnapshot};
use thiserror::Error;

mod bincode;
mod json;

pub use self::bincode::BincodeFormat;
pub use self::json::JsonFormat;

/// Error produced by a [`Format`].
#[derive(Error, Debug)]
pub enum FormatError {
    /// The snapshot could not be encoded.
    #[error(transparent)]
    Serialize(Box<dyn std::error::Error + Send + Sync>),

    /// The bytes do not describe a snapshot.
    #[error(transparent)]
    Deserialize(Box<dyn std::error::Error + Send + Sync>),
}

/// Unique identifier for format types, used to compare format equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTypeId {
    /// [`JsonFormat`].
    Json,
    /// [`BincodeFormat`].
    Bincode,
    /// User-defined format. The string should be a unique identifier.
    Custom(&'static str),
}

/// Encoding of response snapshots to raw bytes.
pub trait Format: Debug + Send + Sync {
    /// Encodes `snapshot`.
    fn encode(&self, snapshot: &ResponseSnapshot) -> Result<Raw, FormatError>;

    /// Decodes bytes previously produced by [`encode`](Format::encode).
    fn decode(&self, data: &[u8]) -> Result<ResponseSnapshot, FormatError>;

    /// Identifier of this format.
    fn format_type_id(&self) -> FormatTypeId;
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, StatusCode, header};

    fn snapshot() -> ResponseSnapshot {
        ResponseSnapshot::ok("<h1>Offline</h1>")
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html"))
    }

    #[test]
    fn test_formats_agree_on_content() {
        let formats: [&dyn Format; 2] = [&JsonFormat, &BincodeFormat];
        for format in formats {
            let raw = format.encode(&snapshot()).unwrap();
            let decoded = format.decode(&raw).unwrap();
            assert_eq!(decoded, snapshot(), "{:?}", format.format_type_id());
        }
    }

    #[test]
    fn test_bincode_is_smaller_than_json() {
        let json = JsonFormat.encode(&snapshot()).unwrap();
        let bincode = BincodeFormat.encode(&snapshot()).unwrap();
        assert!(bincode.len() < json.len());
    }

    #[test]
    fn test_garbage_is_a_deserialize_error() {
        let error = JsonFormat.decode(b"not json").unwrap_err();
        assert!(matches!(error, FormatError::Deserialize(_)));

        let status_only = ResponseSnapshot::text(StatusCode::OK, "");
        let raw = BincodeFormat.encode(&status_only).unwrap();
        assert!(BincodeFormat.decode(&raw[..1]).is_err());
    }
}
