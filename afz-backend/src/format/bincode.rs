use afz_core::{Raw, ResponseSnapshot};
use bytes::Bytes;

use super::{Format, FormatError, FormatTypeId};

/// Bincode format.
///
/// Compact binary encoding with the standard bincode configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl Format for BincodeFormat {
    fn encode(&self, snapshot: &ResponseSnapshot) -> Result<Raw, FormatError> {
        ::bincode::serde::encode_to_vec(snapshot, ::bincode::config::standard())
            .map(Bytes::from)
            .map_err(|e| FormatError::Serialize(Box::new(e)))
    }

    fn decode(&self, data: &[u8]) -> Result<ResponseSnapshot, FormatError> {
        let (snapshot, _) =
            ::bincode::serde::decode_from_slice(data, ::bincode::config::standard())
                .map_err(|e| FormatError::Deserialize(Box::new(e)))?;
        Ok(snapshot)
    }

    fn format_type_id(&self) -> FormatTypeId {
        FormatTypeId::Bincode
    }
}
