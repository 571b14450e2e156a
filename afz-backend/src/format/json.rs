use afz_core::{Raw, ResponseSnapshot};
use bytes::Bytes;

use super::{Format, FormatError, FormatTypeId};

/// JSON format (default).
///
/// Readable with any tooling, which makes it handy when inspecting a
/// persistent store by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn encode(&self, snapshot: &ResponseSnapshot) -> Result<Raw, FormatError> {
        serde_json::to_vec(snapshot)
            .map(Bytes::from)
            .map_err(|e| FormatError::Serialize(Box::new(e)))
    }

    fn decode(&self, data: &[u8]) -> Result<ResponseSnapshot, FormatError> {
        serde_json::from_slice(data).map_err(|e| FormatError::Deserialize(Box::new(e)))
    }

    fn format_type_id(&self) -> FormatTypeId {
        FormatTypeId::Json
    }
}
