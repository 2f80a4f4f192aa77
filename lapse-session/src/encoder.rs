//! Session data encoders.

use crate::error::{SessionError, SessionResult};
use crate::session::SessionData;

/// Converts session data to and from the bytes handed to a [`Store`](crate::Store).
///
/// `decode` either returns fully decoded data or an error; it never yields a
/// partially populated mapping.
pub trait Encoder: Send + Sync {
    /// Short codec name, used in logs.
    fn name(&self) -> &'static str;

    /// Serialize session data.
    fn encode(&self, data: &SessionData) -> SessionResult<Vec<u8>>;

    /// Deserialize session data.
    fn decode(&self, bytes: &[u8]) -> SessionResult<SessionData>;
}

/// Compact JSON encoder. This is the engine default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, data: &SessionData) -> SessionResult<Vec<u8>> {
        serde_json::to_vec(data).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> SessionResult<SessionData> {
        serde_json::from_slice(bytes).map_err(|e| SessionError::Deserialization(e.to_string()))
    }
}

/// Indented JSON encoder, handy when inspecting a file store by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyJsonEncoder;

impl Encoder for PrettyJsonEncoder {
    fn name(&self) -> &'static str {
        "json-pretty"
    }

    fn encode(&self, data: &SessionData) -> SessionResult<Vec<u8>> {
        serde_json::to_vec_pretty(data).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> SessionResult<SessionData> {
        JsonEncoder.decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SessionData {
        let mut data = SessionData::new();
        data.insert("user_id".to_string(), json!(123));
        data.insert("roles".to_string(), json!(["admin", "ops"]));
        data
    }

    #[test]
    fn test_json_encoder() {
        let encoder = JsonEncoder;
        let bytes = encoder.encode(&sample()).unwrap();
        assert_eq!(encoder.decode(&bytes).unwrap(), sample());
        assert_eq!(encoder.decode(b"{}").unwrap(), SessionData::new());
    }

    #[test]
    fn test_pretty_encoder_is_json_compatible() {
        let bytes = PrettyJsonEncoder.encode(&sample()).unwrap();
        assert!(bytes.contains(&b'\n'));
        assert_eq!(JsonEncoder.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_decode_failures() {
        let encoder = JsonEncoder;

        let err = encoder.decode(b"not json").unwrap_err();
        assert!(matches!(err, SessionError::Deserialization(_)));

        // A valid JSON value that is not an object is rejected too.
        let err = encoder.decode(b"[1, 2, 3]").unwrap_err();
        assert!(err.is_encoding());

        let err = encoder.decode(b"{\"a\": 1").unwrap_err();
        assert!(err.is_encoding());
    }
}
