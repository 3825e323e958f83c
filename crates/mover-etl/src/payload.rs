//! On-disk payload envelope shared by extract and load

use serde::{Deserialize, Serialize};

use mover_core::{Result, Row};

/// Payload file extension, without the dot.
pub const PAYLOAD_EXTENSION: &str = "json";

/// One table's extracted rows:
/// `{ "table_name": ..., "count": ..., "data": [...] }`.
///
/// Files are pretty-printed for human inspection; row order is emission
/// order and survives a decode/encode round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    pub table_name: String,
    pub count: usize,
    pub data: Vec<Row>,
}

impl Payload {
    pub fn new(table_name: String, data: Vec<Row>) -> Self {
        Self {
            table_name,
            count: data.len(),
            data,
        }
    }

    /// Encode for writing to disk.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode a payload file.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mover_core::Value;

    fn payload() -> Payload {
        Payload::new(
            "user".into(),
            vec![
                Row::new(
                    vec!["id".into(), "name".into(), "score".into(), "bio".into()],
                    vec![
                        Value::Int64(1),
                        Value::String("alice".into()),
                        Value::Float64(4.5),
                        Value::Null,
                    ],
                ),
                Row::new(
                    vec!["id".into(), "name".into(), "score".into(), "bio".into()],
                    vec![
                        Value::Int64(2),
                        Value::String("bob".into()),
                        Value::Int64(3),
                        Value::Json(serde_json::json!({"likes": ["tea"]})),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn test_envelope_shape() {
        let encoded = payload().to_pretty_json().unwrap();
        let tree: serde_json::Value = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(tree["table_name"], "user");
        assert_eq!(tree["count"], 2);
        assert!(tree["data"].is_array());
        // numbers are unwrapped, nulls are JSON null
        assert_eq!(tree["data"][0]["id"], serde_json::json!(1));
        assert_eq!(tree["data"][0]["bio"], serde_json::Value::Null);
        assert_eq!(tree["data"][1]["bio"]["likes"][0], "tea");
    }

    #[test]
    fn test_output_is_indented() {
        let encoded = payload().to_pretty_json().unwrap();
        let text = String::from_utf8(encoded).unwrap();
        assert!(text.contains("\n  "), "payload should be pretty-printed");
    }

    #[test]
    fn test_decode_encode_round_trip_is_byte_identical() {
        let encoded = payload().to_pretty_json().unwrap();
        let decoded = Payload::from_slice(&encoded).unwrap();
        let re_encoded = decoded.to_pretty_json().unwrap();
        assert_eq!(encoded, re_encoded);
    }

    #[test]
    fn test_decode_preserves_row_order() {
        let encoded = payload().to_pretty_json().unwrap();
        let decoded = Payload::from_slice(&encoded).unwrap();
        assert_eq!(decoded.data[0].get("name"), Some(&Value::String("alice".into())));
        assert_eq!(decoded.data[1].get("name"), Some(&Value::String("bob".into())));
    }

    #[test]
    fn test_invalid_document_is_an_encode_error() {
        assert!(Payload::from_slice(b"not json").is_err());
    }
}
