//! Frame types flowing through the pipeline.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Raw binary frame as emitted by a frame source.
///
/// The payload is shared (`Arc<[u8]>`) and never mutated after capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Opaque frame payload
    pub data: Arc<[u8]>,

    /// Sequence number assigned by the source adapter
    pub sequence_number: u64,

    /// Capture time in milliseconds since the Unix epoch
    pub capture_timestamp: u64,
}

impl RawFrame {
    /// Create a new raw frame
    pub fn new(data: impl Into<Arc<[u8]>>, sequence_number: u64, capture_timestamp: u64) -> Self {
        Self { data: data.into(), sequence_number, capture_timestamp }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A raw frame that passed the rate governor and entered the buffer.
///
/// `admission_index` counts admissions within one activation and restarts
/// at 0 on every `start()`. It is distinct from the source-assigned
/// `frame.sequence_number`, which is what subscribers see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedFrame {
    pub frame: RawFrame,
    pub admission_index: u64,
    pub admitted_at: u64,
}

/// Transport-safe frame delivered to subscribers.
///
/// Serializes with the field names browser clients read (`chunk`,
/// `timestamp`, `sequenceNumber`); `encodedChunk` is accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportFrame {
    /// Standard base64 of the raw payload, padded, without line breaks
    #[serde(rename = "chunk", alias = "encodedChunk")]
    pub encoded_chunk: String,

    /// Capture time copied from the raw frame
    pub timestamp: u64,

    /// Source sequence number copied from the raw frame
    pub sequence_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_frame_shares_payload_on_clone() {
        let frame = RawFrame::new(vec![1u8, 2, 3], 7, 1_000);
        let copy = frame.clone();
        assert!(Arc::ptr_eq(&frame.data, &copy.data));
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_empty());
    }

    #[test]
    fn transport_frame_uses_browser_field_names() {
        let frame = TransportFrame {
            encoded_chunk: "AQID".to_string(),
            timestamp: 42,
            sequence_number: 3,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["chunk"], "AQID");
        assert_eq!(json["timestamp"], 42);
        assert_eq!(json["sequenceNumber"], 3);
    }

    #[test]
    fn transport_frame_accepts_encoded_chunk_alias() {
        let json = r#"{"encodedChunk":"AQID","timestamp":1,"sequenceNumber":2}"#;
        let frame: TransportFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.encoded_chunk, "AQID");
    }
}
