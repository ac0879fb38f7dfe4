//! Conversion of admitted frames into transport frames

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::types::{AdmittedFrame, TransportFrame};
use crate::{Result, StreamError};

/// Converts an admitted binary frame into its transport representation.
///
/// Implementations copy `timestamp` and `sequence_number` through unchanged.
pub trait FrameTranscoder: Send + Sync + 'static {
    fn transcode(&self, frame: &AdmittedFrame) -> Result<TransportFrame>;
}

/// Encodes payloads as standard padded base64 without line wrapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Transcoder {
    max_payload_bytes: Option<usize>,
}

impl Base64Transcoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject payloads larger than `limit` bytes.
    pub fn with_max_payload(limit: Option<usize>) -> Self {
        Self { max_payload_bytes: limit }
    }
}

impl FrameTranscoder for Base64Transcoder {
    fn transcode(&self, admitted: &AdmittedFrame) -> Result<TransportFrame> {
        let frame = &admitted.frame;
        if let Some(limit) = self.max_payload_bytes {
            if frame.len() > limit {
                return Err(StreamError::transcode_failed(
                    frame.sequence_number,
                    format!("payload of {} bytes exceeds limit of {} bytes", frame.len(), limit),
                ));
            }
        }

        Ok(TransportFrame {
            encoded_chunk: STANDARD.encode(&frame.data),
            timestamp: frame.capture_timestamp,
            sequence_number: frame.sequence_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawFrame;
    use proptest::prelude::*;

    fn admitted(data: Vec<u8>) -> AdmittedFrame {
        AdmittedFrame { frame: RawFrame::new(data, 12, 3_400), admission_index: 0, admitted_at: 3_400 }
    }

    #[test]
    fn encodes_standard_padded_base64() {
        let frame = Base64Transcoder::new().transcode(&admitted(b"hello".to_vec())).unwrap();
        assert_eq!(frame.encoded_chunk, "aGVsbG8=");
        assert_eq!(frame.sequence_number, 12);
        assert_eq!(frame.timestamp, 3_400);
    }

    #[test]
    fn empty_payload_encodes_to_empty_string() {
        let frame = Base64Transcoder::new().transcode(&admitted(Vec::new())).unwrap();
        assert_eq!(frame.encoded_chunk, "");
    }

    #[test]
    fn large_payload_is_not_line_wrapped() {
        let frame = Base64Transcoder::new().transcode(&admitted(vec![0xAB; 4096])).unwrap();
        assert!(!frame.encoded_chunk.contains('\n'));
        assert!(!frame.encoded_chunk.contains('\r'));
    }

    #[test]
    fn oversized_payload_fails() {
        let transcoder = Base64Transcoder::with_max_payload(Some(4));
        let result = transcoder.transcode(&admitted(vec![0; 5]));
        assert!(matches!(result, Err(StreamError::Transcode { sequence_number: 12, .. })));
        assert!(transcoder.transcode(&admitted(vec![0; 4])).is_ok());
    }

    proptest! {
        #[test]
        fn decoding_restores_the_payload(data in prop::collection::vec(any::<u8>(), 0..2048)) {
            let frame = Base64Transcoder::new().transcode(&admitted(data.clone())).unwrap();
            prop_assert_eq!(STANDARD.decode(&frame.encoded_chunk).unwrap(), data);
        }
    }
}
