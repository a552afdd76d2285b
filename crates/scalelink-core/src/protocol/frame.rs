//! Frame encoding/decoding
//!
//! Wire envelope used by the scale:
//! - 1 byte: STX (0x02)
//! - 1 byte: LEN = payload length + 1
//! - 1 byte: command/response type
//! - N bytes: payload
//! - 1 byte: LRC, XOR of LEN, type and every payload byte

use super::{FrameError, MAX_PAYLOAD_LEN, STX};

/// Bytes of envelope around the payload: STX, LEN, type and LRC
pub const FRAME_OVERHEAD: usize = 4;

/// A protocol frame
///
/// The checksum is never stored; it is always derived from the type and
/// payload, so two frames with equal contents always carry equal checksums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command or response type
    pub command: u8,
    /// Frame payload
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame, rejecting payloads whose length cannot be expressed in LEN
    pub fn new(command: u8, payload: impl Into<Vec<u8>>) -> Result<Self, FrameError> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge { len: payload.len() });
        }
        Ok(Self { command, payload })
    }

    /// Value of the LEN byte
    pub fn length_byte(&self) -> u8 {
        // Frame::new keeps payload within MAX_PAYLOAD_LEN.
        (self.payload.len() + 1) as u8
    }

    /// LRC over LEN, type and payload
    pub fn checksum(&self) -> u8 {
        self.payload
            .iter()
            .fold(self.length_byte() ^ self.command, |acc, b| acc ^ b)
    }

    /// Decode a frame from one complete envelope (STX through LRC)
    pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
        let first = *data.first().ok_or(FrameError::Truncated { len: 0 })?;
        if first != STX {
            return Err(FrameError::InvalidStart(first));
        }

        if data.len() < FRAME_OVERHEAD {
            return Err(FrameError::Truncated { len: data.len() });
        }

        let declared = data[1] as usize;
        if declared + 3 != data.len() {
            return Err(FrameError::LengthMismatch {
                declared: declared + 3,
                actual: data.len(),
            });
        }

        let actual = data[data.len() - 1];
        let expected = lrc(&data[1..data.len() - 1]);
        if actual != expected {
            return Err(FrameError::ChecksumMismatch { expected, actual });
        }

        Ok(Self {
            command: data[2],
            payload: data[3..data.len() - 1].to_vec(),
        })
    }

    /// Encode the frame to raw bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_size());
        bytes.push(STX);
        bytes.push(self.length_byte());
        bytes.push(self.command);
        bytes.extend_from_slice(&self.payload);
        bytes.push(self.checksum());
        bytes
    }

    /// Get the total encoded size
    pub fn encoded_size(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }
}

/// Encode a command straight to wire bytes
pub fn encode(command: u8, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    Ok(Frame::new(command, payload)?.to_bytes())
}

/// XOR-reduce of the given bytes (longitudinal redundancy check)
pub fn lrc(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let original = Frame::new(0x3A, vec![0x00, 0x00, 0x03, 0x00]).unwrap();
        let encoded = original.to_bytes();
        let decoded = Frame::from_bytes(&encoded).expect("Should decode successfully");

        assert_eq!(original, decoded);
    }

    #[test]
    fn test_status_request_bytes() {
        let encoded = encode(0x3A, &[0x00, 0x00, 0x03, 0x00]).unwrap();
        // LEN = 5, LRC = 5 ^ 0x3A ^ 0x03
        assert_eq!(encoded, vec![0x02, 0x05, 0x3A, 0x00, 0x00, 0x03, 0x00, 0x3C]);
    }

    #[test]
    fn test_empty_payload() {
        let encoded = encode(0xFC, &[]).unwrap();
        assert_eq!(encoded, vec![0x02, 0x01, 0xFC, 0xFD]);

        let decoded = Frame::from_bytes(&encoded).unwrap();
        assert_eq!(decoded.command, 0xFC);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_largest_payload() {
        let payload = vec![0xA5; MAX_PAYLOAD_LEN];
        let encoded = encode(0x10, &payload).unwrap();
        assert_eq!(encoded[1], 254);

        let decoded = Frame::from_bytes(&encoded).unwrap();
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn test_payload_too_large() {
        let payload = vec![0; MAX_PAYLOAD_LEN + 1];
        assert_eq!(
            Frame::new(0x3A, payload),
            Err(FrameError::PayloadTooLarge {
                len: MAX_PAYLOAD_LEN + 1
            })
        );
    }

    #[test]
    fn test_lrc_verification() {
        let frame = Frame::new(0x3A, vec![1, 2, 3, 4, 5]).unwrap();
        let encoded = frame.to_bytes();

        // Single-bit flips in the type and payload region
        for position in 2..encoded.len() - 1 {
            for bit in 0..8 {
                let mut corrupted = encoded.clone();
                corrupted[position] ^= 1 << bit;
                assert!(matches!(
                    Frame::from_bytes(&corrupted),
                    Err(FrameError::ChecksumMismatch { .. })
                ));
            }
        }
    }

    #[test]
    fn test_equal_frames_share_checksum() {
        let a = Frame::new(0x3A, vec![9, 8, 7]).unwrap();
        let b = Frame::new(0x3A, vec![9, 8, 7]).unwrap();
        assert_eq!(a.checksum(), b.checksum());
    }

    #[test]
    fn test_rejects_malformed_envelopes() {
        assert_eq!(Frame::from_bytes(&[]), Err(FrameError::Truncated { len: 0 }));
        assert_eq!(
            Frame::from_bytes(&[0x09, 0x01, 0xFC, 0xFD]),
            Err(FrameError::InvalidStart(0x09))
        );
        assert_eq!(
            Frame::from_bytes(&[0x02, 0x01, 0xFC]),
            Err(FrameError::Truncated { len: 3 })
        );
        assert_eq!(
            Frame::from_bytes(&[0x02, 0x02, 0xFC, 0xFD]),
            Err(FrameError::LengthMismatch {
                declared: 5,
                actual: 4
            })
        );
    }
}
