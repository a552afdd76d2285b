//! Protocol errors

use thiserror::Error;

use crate::status::StatusError;

/// Errors produced while encoding or decoding a single frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Payload does not fit in the LEN byte
    #[error("Payload too large: {len} bytes (max {max})", max = super::MAX_PAYLOAD_LEN)]
    PayloadTooLarge {
        /// Payload length that was rejected
        len: usize,
    },

    /// First byte is not STX
    #[error("Invalid initial byte {0:#04x} (expected STX)")]
    InvalidStart(u8),

    /// Fewer bytes than the smallest envelope
    #[error("Frame truncated: {len} bytes")]
    Truncated {
        /// Bytes available
        len: usize,
    },

    /// LEN disagrees with the number of bytes present
    #[error("Length byte declares {declared} bytes, frame carries {actual}")]
    LengthMismatch {
        /// Envelope size implied by LEN
        declared: usize,
        /// Envelope size received
        actual: usize,
    },

    /// Trailing LRC does not match the frame contents
    #[error("LRC mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// LRC computed over the received bytes
        expected: u8,
        /// LRC carried by the frame
        actual: u8,
    },
}

/// Errors that can occur during communication with the scale
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Scale answered the ENQ with something other than NAK
    #[error("Handshake rejected: scale answered {0:#04x} instead of NAK")]
    HandshakeRejected(u8),

    /// No handshake answer within the timeout
    #[error("Handshake timeout")]
    HandshakeTimeout,

    /// Command sent before a successful handshake
    #[error("Scale must be initialized before sending any command")]
    NotInitialized,

    /// Another handshake or command is in flight
    #[error("Another exchange is in progress")]
    Busy,

    /// Scale answered the command with something other than ACK
    #[error("Command rejected: scale answered {0:#04x} instead of ACK")]
    CommandRejected(u8),

    /// Command not written or not acknowledged within the timeout
    #[error("Failed to deliver the command")]
    DeliveryTimeout,

    /// Response frame not complete within the timeout after ACK
    #[error("Failed to receive the response within the specified time interval")]
    ResponseTimeout,

    /// Response does not start with STX
    #[error("Invalid initial byte {0:#04x} in response (should be STX)")]
    InvalidStart(u8),

    /// Response LRC does not match its contents
    #[error("LRC mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// LRC computed over the received bytes
        expected: u8,
        /// LRC carried by the frame
        actual: u8,
    },

    /// Response envelope is malformed in some other way
    #[error("Malformed response frame: {0}")]
    InvalidResponse(FrameError),

    /// Command payload does not fit in a frame
    #[error("Payload too large: {len} bytes")]
    PayloadTooLarge {
        /// Payload length that was rejected
        len: usize,
    },

    /// Connection was closed
    #[error("Connection closed")]
    Closed,

    /// Client config failed validation
    #[error("Invalid client config: {0}")]
    Config(#[from] ConfigError),

    /// Status payload could not be decoded
    #[error("Status decoding failed: {0}")]
    Status(#[from] StatusError),

    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Transport I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FrameError> for ProtocolError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::PayloadTooLarge { len } => ProtocolError::PayloadTooLarge { len },
            FrameError::InvalidStart(byte) => ProtocolError::InvalidStart(byte),
            FrameError::ChecksumMismatch { expected, actual } => {
                ProtocolError::ChecksumMismatch { expected, actual }
            }
            other => ProtocolError::InvalidResponse(other),
        }
    }
}

/// Errors raised while loading client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for [`ClientConfig`](super::ClientConfig)
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}
