//! Serial Protocol Communication
//!
//! Implements the STX/LEN/TYPE/LRC framed protocol spoken by the scale:
//! an ENQ/NAK handshake followed by ACK-confirmed command/response exchanges.

mod connection;
mod error;
mod exchange;
pub mod frame;
pub mod pending;
pub mod serial;

pub use connection::{ClientConfig, ConnectionState, ScaleClient};
pub use error::{ConfigError, FrameError, ProtocolError};
pub use frame::{encode, lrc, Frame};
pub use pending::{Assembly, PendingExchange};
pub use serial::{configure_port, open_port};

/// Start of frame
pub const STX: u8 = 0x02;

/// Handshake request (client to scale)
pub const ENQ: u8 = 0x05;

/// Command accepted (scale to client)
pub const ACK: u8 = 0x06;

/// Handshake answer (scale to client). Signals "ready" in this protocol, not an error.
pub const NAK: u8 = 0x15;

/// Status request command
pub const REQUEST_STATUS: u8 = 0x3A;

/// Default access code sent with the status request
pub const DEFAULT_PASSWORD: [u8; 4] = [0x00, 0x00, 0x03, 0x00];

/// Default baud rate for scale communication
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default timeout for each stage of an exchange in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Maximum payload size, keeps LEN within one byte
pub const MAX_PAYLOAD_LEN: usize = 253;
