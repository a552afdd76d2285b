//! # ScaleLink Core Library
//!
//! Serial-line client for digital weighing scales.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Framing of the STX/LEN/TYPE/LRC wire envelope
//! - The ENQ/NAK handshake and ACK-confirmed command exchange, with timeouts
//! - Decoding of the scale status response
//!
//! ## Example
//!
//! ```rust,ignore
//! use scalelink_core::protocol::{ClientConfig, ScaleClient};
//!
//! let client = ScaleClient::open(ClientConfig::for_port("/dev/ttyACM0"))?;
//! client.initialize().await?;
//!
//! let status = client.request_status().await?;
//! println!("weight: {} (stable: {})", status.weight, status.stable);
//!
//! client.close().await;
//! ```

pub mod protocol;
pub mod status;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::protocol::{
        ClientConfig, ConnectionState, Frame, FrameError, ProtocolError, ScaleClient,
    };
    pub use crate::status::{ScaleStatus, StatusError};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
