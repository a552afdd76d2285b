//! Scale status decoding
//!
//! Turns the payload of a status response into typed flags and weights.
//!
//! Payload layout:
//! - byte 0: echo of the request type
//! - byte 1: status flags 1 (bits 0-7)
//! - byte 2: status flags 2 (bits 0-1)
//! - bytes 3-6: weight, little-endian u32
//! - bytes 7-8: tare weight, little-endian u16

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::Frame;

/// Minimum payload length of a status response
pub const STATUS_PAYLOAD_LEN: usize = 9;

/// Errors raised while decoding a status payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// Payload shorter than a status response
    #[error("Status payload truncated: {len} bytes (need {need})", need = STATUS_PAYLOAD_LEN)]
    Truncated {
        /// Payload length received
        len: usize,
    },
}

/// Decoded state of the scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScaleStatus {
    /// Weight is fixed
    pub fixed_point: bool,
    /// Auto-zero is active
    pub auto_zero: bool,
    /// Scale is enabled
    pub enabled: bool,
    /// Tare is set
    pub tare: bool,
    /// Reading is stable
    pub stable: bool,
    /// Auto-zero failed at power-on
    pub auto_zero_error: bool,
    /// Load above the maximum
    pub overweight: bool,
    /// Measurement failed
    pub measurement_error: bool,
    /// Load below the minimum
    pub underweight: bool,
    /// ADC did not answer
    pub no_answer_from_adc: bool,
    /// Net weight
    pub weight: u32,
    /// Tare weight
    pub tare_weight: u16,
}

#[inline]
fn bit(byte: u8, position: u8) -> bool {
    (byte >> position) & 1 == 1
}

impl ScaleStatus {
    /// Decode the status carried by a response frame
    pub fn from_frame(frame: &Frame) -> Result<Self, StatusError> {
        Self::from_payload(&frame.payload)
    }

    /// Decode the status from a raw payload
    pub fn from_payload(payload: &[u8]) -> Result<Self, StatusError> {
        if payload.len() < STATUS_PAYLOAD_LEN {
            return Err(StatusError::Truncated { len: payload.len() });
        }

        let flags1 = payload[1];
        let flags2 = payload[2];

        Ok(Self {
            fixed_point: bit(flags1, 0),
            auto_zero: bit(flags1, 1),
            enabled: bit(flags1, 2),
            tare: bit(flags1, 3),
            stable: bit(flags1, 4),
            auto_zero_error: bit(flags1, 5),
            overweight: bit(flags1, 6),
            measurement_error: bit(flags1, 7),
            underweight: bit(flags2, 0),
            no_answer_from_adc: bit(flags2, 1),
            weight: LittleEndian::read_u32(&payload[3..7]),
            tare_weight: LittleEndian::read_u16(&payload[7..9]),
        })
    }
}
