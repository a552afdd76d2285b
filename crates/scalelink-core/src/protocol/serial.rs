//! Serial port handling
//!
//! Opens a serial port as an async byte stream ready to hand to
//! [`ScaleClient::new`](super::ScaleClient::new).

use serialport::SerialPort;
use std::time::Duration;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::debug;

use super::{ProtocolError, DEFAULT_BAUD_RATE};

/// Open a serial port with default settings.
///
/// Must be called from within a tokio runtime.
pub fn open_port(name: &str, baud_rate: Option<u32>) -> Result<SerialStream, ProtocolError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

    let mut port = tokio_serial::new(name, baud)
        .timeout(Duration::from_millis(100))
        .open_native_async()
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;

    configure_port(&mut port)?;
    debug!("open_port: {} opened at {} baud", name, baud);
    Ok(port)
}

/// Configure a serial port for scale communication (8N1, no flow control) and drop stale input
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    port.clear(serialport::ClearBuffer::All)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_port() {
        let result = open_port("/dev/scalelink-does-not-exist", None);
        assert!(matches!(result, Err(ProtocolError::SerialError(_))));
    }
}
