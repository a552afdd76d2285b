//! Connection management
//!
//! Handles the connection lifecycle and command submission to the scale.
//! All transport I/O happens on a dedicated task (see `exchange`); the
//! [`ScaleClient`] handle only guards state transitions and hands requests over.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    encode,
    exchange::{IoTask, Request},
    serial::open_port,
    ConfigError, Frame, ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_PASSWORD, DEFAULT_TIMEOUT_MS,
    MAX_PAYLOAD_LEN, REQUEST_STATUS,
};
use crate::status::ScaleStatus;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No successful handshake yet
    Unconnected,
    /// ENQ sent, waiting for NAK
    Handshaking,
    /// Handshake done, no command in flight
    Ready,
    /// A command is in flight
    Busy,
    /// Transport closed; terminal
    Closed,
}

impl ConnectionState {
    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Unconnected => 0,
            ConnectionState::Handshaking => 1,
            ConnectionState::Ready => 2,
            ConnectionState::Busy => 3,
            ConnectionState::Closed => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Unconnected,
            1 => ConnectionState::Handshaking,
            2 => ConnectionState::Ready,
            3 => ConnectionState::Busy,
            _ => ConnectionState::Closed,
        }
    }
}

/// State shared between the client handle and its IO task
#[derive(Debug, Clone)]
pub(crate) struct SharedState(Arc<AtomicU8>);

impl SharedState {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(
            ConnectionState::Unconnected.to_u8(),
        )))
    }

    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Move from `from` to `to`, or report the state actually found
    pub(crate) fn transition(
        &self,
        from: ConnectionState,
        to: ConnectionState,
    ) -> Result<(), ConnectionState> {
        self.0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ConnectionState::from_u8)
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Serial port name, used by [`ScaleClient::open`]
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Length of every handshake/ACK/response window in milliseconds
    pub timeout_ms: u64,
    /// Access code sent with the status request
    pub password: Vec<u8>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            password: DEFAULT_PASSWORD.to_vec(),
        }
    }
}

impl ClientConfig {
    /// Config for the given port with default settings
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Default::default()
        }
    }

    /// Stage timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load a JSON config file; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values can drive a connection
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be positive".into()));
        }
        if self.password.len() > MAX_PAYLOAD_LEN {
            return Err(ConfigError::Invalid(format!(
                "password is {} bytes, at most {} fit in a frame",
                self.password.len(),
                MAX_PAYLOAD_LEN
            )));
        }
        Ok(())
    }
}

/// Handle to a scale connection
///
/// Only one exchange runs at a time: a second `send_command` while one is in
/// flight fails with [`ProtocolError::Busy`] instead of queueing.
pub struct ScaleClient {
    state: SharedState,
    requests: mpsc::Sender<Request>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    password: Vec<u8>,
}

impl ScaleClient {
    /// Take ownership of a ready transport and start its IO task.
    ///
    /// The config is validated first. Must be called from within a tokio runtime.
    pub fn new<T>(transport: T, config: ClientConfig) -> Result<Self, ProtocolError>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        config.validate()?;

        let state = SharedState::new();
        let cancel = CancellationToken::new();
        let (requests, rx) = mpsc::channel(1);

        let io = IoTask::new(transport, rx, state.clone(), config.timeout(), cancel.clone());
        let task = tokio::spawn(io.run());

        Ok(Self {
            state,
            requests,
            cancel,
            task: Mutex::new(Some(task)),
            password: config.password,
        })
    }

    /// Open the configured serial port and wrap it
    pub fn open(config: ClientConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        let port = open_port(&config.port_name, Some(config.baud_rate))?;
        Self::new(port, config)
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Perform the ENQ/NAK handshake. Succeeds immediately if already initialized.
    pub async fn initialize(&self) -> Result<(), ProtocolError> {
        match self
            .state
            .transition(ConnectionState::Unconnected, ConnectionState::Handshaking)
        {
            Ok(()) => {}
            Err(ConnectionState::Handshaking) => return Err(ProtocolError::Busy),
            Err(ConnectionState::Closed) => return Err(ProtocolError::Closed),
            Err(_) => return Ok(()),
        }

        debug!("initialize: starting handshake");
        let (reply, rx) = oneshot::channel();
        self.dispatch(Request::Handshake { reply }, rx).await
    }

    /// Send a command and wait for the response frame
    pub async fn send_command(&self, command: u8, payload: &[u8]) -> Result<Frame, ProtocolError> {
        match self
            .state
            .transition(ConnectionState::Ready, ConnectionState::Busy)
        {
            Ok(()) => {}
            Err(ConnectionState::Unconnected) => return Err(ProtocolError::NotInitialized),
            Err(ConnectionState::Closed) => return Err(ProtocolError::Closed),
            Err(_) => return Err(ProtocolError::Busy),
        }

        let frame = match encode(command, payload) {
            Ok(frame) => frame,
            Err(e) => {
                let _ = self
                    .state
                    .transition(ConnectionState::Busy, ConnectionState::Ready);
                return Err(e.into());
            }
        };

        debug!("send_command: type {:#04x}, {} payload bytes", command, payload.len());
        let (reply, rx) = oneshot::channel();
        self.dispatch(Request::Command { frame, reply }, rx).await
    }

    /// Query the scale status with the configured access code
    pub async fn request_status(&self) -> Result<ScaleStatus, ProtocolError> {
        let frame = self.send_command(REQUEST_STATUS, &self.password).await?;
        Ok(ScaleStatus::from_frame(&frame)?)
    }

    /// Close the transport. Any exchange in flight fails with [`ProtocolError::Closed`].
    ///
    /// Safe to call repeatedly and from any state.
    pub async fn close(&self) {
        self.cancel.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("close: IO task ended abnormally: {}", e);
            }
        }
        self.state.set(ConnectionState::Closed);
    }

    async fn dispatch<R>(
        &self,
        request: Request,
        rx: oneshot::Receiver<Result<R, ProtocolError>>,
    ) -> Result<R, ProtocolError> {
        if self.requests.send(request).await.is_err() {
            self.state.set(ConnectionState::Closed);
            return Err(ProtocolError::Closed);
        }
        // A dropped reply means the IO task went away before answering.
        rx.await.unwrap_or(Err(ProtocolError::Closed))
    }
}

impl Drop for ScaleClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout(), Duration::from_millis(1000));
        assert_eq!(config.password, vec![0x00, 0x00, 0x03, 0x00]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_json() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"port_name": "/dev/ttyACM0", "timeout_ms": 250}"#).unwrap();
        assert_eq!(config.port_name, "/dev/ttyACM0");
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.password, DEFAULT_PASSWORD.to_vec());
    }

    #[test]
    fn test_config_validation() {
        let config = ClientConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ClientConfig {
            password: vec![0; MAX_PAYLOAD_LEN + 1],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_state_transitions() {
        let state = SharedState::new();
        assert_eq!(state.get(), ConnectionState::Unconnected);

        assert_eq!(
            state.transition(ConnectionState::Ready, ConnectionState::Busy),
            Err(ConnectionState::Unconnected)
        );
        assert!(state
            .transition(ConnectionState::Unconnected, ConnectionState::Handshaking)
            .is_ok());
        assert_eq!(state.get(), ConnectionState::Handshaking);

        state.set(ConnectionState::Closed);
        assert_eq!(state.get(), ConnectionState::Closed);
    }
}
