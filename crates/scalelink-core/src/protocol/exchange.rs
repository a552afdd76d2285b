//! IO task owning the transport
//!
//! Runs the handshake and command exchanges one at a time. Every stage
//! (ENQ write and wait, command write and ACK wait, response wait) gets its
//! own window of `timeout`, measured from the start of that stage.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{
    connection::{ConnectionState, SharedState},
    Assembly, Frame, PendingExchange, ProtocolError, ACK, ENQ, NAK,
};

const READ_CHUNK: usize = 256;

/// Work handed from the client handle to the IO task
pub(crate) enum Request {
    Handshake {
        reply: oneshot::Sender<Result<(), ProtocolError>>,
    },
    Command {
        frame: Vec<u8>,
        reply: oneshot::Sender<Result<Frame, ProtocolError>>,
    },
}

pub(crate) struct IoTask<T> {
    reader: ReadHalf<T>,
    writer: WriteHalf<T>,
    requests: mpsc::Receiver<Request>,
    state: SharedState,
    timeout: Duration,
    cancel: CancellationToken,
}

impl<T> IoTask<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub(crate) fn new(
        transport: T,
        requests: mpsc::Receiver<Request>,
        state: SharedState,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (reader, writer) = tokio::io::split(transport);
        Self {
            reader,
            writer,
            requests,
            state,
            timeout,
            cancel,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut buf = [0u8; READ_CHUNK];

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("IO task: close requested");
                    break;
                }

                request = self.requests.recv() => match request {
                    Some(request) => self.handle(request).await,
                    None => break,
                },

                read = self.reader.read(&mut buf) => match read {
                    Ok(0) => {
                        debug!("IO task: transport reached end of stream");
                        break;
                    }
                    Ok(n) => trace!("IO task: discarding {} idle bytes: {:02x?}", n, &buf[..n]),
                    Err(e) => {
                        warn!("IO task: transport read failed: {}", e);
                        break;
                    }
                },
            }
        }

        self.state.set(ConnectionState::Closed);

        // The transport may complain or stall while closing; that still counts as closed.
        match tokio::time::timeout(self.timeout, self.writer.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("IO task: transport reported an error on close: {}", e),
            Err(_) => debug!("IO task: transport did not finish closing within {:?}", self.timeout),
        }
    }

    async fn handle(&mut self, request: Request) {
        match request {
            Request::Handshake { reply } => {
                let result = self.handshake().await;
                let next = match &result {
                    Ok(()) => ConnectionState::Ready,
                    Err(ProtocolError::Closed) => ConnectionState::Closed,
                    Err(_) => ConnectionState::Unconnected,
                };
                self.state.set(next);
                let _ = reply.send(result);
            }
            Request::Command { frame, reply } => {
                let result = self.exchange(&frame).await;
                let next = match &result {
                    Err(ProtocolError::Closed) => ConnectionState::Closed,
                    _ => ConnectionState::Ready,
                };
                self.state.set(next);
                let _ = reply.send(result);
            }
        }
    }

    async fn handshake(&mut self) -> Result<(), ProtocolError> {
        trace!("handshake: sending ENQ");
        let deadline = Instant::now() + self.timeout;
        if !self.write(&[ENQ], deadline).await? {
            warn!("handshake: ENQ not accepted by the transport within {:?}", self.timeout);
            return Err(ProtocolError::HandshakeTimeout);
        }

        let chunk = match self.next_chunk(deadline).await? {
            Some(chunk) => chunk,
            None => {
                warn!("handshake: no answer to ENQ within {:?}", self.timeout);
                return Err(ProtocolError::HandshakeTimeout);
            }
        };

        match chunk[0] {
            NAK => {
                if chunk.len() > 1 {
                    trace!("handshake: ignoring {} bytes after NAK", chunk.len() - 1);
                }
                debug!("handshake: scale ready");
                Ok(())
            }
            other => {
                warn!("handshake: expected NAK, got {:#04x}", other);
                Err(ProtocolError::HandshakeRejected(other))
            }
        }
    }

    async fn exchange(&mut self, frame: &[u8]) -> Result<Frame, ProtocolError> {
        trace!("exchange: writing {:02x?}", frame);
        let deadline = Instant::now() + self.timeout;
        if !self.write(frame, deadline).await? {
            warn!("exchange: command not accepted by the transport within {:?}", self.timeout);
            return Err(ProtocolError::DeliveryTimeout);
        }

        let chunk = match self.next_chunk(deadline).await? {
            Some(chunk) => chunk,
            None => {
                warn!("exchange: no ACK within {:?}", self.timeout);
                return Err(ProtocolError::DeliveryTimeout);
            }
        };

        if chunk[0] != ACK {
            warn!("exchange: expected ACK, got {:#04x}", chunk[0]);
            return Err(ProtocolError::CommandRejected(chunk[0]));
        }
        trace!("exchange: ACK received");

        // Response window restarts at the ACK.
        let deadline = Instant::now() + self.timeout;
        let mut pending = PendingExchange::new();
        let mut assembly = pending.push(&chunk[1..]);

        loop {
            if let Assembly::Complete(result) = assembly {
                if let Ok(frame) = &result {
                    debug!(
                        "exchange: response type {:#04x}, {} payload bytes",
                        frame.command,
                        frame.payload.len()
                    );
                }
                return result;
            }

            let chunk = match self.next_chunk(deadline).await? {
                Some(chunk) => chunk,
                None => {
                    warn!(
                        "exchange: response incomplete after {:?} ({} bytes buffered)",
                        self.timeout,
                        pending.len()
                    );
                    return Err(ProtocolError::ResponseTimeout);
                }
            };
            assembly = pending.push(&chunk);
        }
    }

    /// Write and flush; `false` when the deadline passes before the transport takes the bytes
    async fn write(&mut self, bytes: &[u8], deadline: Instant) -> Result<bool, ProtocolError> {
        let writer = &mut self.writer;
        let write = async move {
            writer.write_all(bytes).await?;
            writer.flush().await
        };

        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Err(ProtocolError::Closed),

            written = tokio::time::timeout_at(deadline, write) => match written {
                Err(_) => Ok(false),
                Ok(result) => result.map(|()| true).map_err(ProtocolError::from),
            },
        }
    }

    /// Wait for the next non-empty chunk; `None` when the deadline passes first
    async fn next_chunk(&mut self, deadline: Instant) -> Result<Option<Vec<u8>>, ProtocolError> {
        let mut buf = [0u8; READ_CHUNK];

        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Err(ProtocolError::Closed),

            read = tokio::time::timeout_at(deadline, self.reader.read(&mut buf)) => match read {
                Err(_) => Ok(None),
                Ok(Ok(0)) => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "transport closed mid-exchange",
                )
                .into()),
                Ok(Ok(n)) => Ok(Some(buf[..n].to_vec())),
                Ok(Err(e)) => Err(e.into()),
            },
        }
    }
}
