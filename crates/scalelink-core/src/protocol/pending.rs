//! Response assembly for an in-flight command

use tracing::warn;

use super::{Frame, ProtocolError, STX};

/// Outcome of feeding a chunk to a [`PendingExchange`]
#[derive(Debug)]
pub enum Assembly {
    /// More bytes are needed before the frame is complete
    Incomplete,
    /// The exchange is resolved, successfully or not
    Complete(Result<Frame, ProtocolError>),
}

/// Accumulates the response bytes that follow an ACK until a whole frame is present
#[derive(Debug, Default)]
pub struct PendingExchange {
    buffer: Vec<u8>,
}

impl PendingExchange {
    /// Create an empty exchange buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes collected so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been collected yet
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append a chunk and test whether the frame is complete.
    ///
    /// The buffer is cleared whenever the exchange resolves.
    pub fn push(&mut self, chunk: &[u8]) -> Assembly {
        self.buffer.extend_from_slice(chunk);

        let first = match self.buffer.first() {
            Some(&b) => b,
            None => return Assembly::Incomplete,
        };

        if first != STX {
            self.buffer.clear();
            return Assembly::Complete(Err(ProtocolError::InvalidStart(first)));
        }

        if self.buffer.len() < 2 {
            return Assembly::Incomplete;
        }

        let expected = self.buffer[1] as usize + 3;
        if self.buffer.len() < expected {
            return Assembly::Incomplete;
        }

        if self.buffer.len() > expected {
            warn!(
                "Discarding {} bytes trailing the response frame: {:02x?}",
                self.buffer.len() - expected,
                &self.buffer[expected..]
            );
        }

        let result = Frame::from_bytes(&self.buffer[..expected]).map_err(ProtocolError::from);
        self.buffer.clear();
        Assembly::Complete(result)
    }
}
