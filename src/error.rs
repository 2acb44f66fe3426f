use crate::session::SessionState;
use std::time::Duration;
use thiserror::Error;

/// Malformed traffic on the link. Fatal for the current session: framing is
/// not resumable once desynchronized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),
    #[error("frame truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("payload of {0} bytes exceeds the 4-byte frame limit")]
    PayloadTooLong(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Underlying pin or bus I/O failed. Power-cycle the module before reuse.
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    /// Peer did not raise the handshake line within the configured bound.
    #[error("timed out after {0:?} waiting for handshake")]
    HandshakeTimeout(Duration),
    /// The wait was cancelled through a `CancelHandle`.
    #[error("operation cancelled")]
    Cancelled,
    /// Handshake line was already asserted when the host tried to initiate.
    #[error("handshake line asserted before request to send")]
    UnexpectedHandshakeState,
    /// Peer status frame did not report the readiness the exchange needs.
    #[error("peer not ready")]
    PeerNotReady,
    /// Peer sequence bit did not advance; the status frame is stale or a
    /// retransmission.
    #[error("stale peer sequence bit")]
    StaleSequence,
    /// A second exchange tried to acquire the bus while one was in flight.
    #[error("spi bus already in use")]
    BusContention,
    /// The session cannot accept this call in its current state.
    #[error("session not idle (state {0:?})")]
    SessionBusy(SessionState),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<rppal::gpio::Error> for LinkError {
    fn from(e: rppal::gpio::Error) -> Self {
        LinkError::HardwareFault(e.to_string())
    }
}

impl From<rppal::spi::Error> for LinkError {
    fn from(e: rppal::spi::Error) -> Self {
        LinkError::HardwareFault(e.to_string())
    }
}
