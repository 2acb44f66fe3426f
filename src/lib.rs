/// SPI Wifi Link - host-side driver for an AT-over-SPI wifi co-processor
///
/// This library provides the framed command/response transport to an
/// ESP8285-class module: control-line power sequencing, handshake-driven
/// turn-taking, the status-flag sub-protocol, and the session state machine
/// that ties them into reliable request/response cycles.

pub mod config;
pub mod control_lines;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod power;
pub mod session;
pub mod status;
pub mod transport;

// Re-export main types for convenience
pub use config::LinkConfig;
pub use control_lines::{ControlLines, Direction, GpioControlLines, Line};
pub use error::{LinkError, ProtocolError};
pub use frame::{Frame, Opcode};
pub use handshake::{CancelHandle, Clock, HandshakeArbiter, SystemClock};
pub use session::{Session, SessionState};
pub use status::StatusFlags;
pub use transport::{SpiBus, SpiTransport};
