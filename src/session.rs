/// The session state machine: sequences the power sequencer, handshake
/// arbiter, transport, and status register into full command/response
/// cycles and owns the externally visible API.
///
/// One exchange walks: request to send, wait for the peer to raise
/// handshake, query status, push the payload in 4-byte chunks, signal
/// write-done, then the mirror cycle on the receive side before pulling the
/// response frame and acknowledging it.

use crate::config::{LinkConfig, TimingConfig};
use crate::control_lines::{ControlLines, GpioControlLines, Line};
use crate::error::{LinkError, ProtocolError};
use crate::frame::{Frame, CONTROL_FRAME_LEN, MAX_PAYLOAD};
use crate::handshake::{CancelHandle, Clock, HandshakeArbiter, SystemClock};
use crate::power;
use crate::status::{StatusFlags, STATUS_FRAME_LEN};
use crate::transport::{SpiBus, SpiTransport};
use log::{debug, info};
use rppal::gpio::{Gpio, Level};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    PoweredOff,
    PoweringOn,
    Idle,
    RequestingToSend,
    AwaitingHandshake,
    QueryingStatus,
    Transmitting,
    AwaitingPeerData,
    Receiving,
    Error,
}

pub struct Session<B: SpiBus, L: ControlLines, C: Clock> {
    transport: SpiTransport<B>,
    lines: L,
    arbiter: HandshakeArbiter<C>,
    handshake_timeout: Duration,
    state: SessionState,
    /// Peer sequence bit seen on the previous exchange; a repeat means the
    /// status frame is stale or duplicated.
    last_seq: Option<bool>,
    cancel: CancelHandle,
}

impl<B: SpiBus, L: ControlLines, C: Clock> Session<B, L, C> {
    pub fn new(bus: B, lines: L, clock: C, timing: &TimingConfig) -> Self {
        let cancel = CancelHandle::new();
        Session {
            transport: SpiTransport::new(bus),
            lines,
            arbiter: HandshakeArbiter::new(
                clock,
                Duration::from_micros(timing.poll_interval_us),
                cancel.clone(),
            ),
            handshake_timeout: Duration::from_millis(timing.handshake_timeout_ms),
            state: SessionState::PoweredOff,
            last_seq: None,
            cancel,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handle that aborts a pending handshake wait from another thread or a
    /// signal handler.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Bring the co-processor out of reset. A no-op when already `Idle`;
    /// refused mid-exchange or in `Error` (power off first).
    pub fn power_on(&mut self) -> Result<(), LinkError> {
        match self.state {
            SessionState::Idle => {
                debug!("power_on: already idle");
                Ok(())
            }
            SessionState::PoweredOff => {
                self.state = SessionState::PoweringOn;
                if let Err(e) = power::power_up(&mut self.lines) {
                    self.state = SessionState::PoweredOff;
                    return Err(e);
                }
                self.cancel.reset();
                self.last_seq = None;
                self.state = SessionState::Idle;
                Ok(())
            }
            state => Err(LinkError::SessionBusy(state)),
        }
    }

    /// Force the module down from any state, including mid-exchange and
    /// `Error`. A no-op when already `PoweredOff`.
    pub fn power_off(&mut self) -> Result<(), LinkError> {
        if self.state == SessionState::PoweredOff {
            debug!("power_off: already off");
            return Ok(());
        }
        self.state = SessionState::PoweredOff;
        self.last_seq = None;
        power::power_down(&mut self.lines)
    }

    /// One full command/response round trip. The payload is chunked into
    /// 4-byte frames; the returned bytes are the peer's response frame
    /// payload.
    pub fn send_command(&mut self, payload: &[u8]) -> Result<Vec<u8>, LinkError> {
        if self.state != SessionState::Idle {
            return Err(LinkError::SessionBusy(self.state));
        }
        info!("sending {} byte command", payload.len());
        let result = self.run_exchange(payload);
        self.state = match &result {
            Ok(_) => SessionState::Idle,
            // Precondition failures leave the peer untouched; the caller
            // may retry the whole command.
            Err(LinkError::PeerNotReady)
            | Err(LinkError::StaleSequence)
            | Err(LinkError::UnexpectedHandshakeState) => SessionState::Idle,
            Err(_) => SessionState::Error,
        };
        result
    }

    fn run_exchange(&mut self, payload: &[u8]) -> Result<Vec<u8>, LinkError> {
        // send path
        let status = self.request_status()?;
        if !status.ready_to_receive {
            return Err(LinkError::PeerNotReady);
        }
        self.state = SessionState::Transmitting;
        for (i, chunk) in payload.chunks(MAX_PAYLOAD).enumerate() {
            if i > 0 {
                self.state = SessionState::QueryingStatus;
                let status = self.query_status()?;
                if !status.ready_to_receive {
                    return Err(LinkError::PeerNotReady);
                }
                self.state = SessionState::Transmitting;
            }
            self.transport
                .exchange(&mut self.lines, &Frame::write_data(chunk)?, None)?;
        }
        self.transport
            .exchange(&mut self.lines, &Frame::write_done(), None)?;

        // receive path
        let status = self.request_status()?;
        if !status.ready_to_send {
            return Err(LinkError::PeerNotReady);
        }
        if let Some(prev) = self.last_seq {
            if status.sequence == prev {
                return Err(LinkError::StaleSequence);
            }
        }
        self.last_seq = Some(status.sequence);
        self.state = SessionState::AwaitingPeerData;
        // The pending-length indicator is unverified protocol arithmetic;
        // a zero reads as "take the whole frame".
        let take = match status.pending_len {
            0 => MAX_PAYLOAD,
            n => MAX_PAYLOAD.min(n as usize),
        };

        self.state = SessionState::Receiving;
        let raw = self
            .transport
            .exchange(&mut self.lines, &Frame::read_data(), Some(CONTROL_FRAME_LEN))?
            .ok_or(ProtocolError::Truncated {
                expected: CONTROL_FRAME_LEN,
                got: 0,
            })?;
        let response = raw[CONTROL_FRAME_LEN - MAX_PAYLOAD..][..take].to_vec();
        self.transport
            .exchange(&mut self.lines, &Frame::read_done(), None)?;

        debug!("received {} byte response", response.len());
        Ok(response)
    }

    /// Steps 1-3 of the cycle: request to send, wait for the handshake
    /// line, read back the status frame. Used verbatim on both the send and
    /// the receive side.
    fn request_status(&mut self) -> Result<StatusFlags, LinkError> {
        self.state = SessionState::RequestingToSend;
        if self.lines.get(Line::Handshake)? == Level::High {
            return Err(LinkError::UnexpectedHandshakeState);
        }
        self.transport
            .exchange(&mut self.lines, &Frame::write_request(), None)?;

        self.state = SessionState::AwaitingHandshake;
        self.arbiter
            .await_level(&self.lines, Level::High, self.handshake_timeout)?;

        self.state = SessionState::QueryingStatus;
        self.query_status()
    }

    fn query_status(&mut self) -> Result<StatusFlags, LinkError> {
        let raw = self
            .transport
            .exchange(&mut self.lines, &Frame::status_request(), Some(STATUS_FRAME_LEN))?
            .ok_or(ProtocolError::Truncated {
                expected: STATUS_FRAME_LEN,
                got: 0,
            })?;
        let status = StatusFlags::decode(&raw)?;
        debug!("peer status {:?}", status);
        Ok(status)
    }
}

impl Session<Spi, GpioControlLines, SystemClock> {
    /// Claim the configured pins and SPI bus and build a hardware-backed
    /// session in the `PoweredOff` state.
    pub fn open(config: &LinkConfig) -> Result<Self, LinkError> {
        let gpio = Gpio::new()?;
        let lines = GpioControlLines::new(&gpio, &config.pins)?;

        let bus = match config.spi.bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            other => {
                return Err(LinkError::HardwareFault(format!(
                    "unsupported spi bus {}",
                    other
                )))
            }
        };
        let slave_select = match config.spi.slave_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => {
                return Err(LinkError::HardwareFault(format!(
                    "unsupported slave select {}",
                    other
                )))
            }
        };
        let mode = match config.spi.mode {
            0 => Mode::Mode0,
            1 => Mode::Mode1,
            2 => Mode::Mode2,
            3 => Mode::Mode3,
            other => {
                return Err(LinkError::HardwareFault(format!(
                    "unsupported spi mode {}",
                    other
                )))
            }
        };
        let spi = Spi::new(bus, slave_select, config.spi.clock_hz, mode)?;

        Ok(Session::new(spi, lines, SystemClock::new(), &config.timing))
    }
}
