/// One framed exchange on the SPI bus.
///
/// The transport owns the bus handle and borrows the line bank for
/// chip-select timing. Acquisition is scoped: chip select is asserted when
/// the guard is taken and restored high when it drops, so the deselect
/// happens on every exit path, error paths included.

use crate::control_lines::{ControlLines, Line};
use crate::error::LinkError;
use crate::frame::Frame;
use log::trace;
use rppal::gpio::Level;
use std::cell::Cell;

/// Byte-level bus operations the transport delegates to. Implemented for
/// `rppal::spi::Spi`; tests provide a scripted peer.
pub trait SpiBus {
    fn write(&mut self, data: &[u8]) -> Result<(), LinkError>;
    fn read(&mut self, buffer: &mut [u8]) -> Result<(), LinkError>;
}

impl SpiBus for rppal::spi::Spi {
    fn write(&mut self, data: &[u8]) -> Result<(), LinkError> {
        rppal::spi::Spi::write(self, data)?;
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), LinkError> {
        rppal::spi::Spi::read(self, buffer)?;
        Ok(())
    }
}

pub struct SpiTransport<B: SpiBus> {
    bus: B,
    in_use: Cell<bool>,
}

impl<B: SpiBus> SpiTransport<B> {
    pub fn new(bus: B) -> Self {
        SpiTransport {
            bus,
            in_use: Cell::new(false),
        }
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Write one frame and, when `expect_read` is given, read that many
    /// bytes back within the same chip-select window.
    pub fn exchange<L: ControlLines>(
        &mut self,
        lines: &mut L,
        frame: &Frame,
        expect_read: Option<usize>,
    ) -> Result<Option<Vec<u8>>, LinkError> {
        if self.in_use.get() {
            return Err(LinkError::BusContention);
        }
        self.in_use.set(true);
        let guard = BusGuard::select(lines, &self.in_use)?;

        let raw = frame.encode();
        trace!("spi write {:02x?}", raw);
        self.bus.write(&raw)?;

        let response = match expect_read {
            Some(len) => {
                let mut buffer = vec![0u8; len];
                self.bus.read(&mut buffer)?;
                trace!("spi read {:02x?}", buffer);
                Some(buffer)
            }
            None => None,
        };

        drop(guard);
        Ok(response)
    }
}

/// Holds chip select low for the duration of one exchange.
struct BusGuard<'a, L: ControlLines> {
    lines: &'a mut L,
    in_use: &'a Cell<bool>,
}

impl<'a, L: ControlLines> BusGuard<'a, L> {
    fn select(lines: &'a mut L, in_use: &'a Cell<bool>) -> Result<Self, LinkError> {
        if let Err(e) = lines.set(Line::ChipSelect, Level::Low) {
            in_use.set(false);
            return Err(e);
        }
        Ok(BusGuard { lines, in_use })
    }
}

impl<L: ControlLines> Drop for BusGuard<'_, L> {
    fn drop(&mut self) {
        // Deselect must survive an errored transfer; a failure to drive the
        // pin here is unreportable and the next exchange will surface it.
        let _ = self.lines.set(Line::ChipSelect, Level::High);
        self.in_use.set(false);
    }
}
