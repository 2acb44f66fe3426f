/// Control-line sequencing that brings the co-processor out of reset and
/// back down again.
///
/// The power-on order matters: handshake is host-driven high while the
/// module boots, the chip is selected and power applied (low-active), and
/// only then does the host give up the handshake line and start reading it.
/// Readiness is not awaited here; callers go through the handshake arbiter
/// before the first exchange.

use crate::control_lines::{ControlLines, Direction, Line};
use crate::error::LinkError;
use log::info;
use rppal::gpio::Level;

pub fn power_up<L: ControlLines>(lines: &mut L) -> Result<(), LinkError> {
    info!("powering on wifi co-processor");

    lines.set(Line::Handshake, Level::High)?;
    lines.set(Line::Enable, Level::High)?;
    lines.set(Line::Reset, Level::High)?;

    lines.set(Line::ChipSelect, Level::Low)?;
    // power rail is low-active on this module
    lines.set(Line::Power, Level::Low)?;

    // the peer drives handshake from here on
    lines.switch_direction(Line::Handshake, Direction::Input)?;
    lines.set(Line::ChipSelect, Level::High)?;

    info!("power on sequence complete");
    Ok(())
}

/// Reverse of [`power_up`]: de-energize, hold the module in reset, and
/// return every line to the state it held before power-up.
pub fn power_down<L: ControlLines>(lines: &mut L) -> Result<(), LinkError> {
    info!("powering off wifi co-processor");

    lines.set(Line::Power, Level::High)?;
    lines.set(Line::Reset, Level::Low)?;
    lines.set(Line::Enable, Level::Low)?;

    lines.switch_direction(Line::Handshake, Direction::Output)?;
    lines.set(Line::Handshake, Level::Low)?;
    lines.set(Line::ChipSelect, Level::High)?;

    info!("power off sequence complete");
    Ok(())
}
