/// The five discrete control lines of the link.
///
/// The handshake line is the odd one out: the host drives it during the
/// power-up sequence and reads it afterwards, so every line is held as an
/// `IoPin` whose direction can be switched at runtime. Callers are expected
/// to respect the documented sequencing; no timing is enforced here.

use crate::config::PinConfig;
use crate::error::LinkError;
use log::debug;
use rppal::gpio::{Gpio, IoPin, Level, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Handshake,
    Reset,
    Enable,
    Power,
    ChipSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Seam between the protocol layers and the physical pins. The production
/// implementation is [`GpioControlLines`]; tests substitute a recording
/// mock.
pub trait ControlLines {
    fn set(&mut self, line: Line, level: Level) -> Result<(), LinkError>;
    fn get(&self, line: Line) -> Result<Level, LinkError>;
    fn switch_direction(&mut self, line: Line, direction: Direction) -> Result<(), LinkError>;
}

/// Control-line bank over rppal GPIO.
pub struct GpioControlLines {
    handshake: IoPin,
    reset: IoPin,
    enable: IoPin,
    power: IoPin,
    chip_select: IoPin,
}

impl GpioControlLines {
    /// Claim the five pins and drive them to the inert pre-power state:
    /// everything output, reset held low, power off (high), chip deselected.
    pub fn new(gpio: &Gpio, pins: &PinConfig) -> Result<Self, LinkError> {
        let mut bank = GpioControlLines {
            handshake: gpio.get(pins.handshake)?.into_io(Mode::Output),
            reset: gpio.get(pins.reset)?.into_io(Mode::Output),
            enable: gpio.get(pins.enable)?.into_io(Mode::Output),
            power: gpio.get(pins.power)?.into_io(Mode::Output),
            chip_select: gpio.get(pins.chip_select)?.into_io(Mode::Output),
        };
        bank.handshake.write(Level::Low);
        bank.reset.write(Level::Low);
        bank.enable.write(Level::Low);
        bank.power.write(Level::High);
        bank.chip_select.write(Level::High);
        Ok(bank)
    }

    fn pin(&self, line: Line) -> &IoPin {
        match line {
            Line::Handshake => &self.handshake,
            Line::Reset => &self.reset,
            Line::Enable => &self.enable,
            Line::Power => &self.power,
            Line::ChipSelect => &self.chip_select,
        }
    }

    fn pin_mut(&mut self, line: Line) -> &mut IoPin {
        match line {
            Line::Handshake => &mut self.handshake,
            Line::Reset => &mut self.reset,
            Line::Enable => &mut self.enable,
            Line::Power => &mut self.power,
            Line::ChipSelect => &mut self.chip_select,
        }
    }
}

impl ControlLines for GpioControlLines {
    fn set(&mut self, line: Line, level: Level) -> Result<(), LinkError> {
        debug!("set {:?} {:?}", line, level);
        self.pin_mut(line).write(level);
        Ok(())
    }

    fn get(&self, line: Line) -> Result<Level, LinkError> {
        Ok(self.pin(line).read())
    }

    fn switch_direction(&mut self, line: Line, direction: Direction) -> Result<(), LinkError> {
        debug!("switch {:?} to {:?}", line, direction);
        let mode = match direction {
            Direction::Input => Mode::Input,
            Direction::Output => Mode::Output,
        };
        self.pin_mut(line).set_mode(mode);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Every mutation a caller performs on the bank, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum LineEvent {
        Set(Line, Level),
        Switch(Line, Direction),
    }

    /// Recording line bank. Reads of the handshake line pop from a scripted
    /// queue when one is provided, so tests can play the peer's side.
    pub(crate) struct MockLines {
        pub levels: RefCell<[Level; 5]>,
        pub directions: [Direction; 5],
        pub handshake_script: RefCell<VecDeque<Level>>,
        pub events: Vec<LineEvent>,
    }

    fn index(line: Line) -> usize {
        match line {
            Line::Handshake => 0,
            Line::Reset => 1,
            Line::Enable => 2,
            Line::Power => 3,
            Line::ChipSelect => 4,
        }
    }

    impl MockLines {
        /// Construction-time state mirroring `GpioControlLines::new`.
        pub fn new() -> Self {
            MockLines {
                levels: RefCell::new([
                    Level::Low,
                    Level::Low,
                    Level::Low,
                    Level::High,
                    Level::High,
                ]),
                directions: [Direction::Output; 5],
                handshake_script: RefCell::new(VecDeque::new()),
                events: Vec::new(),
            }
        }

        pub fn script_handshake(&mut self, reads: &[Level]) {
            self.handshake_script.borrow_mut().extend(reads.iter().copied());
        }

        pub fn level(&self, line: Line) -> Level {
            self.levels.borrow()[index(line)]
        }

        pub fn direction(&self, line: Line) -> Direction {
            self.directions[index(line)]
        }

        pub fn snapshot(&self) -> ([Level; 5], [Direction; 5]) {
            (*self.levels.borrow(), self.directions)
        }
    }

    impl ControlLines for MockLines {
        fn set(&mut self, line: Line, level: Level) -> Result<(), LinkError> {
            self.levels.borrow_mut()[index(line)] = level;
            self.events.push(LineEvent::Set(line, level));
            Ok(())
        }

        fn get(&self, line: Line) -> Result<Level, LinkError> {
            if line == Line::Handshake {
                if let Some(level) = self.handshake_script.borrow_mut().pop_front() {
                    return Ok(level);
                }
                // once the host has handed the line to the peer, an
                // unscripted peer idles low
                if self.directions[index(line)] == Direction::Input {
                    return Ok(Level::Low);
                }
            }
            Ok(self.levels.borrow()[index(line)])
        }

        fn switch_direction(&mut self, line: Line, direction: Direction) -> Result<(), LinkError> {
            self.directions[index(line)] = direction;
            self.events.push(LineEvent::Switch(line, direction));
            Ok(())
        }
    }
}
