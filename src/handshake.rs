/// Bounded wait for the peer-driven handshake line.
///
/// This is the only point in the driver that blocks on peer-controlled
/// state. The wait polls the line at a fixed interval against an injectable
/// clock, and checks a shared cancellation flag on every iteration so an
/// out-of-band power-off is observed as `Cancelled` instead of hanging
/// until the hardware timeout.

use crate::control_lines::{ControlLines, Line};
use crate::error::LinkError;
use log::warn;
use rppal::gpio::Level;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source for the poll loop. Production uses
/// [`SystemClock`]; tests advance a fake on demand.
pub trait Clock {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Cloneable handle that makes a pending handshake wait return
/// [`LinkError::Cancelled`]. Safe to trigger from a signal handler or
/// another thread.
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        CancelHandle(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HandshakeArbiter<C: Clock> {
    clock: C,
    poll_interval: Duration,
    cancel: CancelHandle,
}

impl<C: Clock> HandshakeArbiter<C> {
    pub fn new(clock: C, poll_interval: Duration, cancel: CancelHandle) -> Self {
        HandshakeArbiter {
            clock,
            poll_interval,
            cancel,
        }
    }

    /// Block until the handshake line reads `target`, the timeout elapses,
    /// or the cancel flag is raised.
    pub fn await_level<L: ControlLines>(
        &self,
        lines: &L,
        target: Level,
        timeout: Duration,
    ) -> Result<(), LinkError> {
        let deadline = self.clock.now() + timeout;
        loop {
            if self.cancel.is_cancelled() {
                return Err(LinkError::Cancelled);
            }
            if lines.get(Line::Handshake)? == target {
                return Ok(());
            }
            if self.clock.now() >= deadline {
                warn!("handshake did not reach {:?} within {:?}", target, timeout);
                return Err(LinkError::HandshakeTimeout(timeout));
            }
            self.clock.sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
pub(crate) mod fake_clock {
    use super::Clock;
    use std::cell::Cell;
    use std::time::Duration;

    /// Clock that only moves when the arbiter sleeps.
    pub(crate) struct FakeClock {
        elapsed: Cell<Duration>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            FakeClock {
                elapsed: Cell::new(Duration::ZERO),
            }
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Duration {
            self.elapsed.get()
        }

        fn sleep(&self, duration: Duration) {
            self.elapsed.set(self.elapsed.get() + duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake_clock::FakeClock;
    use super::*;
    use crate::control_lines::mock::MockLines;

    fn arbiter() -> HandshakeArbiter<FakeClock> {
        HandshakeArbiter::new(FakeClock::new(), Duration::from_millis(1), CancelHandle::new())
    }

    #[test]
    fn test_returns_once_line_reaches_target() {
        let mut lines = MockLines::new();
        lines.script_handshake(&[Level::Low, Level::Low, Level::High]);
        arbiter()
            .await_level(&lines, Level::High, Duration::from_millis(100))
            .unwrap();
    }

    #[test]
    fn test_times_out_when_line_never_moves() {
        let lines = MockLines::new();
        let err = arbiter()
            .await_level(&lines, Level::High, Duration::from_millis(5))
            .unwrap_err();
        assert_eq!(err, LinkError::HandshakeTimeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_cancel_flag_observed_before_polling() {
        let lines = MockLines::new();
        let cancel = CancelHandle::new();
        let arbiter =
            HandshakeArbiter::new(FakeClock::new(), Duration::from_millis(1), cancel.clone());
        cancel.cancel();
        let err = arbiter
            .await_level(&lines, Level::High, Duration::from_millis(100))
            .unwrap_err();
        assert_eq!(err, LinkError::Cancelled);
    }
}
