//! Uptime clock driven by the periodic timer interrupt.
//!
//! The tick handler owns the write side of the counter; the foreground only
//! ever sees it through [`UptimeClock::now`], which reads inside the timer's
//! critical section so a 32-bit count is never observed half-updated on a
//! target whose native word is narrower.

use hidprank_shared::{HardwareTimer, StatusLed, TickHandler};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Timer ticks since power-on. Volatile; restarts at zero every boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uptime(pub u32);

impl Uptime {
    pub const ZERO: Uptime = Uptime(0);

    /// Uptime equivalent to `secs` seconds at `tick_hz`, saturating.
    pub fn from_secs(secs: u32, tick_hz: u32) -> Self {
        let ticks = secs as u64 * tick_hz as u64;
        Uptime(u32::try_from(ticks).unwrap_or(u32::MAX))
    }

    pub fn ticks(self) -> u32 {
        self.0
    }

    /// Whole seconds elapsed at `tick_hz`.
    pub fn as_secs(self, tick_hz: u32) -> u32 {
        if tick_hz == 0 {
            return 0;
        }
        self.0 / tick_hz
    }

    /// High and low 16-bit halves, as printed on the debug channel.
    pub fn halves(self) -> (u16, u16) {
        ((self.0 >> 16) as u16, (self.0 & 0xFFFF) as u16)
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hi, lo) = self.halves();
        write!(f, "0x{:04X}{:04X}", hi, lo)
    }
}

/// State mutated by the tick handler.
pub struct ClockState {
    ticks: AtomicU32,
    led: Arc<dyn StatusLed>,
}

impl fmt::Debug for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClockState")
            .field("ticks", &self.ticks.load(Ordering::Relaxed))
            .finish()
    }
}

impl ClockState {
    pub fn new(led: Arc<dyn StatusLed>) -> Self {
        Self { ticks: AtomicU32::new(0), led }
    }

    /// One timer interrupt: advance the counter and flip the status LED.
    ///
    /// The counter saturates instead of wrapping so uptime never appears to
    /// go backwards within a session.
    pub fn tick(&self) {
        // Err means the counter is already saturated
        self.ticks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| t.checked_add(1))
            .ok();
        self.led.toggle();
    }

    fn load(&self) -> Uptime {
        Uptime(self.ticks.load(Ordering::Acquire))
    }
}

/// The uptime clock: a [`ClockState`] bound to the hardware timer feeding it.
pub struct UptimeClock<T: HardwareTimer> {
    state: Arc<ClockState>,
    timer: T,
    tick_hz: u32,
}

impl<T: HardwareTimer> fmt::Debug for UptimeClock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UptimeClock")
            .field("state", &self.state)
            .field("tick_hz", &self.tick_hz)
            .finish()
    }
}

impl<T: HardwareTimer> UptimeClock<T> {
    /// Register the tick handler with `timer` and start it at `tick_hz`.
    pub fn start(mut timer: T, tick_hz: u32, led: Arc<dyn StatusLed>) -> Self {
        let state = Arc::new(ClockState::new(led));
        let isr_state = Arc::clone(&state);
        let handler: TickHandler = Arc::new(move || isr_state.tick());
        timer.start(tick_hz, handler);
        tracing::debug!("Uptime clock started at {} Hz", tick_hz);
        Self { state, timer, tick_hz }
    }

    /// Tear-free snapshot of the uptime counter.
    pub fn now(&self) -> Uptime {
        self.timer.critical_section(|| self.state.load())
    }

    /// Deliver one tick directly, as the timer interrupt would.
    pub fn tick(&self) {
        self.state.tick();
    }

    pub fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}
