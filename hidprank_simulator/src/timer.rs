//! Simulated tick sources and delays.
//!
//! [`ThreadTimer`] fires the tick handler from a background thread in (scaled)
//! real time, the way the hardware interrupt preempts the foreground.
//! [`VirtualTimer`] and [`VirtualDelay`] advance time only when the
//! foreground delays, which makes whole boot sessions deterministic in tests.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use hidprank_shared::{DelayMs, HardwareTimer, TickHandler};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const WAKE_PERIOD: Duration = Duration::from_millis(1);

// --- Virtual time ---

#[derive(Default)]
struct VirtualInner {
    handler: Mutex<Option<TickHandler>>,
    tick_hz: AtomicU32,
    masked: AtomicBool,
    pending: AtomicU64,
    fired: AtomicU64,
}

/// Timer whose ticks are injected explicitly, either by [`VirtualDelay`] or
/// by a test calling [`VirtualTimer::fire`].
#[derive(Clone, Default)]
pub struct VirtualTimer {
    inner: Arc<VirtualInner>,
}

impl std::fmt::Debug for VirtualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualTimer")
            .field("tick_hz", &self.tick_hz())
            .field("fired", &self.fired())
            .finish()
    }
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_hz(&self) -> u32 {
        self.inner.tick_hz.load(Ordering::Acquire)
    }

    /// Ticks delivered to the handler so far.
    pub fn fired(&self) -> u64 {
        self.inner.fired.load(Ordering::Acquire)
    }

    pub fn is_masked(&self) -> bool {
        self.inner.masked.load(Ordering::Acquire)
    }

    /// Raise `ticks` timer interrupts. Ticks raised while masked are held
    /// pending and delivered when the mask is lifted.
    pub fn fire(&self, ticks: u64) {
        if self.is_masked() {
            self.inner.pending.fetch_add(ticks, Ordering::AcqRel);
            return;
        }
        self.deliver(ticks);
    }

    fn deliver(&self, ticks: u64) {
        let handler = self
            .inner
            .handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(handler) = handler else {
            return;
        };
        for _ in 0..ticks {
            handler();
        }
        self.inner.fired.fetch_add(ticks, Ordering::AcqRel);
    }
}

impl HardwareTimer for VirtualTimer {
    fn start(&mut self, tick_hz: u32, handler: TickHandler) {
        self.inner.tick_hz.store(tick_hz, Ordering::Release);
        *self.inner.handler.lock().unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    fn critical_section<R>(&self, f: impl FnOnce() -> R) -> R {
        let was_masked = self.inner.masked.swap(true, Ordering::AcqRel);
        let result = f();
        self.inner.masked.store(was_masked, Ordering::Release);
        if !was_masked {
            let pending = self.inner.pending.swap(0, Ordering::AcqRel);
            if pending > 0 {
                self.deliver(pending);
            }
        }
        result
    }
}

/// Delay that advances a [`VirtualTimer`] instead of sleeping.
#[derive(Debug, Clone)]
pub struct VirtualDelay {
    timer: VirtualTimer,
    // Sub-tick remainder, in tick_hz * ms units
    carry: u64,
    elapsed_ms: u64,
}

impl VirtualDelay {
    pub fn new(timer: VirtualTimer) -> Self {
        Self { timer, carry: 0, elapsed_ms: 0 }
    }

    /// Total time spent in delays.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

impl DelayMs for VirtualDelay {
    fn delay_ms(&mut self, ms: u32) {
        let scaled = ms as u64 * self.timer.tick_hz() as u64 + self.carry;
        self.carry = scaled % 1000;
        self.elapsed_ms += ms as u64;
        self.timer.fire(scaled / 1000);
    }
}

// --- Real time ---

/// Timer backed by a thread that delivers ticks at `tick_hz * speed` per
/// wall-clock second. Ticks are delivered while holding the gate mutex, and
/// `critical_section` takes the same mutex, so a foreground read never
/// interleaves with a tick.
pub struct ThreadTimer {
    speed: f64,
    gate: Arc<Mutex<()>>,
    masked: AtomicBool,
    fired: Arc<AtomicU64>,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ThreadTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadTimer")
            .field("speed", &self.speed)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl ThreadTimer {
    /// `speed` is the simulated-to-real time ratio; 1.0 is real time.
    pub fn new(speed: f64) -> Self {
        Self {
            speed: if speed > 0.0 { speed } else { 1.0 },
            gate: Arc::new(Mutex::new(())),
            masked: AtomicBool::new(false),
            fired: Arc::new(AtomicU64::new(0)),
            stop: None,
            worker: None,
        }
    }

    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Acquire)
    }

    pub fn stop(&mut self) {
        // Dropping the sender disconnects the worker's receiver
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Timer thread panicked");
            }
        }
    }
}

impl HardwareTimer for ThreadTimer {
    fn start(&mut self, tick_hz: u32, handler: TickHandler) {
        self.stop();
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let gate = Arc::clone(&self.gate);
        let fired = Arc::clone(&self.fired);
        let rate = tick_hz as f64 * self.speed;
        tracing::debug!("Starting timer thread at {} Hz x{}", tick_hz, self.speed);

        let worker = std::thread::spawn(move || {
            let started = Instant::now();
            let mut delivered: u64 = 0;
            loop {
                match stop_rx.recv_timeout(WAKE_PERIOD) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
                let due = (started.elapsed().as_secs_f64() * rate) as u64;
                if due <= delivered {
                    continue;
                }
                let _gate = gate.lock().unwrap_or_else(|e| e.into_inner());
                for _ in delivered..due {
                    handler();
                }
                fired.fetch_add(due - delivered, Ordering::AcqRel);
                delivered = due;
            }
        });

        self.stop = Some(stop_tx);
        self.worker = Some(worker);
    }

    fn critical_section<R>(&self, f: impl FnOnce() -> R) -> R {
        if self.masked.swap(true, Ordering::AcqRel) {
            // Already masked by an enclosing section
            return f();
        }
        let result = {
            let _gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
            f()
        };
        self.masked.store(false, Ordering::Release);
        result
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Blocking delay in scaled real time.
#[derive(Debug, Clone, Copy)]
pub struct ScaledDelay {
    speed: f64,
}

impl ScaledDelay {
    pub fn new(speed: f64) -> Self {
        Self { speed: if speed > 0.0 { speed } else { 1.0 } }
    }
}

impl DelayMs for ScaledDelay {
    fn delay_ms(&mut self, ms: u32) {
        let real = Duration::from_secs_f64(ms as f64 / 1000.0 / self.speed);
        std::thread::sleep(real);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_handler() -> (TickHandler, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        let handler: TickHandler = Arc::new(move || {
            c.fetch_add(1, Ordering::Relaxed);
        });
        (handler, count)
    }

    #[test]
    fn test_virtual_delay_converts_ms_to_ticks() {
        let mut timer = VirtualTimer::new();
        let (handler, count) = counting_handler();
        timer.start(1000, handler);
        let mut delay = VirtualDelay::new(timer.clone());
        delay.delay_ms(250);
        assert_eq!(count.load(Ordering::Relaxed), 250);
        assert_eq!(timer.fired(), 250);
        assert_eq!(delay.elapsed_ms(), 250);
    }

    #[test]
    fn test_virtual_delay_carries_fractional_ticks() {
        let mut timer = VirtualTimer::new();
        let (handler, count) = counting_handler();
        timer.start(1, handler);
        let mut delay = VirtualDelay::new(timer);
        for _ in 0..4 {
            delay.delay_ms(500);
        }
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_masked_ticks_are_delivered_after_section() {
        let mut timer = VirtualTimer::new();
        let (handler, count) = counting_handler();
        timer.start(1000, handler);
        let seen = timer.critical_section(|| {
            timer.fire(3);
            count.load(Ordering::Relaxed)
        });
        assert_eq!(seen, 0);
        assert_eq!(count.load(Ordering::Relaxed), 3);
        assert!(!timer.is_masked());
    }

    #[test]
    fn test_thread_timer_ticks_and_stops() {
        let mut timer = ThreadTimer::new(1.0);
        let (handler, count) = counting_handler();
        timer.start(1000, handler);
        std::thread::sleep(Duration::from_millis(50));
        timer.stop();
        let after_stop = count.load(Ordering::Relaxed);
        assert!(after_stop > 0);
        assert_eq!(after_stop, timer.fired());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::Relaxed), after_stop);
    }
}
