use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseButton, MouseEvent, MouseEventKind};

/// Roughly one display refresh.
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AimEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    Tick,
}

/// Source of terminal events (keyboard, mouse, resize)
pub trait AimEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AimEvent, RecvTimeoutError>;
}

/// Only left-button presses matter to the game; motion and release reports
/// are dropped so a moving mouse cannot flood the channel.
fn is_press(mouse: &MouseEvent) -> bool {
    matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left))
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<AimEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) => AimEvent::Key(key),
                Ok(CtEvent::Mouse(mouse)) if is_press(&mouse) => AimEvent::Mouse(mouse),
                Ok(CtEvent::Resize(w, h)) => AimEvent::Resize(w, h),
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AimEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AimEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn frame_rate() -> Self {
        Self::new(Duration::from_millis(FRAME_INTERVAL_MS))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AimEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AimEvent>) -> Self {
        Self { rx }
    }
}

impl AimEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AimEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time.
///
/// Ticks are due once per interval measured from the previous tick, so a
/// steady stream of input cannot starve the frame loop.
pub struct Runner<E: AimEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    last_tick: Instant,
}

impl<E: AimEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
            last_tick: Instant::now(),
        }
    }

    /// Blocks until the next tick is due and returns the next event, or Tick
    pub fn step(&mut self) -> AimEvent {
        let remaining = self.ticker.interval().saturating_sub(self.last_tick.elapsed());
        if remaining.is_zero() {
            self.last_tick = Instant::now();
            return AimEvent::Tick;
        }

        match self.event_source.recv_timeout(remaining) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                self.last_tick = Instant::now();
                AimEvent::Tick
            }
        }
    }
}
