use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of monotonic timestamps in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock anchored at construction time.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for tests. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Handle for one scheduled frame. Only the most recently issued token is
/// honoured, and only while it has not been cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameToken(u64);

/// Frame scheduling state: which frame is pending and when the last one ran.
#[derive(Debug, Default)]
pub struct FrameLoop {
    generation: u64,
    pending: Option<FrameToken>,
    previous: Option<f64>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the next frame, superseding any token handed out before.
    pub fn request(&mut self) -> FrameToken {
        self.generation += 1;
        let token = FrameToken(self.generation);
        self.pending = Some(token);
        token
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<FrameToken> {
        self.pending
    }

    /// Consumes `token` if it is the frame currently scheduled.
    pub fn accept(&mut self, token: FrameToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Forgets the previous frame so the next delta starts from zero.
    pub fn reset_timing(&mut self) {
        self.previous = None;
    }

    /// Seconds since the previous frame. The first frame after a reset
    /// yields zero.
    pub fn delta(&mut self, timestamp: f64) -> f64 {
        let previous = self.previous.unwrap_or(timestamp);
        self.previous = Some(timestamp);
        ((timestamp - previous) / 1000.0).max(0.0)
    }
}
