use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tracing::{debug, warn};

/// Audible feedback requested by the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Shoot,
    Hit,
    Miss,
    Finish,
}

/// Audio backend handed to a session at construction.
///
/// `init` runs once before the first cue and `dispose` once when the owner
/// is done with it.
pub trait SoundSink {
    fn init(&mut self) {}
    fn play(&mut self, cue: Cue);
    fn set_volume(&mut self, _volume: f64) {}
    fn set_muted(&mut self, _muted: bool) {}
    fn dispose(&mut self) {}
}

/// Discards every cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSound;

impl SoundSink for NoopSound {
    fn play(&mut self, _cue: Cue) {}
}

/// Rings the terminal bell for hits and for the end of a run.
#[derive(Debug)]
pub struct TerminalBell<W: Write> {
    out: W,
    volume: f64,
    muted: bool,
    ready: bool,
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            volume: 0.5,
            muted: false,
            ready: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn audible(&self) -> bool {
        self.ready && !self.muted && self.volume > 0.0
    }
}

impl<W: Write> SoundSink for TerminalBell<W> {
    fn init(&mut self) {
        self.ready = true;
        debug!(volume = self.volume, muted = self.muted, "terminal bell ready");
    }

    fn play(&mut self, cue: Cue) {
        if !self.audible() {
            return;
        }
        if matches!(cue, Cue::Hit | Cue::Finish) {
            if let Err(e) = self.out.write_all(b"\x07").and_then(|_| self.out.flush()) {
                warn!(error = %e, "failed to ring terminal bell");
            }
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn dispose(&mut self) {
        self.ready = false;
    }
}

/// Keeps every cue it receives; clones share the log.
#[derive(Debug, Default, Clone)]
pub struct CueRecorder {
    cues: Rc<RefCell<Vec<Cue>>>,
    lifecycle: Rc<RefCell<Vec<&'static str>>>,
}

impl CueRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.cues.borrow().clone()
    }

    pub fn lifecycle(&self) -> Vec<&'static str> {
        self.lifecycle.borrow().clone()
    }
}

impl SoundSink for CueRecorder {
    fn init(&mut self) {
        self.lifecycle.borrow_mut().push("init");
    }

    fn play(&mut self, cue: Cue) {
        self.cues.borrow_mut().push(cue);
    }

    fn dispose(&mut self) {
        self.lifecycle.borrow_mut().push("dispose");
    }
}
