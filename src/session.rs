use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

use crate::clock::{Clock, FrameLoop, FrameToken};
use crate::error::{FlickError, Result};
use crate::kinematics::{self, GameArea, Movement, Target};
use crate::sound::{Cue, SoundSink};
use crate::spawn::Spawner;
use crate::util;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// Hit as many targets as possible before the clock runs out.
    #[default]
    TimeAttack,
    /// The run ends the instant `target_count` targets have been hit.
    Precision,
}

impl GameMode {
    pub fn next(self) -> Self {
        match self {
            GameMode::TimeAttack => GameMode::Precision,
            GameMode::Precision => GameMode::TimeAttack,
        }
    }
}

impl FromStr for GameMode {
    type Err = FlickError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "TIME_ATTACK" => Ok(GameMode::TimeAttack),
            "PRECISION" => Ok(GameMode::Precision),
            _ => Err(FlickError::UnknownMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum GameState {
    Idle,
    Playing,
    Finished,
}

/// Settings for one run; frozen once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub mode: GameMode,
    /// Time Attack length in seconds.
    pub duration: f64,
    /// Hits needed to finish a Precision run.
    pub target_count: u32,
    pub movement: Movement,
    /// Seconds before an untouched target disappears; 0 disables expiry.
    pub auto_dismiss_time: f64,
    /// Target radius in game-area units.
    pub target_size: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::TimeAttack,
            duration: 30.0,
            target_count: 20,
            movement: Movement::Static,
            auto_dismiss_time: 0.0,
            target_size: 30.0,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(FlickError::invalid("duration", "must be a positive number of seconds"));
        }
        if self.target_count == 0 {
            return Err(FlickError::invalid("target_count", "must be at least 1"));
        }
        if !(self.auto_dismiss_time.is_finite() && self.auto_dismiss_time >= 0.0) {
            return Err(FlickError::invalid("auto_dismiss_time", "must be zero or positive"));
        }
        if !(self.target_size.is_finite() && self.target_size > 0.0) {
            return Err(FlickError::invalid("target_size", "must be a positive radius"));
        }
        Ok(())
    }
}

/// Partial config applied on top of the session defaults by `start`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub mode: Option<GameMode>,
    pub duration: Option<f64>,
    pub target_count: Option<u32>,
    pub movement: Option<Movement>,
    pub auto_dismiss_time: Option<f64>,
    pub target_size: Option<f64>,
}

impl ConfigOverrides {
    pub fn apply(&self, base: &GameConfig) -> GameConfig {
        GameConfig {
            mode: self.mode.unwrap_or(base.mode),
            duration: self.duration.unwrap_or(base.duration),
            target_count: self.target_count.unwrap_or(base.target_count),
            movement: self.movement.unwrap_or(base.movement),
            auto_dismiss_time: self.auto_dismiss_time.unwrap_or(base.auto_dismiss_time),
            target_size: self.target_size.unwrap_or(base.target_size),
        }
    }
}

impl From<&GameConfig> for ConfigOverrides {
    fn from(cfg: &GameConfig) -> Self {
        Self {
            mode: Some(cfg.mode),
            duration: Some(cfg.duration),
            target_count: Some(cfg.target_count),
            movement: Some(cfg.movement),
            auto_dismiss_time: Some(cfg.auto_dismiss_time),
            target_size: Some(cfg.target_size),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameStats {
    pub score: u32,
    /// Hits plus misses.
    pub total_clicks: u32,
    /// Set by the first hit or miss, never by `start`.
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

impl GameStats {
    pub fn misses(&self) -> u32 {
        self.total_clicks - self.score
    }

    pub fn accuracy(&self) -> f64 {
        util::percentage(self.score as f64, self.total_clicks as f64)
    }

    /// Milliseconds between the first interaction and the end of the run.
    pub fn duration_ms(&self) -> f64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).max(0.0),
            _ => 0.0,
        }
    }
}

/// Summary of a finished run, ready to be written to history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub mode: GameMode,
    pub movement: Movement,
    pub score: u32,
    pub total_clicks: u32,
    pub accuracy: f64,
    pub duration_ms: f64,
    pub avg_time_per_target_ms: f64,
}

/// One aim-training session: owns the config, the live targets and the stats,
/// and drives them through Idle, Playing and Finished.
///
/// All mutation happens through `start`, `stop`, `reset`, `set_game_area`,
/// `on_target_hit`, `on_miss` and `on_frame`. Calls made in a state where they
/// make no sense are ignored.
pub struct AimSession {
    state: GameState,
    defaults: GameConfig,
    config: GameConfig,
    targets: Vec<Target>,
    stats: GameStats,
    elapsed: f64,
    hit_offsets: Vec<f64>,
    area: GameArea,
    frames: FrameLoop,
    spawner: Spawner,
    clock: Box<dyn Clock>,
    sound: Box<dyn SoundSink>,
}

impl std::fmt::Debug for AimSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AimSession")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("targets", &self.targets.len())
            .field("stats", &self.stats)
            .field("area", &self.area)
            .finish()
    }
}

impl AimSession {
    pub fn new<C, S>(defaults: GameConfig, clock: C, sound: S, spawner: Spawner) -> Self
    where
        C: Clock + 'static,
        S: SoundSink + 'static,
    {
        let mut sound: Box<dyn SoundSink> = Box::new(sound);
        sound.init();
        Self {
            state: GameState::Idle,
            config: defaults.clone(),
            defaults,
            targets: Vec::new(),
            stats: GameStats::default(),
            elapsed: 0.0,
            hit_offsets: Vec::new(),
            area: GameArea::default(),
            frames: FrameLoop::new(),
            spawner,
            clock: Box::new(clock),
            sound,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == GameState::Playing
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn defaults(&self) -> &GameConfig {
        &self.defaults
    }

    pub fn set_defaults(&mut self, defaults: GameConfig) {
        self.defaults = defaults;
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn area(&self) -> GameArea {
        self.area
    }

    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Seconds accumulated by the frame loop since the first interaction.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed
    }

    pub fn accuracy(&self) -> f64 {
        self.stats.accuracy()
    }

    /// Seconds left in a Time Attack run. The full duration is reported
    /// until the first interaction starts the clock.
    pub fn time_remaining(&self) -> Option<f64> {
        if self.config.mode != GameMode::TimeAttack {
            return None;
        }
        let used = match (self.stats.start_time, self.stats.end_time) {
            (Some(start), Some(end)) => (end - start) / 1000.0,
            (Some(start), None) => (self.now() - start) / 1000.0,
            (None, _) => 0.0,
        };
        Some((self.config.duration - used).max(0.0))
    }

    pub fn targets_remaining(&self) -> Option<u32> {
        match self.config.mode {
            GameMode::Precision => Some(self.config.target_count.saturating_sub(self.stats.score)),
            GameMode::TimeAttack => None,
        }
    }

    /// Seconds from the first interaction to each hit, in order.
    pub fn hit_offsets(&self) -> &[f64] {
        &self.hit_offsets
    }

    /// Mean and standard deviation of the gaps between consecutive hits.
    pub fn hit_interval_stats(&self) -> Option<(f64, f64)> {
        let intervals = util::intervals(&self.hit_offsets);
        Some((util::mean(&intervals)?, util::std_dev(&intervals)?))
    }

    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.frames.pending()
    }

    pub fn set_sound_volume(&mut self, volume: f64) {
        self.sound.set_volume(volume);
    }

    pub fn set_sound_muted(&mut self, muted: bool) {
        self.sound.set_muted(muted);
    }

    /// Begins a run from Idle or Finished. Overrides are merged onto the
    /// session defaults and validated before anything changes.
    pub fn start(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if self.state == GameState::Playing {
            debug!("start ignored: run already in progress");
            return Ok(());
        }

        let config = overrides.apply(&self.defaults);
        config.validate()?;

        self.config = config;
        self.targets.clear();
        self.stats = GameStats::default();
        self.elapsed = 0.0;
        self.hit_offsets.clear();
        self.frames.reset_timing();
        self.state = GameState::Playing;
        self.frames.request();

        info!(
            mode = %self.config.mode,
            movement = %self.config.movement,
            duration = self.config.duration,
            target_count = self.config.target_count,
            "run started"
        );

        let now = self.now();
        self.replenish(now);
        Ok(())
    }

    /// Ends a run in progress. Ignored unless Playing.
    pub fn stop(&mut self) {
        if self.state != GameState::Playing {
            return;
        }
        let now = self.now();
        self.finish(now);
    }

    /// Returns to Idle from any state, dropping targets and stats.
    pub fn reset(&mut self) {
        self.frames.cancel();
        self.frames.reset_timing();
        self.state = GameState::Idle;
        self.targets.clear();
        self.stats = GameStats::default();
        self.elapsed = 0.0;
        self.hit_offsets.clear();
        debug!("session reset");
    }

    /// Records the size of the surface the targets live on. Targets are not
    /// moved here; the next frame clamps every target, static ones included,
    /// against the new bounds.
    pub fn set_game_area(&mut self, width: f64, height: f64) {
        self.area = GameArea::new(width, height);
    }

    /// A pointer event landed on the target `id`.
    ///
    /// An id that is no longer live (expired in between) is registered as a
    /// miss, so every interaction is counted exactly once.
    pub fn on_target_hit(&mut self, id: u64) {
        if self.state != GameState::Playing {
            return;
        }
        let Some(idx) = self.targets.iter().position(|t| t.id == id) else {
            debug!(id, "hit on a target that is gone, counting as miss");
            self.on_miss();
            return;
        };

        let now = self.now();
        self.targets.remove(idx);
        self.stats.score += 1;
        self.stats.total_clicks += 1;
        let start = *self.stats.start_time.get_or_insert(now);
        self.hit_offsets.push((now - start) / 1000.0);
        self.sound.play(Cue::Shoot);
        self.sound.play(Cue::Hit);

        if self.config.mode == GameMode::Precision && self.stats.score >= self.config.target_count {
            self.finish(now);
            return;
        }
        self.replenish(now);
    }

    /// A pointer event landed on the background.
    pub fn on_miss(&mut self) {
        if self.state != GameState::Playing {
            return;
        }
        let now = self.now();
        self.stats.total_clicks += 1;
        self.stats.start_time.get_or_insert(now);
        self.sound.play(Cue::Shoot);
        self.sound.play(Cue::Miss);
    }

    /// Runs the pending frame at the current clock time, if one is scheduled.
    pub fn tick(&mut self) -> Option<FrameToken> {
        let token = self.frames.pending()?;
        let now = self.now();
        self.on_frame(token, now)
    }

    /// Executes one frame. `token` must be the frame currently scheduled;
    /// anything else (a frame issued before a stop or reset, or one already
    /// run) is ignored. Returns the token of the next frame while the run
    /// continues.
    pub fn on_frame(&mut self, token: FrameToken, timestamp: f64) -> Option<FrameToken> {
        if self.state != GameState::Playing || !self.frames.accept(token) {
            return None;
        }

        let dt = self.frames.delta(timestamp);
        if let Some(start) = self.stats.start_time {
            // the frame that straddles the first interaction only counts from it
            self.elapsed += dt.min(((timestamp - start) / 1000.0).max(0.0));
        }

        if let (GameMode::TimeAttack, Some(start)) = (self.config.mode, self.stats.start_time) {
            if (timestamp - start) / 1000.0 >= self.config.duration {
                self.finish(timestamp);
                return None;
            }
        }

        let expired = kinematics::step(
            &mut self.targets,
            self.config.movement,
            self.area,
            dt,
            timestamp,
        );
        if expired > 0 {
            debug!(expired, "targets expired");
        }

        self.replenish(timestamp);
        Some(self.frames.request())
    }

    /// Summary of the run once it has finished.
    pub fn result(&self) -> Option<SessionResult> {
        if self.state != GameState::Finished {
            return None;
        }
        let duration_ms = self.stats.duration_ms();
        let avg_time_per_target_ms = if self.stats.score > 0 {
            duration_ms / self.stats.score as f64
        } else {
            0.0
        };
        Some(SessionResult {
            mode: self.config.mode,
            movement: self.config.movement,
            score: self.stats.score,
            total_clicks: self.stats.total_clicks,
            accuracy: self.stats.accuracy(),
            duration_ms,
            avg_time_per_target_ms,
        })
    }

    fn finish(&mut self, at: f64) {
        self.frames.cancel();
        self.stats.end_time = Some(at);
        self.state = GameState::Finished;
        self.sound.play(Cue::Finish);
        info!(
            score = self.stats.score,
            total_clicks = self.stats.total_clicks,
            duration_ms = self.stats.duration_ms(),
            "run finished"
        );
    }

    fn replenish(&mut self, now: f64) {
        self.spawner
            .replenish(&mut self.targets, &self.config, self.area, now);
    }
}

impl Drop for AimSession {
    fn drop(&mut self) {
        self.sound.dispose();
    }
}
