use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::kinematics::Movement;
use crate::session::{GameConfig, GameMode};

/// Preferences remembered between launches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mode: GameMode,
    pub duration: f64,
    pub target_count: u32,
    pub movement: Movement,
    pub auto_dismiss_secs: f64,
    pub target_size: f64,
    pub volume: f64,
    pub muted: bool,
}

impl Default for Config {
    fn default() -> Self {
        let game = GameConfig::default();
        Self {
            mode: game.mode,
            duration: game.duration,
            target_count: game.target_count,
            movement: game.movement,
            auto_dismiss_secs: game.auto_dismiss_time,
            target_size: game.target_size,
            volume: 0.5,
            muted: false,
        }
    }
}

impl Config {
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            mode: self.mode,
            duration: self.duration,
            target_count: self.target_count,
            movement: self.movement,
            auto_dismiss_time: self.auto_dismiss_secs,
            target_size: self.target_size,
        }
    }

    /// Copies the game settings from `game`, keeping sound preferences.
    pub fn with_game(&self, game: &GameConfig) -> Self {
        Self {
            mode: game.mode,
            duration: game.duration,
            target_count: game.target_count,
            movement: game.movement,
            auto_dismiss_secs: game.auto_dismiss_time,
            target_size: game.target_size,
            ..self.clone()
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("flick_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) if cfg.game_config().validate().is_ok() => cfg,
            Ok(_) => {
                warn!(path = %self.path.display(), "stored config out of range, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable config, using defaults");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
