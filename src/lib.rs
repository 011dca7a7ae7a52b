// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod arena;
pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod kinematics;
pub mod runtime;
pub mod session;
pub mod sound;
pub mod spawn;
pub mod time_series;
pub mod util;

pub use error::{FlickError, Result};
pub use session::{AimSession, ConfigOverrides, GameConfig, GameMode, GameState, GameStats};
