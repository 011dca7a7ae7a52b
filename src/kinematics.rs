use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::FlickError;

/// How live targets travel across the game area.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Movement {
    #[default]
    Static,
    /// Straight-line travel. Walls reflect it exactly like `Bounce` so targets
    /// never leave the field.
    Linear,
    Bounce,
}

impl Movement {
    pub fn is_moving(self) -> bool {
        !matches!(self, Movement::Static)
    }

    pub fn next(self) -> Self {
        match self {
            Movement::Static => Movement::Linear,
            Movement::Linear => Movement::Bounce,
            Movement::Bounce => Movement::Static,
        }
    }
}

impl FromStr for Movement {
    type Err = FlickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STATIC" => Ok(Movement::Static),
            "LINEAR" => Ok(Movement::Linear),
            "BOUNCE" => Ok(Movement::Bounce),
            _ => Err(FlickError::UnknownMovement(s.to_string())),
        }
    }
}

/// Size of the surface targets live on, supplied by whoever draws it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GameArea {
    pub width: f64,
    pub height: f64,
}

impl GameArea {
    pub fn new(width: f64, height: f64) -> Self {
        let sanitize = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            width: sanitize(width),
            height: sanitize(height),
        }
    }

    /// An area with no extent on either axis cannot hold targets.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Largest radius that still fits inside the area.
    pub fn max_radius(&self) -> f64 {
        self.width.min(self.height) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    /// units per second
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
    /// Monotonic timestamp (ms) at which the target appeared.
    pub created_at: f64,
    /// Milliseconds before the target vanishes on its own; 0 keeps it forever.
    pub lifespan: f64,
}

impl Target {
    pub fn is_expired(&self, now: f64) -> bool {
        self.lifespan > 0.0 && now - self.created_at > self.lifespan
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (dx, dy) = (x - self.x, y - self.y);
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// Moves a single target by `dt` seconds and reflects it off the walls.
///
/// Static targets do not move, but are still pulled back inside when the
/// area shrinks under them. An empty area means the bounds are not known
/// yet, so nothing is clamped.
pub fn advance(target: &mut Target, movement: Movement, area: GameArea, dt: f64) {
    if movement.is_moving() {
        target.x += target.vx * dt;
        target.y += target.vy * dt;
    }

    if area.is_empty() {
        return;
    }

    let (x, vx) = reflect(target.x, target.vx, target.radius, area.width);
    let (y, vy) = reflect(target.y, target.vy, target.radius, area.height);
    target.x = x;
    target.y = y;
    // Linear shares the wall treatment with Bounce.
    if movement.is_moving() {
        target.vx = vx;
        target.vy = vy;
    }
}

/// Elastic reflection along one axis. The velocity flips only when it points
/// into the wall that was reached.
fn reflect(pos: f64, vel: f64, radius: f64, extent: f64) -> (f64, f64) {
    let lo = radius;
    let hi = (extent - radius).max(lo);

    if pos <= lo {
        (lo, if vel < 0.0 { -vel } else { vel })
    } else if pos >= hi {
        (hi, if vel > 0.0 { -vel } else { vel })
    } else {
        (pos, vel)
    }
}

/// One kinematics pass over the live set: advances every target, then drops
/// those whose lifespan ran out at `now`. Returns how many expired.
///
/// Expiry is not a hit and not a miss; callers must not touch stats for it.
pub fn step(targets: &mut Vec<Target>, movement: Movement, area: GameArea, dt: f64, now: f64) -> usize {
    let before = targets.len();
    for target in targets.iter_mut() {
        if !target.is_expired(now) {
            advance(target, movement, area, dt);
        }
    }
    targets.retain(|t| !t.is_expired(now));
    before - targets.len()
}
