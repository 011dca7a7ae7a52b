use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::TAU;
use tracing::debug;

use crate::kinematics::{GameArea, Target};
use crate::session::{GameConfig, GameMode};

/// Targets kept on screen at once in Time Attack.
pub const TIME_ATTACK_CEILING: usize = 5;
/// Precision shows a single target at a time.
pub const PRECISION_CEILING: usize = 1;

/// Initial speed range for moving targets, units per second.
pub const MIN_SPEED: f64 = 100.0;
pub const MAX_SPEED: f64 = 200.0;

pub fn ceiling(mode: GameMode) -> usize {
    match mode {
        GameMode::TimeAttack => TIME_ATTACK_CEILING,
        GameMode::Precision => PRECISION_CEILING,
    }
}

/// Creates targets and hands out their ids.
#[derive(Debug)]
pub struct Spawner<R: Rng = StdRng> {
    rng: R,
    next_id: u64,
}

impl Spawner<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl Default for Spawner<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl<R: Rng> Spawner<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, next_id: 1 }
    }

    /// Builds one target at a uniformly random position inside `area`.
    /// Returns `None` while the area has no size yet.
    pub fn spawn(&mut self, config: &GameConfig, area: GameArea, now: f64) -> Option<Target> {
        if area.is_empty() {
            return None;
        }

        let radius = config.target_size.min(area.max_radius());
        let x = radius + self.rng.gen::<f64>() * (area.width - 2.0 * radius);
        let y = radius + self.rng.gen::<f64>() * (area.height - 2.0 * radius);

        let (vx, vy) = if config.movement.is_moving() {
            let speed = self.rng.gen_range(MIN_SPEED..MAX_SPEED);
            let angle = self.rng.gen_range(0.0..TAU);
            (angle.cos() * speed, angle.sin() * speed)
        } else {
            (0.0, 0.0)
        };

        let id = self.next_id;
        self.next_id += 1;

        Some(Target {
            id,
            x,
            y,
            vx,
            vy,
            radius,
            created_at: now,
            lifespan: config.auto_dismiss_time * 1000.0,
        })
    }

    /// Tops the live set up to the mode's ceiling. Returns how many targets
    /// were added; zero when there is no deficit or no area.
    pub fn replenish(
        &mut self,
        targets: &mut Vec<Target>,
        config: &GameConfig,
        area: GameArea,
        now: f64,
    ) -> usize {
        let mut spawned = 0;
        while targets.len() < ceiling(config.mode) {
            match self.spawn(config, area, now) {
                Some(target) => {
                    debug!(id = target.id, x = target.x, y = target.y, "spawned target");
                    targets.push(target);
                    spawned += 1;
                }
                None => break,
            }
        }
        spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::Movement;

    fn config(mode: GameMode, movement: Movement) -> GameConfig {
        GameConfig {
            mode,
            movement,
            ..GameConfig::default()
        }
    }

    const AREA: GameArea = GameArea {
        width: 640.0,
        height: 384.0,
    };

    #[test]
    fn ceilings_differ_by_mode() {
        assert_eq!(ceiling(GameMode::TimeAttack), 5);
        assert_eq!(ceiling(GameMode::Precision), 1);
    }

    #[test]
    fn spawn_is_noop_without_area() {
        let mut spawner = Spawner::seeded(1);
        let cfg = GameConfig::default();
        assert!(spawner.spawn(&cfg, GameArea::default(), 0.0).is_none());
        let mut targets = Vec::new();
        assert_eq!(spawner.replenish(&mut targets, &cfg, GameArea::new(0.0, 300.0), 0.0), 0);
        assert!(targets.is_empty());
    }

    #[test]
    fn positions_stay_inside_padded_area() {
        let mut spawner = Spawner::seeded(7);
        let cfg = GameConfig::default();
        for _ in 0..500 {
            let t = spawner.spawn(&cfg, AREA, 0.0).unwrap();
            assert!(t.x >= t.radius && t.x <= AREA.width - t.radius);
            assert!(t.y >= t.radius && t.y <= AREA.height - t.radius);
        }
    }

    #[test]
    fn static_targets_have_no_velocity() {
        let mut spawner = Spawner::seeded(3);
        let t = spawner
            .spawn(&config(GameMode::TimeAttack, Movement::Static), AREA, 0.0)
            .unwrap();
        assert_eq!((t.vx, t.vy), (0.0, 0.0));
    }

    #[test]
    fn moving_targets_get_speed_in_range() {
        let mut spawner = Spawner::seeded(11);
        for movement in [Movement::Linear, Movement::Bounce] {
            for _ in 0..200 {
                let t = spawner
                    .spawn(&config(GameMode::TimeAttack, movement), AREA, 0.0)
                    .unwrap();
                let speed = (t.vx * t.vx + t.vy * t.vy).sqrt();
                assert!(speed >= MIN_SPEED - 1e-9 && speed < MAX_SPEED + 1e-9);
            }
        }
    }

    #[test]
    fn lifespan_comes_from_auto_dismiss() {
        let mut spawner = Spawner::seeded(5);
        let cfg = GameConfig {
            auto_dismiss_time: 1.5,
            ..GameConfig::default()
        };
        let t = spawner.spawn(&cfg, AREA, 42.0).unwrap();
        assert_eq!(t.lifespan, 1500.0);
        assert_eq!(t.created_at, 42.0);
    }

    #[test]
    fn radius_is_capped_by_area() {
        let mut spawner = Spawner::seeded(5);
        let cfg = GameConfig {
            target_size: 500.0,
            ..GameConfig::default()
        };
        let t = spawner.spawn(&cfg, GameArea::new(100.0, 60.0), 0.0).unwrap();
        assert_eq!(t.radius, 30.0);
        assert_eq!(t.y, 30.0);
    }

    #[test]
    fn replenish_fills_to_ceiling_and_is_idempotent() {
        let mut spawner = Spawner::seeded(9);
        let cfg = config(GameMode::TimeAttack, Movement::Static);
        let mut targets = Vec::new();

        assert_eq!(spawner.replenish(&mut targets, &cfg, AREA, 0.0), 5);
        assert_eq!(spawner.replenish(&mut targets, &cfg, AREA, 0.0), 0);
        assert_eq!(targets.len(), 5);

        targets.remove(2);
        assert_eq!(spawner.replenish(&mut targets, &cfg, AREA, 0.0), 1);
        assert_eq!(targets.len(), 5);
    }

    #[test]
    fn precision_keeps_one_target() {
        let mut spawner = Spawner::seeded(9);
        let cfg = config(GameMode::Precision, Movement::Bounce);
        let mut targets = Vec::new();
        spawner.replenish(&mut targets, &cfg, AREA, 0.0);
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let mut spawner = Spawner::seeded(2);
        let cfg = GameConfig::default();
        let a = spawner.spawn(&cfg, AREA, 0.0).unwrap();
        let b = spawner.spawn(&cfg, AREA, 0.0).unwrap();
        assert_ne!(a.id, b.id);
    }
}
