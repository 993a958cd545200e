//! Player craft and its drag-steering integration

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::consts::{MIN_PATH_LENGTH, ROCKET_TIP_DISTANCE};
use crate::{facing_vector, normalize_angle};
use crate::tuning::{FieldTuning, RocketTuning};

/// Transition of the out-of-bounds flag after a move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsChange {
    Unchanged,
    Left,
    Entered,
}

/// The player's rocket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rocket {
    /// Sprite centre
    pub pos: Vec2,
    /// Sprite rotation (0 = nose up, clockwise positive)
    pub angle: f32,
    pub speed: f32,
    /// Ticks of sustained thrust, saturating at the tuning maximum
    pub acceleration: u32,
    /// Vector from the rocket to the last drag target
    pub path: Option<Vec2>,
    pub moving: bool,
    pub out_of_bounds: bool,
    pub alive: bool,
    /// Cosmetic spark bursts still to emit after a hit
    pub hit_sparks: u32,
}

impl Rocket {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            angle: 0.0,
            speed: 0.0,
            acceleration: 0,
            path: None,
            moving: false,
            out_of_bounds: false,
            alive: true,
            hit_sparks: 0,
        }
    }

    /// Unit vector along the nose
    pub fn facing(&self) -> Vec2 {
        facing_vector(self.angle)
    }

    /// Nose position, where lasers and blasts leave the craft
    pub fn tip(&self) -> Vec2 {
        self.pos + self.facing() * ROCKET_TIP_DISTANCE
    }

    pub fn hitbox(&self, tuning: &RocketTuning) -> Rect {
        Rect::centered(self.pos, Vec2::new(tuning.hitbox_width, tuning.hitbox_height))
    }

    /// Speed lost to a cold engine; shrinks as thrust is sustained
    fn acceleration_penalty(&self, max: u32) -> f32 {
        let quarter = (max / 4).max(1);
        match self.acceleration {
            a if a < quarter => 10.0,
            a if a < quarter * 2 => 8.0,
            a if a < quarter * 3 => 6.0,
            a if a < max => 3.0,
            _ => 0.0,
        }
    }

    /// Advance one tick.
    ///
    /// `target` is the drag point (None when released), `steady` the control
    /// noise for this tick, `time_ms` the level clock used for idle drift.
    pub fn steer(
        &mut self,
        target: Option<Vec2>,
        steady: u32,
        time_ms: f64,
        rng: &mut impl Rng,
        tuning: &RocketTuning,
    ) {
        let steady = steady as f32;
        match target {
            Some(target) => {
                self.moving = true;
                if self.acceleration < tuning.max_acceleration {
                    self.acceleration += 1;
                }
                let path = target - self.pos;
                self.path = Some(path);
                let penalty = self.acceleration_penalty(tuning.max_acceleration);

                let len = path.length();
                if len < MIN_PATH_LENGTH {
                    // Finger on the craft: no heading to follow
                    self.speed = 0.0;
                } else {
                    let facing = self.facing();
                    let theta = (facing.dot(path) / len).clamp(-1.0, 1.0).acos();
                    if theta >= tuning.align_threshold {
                        let turn = if path.x * facing.y < path.y * facing.x {
                            tuning.turn_step
                        } else {
                            -tuning.turn_step
                        };
                        self.angle = normalize_angle(self.angle + turn);
                        self.speed = (4.0 - steady / 4.0) - penalty + turn_band_bonus(theta) - (steady - 2.0);
                    } else {
                        self.speed = tuning.cruise_speed - steady - penalty;
                    }
                }

                self.pos += jitter(rng, steady);
                if len >= MIN_PATH_LENGTH {
                    self.pos += path / len * self.speed;
                }
            }
            None => {
                self.moving = false;
                self.acceleration = self.acceleration.saturating_sub(1);
                if self.speed > 0.0 {
                    self.speed = (self.speed - tuning.coast_decel).max(0.0);
                    if let Some(path) = self.path {
                        self.pos += path.normalize_or_zero() * self.speed;
                    }
                    self.pos += jitter(rng, steady);
                }
                self.pos += Vec2::new(time_ms.cos() as f32, time_ms.sin() as f32) * steady;
            }
        }
    }

    /// Update the out-of-bounds flag (the field edge itself counts as outside)
    pub fn check_bounds(&mut self, field: &FieldTuning) -> BoundsChange {
        let outside = self.pos.x <= 0.0
            || self.pos.y <= 0.0
            || self.pos.x >= field.width
            || self.pos.y >= field.height;
        match (outside, self.out_of_bounds) {
            (true, false) => {
                self.out_of_bounds = true;
                BoundsChange::Left
            }
            (false, true) => {
                self.out_of_bounds = false;
                BoundsChange::Entered
            }
            _ => BoundsChange::Unchanged,
        }
    }
}

/// Extra speed granted while turning; finer alignment earns more
fn turn_band_bonus(theta: f32) -> f32 {
    match theta {
        t if t >= 3.0 => 0.0,
        t if t >= 2.5 => 1.0,
        t if t >= 2.0 => 2.0,
        t if t >= 1.5 => 3.0,
        t if t >= 1.0 => 4.0,
        t if t >= 0.5 => 6.0,
        t if t >= 0.3 => 8.0,
        t if t >= 0.05 => 11.0,
        _ => 0.0,
    }
}

/// Choppy bump of `steady` pixels, same sign on both axes
fn jitter(rng: &mut impl Rng, steady: f32) -> Vec2 {
    if rng.random_bool(0.5) {
        Vec2::splat(steady)
    } else {
        Vec2::splat(-steady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn center() -> Vec2 {
        Vec2::new(540.0, 960.0)
    }

    #[test]
    fn test_tip_is_ahead_of_nose() {
        let rocket = Rocket::new(center());
        assert_eq!(rocket.tip(), Vec2::new(540.0, 860.0));
    }

    #[test]
    fn test_hitbox_is_centred() {
        let rocket = Rocket::new(center());
        let hitbox = rocket.hitbox(&RocketTuning::default());
        assert_eq!(hitbox.center(), center());
        assert_eq!(hitbox.width, 90.0);
        assert_eq!(hitbox.height, 150.0);
    }

    #[test]
    fn test_aligned_drag_moves_toward_target() {
        let tuning = RocketTuning::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut rocket = Rocket::new(center());
        let target = center() - Vec2::new(0.0, 5000.0);

        for _ in 0..tuning.max_acceleration {
            rocket.steer(Some(target), 0, 0.0, &mut rng, &tuning);
        }
        assert_eq!(rocket.acceleration, tuning.max_acceleration);
        assert_eq!(rocket.angle, 0.0);
        // Warm engine at zero noise cruises at full speed
        assert_eq!(rocket.speed, tuning.cruise_speed);
        assert!(rocket.pos.y < center().y);
        assert!((rocket.pos.x - center().x).abs() < 1e-3);
    }

    #[test]
    fn test_turns_toward_target_on_shorter_side() {
        let tuning = RocketTuning::default();
        let mut rng = Pcg32::seed_from_u64(1);

        let mut right = Rocket::new(center());
        right.steer(Some(center() + Vec2::new(400.0, 0.0)), 0, 0.0, &mut rng, &tuning);
        assert!(right.angle > 0.0);

        let mut left = Rocket::new(center());
        left.steer(Some(center() - Vec2::new(400.0, 0.0)), 0, 0.0, &mut rng, &tuning);
        assert!(left.angle < 0.0);
    }

    #[test]
    fn test_turning_speed_uses_band_bonus() {
        let tuning = RocketTuning::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut rocket = Rocket::new(center());
        rocket.acceleration = tuning.max_acceleration;
        // Target straight right: theta = pi/2 sits in the 1.5..2 band
        rocket.steer(Some(center() + Vec2::new(400.0, 0.0)), 0, 0.0, &mut rng, &tuning);
        assert_eq!(rocket.speed, 4.0 + 3.0 + 2.0);
    }

    #[test]
    fn test_release_coasts_to_a_stop() {
        let tuning = RocketTuning::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut rocket = Rocket::new(center());
        rocket.path = Some(Vec2::new(0.0, -1.0));
        rocket.speed = 1.0;
        rocket.acceleration = 5;

        rocket.steer(None, 0, 0.0, &mut rng, &tuning);
        assert_eq!(rocket.speed, 0.75);
        assert_eq!(rocket.acceleration, 4);
        assert!(!rocket.moving);
        for _ in 0..10 {
            rocket.steer(None, 0, 0.0, &mut rng, &tuning);
        }
        assert_eq!(rocket.speed, 0.0);
    }

    #[test]
    fn test_drag_on_top_of_rocket_is_safe() {
        let tuning = RocketTuning::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut rocket = Rocket::new(center());
        rocket.steer(Some(center()), 3, 0.0, &mut rng, &tuning);
        assert!(rocket.pos.is_finite());
        assert!(rocket.angle.is_finite());
        assert_eq!(rocket.speed, 0.0);
    }

    #[test]
    fn test_bounds_transitions() {
        let field = FieldTuning::default();
        let mut rocket = Rocket::new(center());
        assert_eq!(rocket.check_bounds(&field), BoundsChange::Unchanged);
        rocket.pos.x = -1.0;
        assert_eq!(rocket.check_bounds(&field), BoundsChange::Left);
        assert_eq!(rocket.check_bounds(&field), BoundsChange::Unchanged);
        rocket.pos.x = 0.0;
        assert!(rocket.out_of_bounds);
        rocket.pos.x = 10.0;
        assert_eq!(rocket.check_bounds(&field), BoundsChange::Entered);
    }

    #[test]
    fn test_band_bonus_table() {
        assert_eq!(turn_band_bonus(2.9), 1.0);
        assert_eq!(turn_band_bonus(0.4), 8.0);
        assert_eq!(turn_band_bonus(0.1), 11.0);
        assert_eq!(turn_band_bonus(3.1), 0.0);
    }
}
