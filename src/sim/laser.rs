//! Auxiliary laser, online while repair is at or above the threshold

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::rocket::Rocket;
use super::timeline::{Continuation, Timeline};
use crate::tuning::LaserTuning;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Laser {
    /// Muzzle glow building up at the nose
    pub charging: bool,
    /// Fired and within its rearm period
    pub active: bool,
    /// Hit something; invisible until rearmed
    pub spent: bool,
    /// Centre of the bolt
    pub pos: Vec2,
    /// Unit travel direction
    pub dir: Vec2,
    /// Elapsed second of the last shot
    pub fired_at_secs: u64,
}

impl Laser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rearm after the cooldown and start a new charge when repair allows.
    /// Returns true when a charge began.
    pub fn ready_check(
        &mut self,
        seconds: u64,
        repair: u8,
        threshold: u8,
        tuning: &LaserTuning,
        timeline: &mut Timeline,
    ) -> bool {
        if self.active && seconds.saturating_sub(self.fired_at_secs) >= tuning.rearm_secs {
            self.active = false;
            self.spent = false;
        }
        if self.charging || self.active || repair < threshold {
            return false;
        }
        self.charging = true;
        timeline.schedule(tuning.charge_ms, Continuation::LaserCharged);
        true
    }

    /// Charge complete: leave the nose along the current facing
    pub fn on_charged(&mut self, rocket: &Rocket, seconds: u64) -> bool {
        if !self.charging {
            return false;
        }
        self.charging = false;
        self.active = true;
        self.spent = false;
        self.pos = rocket.tip();
        self.dir = rocket.facing();
        self.fired_at_secs = seconds;
        true
    }

    pub fn advance(&mut self, tuning: &LaserTuning) {
        if self.active && !self.spent {
            self.pos += self.dir * tuning.speed;
        }
    }

    /// Bolt hitbox while it is in flight
    pub fn hitbox(&self, tuning: &LaserTuning) -> Option<Rect> {
        (self.active && !self.spent).then(|| Rect::centered(self.pos, Vec2::splat(tuning.size)))
    }

    pub fn spend(&mut self) {
        self.spent = true;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charges_only_at_threshold() {
        let tuning = LaserTuning::default();
        let mut timeline = Timeline::new();
        let mut laser = Laser::new();
        assert!(!laser.ready_check(0, 7, 8, &tuning, &mut timeline));
        assert!(laser.ready_check(0, 8, 8, &tuning, &mut timeline));
        // Already charging
        assert!(!laser.ready_check(0, 12, 8, &tuning, &mut timeline));
        assert_eq!(timeline.advance(2000.0), vec![Continuation::LaserCharged]);
    }

    #[test]
    fn test_fires_from_nose_and_rearms() {
        let tuning = LaserTuning::default();
        let mut timeline = Timeline::new();
        let mut laser = Laser::new();
        let rocket = Rocket::new(Vec2::new(540.0, 960.0));

        laser.ready_check(3, 9, 8, &tuning, &mut timeline);
        assert!(laser.on_charged(&rocket, 5));
        assert_eq!(laser.pos, rocket.tip());
        laser.advance(&tuning);
        assert_eq!(laser.pos, rocket.tip() + Vec2::new(0.0, -30.0));

        laser.spend();
        assert!(laser.hitbox(&tuning).is_none());
        laser.advance(&tuning);
        assert_eq!(laser.pos, rocket.tip() + Vec2::new(0.0, -30.0));

        assert!(!laser.ready_check(6, 9, 8, &tuning, &mut timeline));
        assert!(laser.ready_check(7, 9, 8, &tuning, &mut timeline));
        assert!(!laser.active);
    }

    #[test]
    fn test_stale_charge_is_ignored() {
        let mut laser = Laser::new();
        let rocket = Rocket::new(Vec2::ZERO);
        assert!(!laser.on_charged(&rocket, 0));
        assert!(!laser.active);
    }
}
