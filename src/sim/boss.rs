//! Boss encounter state machine
//!
//! One boss instance lives for the whole session and is reset per level.
//! Transitions that are only valid from certain phases return
//! `InvalidStateTransition` instead of silently doing nothing.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::error::{SimError, SimResult};
use crate::tuning::{BossTuning, FieldTuning};

/// Boss phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossPhase {
    Dormant,
    /// Warning pulses before arrival
    Warning,
    /// Fading in, not yet interactive
    Spawning,
    Active,
    /// Health reached zero, fading out
    Defeated,
}

/// Result of a qualifying weapon contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossHit {
    /// Inside the hit cooldown
    Deflected,
    Damaged { health: u32 },
    Defeated,
}

/// The boss's falling projectile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DarkEnergy {
    pub active: bool,
    /// Centre
    pub pos: Vec2,
    /// Rocket x when the shot was released
    pub target_x: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    pub phase: BossPhase,
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub health: u32,
    pub moving_right: bool,
    pub dark_energy_ready: bool,
    pub dark_energy: DarkEnergy,
    /// Elapsed second of the last dark-energy release
    pub last_fired_secs: u64,
    last_hit_ms: Option<f64>,
}

impl Boss {
    pub fn new(level: u32, field: &FieldTuning, tuning: &BossTuning) -> Self {
        let mut boss = Self {
            phase: BossPhase::Dormant,
            pos: Vec2::ZERO,
            size: Vec2::new(tuning.width, tuning.height),
            health: 0,
            moving_right: false,
            dark_energy_ready: false,
            dark_energy: DarkEnergy::default(),
            last_fired_secs: 0,
            last_hit_ms: None,
        };
        boss.reset(level, field);
        boss
    }

    /// Back to dormant with `level + 1` health, parked top-centre
    pub fn reset(&mut self, level: u32, field: &FieldTuning) {
        self.phase = BossPhase::Dormant;
        self.pos = Vec2::new((field.width - self.size.x) / 2.0, 0.0);
        self.health = level + 1;
        self.moving_right = false;
        self.dark_energy_ready = false;
        self.dark_energy = DarkEnergy::default();
        self.last_fired_secs = 0;
        self.last_hit_ms = None;
    }

    /// Spawning, active or defeated: asteroid spawns and power-up rolls are off
    pub fn is_engaged(&self) -> bool {
        matches!(
            self.phase,
            BossPhase::Spawning | BossPhase::Active | BossPhase::Defeated
        )
    }

    pub fn begin_warning(&mut self) -> SimResult<()> {
        if self.phase != BossPhase::Dormant {
            return Err(SimError::transition("boss", self.phase, "begin_warning"));
        }
        self.phase = BossPhase::Warning;
        log::info!("Boss warning");
        Ok(())
    }

    pub fn begin_spawn(&mut self) -> SimResult<()> {
        if !matches!(self.phase, BossPhase::Dormant | BossPhase::Warning) {
            return Err(SimError::transition("boss", self.phase, "begin_spawn"));
        }
        self.phase = BossPhase::Spawning;
        log::info!("Boss spawning with {} health", self.health);
        Ok(())
    }

    /// Fade-in complete: the boss becomes interactive
    pub fn finish_spawn(&mut self) -> SimResult<()> {
        if self.phase != BossPhase::Spawning {
            return Err(SimError::transition("boss", self.phase, "finish_spawn"));
        }
        self.phase = BossPhase::Active;
        self.dark_energy_ready = true;
        Ok(())
    }

    /// Horizontal sweep, reversing at the field edges
    pub fn patrol(&mut self, field: &FieldTuning, tuning: &BossTuning) {
        if self.phase != BossPhase::Active {
            return;
        }
        if self.moving_right {
            self.pos.x += tuning.patrol_speed;
            if self.pos.x + self.size.x >= field.width {
                self.moving_right = false;
            }
        } else {
            self.pos.x -= tuning.patrol_speed;
            if self.pos.x <= 0.0 {
                self.moving_right = true;
            }
        }
    }

    /// Body rectangle the rocket can crash into
    pub fn contact_rect(&self, tuning: &BossTuning) -> Rect {
        let left = self.pos.x + tuning.inset_left;
        let right = self.pos.x + self.size.x - tuning.inset_right;
        Rect::new(
            left,
            self.pos.y,
            right - left,
            self.size.y + tuning.contact_overhang,
        )
    }

    /// Body rectangle weapons can hit
    pub fn shot_rect(&self, tuning: &BossTuning) -> Rect {
        let left = self.pos.x + tuning.inset_left;
        let right = self.pos.x + self.size.x - tuning.inset_right;
        Rect::new(
            left,
            self.pos.y,
            right - left,
            self.size.y - tuning.shot_inset_bottom,
        )
    }

    /// Register a laser or blast hit
    pub fn take_hit(&mut self, now_ms: f64, tuning: &BossTuning) -> SimResult<BossHit> {
        if self.phase != BossPhase::Active {
            return Err(SimError::transition("boss", self.phase, "take_hit"));
        }
        if self
            .last_hit_ms
            .is_some_and(|last| now_ms - last < tuning.hit_cooldown_ms)
        {
            return Ok(BossHit::Deflected);
        }

        self.last_hit_ms = Some(now_ms);
        self.health = self.health.saturating_sub(1);
        if self.health > 0 {
            return Ok(BossHit::Damaged {
                health: self.health,
            });
        }

        self.phase = BossPhase::Defeated;
        self.dark_energy_ready = false;
        self.dark_energy.active = false;
        log::info!("Boss defeated");
        Ok(BossHit::Defeated)
    }

    /// Cooldown elapsed, nothing in flight, boss interactive
    pub fn can_fire(&self, seconds: u64, tuning: &BossTuning) -> bool {
        self.phase == BossPhase::Active
            && self.dark_energy_ready
            && !self.dark_energy.active
            && seconds.saturating_sub(self.last_fired_secs) >= tuning.dark_energy_cooldown_secs
    }

    /// Release a dark-energy shot toward the rocket's current column
    pub fn fire_dark_energy(&mut self, seconds: u64, rocket_x: f32) -> SimResult<()> {
        if self.phase != BossPhase::Active || self.dark_energy.active {
            return Err(SimError::transition("boss", self.phase, "fire_dark_energy"));
        }
        self.last_fired_secs = seconds;
        self.dark_energy = DarkEnergy {
            active: true,
            pos: self.pos + Vec2::new(self.size.x / 2.0, self.size.y / 2.0 + 160.0),
            target_x: rocket_x,
        };
        Ok(())
    }

    /// Fall, sway, and drift toward the column the rocket was in
    pub fn advance_dark_energy(&mut self, time_ms: f64, tuning: &BossTuning) {
        let shot = &mut self.dark_energy;
        if !shot.active {
            return;
        }
        shot.pos.y += tuning.dark_energy_fall_speed;
        shot.pos.x += (time_ms * 0.0074).cos() as f32 * tuning.dark_energy_sway;
        let correction = (shot.target_x - shot.pos.x)
            .clamp(-tuning.dark_energy_tracking, tuning.dark_energy_tracking);
        shot.pos.x += correction;
    }

    pub fn expire_dark_energy(&mut self) {
        self.dark_energy.active = false;
    }

    pub fn dark_energy_rect(&self, tuning: &BossTuning) -> Option<Rect> {
        self.dark_energy.active.then(|| {
            Rect::centered(self.dark_energy.pos, Vec2::splat(tuning.dark_energy_size))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_boss(level: u32) -> (Boss, BossTuning, FieldTuning) {
        let tuning = BossTuning::default();
        let field = FieldTuning::default();
        let mut boss = Boss::new(level, &field, &tuning);
        boss.begin_spawn().unwrap();
        boss.finish_spawn().unwrap();
        (boss, tuning, field)
    }

    #[test]
    fn test_phase_sequence() {
        let tuning = BossTuning::default();
        let field = FieldTuning::default();
        let mut boss = Boss::new(0, &field, &tuning);
        assert_eq!(boss.health, 1);
        assert!(!boss.is_engaged());

        boss.begin_warning().unwrap();
        assert!(!boss.is_engaged());
        boss.begin_spawn().unwrap();
        assert!(boss.is_engaged());
        assert!(!boss.dark_energy_ready);
        boss.finish_spawn().unwrap();
        assert_eq!(boss.phase, BossPhase::Active);
        assert!(boss.dark_energy_ready);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let tuning = BossTuning::default();
        let field = FieldTuning::default();
        let mut boss = Boss::new(2, &field, &tuning);
        assert!(matches!(
            boss.finish_spawn(),
            Err(SimError::InvalidStateTransition { machine: "boss", .. })
        ));
        assert!(boss.take_hit(0.0, &tuning).is_err());
        assert!(boss.fire_dark_energy(5, 500.0).is_err());
        boss.begin_spawn().unwrap();
        assert!(boss.begin_warning().is_err());
        assert!(boss.begin_spawn().is_err());
    }

    #[test]
    fn test_health_decreases_until_defeat_once() {
        let (mut boss, tuning, _) = active_boss(2);
        assert_eq!(boss.health, 3);

        assert_eq!(boss.take_hit(0.0, &tuning).unwrap(), BossHit::Damaged { health: 2 });
        assert_eq!(boss.take_hit(500.0, &tuning).unwrap(), BossHit::Deflected);
        assert_eq!(boss.take_hit(1000.0, &tuning).unwrap(), BossHit::Damaged { health: 1 });
        assert_eq!(boss.take_hit(2000.0, &tuning).unwrap(), BossHit::Defeated);
        assert_eq!(boss.health, 0);
        assert_eq!(boss.phase, BossPhase::Defeated);
        // A defeated boss cannot be defeated again
        assert!(boss.take_hit(5000.0, &tuning).is_err());
    }

    #[test]
    fn test_patrol_reverses_at_edges() {
        let (mut boss, tuning, field) = active_boss(0);
        assert!(!boss.moving_right);
        let mut reversals = 0;
        let mut last = boss.moving_right;
        for _ in 0..200 {
            boss.patrol(&field, &tuning);
            assert!(boss.pos.x > -tuning.patrol_speed);
            assert!(boss.pos.x + boss.size.x < field.width + tuning.patrol_speed);
            if boss.moving_right != last {
                reversals += 1;
                last = boss.moving_right;
            }
        }
        assert!(reversals >= 2);
    }

    #[test]
    fn test_dark_energy_gating_and_flight() {
        let (mut boss, tuning, _) = active_boss(0);
        assert!(boss.can_fire(1, &tuning));
        boss.fire_dark_energy(1, 100.0).unwrap();
        assert!(!boss.can_fire(5, &tuning));
        assert!(boss.fire_dark_energy(5, 100.0).is_err());

        let start = boss.dark_energy.pos;
        boss.advance_dark_energy(0.0, &tuning);
        assert_eq!(boss.dark_energy.pos.y, start.y + tuning.dark_energy_fall_speed);
        assert!(boss.dark_energy_rect(&tuning).is_some());

        boss.expire_dark_energy();
        assert!(boss.dark_energy_rect(&tuning).is_none());
        assert!(!boss.can_fire(1, &tuning));
        assert!(boss.can_fire(2, &tuning));
    }

    #[test]
    fn test_contact_rect_insets() {
        let (boss, tuning, _) = active_boss(0);
        let contact = boss.contact_rect(&tuning);
        assert_eq!(contact.x, boss.pos.x + 70.0);
        assert_eq!(contact.right(), boss.pos.x + boss.size.x - 20.0);
        assert_eq!(contact.bottom(), boss.pos.y + boss.size.y + 10.0);
        assert_eq!(boss.shot_rect(&tuning).bottom(), boss.pos.y + boss.size.y - 30.0);
    }
}
