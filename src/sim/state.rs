//! Session-level state types
//!
//! Phases, events, and the repair economy shared by every component.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::DamageRule;
use super::powerup::PowerUpKind;
use crate::audio::{AudioCue, CueCommand};

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Idle asteroid field, waiting for start
    Title,
    /// A level is running
    Playing,
    /// Boss defeated, level banner showing
    LevelClear,
    /// Rocket destroyed
    GameOver,
}

/// Events for the session wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    Start,
    Restart,
    LevelAdvance { level: u32 },
    GameOver { victory: bool },
}

/// What destroyed an asteroid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestroyCause {
    Laser,
    RapidBlast,
    TurretBlast,
    ForceField,
    Shockwave,
}

/// Gameplay events for presentation (particles, labels) and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    AsteroidDestroyed { cause: DestroyCause },
    RocketDamaged { amount: u8, remaining: u8 },
    Repaired { repair: u8 },
    OutOfBounds { outside: bool },
    LaserFired,
    BossWarning,
    BossSpawned,
    BossHit { health: u32 },
    BossDefeated,
    DarkEnergyFired,
    PowerUpOffered,
    PowerUpCollected,
    PowerUpActivated { kind: PowerUpKind },
    PowerUpExpired { kind: PowerUpKind },
}

/// Side effects collected during a tick, flushed by the controller
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    pub cues: Vec<CueCommand>,
    pub events: Vec<GameEvent>,
}

impl Outbox {
    pub fn play(&mut self, cue: AudioCue) {
        self.cues.push(CueCommand::once(cue));
    }

    pub fn play_loop(&mut self, cue: AudioCue) {
        self.cues.push(CueCommand::looped(cue));
    }

    pub fn pause(&mut self, cue: AudioCue) {
        self.cues.push(CueCommand::Pause(cue));
    }

    pub fn stop(&mut self, cue: AudioCue) {
        self.cues.push(CueCommand::Stop(cue));
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

/// Result of applying damage to the rocket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Inside the invincibility window, or already destroyed
    Ignored,
    Applied { remaining: u8 },
    /// Repair reached zero with this hit
    Destroyed,
}

/// Repair progress: the rocket's health and its control-quality dial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairEconomy {
    value: u8,
    max: u8,
    /// Timeline time of the last damaging contact (None: never hit)
    last_hit_ms: Option<f64>,
    /// Elapsed second of the last passive repair
    prev_repair_secs: i64,
}

impl RepairEconomy {
    pub fn new(start: u8, max: u8) -> Self {
        Self {
            value: start.min(max),
            max,
            last_hit_ms: None,
            prev_repair_secs: -1,
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.value >= self.max
    }

    /// Displayed percentage, capped at 100
    pub fn percent(&self) -> u32 {
        (u32::from(self.value) * 100 / u32::from(self.max.max(1))).min(100)
    }

    /// Whether a hit at `now_ms` would fall inside the invincibility window
    pub fn is_invincible(&self, window_ms: f64, now_ms: f64) -> bool {
        self.last_hit_ms.is_some_and(|last| now_ms - last < window_ms)
    }

    /// Contact damage, gated by the invincibility window of the rule
    pub fn apply_damage(&mut self, rule: DamageRule, now_ms: f64) -> DamageOutcome {
        if self.value == 0 || self.is_invincible(rule.window_ms, now_ms) {
            return DamageOutcome::Ignored;
        }
        self.last_hit_ms = Some(now_ms);
        self.subtract(rule.amount)
    }

    /// Ungated drain (out-of-bounds penalty); does not open a window
    pub fn drain(&mut self, amount: u8) -> DamageOutcome {
        if self.value == 0 {
            return DamageOutcome::Ignored;
        }
        self.subtract(amount)
    }

    fn subtract(&mut self, amount: u8) -> DamageOutcome {
        self.value = self.value.saturating_sub(amount);
        if self.value == 0 {
            DamageOutcome::Destroyed
        } else {
            DamageOutcome::Applied {
                remaining: self.value,
            }
        }
    }

    /// Add repair, clamped at max; returns the amount actually gained
    pub fn repair(&mut self, amount: u8) -> u8 {
        let before = self.value;
        self.value = self.value.saturating_add(amount).min(self.max);
        self.value - before
    }

    /// Overwrite the value, clamping anything outside [0, max]
    pub fn set(&mut self, value: i64) {
        if value < 0 || value > i64::from(self.max) {
            log::debug!(
                "{}; clamped",
                super::SimError::OutOfRangeResource {
                    value,
                    max: self.max
                }
            );
        }
        self.value = value.clamp(0, i64::from(self.max)) as u8;
    }

    /// Passive repair: +1 every `interval` elapsed seconds while in bounds
    pub fn regen(&mut self, seconds: u64, in_bounds: bool, interval: i64) -> bool {
        let seconds = seconds as i64;
        if !in_bounds || self.is_full() || self.value == 0 || seconds - self.prev_repair_secs < interval {
            return false;
        }
        self.value += 1;
        self.prev_repair_secs = seconds;
        true
    }

    /// Per-tick control noise: `floor(random(0, base - repair))`, or 1 at full repair
    pub fn steady_controls(&self, rng: &mut impl Rng, noise_base: u8) -> u32 {
        if self.is_full() {
            return 1;
        }
        let span = f32::from(noise_base.saturating_sub(self.value));
        (rng.random::<f32>() * span).floor() as u32
    }
}
