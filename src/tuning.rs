//! Data-driven game balance
//!
//! Every constant the simulation consults lives here so difficulty can be tuned
//! (and tests can shrink pools or disable noise) without touching game logic.
//! Loaded from JSON; every section is `#[serde(default)]` so a tuning file only
//! needs the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a tuning table
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed tuning json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Play-field dimensions (screen pixels, y grows downward)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTuning {
    pub width: f32,
    pub height: f32,
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            width: 1080.0,
            height: 1920.0,
        }
    }
}

/// Rocket handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocketTuning {
    /// Collision box (about 45% of the 200px sprite width)
    pub hitbox_width: f32,
    pub hitbox_height: f32,
    /// Facing/heading angle below which the craft counts as aligned (radians)
    pub align_threshold: f32,
    /// Rotation applied per tick while turning toward the drag target
    pub turn_step: f32,
    /// Speed while aligned before noise and acceleration penalty
    pub cruise_speed: f32,
    /// Upper bound for the steady-controls draw (`random(0, base - repair)`)
    pub control_noise_base: u8,
    /// Ticks of sustained thrust until the acceleration penalty vanishes
    pub max_acceleration: u32,
    /// Per-tick speed loss while coasting
    pub coast_decel: f32,
}

impl Default for RocketTuning {
    fn default() -> Self {
        Self {
            hitbox_width: 90.0,
            hitbox_height: 150.0,
            align_threshold: 0.05,
            turn_step: 0.08 * 0.1_f32.cos(),
            cruise_speed: 16.0,
            control_noise_base: 16,
            max_acceleration: 120,
            coast_decel: 0.25,
        }
    }
}

/// Asteroid fields (play and title)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsteroidTuning {
    pub capacity: usize,
    pub title_capacity: usize,
    /// Spawn every `floor(spawn_divisor / (level + 1))` ticks
    pub spawn_divisor: u32,
    /// Sprite edge length; hitbox is `size / hitbox_ratio`
    pub size: f32,
    pub hitbox_ratio: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Lateral aim error added to the path toward the rocket
    pub path_variance: f32,
    /// How far past the perpendicular edges a spawn point may sit
    pub edge_spread: f32,
    /// Fade-out when the boss arrives before the field is cleared
    pub boss_fade_ms: f64,
}

impl Default for AsteroidTuning {
    fn default() -> Self {
        Self {
            capacity: 15,
            title_capacity: 8,
            spawn_divisor: 150,
            size: 150.0,
            hitbox_ratio: 1.2,
            min_speed: 8.0,
            max_speed: 18.0,
            path_variance: 200.0,
            edge_spread: 100.0,
            boss_fade_ms: 1500.0,
        }
    }
}

/// Boss encounter timing and behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    pub warning_secs: u64,
    pub spawn_secs: u64,
    pub width: f32,
    pub height: f32,
    /// Horizontal patrol speed (px per tick)
    pub patrol_speed: f32,
    pub warning_pulse_ms: f64,
    pub warning_pulses: u32,
    pub fade_in_ms: f64,
    pub fade_out_ms: f64,
    /// Backdrop fade between boss fade-out and the level-clear banner
    pub backdrop_fade_ms: f64,
    /// Level banner fade in + fade out
    pub banner_ms: f64,
    /// Minimum spacing between hits that count against boss health
    pub hit_cooldown_ms: f64,
    /// Body rectangle insets used for contact and shot tests
    pub inset_left: f32,
    pub inset_right: f32,
    pub contact_overhang: f32,
    pub shot_inset_bottom: f32,
    pub dark_energy_cooldown_secs: u64,
    /// Chance per eligible tick that a dark-energy shot is released
    pub dark_energy_fire_chance: f64,
    pub dark_energy_lifetime_ms: f64,
    pub dark_energy_size: f32,
    pub dark_energy_fall_speed: f32,
    pub dark_energy_sway: f32,
    /// Max horizontal correction per tick toward the rocket's last known x
    pub dark_energy_tracking: f32,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            warning_secs: 50,
            spawn_secs: 60,
            width: 422.0,
            height: 705.0,
            patrol_speed: 18.0,
            warning_pulse_ms: 750.0,
            warning_pulses: 5,
            fade_in_ms: 3000.0,
            fade_out_ms: 750.0,
            backdrop_fade_ms: 750.0,
            banner_ms: 4000.0,
            hit_cooldown_ms: 1000.0,
            inset_left: 70.0,
            inset_right: 20.0,
            contact_overhang: 10.0,
            shot_inset_bottom: 30.0,
            dark_energy_cooldown_secs: 1,
            dark_energy_fire_chance: 1999.0 / 2000.0,
            dark_energy_lifetime_ms: 3000.0,
            dark_energy_size: 100.0,
            dark_energy_fall_speed: 7.0,
            dark_energy_sway: 30.0,
            dark_energy_tracking: 3.0,
        }
    }
}

/// Power-up pickup and effect table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpTuning {
    /// Chance per elapsed second that a pickup is offered
    pub roll_chance: f64,
    /// Seconds an acquired power-up stays active
    pub duration_secs: u64,
    pub blast_capacity: usize,
    pub turret_capacity: usize,
    pub pickup_size: f32,
    pub pickup_spawn_ms: f64,
    pub pickup_fade_ms: f64,
    pub pickup_drift_ms: f64,
    pub obtain_ms: f64,
    pub charge_ms: f64,
    pub flight_ms: f64,
    pub flight_distance: f32,
    pub projectile_size: f32,
    pub force_field_radius: f32,
    pub force_field_shrink_ms: f64,
    pub double_repair_amount: u8,
    pub shockwave_width: f32,
    /// Visual scale of the shockwave sprite at the moment of the burst
    pub shockwave_scale: f32,
    pub shockwave_margin: f32,
    pub shockwave_ms: f64,
    pub turret_fade_ms: f64,
    pub turret_angle_offset: f32,
    /// Angular frequency of the turret sweep (radians per ms)
    pub turret_sweep_rate: f64,
    pub turret_sweep_amplitude: f32,
}

impl Default for PowerUpTuning {
    fn default() -> Self {
        Self {
            roll_chance: 0.2,
            duration_secs: 8,
            blast_capacity: 12,
            turret_capacity: 12,
            pickup_size: 180.0,
            pickup_spawn_ms: 300.0,
            pickup_fade_ms: 1000.0,
            pickup_drift_ms: 3000.0,
            obtain_ms: 600.0,
            charge_ms: 500.0,
            flight_ms: 1800.0,
            flight_distance: 3000.0,
            projectile_size: 100.0,
            force_field_radius: 75.0 + 180.0,
            force_field_shrink_ms: 1300.0,
            double_repair_amount: 2,
            shockwave_width: 50.0,
            shockwave_scale: 20.0,
            shockwave_margin: 75.0,
            shockwave_ms: 3000.0,
            turret_fade_ms: 500.0,
            turret_angle_offset: 1.15,
            turret_sweep_rate: 0.005,
            turret_sweep_amplitude: 4.0,
        }
    }
}

/// Repair economy thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairTuning {
    pub max: u8,
    /// Repair level at which the auxiliary laser comes online
    pub laser_threshold: u8,
    pub regen_interval_secs: i64,
    /// Starting repair is `max(start_base - level, start_floor)`
    pub start_base: u8,
    pub start_floor: u8,
}

impl Default for RepairTuning {
    fn default() -> Self {
        Self {
            max: 12,
            laser_threshold: 8,
            regen_interval_secs: 5,
            start_base: 6,
            start_floor: 2,
        }
    }
}

/// Damage per contact kind and the invincibility window it opens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageTuning {
    pub asteroid: u8,
    pub asteroid_window_ms: f64,
    pub boss_body: u8,
    pub boss_body_window_ms: f64,
    pub dark_energy: u8,
    pub dark_energy_window_ms: f64,
    pub out_of_bounds: u8,
}

impl Default for DamageTuning {
    fn default() -> Self {
        Self {
            asteroid: 2,
            asteroid_window_ms: 2000.0,
            boss_body: 2,
            boss_body_window_ms: 1000.0,
            dark_energy: 4,
            dark_energy_window_ms: 1000.0,
            out_of_bounds: 1,
        }
    }
}

/// Auxiliary laser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaserTuning {
    pub charge_ms: f64,
    /// Travel per tick once fired
    pub speed: f32,
    /// Seconds after firing before the next charge may start
    pub rearm_secs: u64,
    pub size: f32,
}

impl Default for LaserTuning {
    fn default() -> Self {
        Self {
            charge_ms: 2000.0,
            speed: 30.0,
            rearm_secs: 2,
            size: 100.0,
        }
    }
}

/// Complete balance table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Level a fresh session starts on
    pub start_level: u32,
    pub field: FieldTuning,
    pub rocket: RocketTuning,
    pub asteroids: AsteroidTuning,
    pub boss: BossTuning,
    pub power_ups: PowerUpTuning,
    pub repair: RepairTuning,
    pub damage: DamageTuning,
    pub laser: LaserTuning,
}

impl Tuning {
    /// Shipped balance (the game starts on level 1)
    pub fn standard() -> Self {
        Self {
            start_level: 1,
            ..Self::default()
        }
    }

    /// Parse a (possibly partial) tuning table and validate it
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load a tuning table from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Starting repair for a level: `max(start_base - level, start_floor)`
    pub fn starting_repair(&self, level: u32) -> u8 {
        let base = u32::from(self.repair.start_base);
        let start = base.saturating_sub(level).max(u32::from(self.repair.start_floor));
        start.min(u32::from(self.repair.max)) as u8
    }

    /// Reject tables the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> TuningError {
            TuningError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.field.width <= 0.0 || self.field.height <= 0.0 {
            return Err(invalid("field", "dimensions must be positive"));
        }
        if self.repair.max == 0 {
            return Err(invalid("repair.max", "must be at least 1"));
        }
        if self.repair.start_floor > self.repair.max {
            return Err(invalid(
                "repair.start_floor",
                crate::sim::SimError::OutOfRangeResource {
                    value: i64::from(self.repair.start_floor),
                    max: self.repair.max,
                }
                .to_string(),
            ));
        }
        if self.rocket.control_noise_base <= self.repair.max {
            return Err(invalid(
                "rocket.control_noise_base",
                "must exceed repair.max so the noise range is never empty",
            ));
        }
        if self.asteroids.spawn_divisor == 0 {
            return Err(invalid("asteroids.spawn_divisor", "must be positive"));
        }
        if self.asteroids.min_speed > self.asteroids.max_speed {
            return Err(invalid("asteroids.min_speed", "exceeds max_speed"));
        }
        if self.asteroids.hitbox_ratio <= 0.0 {
            return Err(invalid("asteroids.hitbox_ratio", "must be positive"));
        }
        if self.boss.warning_secs > self.boss.spawn_secs {
            return Err(invalid("boss.warning_secs", "warning must precede the spawn"));
        }
        for (field, p) in [
            ("power_ups.roll_chance", self.power_ups.roll_chance),
            ("boss.dark_energy_fire_chance", self.boss.dark_energy_fire_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(field, format!("{p} is not a probability")));
            }
        }
        if self.power_ups.flight_ms <= 0.0 {
            return Err(invalid("power_ups.flight_ms", "must be positive"));
        }
        Ok(())
    }
}
