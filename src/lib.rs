//! Rocket Repair - an asteroid-dodging arcade session
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pools, collisions, state machines, session tick)
//! - `tuning`: Data-driven game balance
//! - `audio`: Fire-and-forget sound cue seam
//! - `renderer`: Per-tick frame snapshots for an external presenter
//! - `platform`: Drag input sources

pub mod audio;
pub mod platform;
pub mod renderer;
pub mod sim;
pub mod tuning;

pub use sim::{SessionController, SessionEvent, SessionPhase};
pub use tuning::{Tuning, TuningError};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed frame step used by the native runner (60 Hz, in milliseconds)
    pub const FRAME_DT_MS: f32 = 1000.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Distance from rocket centre to its nose, used for muzzle positions
    pub const ROCKET_TIP_DISTANCE: f32 = 100.0;
    /// Tolerance below which a drag vector is treated as "on top of the rocket"
    pub const MIN_PATH_LENGTH: f32 = 0.001;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector a sprite rotated by `angle` points its nose along.
///
/// Sprites are drawn nose-up, so angle 0 faces -y in screen space and positive
/// angles turn clockwise.
#[inline]
pub fn facing_vector(angle: f32) -> Vec2 {
    Vec2::new(angle.sin(), -angle.cos())
}

/// Screen-space angle of a vector (atan2, radians)
#[inline]
pub fn vector_angle(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Unit vector for a screen-space angle
#[inline]
pub fn angle_vector(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize_angle_wraps() {
        // 3π lands on the ±π seam; either side of it is the same heading
        assert!((normalize_angle(3.0 * PI).abs() - PI).abs() < 1e-5);
        assert!((normalize_angle(2.5 * PI) - FRAC_PI_2).abs() < 1e-5);
        assert!((normalize_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_facing_vector_points_up_at_zero() {
        let f = facing_vector(0.0);
        assert!(f.x.abs() < 1e-6);
        assert!((f.y + 1.0).abs() < 1e-6);
        // A quarter turn clockwise faces +x
        let f = facing_vector(FRAC_PI_2);
        assert!((f.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_vector_angle_round_trips_angle_vector() {
        let theta = 0.7;
        assert!((vector_angle(angle_vector(theta)) - theta).abs() < 1e-6);
    }
}
