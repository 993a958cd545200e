//! Asteroid fields
//!
//! A field owns one pool and decides when to spawn, how asteroids move, and
//! when a pooled asteroid has finished its pass and goes back to the pool.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::{Rect, within_radius};
use super::error::SimResult;
use super::pool::{EntityPool, Handle};
use super::rocket::Rocket;
use crate::tuning::{AsteroidTuning, FieldTuning};
use crate::vector_angle;

/// Where a field aims new asteroids
pub trait RocketPosition {
    fn rocket_position(&self) -> Vec2;
}

impl RocketPosition for Rocket {
    fn rocket_position(&self) -> Vec2 {
        self.pos
    }
}

impl RocketPosition for Vec2 {
    fn rocket_position(&self) -> Vec2 {
        *self
    }
}

/// A pooled asteroid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Asteroid {
    /// Sprite centre
    pub pos: Vec2,
    /// Screen-space travel angle (atan2 of the path)
    pub heading: f32,
    pub speed: f32,
    pub hitbox_size: f32,
    /// Entered the field at least once
    pub on_screen: bool,
    /// Left the field after entering it
    pub moved_across_screen: bool,
    /// Has struck the rocket
    pub collided: bool,
    /// Fading out ahead of the boss; frozen and harmless
    pub fading: bool,
}

impl Asteroid {
    pub fn hitbox(&self) -> Rect {
        Rect::centered(self.pos, Vec2::splat(self.hitbox_size))
    }

    /// Move one tick; returns true on the tick the asteroid first enters the field
    pub fn advance(&mut self, field: &FieldTuning) -> bool {
        self.pos += Vec2::new(self.heading.cos(), self.heading.sin()) * self.speed;

        let inside = self.pos.x > 0.0
            && self.pos.x < field.width
            && self.pos.y > 0.0
            && self.pos.y <= field.height;
        let entered = inside && !self.on_screen;
        if entered {
            self.on_screen = true;
        }

        let outside = self.pos.x > field.width
            || self.pos.x < 0.0
            || self.pos.y > field.height
            || self.pos.y < 0.0;
        if outside && self.on_screen && !self.moved_across_screen {
            self.moved_across_screen = true;
        }
        entered
    }

    /// Fully past the field by a hitbox-sized margin after a complete pass
    pub fn is_spent(&self, field: &FieldTuning) -> bool {
        let margin = self.hitbox_size;
        self.moved_across_screen
            && (self.pos.x > field.width + margin
                || self.pos.x < -margin
                || self.pos.y > field.height + margin
                || self.pos.y < -margin)
    }
}

/// Per-tick summary of field movement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldStep {
    pub entered: usize,
    pub retired: usize,
}

/// Pool-backed asteroid field
#[derive(Debug, Clone)]
pub struct AsteroidField {
    pool: EntityPool<Asteroid>,
    spawn_divisor: u32,
    /// Spawn interval shrinks with level (play field) or stays fixed (title field)
    level_scaled: bool,
}

impl AsteroidField {
    pub fn new(name: &'static str, capacity: usize, spawn_divisor: u32, level_scaled: bool) -> Self {
        Self {
            pool: EntityPool::new(name, capacity),
            spawn_divisor,
            level_scaled,
        }
    }

    /// Field used while a level runs
    pub fn play(tuning: &AsteroidTuning) -> Self {
        Self::new("asteroids", tuning.capacity, tuning.spawn_divisor, true)
    }

    /// Idle field behind the title
    pub fn title(tuning: &AsteroidTuning) -> Self {
        Self::new("title asteroids", tuning.title_capacity, tuning.spawn_divisor, false)
    }

    /// Ticks between spawns: `floor(divisor / (level + 1))`, at least 1
    pub fn spawn_interval(&self, level: u32) -> u64 {
        if self.level_scaled {
            (u64::from(self.spawn_divisor) / (u64::from(level) + 1)).max(1)
        } else {
            u64::from(self.spawn_divisor).max(1)
        }
    }

    pub fn should_spawn(&self, tick: u64, level: u32) -> bool {
        tick % self.spawn_interval(level) == 0 && !self.pool.is_full()
    }

    /// Spawn half a field beyond a random edge, aimed near `target`
    pub fn spawn(
        &mut self,
        target: &impl RocketPosition,
        rng: &mut impl Rng,
        field: &FieldTuning,
        tuning: &AsteroidTuning,
    ) -> SimResult<Handle> {
        let (w, h) = (field.width, field.height);
        let spread = tuning.edge_spread;
        let pos = match rng.random_range(0..4) {
            0 => Vec2::new(-w / 2.0, rng.random_range(-spread..h + spread)),
            1 => Vec2::new(rng.random_range(-spread..w + spread), -h / 2.0),
            2 => Vec2::new(w * 1.5, rng.random_range(-spread..h + spread)),
            _ => Vec2::new(rng.random_range(-spread..w + spread), h * 1.5),
        };

        let mut variance = (rng.random::<f32>() * tuning.path_variance).floor();
        if rng.random_bool(0.5) {
            variance = -variance;
        }
        let path = target.rocket_position() - pos + Vec2::splat(variance);
        let speed = if tuning.max_speed > tuning.min_speed {
            rng.random_range(tuning.min_speed..tuning.max_speed)
        } else {
            tuning.min_speed
        };

        self.pool.spawn(Asteroid {
            pos,
            heading: vector_angle(path),
            speed,
            hitbox_size: tuning.size / tuning.hitbox_ratio,
            ..Default::default()
        })
    }

    /// Move every live asteroid and retire the ones that finished their pass
    pub fn advance(&mut self, field: &FieldTuning) -> FieldStep {
        let mut step = FieldStep::default();
        for handle in self.pool.handles() {
            let Some(asteroid) = self.pool.get_mut(handle) else {
                continue;
            };
            if asteroid.fading {
                continue;
            }
            if asteroid.advance(field) {
                step.entered += 1;
            }
            if asteroid.is_spent(field) && self.pool.release(handle).is_ok() {
                step.retired += 1;
            }
        }
        step
    }

    pub fn destroy(&mut self, handle: Handle) -> SimResult<()> {
        self.pool.release(handle)
    }

    /// Destroy every asteroid whose centre lies within `radius` of `center`
    pub fn destroy_within(&mut self, center: Vec2, radius: f32, only_on_screen: bool) -> usize {
        let doomed: Vec<Handle> = self
            .pool
            .iter()
            .filter(|(_, a)| !a.fading && (!only_on_screen || a.on_screen))
            .filter(|(_, a)| within_radius(a.pos, center, radius))
            .map(|(h, _)| h)
            .collect();
        doomed
            .into_iter()
            .filter(|h| self.pool.release(*h).is_ok())
            .count()
    }

    /// Hitboxes of asteroids that can still collide
    pub fn hitboxes(&self, only_on_screen: bool) -> Vec<(Handle, Rect)> {
        self.pool
            .iter()
            .filter(|(_, a)| !a.fading && (!only_on_screen || a.on_screen))
            .map(|(h, a)| (h, a.hitbox()))
            .collect()
    }

    /// Freeze every asteroid for a fade-out
    pub fn begin_fade(&mut self) -> usize {
        self.pool.for_each_mut(|_, a| a.fading = true);
        self.pool.active_count()
    }

    pub fn release_all(&mut self) -> usize {
        self.pool.release_all()
    }

    pub fn get(&self, handle: Handle) -> Option<&Asteroid> {
        self.pool.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Asteroid> {
        self.pool.get_mut(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Asteroid)> + '_ {
        self.pool.iter()
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimError;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashMap;

    fn field() -> FieldTuning {
        FieldTuning::default()
    }

    fn center() -> Vec2 {
        Vec2::new(540.0, 960.0)
    }

    #[test]
    fn test_spawn_interval_scales_with_level() {
        let field = AsteroidField::play(&AsteroidTuning::default());
        assert_eq!(field.spawn_interval(0), 150);
        assert_eq!(field.spawn_interval(1), 75);
        assert_eq!(field.spawn_interval(3), 37);
        assert_eq!(field.spawn_interval(500), 1);

        let title = AsteroidField::title(&AsteroidTuning::default());
        assert_eq!(title.spawn_interval(5), 150);
        assert_eq!(title.capacity(), 8);
    }

    #[test]
    fn test_spawn_starts_off_field() {
        let tuning = AsteroidTuning::default();
        let mut rng = Pcg32::seed_from_u64(42);
        let mut asteroids = AsteroidField::play(&tuning);
        for _ in 0..tuning.capacity {
            let h = asteroids.spawn(&center(), &mut rng, &field(), &tuning).unwrap();
            let a = asteroids.get(h).unwrap();
            let off = a.pos.x <= 0.0 || a.pos.x >= 1080.0 || a.pos.y <= 0.0 || a.pos.y >= 1920.0;
            assert!(off, "spawned on field at {:?}", a.pos);
            assert!((8.0..18.0).contains(&a.speed));
            assert!((a.hitbox_size - 125.0).abs() < 1e-3);
            assert!(!a.on_screen && !a.moved_across_screen);
        }
    }

    #[test]
    fn test_spawn_past_capacity_is_exhausted() {
        let tuning = AsteroidTuning::default();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut asteroids = AsteroidField::play(&tuning);
        for _ in 0..tuning.capacity {
            asteroids.spawn(&center(), &mut rng, &field(), &tuning).unwrap();
        }
        assert!(!asteroids.should_spawn(0, 0));
        let err = asteroids.spawn(&center(), &mut rng, &field(), &tuning).unwrap_err();
        assert!(matches!(err, SimError::PoolExhausted { capacity: 15, .. }));
    }

    #[test]
    fn test_retired_only_after_crossing() {
        let tuning = AsteroidTuning::default();
        let field = field();
        let mut rng = Pcg32::seed_from_u64(7);
        let mut asteroids = AsteroidField::play(&tuning);
        for _ in 0..tuning.capacity {
            asteroids.spawn(&center(), &mut rng, &field, &tuning).unwrap();
        }

        let mut seen: HashMap<Handle, (bool, bool)> = HashMap::new();
        let mut retired = 0;
        for _ in 0..2000 {
            for (h, a) in asteroids.iter() {
                let flags = seen.entry(h).or_default();
                // movedAcrossScreen is never observed before onScreen
                assert!(!a.moved_across_screen || a.on_screen);
                *flags = (a.on_screen, a.moved_across_screen);
            }
            let before: Vec<Handle> = asteroids.iter().map(|(h, _)| h).collect();
            retired += asteroids.advance(&field).retired;
            for h in before {
                if asteroids.get(h).is_none() {
                    // Released this tick; it must have entered before
                    assert!(seen[&h].0, "retired without entering the field");
                }
            }
        }
        assert_eq!(retired, tuning.capacity);
        assert_eq!(asteroids.active_count(), 0);
    }

    #[test]
    fn test_destroy_within_radius() {
        let tuning = AsteroidTuning::default();
        let mut asteroids = AsteroidField::play(&tuning);
        let near = asteroids
            .pool
            .spawn(Asteroid {
                pos: center() + Vec2::new(100.0, 0.0),
                on_screen: true,
                hitbox_size: 125.0,
                ..Default::default()
            })
            .unwrap();
        let far = asteroids
            .pool
            .spawn(Asteroid {
                pos: center() + Vec2::new(400.0, 0.0),
                on_screen: true,
                hitbox_size: 125.0,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(asteroids.destroy_within(center(), 255.0, true), 1);
        assert!(asteroids.get(near).is_none());
        assert!(asteroids.get(far).is_some());
    }

    #[test]
    fn test_fading_asteroids_freeze_and_stop_colliding() {
        let tuning = AsteroidTuning::default();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut asteroids = AsteroidField::play(&tuning);
        let h = asteroids.spawn(&center(), &mut rng, &field(), &tuning).unwrap();
        let before = asteroids.get(h).unwrap().pos;

        assert_eq!(asteroids.begin_fade(), 1);
        asteroids.advance(&field());
        assert_eq!(asteroids.get(h).unwrap().pos, before);
        assert!(asteroids.hitboxes(false).is_empty());
        assert_eq!(asteroids.release_all(), 1);
    }
}
