//! Collision detection and resolution policy
//!
//! Every pairwise check in the game goes through [`overlaps`]; which entities
//! were involved only decides what happens next, via [`policy`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::DamageTuning;

/// Axis-aligned rectangle (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of `size` centred on `center`
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self::new(
            center.x - size.x / 2.0,
            center.y - size.y / 2.0,
            size.x,
            size.y,
        )
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Open-interval AABB test; rectangles that only share an edge do not collide
#[inline]
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.width && a.x + a.width > b.x && a.y < b.y + b.height && a.y + a.height > b.y
}

/// Point-in-circle test used by area effects (inclusive)
#[inline]
pub fn within_radius(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance_squared(center) <= radius * radius
}

/// Which two kinds of entity touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Contact {
    RocketAsteroid,
    RocketBossBody,
    RocketDarkEnergy,
    RocketPickup,
    LaserAsteroid,
    LaserBoss,
    BlastAsteroid,
    BlastBoss,
}

/// Repair loss and the invincibility window it opens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRule {
    pub amount: u8,
    pub window_ms: f64,
}

/// Outcome of a contact
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactPolicy {
    /// Damage applied to the rocket (subject to its invincibility window)
    pub rocket_damage: Option<DamageRule>,
    pub destroys_asteroid: bool,
    /// The shot that made contact is spent
    pub consumes_shot: bool,
    /// Counts as a hit against the boss (subject to its hit cooldown)
    pub damages_boss: bool,
    pub collects_pickup: bool,
}

/// Dispatch table: what each kind of contact does
pub fn policy(contact: Contact, damage: &DamageTuning) -> ContactPolicy {
    match contact {
        Contact::RocketAsteroid => ContactPolicy {
            rocket_damage: Some(DamageRule {
                amount: damage.asteroid,
                window_ms: damage.asteroid_window_ms,
            }),
            // The asteroid is marked collided but keeps flying
            ..Default::default()
        },
        Contact::RocketBossBody => ContactPolicy {
            rocket_damage: Some(DamageRule {
                amount: damage.boss_body,
                window_ms: damage.boss_body_window_ms,
            }),
            ..Default::default()
        },
        Contact::RocketDarkEnergy => ContactPolicy {
            rocket_damage: Some(DamageRule {
                amount: damage.dark_energy,
                window_ms: damage.dark_energy_window_ms,
            }),
            ..Default::default()
        },
        Contact::RocketPickup => ContactPolicy {
            collects_pickup: true,
            ..Default::default()
        },
        Contact::LaserAsteroid | Contact::BlastAsteroid => ContactPolicy {
            destroys_asteroid: true,
            consumes_shot: true,
            ..Default::default()
        },
        Contact::LaserBoss | Contact::BlastBoss => ContactPolicy {
            consumes_shot: true,
            damages_boss: true,
            ..Default::default()
        },
    }
}

/// All overlapping pairs between two hitbox sets, in `lhs` then `rhs` order.
///
/// With `exclusive`, each `lhs` entry pairs with at most its first hit (a shot
/// that is spent on contact).
pub fn pair_hits<A: Copy, B: Copy>(lhs: &[(A, Rect)], rhs: &[(B, Rect)], exclusive: bool) -> Vec<(A, B)> {
    let mut hits = Vec::new();
    for (a, a_rect) in lhs {
        for (b, b_rect) in rhs {
            if overlaps(a_rect, b_rect) {
                hits.push((*a, *b));
                if exclusive {
                    break;
                }
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_overlapping_rects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!(overlaps(&a, &b));
    }

    #[test]
    fn test_edge_touching_rects_do_not_collide() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let right = Rect::new(10.0, 0.0, 10.0, 10.0);
        let below = Rect::new(0.0, 10.0, 10.0, 10.0);
        assert!(!overlaps(&a, &right));
        assert!(!overlaps(&a, &below));
    }

    #[test]
    fn test_contained_rect_overlaps() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        let inner = Rect::new(40.0, 40.0, 5.0, 5.0);
        assert!(overlaps(&outer, &inner));
        assert!(overlaps(&inner, &outer));
    }

    #[test]
    fn test_centered_rect() {
        let r = Rect::centered(Vec2::new(100.0, 200.0), Vec2::new(90.0, 150.0));
        assert_eq!(r.x, 55.0);
        assert_eq!(r.y, 125.0);
        assert_eq!(r.center(), Vec2::new(100.0, 200.0));
    }

    #[test]
    fn test_within_radius_is_inclusive() {
        assert!(within_radius(Vec2::new(3.0, 4.0), Vec2::ZERO, 5.0));
        assert!(!within_radius(Vec2::new(3.0, 4.1), Vec2::ZERO, 5.0));
    }

    #[test]
    fn test_policy_damage_amounts() {
        let damage = DamageTuning::default();
        let hit = policy(Contact::RocketAsteroid, &damage);
        assert_eq!(hit.rocket_damage.map(|d| d.amount), Some(2));
        assert!(!hit.destroys_asteroid);

        let dark = policy(Contact::RocketDarkEnergy, &damage);
        assert_eq!(dark.rocket_damage.map(|d| d.amount), Some(4));
        assert_eq!(dark.rocket_damage.map(|d| d.window_ms), Some(1000.0));

        let laser = policy(Contact::LaserBoss, &damage);
        assert!(laser.damages_boss && laser.consumes_shot);
        assert!(laser.rocket_damage.is_none());

        assert!(policy(Contact::RocketPickup, &damage).collects_pickup);
    }

    #[test]
    fn test_pair_hits_exclusive_stops_at_first_hit() {
        let shots = [(0u8, Rect::new(0.0, 0.0, 10.0, 10.0))];
        let targets = [
            (1u8, Rect::new(5.0, 5.0, 10.0, 10.0)),
            (2u8, Rect::new(2.0, 2.0, 3.0, 3.0)),
        ];
        assert_eq!(pair_hits(&shots, &targets, false), vec![(0, 1), (0, 2)]);
        assert_eq!(pair_hits(&shots, &targets, true), vec![(0, 1)]);
    }

    fn rect_strategy() -> impl Strategy<Value = Rect> {
        (-500.0f32..500.0, -500.0f32..500.0, 0.0f32..300.0, 0.0f32..300.0)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn prop_overlaps_is_symmetric(a in rect_strategy(), b in rect_strategy()) {
            prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        }
    }
}
