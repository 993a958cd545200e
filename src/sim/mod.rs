//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Stable iteration order (pool acquisition order)
//! - Deferred work on the owned timeline, never on wall-clock callbacks
//! - No rendering or platform dependencies beyond the collaborator traits

pub mod asteroid;
pub mod boss;
pub mod collision;
pub mod error;
pub mod laser;
pub mod pool;
pub mod powerup;
pub mod rocket;
pub mod state;
pub mod tick;
pub mod timeline;

pub use asteroid::{Asteroid, AsteroidField};
pub use boss::{Boss, BossPhase};
pub use collision::{Contact, Rect, overlaps, pair_hits, policy};
pub use error::{SimError, SimResult};
pub use laser::Laser;
pub use pool::{EntityPool, Handle};
pub use powerup::{PowerUpController, PowerUpKind, PowerUpPhase, ProjectileKind};
pub use rocket::Rocket;
pub use state::{DestroyCause, GameEvent, RepairEconomy, SessionEvent, SessionPhase};
pub use tick::{SessionController, SessionSummary};
pub use timeline::{Continuation, TaskId, Timeline};
