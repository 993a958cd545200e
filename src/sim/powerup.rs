//! Power-up state machine
//!
//! At most one power-up exists at a time. It is offered as a pickup, collected
//! by flying into it, and after a short obtain effect one of five variants is
//! activated. Timed parts of every variant (charging, projectile flight, the
//! shockwave animation, expiry fades) run as continuations on the session
//! timeline, so `stop_running` can cancel all of them at once.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::asteroid::AsteroidField;
use super::collision::Rect;
use super::error::{SimError, SimResult, settle};
use super::pool::{EntityPool, Handle};
use super::rocket::Rocket;
use super::state::{DestroyCause, GameEvent, Outbox, RepairEconomy};
use super::timeline::{Continuation, Timeline};
use crate::angle_vector;
use crate::audio::AudioCue;
use crate::tuning::{FieldTuning, PowerUpTuning};

/// Power-up variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Destroys asteroids around the rocket every tick
    ForceField,
    /// Instant +2 repair
    DoubleRepair,
    /// Repeating charged shots from the rocket's nose
    RapidBlast,
    /// One area burst around the rocket
    Shockwave,
    /// Sweeping gun at the field centre
    Turret,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::ForceField,
        PowerUpKind::DoubleRepair,
        PowerUpKind::RapidBlast,
        PowerUpKind::Shockwave,
        PowerUpKind::Turret,
    ];

    /// Uniform draw, skipping double repair when it would be wasted
    pub fn draw(rng: &mut impl Rng, repair_full: bool) -> Self {
        let choices: Vec<PowerUpKind> = Self::ALL
            .into_iter()
            .filter(|kind| !(repair_full && *kind == PowerUpKind::DoubleRepair))
            .collect();
        choices[rng.random_range(0..choices.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpPhase {
    Idle,
    /// Pickup on screen
    Offered,
    /// Collected, obtain effect playing
    Selected,
    Active,
    /// Expiry animation playing; no longer affects the game
    Expiring,
}

/// The two pooled projectile kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    RapidBlast,
    TurretBlast,
}

impl ProjectileKind {
    pub fn destroy_cause(self) -> DestroyCause {
        match self {
            ProjectileKind::RapidBlast => DestroyCause::RapidBlast,
            ProjectileKind::TurretBlast => DestroyCause::TurretBlast,
        }
    }
}

/// A pooled blast
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Projectile {
    /// Centre
    pub pos: Vec2,
    /// Unit flight direction
    pub dir: Vec2,
    /// Screen-space firing angle
    pub angle: f32,
}

/// The on-screen pickup while a power-up is offered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub pos: Vec2,
    /// Spawn burst finished; visible and collectable
    pub revealed: bool,
    pub drifting: bool,
}

/// Narrow view of the session a power-up effect may touch
pub struct EffectContext<'a> {
    pub rocket: &'a Rocket,
    pub asteroids: &'a mut AsteroidField,
    pub repair: &'a mut RepairEconomy,
    pub timeline: &'a mut Timeline,
    pub out: &'a mut Outbox,
    pub rng: &'a mut Pcg32,
    pub field: &'a FieldTuning,
    pub seconds: u64,
    pub time_ms: f64,
}

/// Continuations that belong to an activated effect
fn is_effect_task(c: &Continuation) -> bool {
    matches!(
        c,
        Continuation::BlastCharged
            | Continuation::TurretRecharged
            | Continuation::ProjectileArrived { .. }
            | Continuation::ShockwaveFinished
    )
}

/// Continuations that belong to the pickup lifecycle
fn is_pickup_task(c: &Continuation) -> bool {
    matches!(
        c,
        Continuation::PickupRevealed
            | Continuation::PickupDrifting
            | Continuation::PickupGone
            | Continuation::PowerUpObtained
    )
}

#[derive(Debug, Clone)]
pub struct PowerUpController {
    pub phase: PowerUpPhase,
    pub kind: Option<PowerUpKind>,
    /// Effect position (tracks the rocket for the force field and shockwave)
    pub pos: Vec2,
    pub pickup: Option<Pickup>,
    /// Elapsed second the power-up was activated
    pub acquired_secs: u64,
    pub turret_angle: f32,
    blast_charging: bool,
    turret_ready: bool,
    blasts: EntityPool<Projectile>,
    turret_blasts: EntityPool<Projectile>,
    tuning: PowerUpTuning,
}

impl PowerUpController {
    pub fn new(tuning: &PowerUpTuning) -> Self {
        Self {
            phase: PowerUpPhase::Idle,
            kind: None,
            pos: Vec2::ZERO,
            pickup: None,
            acquired_secs: 0,
            turret_angle: 0.0,
            blast_charging: false,
            turret_ready: false,
            blasts: EntityPool::new("rapid blasts", tuning.blast_capacity),
            turret_blasts: EntityPool::new("turret blasts", tuning.turret_capacity),
            tuning: tuning.clone(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == PowerUpPhase::Idle
    }

    /// Collected and not yet expired (the session's "has power-up" flag)
    pub fn has_power_up(&self) -> bool {
        matches!(self.phase, PowerUpPhase::Selected | PowerUpPhase::Active)
    }

    pub fn pool(&self, kind: ProjectileKind) -> &EntityPool<Projectile> {
        match kind {
            ProjectileKind::RapidBlast => &self.blasts,
            ProjectileKind::TurretBlast => &self.turret_blasts,
        }
    }

    fn pool_mut(&mut self, kind: ProjectileKind) -> &mut EntityPool<Projectile> {
        match kind {
            ProjectileKind::RapidBlast => &mut self.blasts,
            ProjectileKind::TurretBlast => &mut self.turret_blasts,
        }
    }

    /// Put a pickup on screen
    pub fn offer(&mut self, rng: &mut impl Rng, timeline: &mut Timeline, out: &mut Outbox) -> SimResult<()> {
        if self.phase != PowerUpPhase::Idle {
            return Err(SimError::transition("power-up", self.phase, "offer"));
        }
        self.phase = PowerUpPhase::Offered;
        self.pickup = Some(Pickup {
            pos: Vec2::new(rng.random_range(100.0..1000.0), rng.random_range(200.0..500.0)),
            revealed: false,
            drifting: false,
        });
        timeline.schedule(self.tuning.pickup_spawn_ms, Continuation::PickupRevealed);
        out.play(AudioCue::PowerSpawn);
        out.emit(GameEvent::PowerUpOffered);
        Ok(())
    }

    pub fn on_pickup_revealed(&mut self, timeline: &mut Timeline) {
        if let (PowerUpPhase::Offered, Some(pickup)) = (self.phase, self.pickup.as_mut()) {
            pickup.revealed = true;
            timeline.schedule(self.tuning.pickup_fade_ms, Continuation::PickupDrifting);
        }
    }

    pub fn on_pickup_drifting(&mut self, timeline: &mut Timeline) {
        if let (PowerUpPhase::Offered, Some(pickup)) = (self.phase, self.pickup.as_mut()) {
            pickup.drifting = true;
            timeline.schedule(self.tuning.pickup_drift_ms, Continuation::PickupGone);
        }
    }

    /// Uncollected pickup drifted away
    pub fn on_pickup_gone(&mut self) {
        if self.phase == PowerUpPhase::Offered {
            self.phase = PowerUpPhase::Idle;
            self.pickup = None;
        }
    }

    /// Move a drifting pickup down the field
    pub fn advance_pickup(&mut self, dt_ms: f64, field: &FieldTuning) {
        let rate = (field.height - 100.0) / self.tuning.pickup_drift_ms as f32;
        if let Some(pickup) = self.pickup.as_mut().filter(|p| p.drifting) {
            pickup.pos.y += rate * dt_ms as f32;
        }
    }

    /// Collision box of a collectable pickup
    pub fn pickup_rect(&self) -> Option<Rect> {
        self.pickup
            .as_ref()
            .filter(|p| p.revealed && self.phase == PowerUpPhase::Offered)
            .map(|p| Rect::centered(p.pos, Vec2::splat(self.tuning.pickup_size)))
    }

    /// Rocket flew into the pickup
    pub fn collect(&mut self, timeline: &mut Timeline, out: &mut Outbox) -> SimResult<()> {
        if self.pickup_rect().is_none() {
            return Err(SimError::transition("power-up", self.phase, "collect"));
        }
        timeline.cancel_where(is_pickup_task);
        self.pickup = None;
        self.phase = PowerUpPhase::Selected;
        timeline.schedule(self.tuning.obtain_ms, Continuation::PowerUpObtained);
        out.emit(GameEvent::PowerUpCollected);
        Ok(())
    }

    /// Obtain effect finished: draw a variant and activate it
    pub fn on_obtained(&mut self, ctx: &mut EffectContext<'_>) {
        if self.phase != PowerUpPhase::Selected {
            return;
        }
        ctx.out.play(AudioCue::Obtained);
        let kind = PowerUpKind::draw(&mut *ctx.rng, ctx.repair.is_full());
        settle(self.activate(kind, ctx));
    }

    /// Start `kind`; instantaneous variants finish within the call
    pub fn activate(&mut self, kind: PowerUpKind, ctx: &mut EffectContext<'_>) -> SimResult<()> {
        if self.phase != PowerUpPhase::Selected {
            return Err(SimError::transition("power-up", self.phase, "activate"));
        }
        self.phase = PowerUpPhase::Active;
        self.kind = Some(kind);
        self.acquired_secs = ctx.seconds;
        self.blast_charging = false;
        self.turret_ready = false;
        ctx.out.emit(GameEvent::PowerUpActivated { kind });
        log::info!("Power-up activated: {kind:?}");

        match kind {
            PowerUpKind::ForceField => {
                self.pos = ctx.rocket.pos;
                ctx.out.play(AudioCue::Force);
            }
            PowerUpKind::DoubleRepair => {
                let gained = ctx.repair.repair(self.tuning.double_repair_amount);
                ctx.out.play(AudioCue::LifeUp);
                if gained > 0 {
                    ctx.out.emit(GameEvent::Repaired {
                        repair: ctx.repair.value(),
                    });
                }
                self.stop_running(ctx.timeline, ctx.out);
            }
            PowerUpKind::RapidBlast => {}
            PowerUpKind::Shockwave => {
                self.pos = ctx.rocket.pos;
                let radius = self.tuning.shockwave_scale * self.tuning.shockwave_width / 2.0
                    + self.tuning.shockwave_margin;
                let destroyed = ctx.asteroids.destroy_within(self.pos, radius, true);
                record_destroyed(ctx.out, destroyed, DestroyCause::Shockwave);
                ctx.timeline.schedule(self.tuning.shockwave_ms, Continuation::ShockwaveFinished);
            }
            PowerUpKind::Turret => {
                self.pos = Vec2::new(ctx.field.width / 2.0, ctx.field.height / 2.0);
                self.turret_ready = true;
            }
        }
        Ok(())
    }

    /// Per-tick behaviour of the running variant
    pub fn act(&mut self, ctx: &mut EffectContext<'_>) {
        match (self.phase, self.kind) {
            (PowerUpPhase::Active, Some(PowerUpKind::ForceField)) => {
                self.pos = ctx.rocket.pos;
                let destroyed = ctx
                    .asteroids
                    .destroy_within(self.pos, self.tuning.force_field_radius, false);
                record_destroyed(ctx.out, destroyed, DestroyCause::ForceField);
            }
            (PowerUpPhase::Active, Some(PowerUpKind::RapidBlast)) => {
                if !self.blast_charging {
                    self.blast_charging = true;
                    ctx.timeline.schedule(self.tuning.charge_ms, Continuation::BlastCharged);
                }
            }
            (PowerUpPhase::Active, Some(PowerUpKind::Turret)) => {
                self.turret_angle = ((ctx.time_ms * self.tuning.turret_sweep_rate).cos()
                    * f64::from(self.tuning.turret_sweep_amplitude)) as f32;
                if self.turret_ready {
                    self.turret_ready = false;
                    let angle = self.turret_angle + self.tuning.turret_angle_offset;
                    self.launch(ProjectileKind::TurretBlast, self.pos, angle, ctx);
                    ctx.timeline.schedule(self.tuning.charge_ms, Continuation::TurretRecharged);
                }
            }
            (PowerUpPhase::Expiring, Some(PowerUpKind::ForceField)) => {
                self.pos = ctx.rocket.pos;
            }
            _ => {}
        }
    }

    /// Rapid blast charge finished: fire from the nose along the facing
    pub fn on_blast_charged(&mut self, ctx: &mut EffectContext<'_>) {
        self.blast_charging = false;
        if self.phase != PowerUpPhase::Active || self.kind != Some(PowerUpKind::RapidBlast) {
            return;
        }
        let angle = crate::vector_angle(ctx.rocket.facing());
        self.launch(ProjectileKind::RapidBlast, ctx.rocket.tip(), angle, ctx);
    }

    pub fn on_turret_recharged(&mut self) {
        if self.phase == PowerUpPhase::Active && self.kind == Some(PowerUpKind::Turret) {
            self.turret_ready = true;
        }
    }

    fn launch(&mut self, kind: ProjectileKind, origin: Vec2, angle: f32, ctx: &mut EffectContext<'_>) {
        let projectile = Projectile {
            pos: origin,
            dir: angle_vector(angle),
            angle,
        };
        match self.pool_mut(kind).spawn(projectile) {
            Ok(handle) => {
                ctx.out.play(match kind {
                    ProjectileKind::RapidBlast => AudioCue::RedLaser,
                    ProjectileKind::TurretBlast => AudioCue::Turret,
                });
                ctx.timeline
                    .schedule(self.tuning.flight_ms, Continuation::ProjectileArrived { kind, handle });
            }
            Err(err) => settle(Err(err)),
        }
    }

    /// Move projectiles along their flight paths
    pub fn advance_projectiles(&mut self, dt_ms: f64) {
        let step = self.tuning.flight_distance / self.tuning.flight_ms as f32 * dt_ms as f32;
        for pool in [&mut self.blasts, &mut self.turret_blasts] {
            pool.for_each_mut(|_, p| p.pos += p.dir * step);
        }
    }

    /// Flight finished; a projectile already spent on a hit is ignored
    pub fn on_projectile_arrived(&mut self, kind: ProjectileKind, handle: Handle) {
        let pool = self.pool_mut(kind);
        if pool.contains(handle) {
            settle(pool.release(handle));
        }
    }

    pub fn projectile_hitboxes(&self, kind: ProjectileKind) -> Vec<(Handle, Rect)> {
        let size = Vec2::splat(self.tuning.projectile_size);
        self.pool(kind)
            .iter()
            .map(|(h, p)| (h, Rect::centered(p.pos, size)))
            .collect()
    }

    /// Spend a projectile on a hit
    pub fn release_projectile(&mut self, kind: ProjectileKind, handle: Handle) -> SimResult<()> {
        self.pool_mut(kind).release(handle)
    }

    pub fn on_shockwave_finished(&mut self, timeline: &mut Timeline, out: &mut Outbox) {
        if self.phase == PowerUpPhase::Active && self.kind == Some(PowerUpKind::Shockwave) {
            self.stop_running(timeline, out);
        }
    }

    /// Expire once the active duration has passed
    pub fn update_expiry(&mut self, seconds: u64, timeline: &mut Timeline, out: &mut Outbox) {
        if self.phase == PowerUpPhase::Active
            && seconds.saturating_sub(self.acquired_secs) > self.tuning.duration_secs
        {
            self.stop_running(timeline, out);
        }
    }

    /// End the current power-up: cancel its continuations, release every
    /// projectile, and either play the expiry animation or go straight to idle
    pub fn stop_running(&mut self, timeline: &mut Timeline, out: &mut Outbox) {
        timeline.cancel_where(is_effect_task);
        let released = self.blasts.release_all() + self.turret_blasts.release_all();
        if released > 0 {
            log::debug!("power-up stopped with {released} projectiles in flight");
        }
        self.blast_charging = false;
        self.turret_ready = false;

        match self.phase {
            PowerUpPhase::Active => {
                let kind = self.kind;
                if let Some(kind) = kind {
                    out.emit(GameEvent::PowerUpExpired { kind });
                }
                let fade_ms = match kind {
                    Some(PowerUpKind::ForceField) => Some(self.tuning.force_field_shrink_ms),
                    Some(PowerUpKind::Turret) => Some(self.tuning.turret_fade_ms),
                    _ => None,
                };
                match fade_ms {
                    Some(ms) => {
                        self.phase = PowerUpPhase::Expiring;
                        timeline.schedule(ms, Continuation::PowerUpFaded);
                    }
                    None => self.clear(),
                }
            }
            PowerUpPhase::Offered | PowerUpPhase::Selected => {
                timeline.cancel_where(is_pickup_task);
                self.clear();
            }
            PowerUpPhase::Idle | PowerUpPhase::Expiring => {}
        }
    }

    /// Expiry animation finished
    pub fn on_faded(&mut self) {
        if self.phase == PowerUpPhase::Expiring {
            self.clear();
        }
    }

    /// Drop everything without animation (level start, restart, defeat)
    pub fn reset(&mut self, timeline: &mut Timeline) {
        timeline.cancel_where(|c| {
            is_effect_task(c) || is_pickup_task(c) || *c == Continuation::PowerUpFaded
        });
        self.blasts.release_all();
        self.turret_blasts.release_all();
        self.blast_charging = false;
        self.turret_ready = false;
        self.clear();
    }

    fn clear(&mut self) {
        self.phase = PowerUpPhase::Idle;
        self.kind = None;
        self.pickup = None;
    }
}

fn record_destroyed(out: &mut Outbox, count: usize, cause: DestroyCause) {
    for _ in 0..count {
        out.play(AudioCue::FireballExplosion);
        out.emit(GameEvent::AsteroidDestroyed { cause });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::asteroid::Asteroid;
    use crate::tuning::{AsteroidTuning, Tuning};
    use rand::SeedableRng;

    struct Harness {
        tuning: Tuning,
        rocket: Rocket,
        asteroids: AsteroidField,
        repair: RepairEconomy,
        timeline: Timeline,
        out: Outbox,
        rng: Pcg32,
        seconds: u64,
    }

    impl Harness {
        fn new(repair: u8) -> Self {
            let tuning = Tuning::standard();
            Self {
                rocket: Rocket::new(Vec2::new(540.0, 960.0)),
                asteroids: AsteroidField::play(&AsteroidTuning::default()),
                repair: RepairEconomy::new(repair, 12),
                timeline: Timeline::new(),
                out: Outbox::default(),
                rng: Pcg32::seed_from_u64(11),
                seconds: 0,
                tuning,
            }
        }

        fn ctx(&mut self) -> EffectContext<'_> {
            let time_ms = self.timeline.now_ms();
            EffectContext {
                rocket: &self.rocket,
                asteroids: &mut self.asteroids,
                repair: &mut self.repair,
                timeline: &mut self.timeline,
                out: &mut self.out,
                rng: &mut self.rng,
                field: &self.tuning.field,
                seconds: self.seconds,
                time_ms,
            }
        }

        /// Advance the timeline and dispatch power-up continuations
        fn run(&mut self, power_up: &mut PowerUpController, dt_ms: f64) {
            power_up.advance_projectiles(dt_ms);
            for c in self.timeline.advance(dt_ms) {
                match c {
                    Continuation::PickupRevealed => power_up.on_pickup_revealed(&mut self.timeline),
                    Continuation::PickupDrifting => power_up.on_pickup_drifting(&mut self.timeline),
                    Continuation::PickupGone => power_up.on_pickup_gone(),
                    Continuation::PowerUpObtained => power_up.on_obtained(&mut self.ctx()),
                    Continuation::BlastCharged => power_up.on_blast_charged(&mut self.ctx()),
                    Continuation::TurretRecharged => power_up.on_turret_recharged(),
                    Continuation::ProjectileArrived { kind, handle } => {
                        power_up.on_projectile_arrived(kind, handle)
                    }
                    Continuation::ShockwaveFinished => {
                        power_up.on_shockwave_finished(&mut self.timeline, &mut self.out)
                    }
                    Continuation::PowerUpFaded => power_up.on_faded(),
                    _ => {}
                }
            }
        }

        fn selected(&mut self) -> PowerUpController {
            let mut power_up = PowerUpController::new(&self.tuning.power_ups);
            power_up.phase = PowerUpPhase::Selected;
            power_up
        }

        fn place_asteroid(&mut self, offset: Vec2, on_screen: bool) -> Handle {
            let tuning = AsteroidTuning::default();
            let h = self
                .asteroids
                .spawn(&self.rocket, &mut self.rng, &self.tuning.field, &tuning)
                .unwrap();
            let a: &mut Asteroid = self.asteroids.get_mut(h).unwrap();
            a.pos = self.rocket.pos + offset;
            a.speed = 0.0;
            a.on_screen = on_screen;
            h
        }
    }

    #[test]
    fn test_draw_excludes_double_repair_at_full() {
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..500 {
            assert_ne!(PowerUpKind::draw(&mut rng, true), PowerUpKind::DoubleRepair);
        }
        let drawn: Vec<PowerUpKind> = (0..500).map(|_| PowerUpKind::draw(&mut rng, false)).collect();
        for kind in PowerUpKind::ALL {
            assert!(drawn.contains(&kind));
        }
    }

    #[test]
    fn test_pickup_lifecycle_without_collection() {
        let mut h = Harness::new(6);
        let mut power_up = PowerUpController::new(&h.tuning.power_ups);
        power_up.offer(&mut h.rng, &mut h.timeline, &mut h.out).unwrap();
        assert!(power_up.offer(&mut h.rng, &mut h.timeline, &mut h.out).is_err());
        assert!(power_up.pickup_rect().is_none());

        h.run(&mut power_up, 300.0);
        assert!(power_up.pickup_rect().is_some());
        h.run(&mut power_up, 1000.0);
        let y0 = power_up.pickup.as_ref().unwrap().pos.y;
        power_up.advance_pickup(100.0, &h.tuning.field);
        assert!(power_up.pickup.as_ref().unwrap().pos.y > y0);

        h.run(&mut power_up, 3000.0);
        assert_eq!(power_up.phase, PowerUpPhase::Idle);
        assert!(power_up.pickup.is_none());
    }

    #[test]
    fn test_collect_then_obtain_activates() {
        let mut h = Harness::new(6);
        let mut power_up = PowerUpController::new(&h.tuning.power_ups);
        power_up.offer(&mut h.rng, &mut h.timeline, &mut h.out).unwrap();
        h.run(&mut power_up, 300.0);
        power_up.collect(&mut h.timeline, &mut h.out).unwrap();
        assert_eq!(power_up.phase, PowerUpPhase::Selected);
        assert!(power_up.has_power_up());

        // The cancelled drift never sends the selection back to idle
        h.run(&mut power_up, 600.0);
        assert_ne!(power_up.phase, PowerUpPhase::Selected);
        assert!(h.out.events.contains(&GameEvent::PowerUpCollected));
        assert!(h.out.events.iter().any(|e| matches!(e, GameEvent::PowerUpActivated { .. })));
    }

    #[test]
    fn test_double_repair_at_eleven_caps_and_idles() {
        let mut h = Harness::new(11);
        let mut power_up = h.selected();
        power_up.activate(PowerUpKind::DoubleRepair, &mut h.ctx()).unwrap();
        assert_eq!(h.repair.value(), 12);
        assert_eq!(power_up.phase, PowerUpPhase::Idle);
        assert!(power_up.kind.is_none());
    }

    #[test]
    fn test_force_field_destroys_nearby_asteroids() {
        let mut h = Harness::new(6);
        let near = h.place_asteroid(Vec2::new(200.0, 0.0), false);
        let far = h.place_asteroid(Vec2::new(0.0, 400.0), true);
        let mut power_up = h.selected();
        power_up.activate(PowerUpKind::ForceField, &mut h.ctx()).unwrap();
        power_up.act(&mut h.ctx());

        assert!(h.asteroids.get(near).is_none());
        assert!(h.asteroids.get(far).is_some());
        assert_eq!(
            h.out
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::AsteroidDestroyed { cause: DestroyCause::ForceField }))
                .count(),
            1
        );
    }

    #[test]
    fn test_shockwave_single_burst_on_screen_only() {
        let mut h = Harness::new(6);
        let on = h.place_asteroid(Vec2::new(300.0, 0.0), true);
        let off = h.place_asteroid(Vec2::new(-300.0, 0.0), false);
        let mut power_up = h.selected();
        power_up.activate(PowerUpKind::Shockwave, &mut h.ctx()).unwrap();
        assert!(h.asteroids.get(on).is_none());
        assert!(h.asteroids.get(off).is_some());

        // Later arrivals are untouched by the finished burst
        let late = h.place_asteroid(Vec2::new(10.0, 0.0), true);
        power_up.act(&mut h.ctx());
        assert!(h.asteroids.get(late).is_some());

        h.run(&mut power_up, 3000.0);
        assert_eq!(power_up.phase, PowerUpPhase::Idle);
    }

    #[test]
    fn test_rapid_blast_charges_fires_and_releases_on_arrival() {
        let mut h = Harness::new(6);
        let mut power_up = h.selected();
        power_up.activate(PowerUpKind::RapidBlast, &mut h.ctx()).unwrap();

        power_up.act(&mut h.ctx());
        power_up.act(&mut h.ctx());
        assert_eq!(h.timeline.pending_count(), 1, "only one charge at a time");

        h.run(&mut power_up, 500.0);
        assert_eq!(power_up.pool(ProjectileKind::RapidBlast).active_count(), 1);
        let (_, start) = power_up.projectile_hitboxes(ProjectileKind::RapidBlast)[0];
        // Fired from the nose, heading up
        assert_eq!(start.center(), h.rocket.tip());

        h.run(&mut power_up, 900.0);
        let (_, mid) = power_up.projectile_hitboxes(ProjectileKind::RapidBlast)[0];
        assert!(mid.center().y < start.center().y - 1000.0);

        h.run(&mut power_up, 900.0);
        assert_eq!(power_up.pool(ProjectileKind::RapidBlast).active_count(), 0);
    }

    #[test]
    fn test_arrival_after_hit_is_ignored() {
        let mut h = Harness::new(6);
        let mut power_up = h.selected();
        power_up.activate(PowerUpKind::RapidBlast, &mut h.ctx()).unwrap();
        power_up.act(&mut h.ctx());
        h.run(&mut power_up, 500.0);

        let (handle, _) = power_up.projectile_hitboxes(ProjectileKind::RapidBlast)[0];
        power_up.release_projectile(ProjectileKind::RapidBlast, handle).unwrap();
        h.run(&mut power_up, 1800.0);
        assert_eq!(power_up.pool(ProjectileKind::RapidBlast).active_count(), 0);
    }

    #[test]
    fn test_turret_fires_then_recharges() {
        let mut h = Harness::new(6);
        let mut power_up = h.selected();
        power_up.activate(PowerUpKind::Turret, &mut h.ctx()).unwrap();
        assert_eq!(power_up.pos, Vec2::new(540.0, 960.0));

        power_up.act(&mut h.ctx());
        power_up.act(&mut h.ctx());
        assert_eq!(power_up.pool(ProjectileKind::TurretBlast).active_count(), 1);

        h.run(&mut power_up, 500.0);
        power_up.act(&mut h.ctx());
        assert_eq!(power_up.pool(ProjectileKind::TurretBlast).active_count(), 2);
        assert_eq!(power_up.pool(ProjectileKind::RapidBlast).active_count(), 0);
    }

    #[test]
    fn test_expiry_releases_projectiles_and_fades() {
        let mut h = Harness::new(6);
        let mut power_up = h.selected();
        power_up.activate(PowerUpKind::Turret, &mut h.ctx()).unwrap();
        power_up.act(&mut h.ctx());
        assert_eq!(power_up.pool(ProjectileKind::TurretBlast).active_count(), 1);

        power_up.update_expiry(8, &mut h.timeline, &mut h.out);
        assert_eq!(power_up.phase, PowerUpPhase::Active);
        power_up.update_expiry(9, &mut h.timeline, &mut h.out);
        assert_eq!(power_up.phase, PowerUpPhase::Expiring);
        assert!(!power_up.has_power_up());
        assert_eq!(power_up.pool(ProjectileKind::TurretBlast).active_count(), 0);

        // No recharge or arrival survives the stop
        assert!(!h.timeline.any(|c| is_effect_task(c)));
        h.run(&mut power_up, 500.0);
        assert_eq!(power_up.phase, PowerUpPhase::Idle);
    }

    #[test]
    fn test_stop_while_offered_cancels_pickup() {
        let mut h = Harness::new(6);
        let mut power_up = PowerUpController::new(&h.tuning.power_ups);
        power_up.offer(&mut h.rng, &mut h.timeline, &mut h.out).unwrap();
        power_up.stop_running(&mut h.timeline, &mut h.out);
        assert_eq!(power_up.phase, PowerUpPhase::Idle);
        assert_eq!(h.timeline.pending_count(), 0);
    }
}
