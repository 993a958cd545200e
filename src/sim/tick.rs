//! Fixed order session tick
//!
//! `SessionController` owns every component and advances them once per call
//! to [`SessionController::tick`]: due continuations, rocket, field or boss,
//! power-up, collision sweep, then session bookkeeping. Collaborators (input,
//! audio, renderer) are reached only through their traits.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::asteroid::AsteroidField;
use super::boss::{Boss, BossHit, BossPhase};
use super::collision::{Contact, Rect, overlaps, pair_hits, policy};
use super::error::{SimError, SimResult, report_violation, settle};
use super::laser::Laser;
use super::pool::Handle;
use super::powerup::{EffectContext, PowerUpController, PowerUpKind, PowerUpPhase, ProjectileKind};
use super::rocket::{BoundsChange, Rocket};
use super::state::{
    DamageOutcome, DestroyCause, GameEvent, Outbox, RepairEconomy, SessionEvent, SessionPhase,
};
use super::timeline::{Continuation, TaskId, Timeline};
use crate::audio::{AudioCue, AudioSink, NullAudio};
use crate::platform::{InputSource, ManualInput};
use crate::renderer::{Frame, Hud, NullRenderer, RenderSink, Sprite, SpriteKind};
use crate::tuning::Tuning;

/// Snapshot of a session for logs and the headless runner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub seed: u64,
    pub phase: SessionPhase,
    pub level: u32,
    pub seconds: u64,
    pub ticks: u64,
    pub repair: u8,
    pub rocket: Vec2,
    pub asteroids: usize,
    pub boss_phase: BossPhase,
    pub boss_health: u32,
    pub power_up: Option<PowerUpKind>,
}

/// Top-level driver of one play session
pub struct SessionController<I = ManualInput, A = NullAudio, R = NullRenderer> {
    tuning: Tuning,
    seed: u64,
    phase: SessionPhase,
    level: u32,
    /// Level clock in milliseconds
    timer_ms: f64,
    /// Whole seconds of `timer_ms` already processed
    seconds: u64,
    /// Ticks since level start (drives spawn scheduling)
    num_ticks: u64,
    /// Ticks since the title screen appeared
    title_ticks: u64,
    /// Ticks since construction, stamped on frames
    frame_tick: u64,

    rocket: Rocket,
    repair: RepairEconomy,
    asteroids: AsteroidField,
    title_field: AsteroidField,
    boss: Boss,
    power_up: PowerUpController,
    laser: Laser,
    timeline: Timeline,
    rng: Pcg32,

    /// Current music track; paused while out of bounds or during the warning
    music: Option<AudioCue>,
    warning_visible: bool,
    dark_energy_task: Option<TaskId>,

    outbox: Outbox,
    events: Vec<SessionEvent>,
    game_events: Vec<GameEvent>,

    input: I,
    audio: A,
    renderer: R,
}

impl SessionController {
    /// Headless session with manual input and no presentation
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        Self::with_collaborators(
            tuning,
            seed,
            ManualInput::default(),
            NullAudio,
            NullRenderer,
        )
    }
}

impl<I: InputSource, A: AudioSink, R: RenderSink> SessionController<I, A, R> {
    pub fn with_collaborators(tuning: Tuning, seed: u64, input: I, audio: A, renderer: R) -> Self {
        let level = tuning.start_level;
        let centre = field_centre(&tuning);
        Self {
            seed,
            phase: SessionPhase::Title,
            level,
            timer_ms: 0.0,
            seconds: 0,
            num_ticks: 0,
            title_ticks: 0,
            frame_tick: 0,
            rocket: Rocket::new(centre),
            repair: RepairEconomy::new(tuning.starting_repair(level), tuning.repair.max),
            asteroids: AsteroidField::play(&tuning.asteroids),
            title_field: AsteroidField::title(&tuning.asteroids),
            boss: Boss::new(level, &tuning.field, &tuning.boss),
            power_up: PowerUpController::new(&tuning.power_ups),
            laser: Laser::new(),
            timeline: Timeline::new(),
            rng: Pcg32::seed_from_u64(seed),
            music: None,
            warning_visible: false,
            dark_energy_task: None,
            outbox: Outbox::default(),
            events: Vec::new(),
            game_events: Vec::new(),
            input,
            audio,
            renderer,
            tuning,
        }
    }

    // ---- session transitions ----

    /// Leave the title screen and begin the first level
    pub fn start(&mut self) -> SimResult<()> {
        if self.phase != SessionPhase::Title {
            return Err(SimError::transition("session", self.phase, "start"));
        }
        self.title_field.release_all();
        self.events.push(SessionEvent::Start);
        self.start_level(self.tuning.start_level);
        self.flush();
        Ok(())
    }

    /// Tear everything down and return to the title screen
    pub fn restart(&mut self) {
        self.teardown();
        self.title_field.release_all();
        self.title_ticks = 0;
        self.level = self.tuning.start_level;
        self.reset_clock();
        self.boss.reset(self.level, &self.tuning.field);
        self.rocket = Rocket::new(field_centre(&self.tuning));
        self.repair = RepairEconomy::new(self.tuning.starting_repair(self.level), self.tuning.repair.max);
        self.phase = SessionPhase::Title;
        self.events.push(SessionEvent::Restart);
        log::info!("Session restarted");
        self.flush();
    }

    fn start_level(&mut self, level: u32) {
        self.power_up.reset(&mut self.timeline);
        self.timeline.cancel_all();
        self.asteroids.release_all();
        self.laser.reset();
        self.dark_energy_task = None;
        self.warning_visible = false;
        if self.rocket.out_of_bounds {
            self.outbox.stop(AudioCue::OutOfBounds);
        }
        if self.rocket.moving {
            self.outbox.pause(AudioCue::Rocket);
        }

        self.level = level;
        self.reset_clock();
        self.boss.reset(level, &self.tuning.field);
        self.rocket = Rocket::new(field_centre(&self.tuning));
        self.repair = RepairEconomy::new(self.tuning.starting_repair(level), self.tuning.repair.max);
        self.phase = SessionPhase::Playing;

        self.spawn_asteroid();
        self.switch_music(AudioCue::Panic);
        log::info!("Level {} started with repair {}", level, self.repair.value());
    }

    fn reset_clock(&mut self) {
        self.timer_ms = 0.0;
        self.seconds = 0;
        self.num_ticks = 0;
    }

    /// Release every pool, cancel every continuation, silence loops
    fn teardown(&mut self) {
        let asteroids = self.asteroids.release_all();
        self.power_up.reset(&mut self.timeline);
        let cancelled = self.timeline.cancel_all();
        self.laser.reset();
        self.boss.expire_dark_energy();
        self.dark_energy_task = None;
        self.warning_visible = false;
        self.stop_music();
        self.outbox.stop(AudioCue::Rocket);
        self.outbox.stop(AudioCue::OutOfBounds);
        log::debug!("teardown: released {asteroids} asteroids, cancelled {cancelled} continuations");
    }

    /// Repair reached zero
    fn defeat(&mut self) {
        if self.phase != SessionPhase::Playing || !self.rocket.alive {
            return;
        }
        log::info!("Rocket destroyed on level {} at {}s", self.level, self.seconds);
        self.rocket.alive = false;
        self.teardown();
        self.phase = SessionPhase::GameOver;
        self.outbox.play(AudioCue::RocketExplosion);
        self.events.push(SessionEvent::GameOver { victory: false });
    }

    /// Boss faded out and the backdrop with it: show the level banner
    fn clear_level(&mut self) {
        log::info!("Level {} cleared", self.level);
        self.phase = SessionPhase::LevelClear;
        self.outbox.play(AudioCue::NextLevel);
        self.events.push(SessionEvent::GameOver { victory: true });
        self.timeline
            .schedule(self.tuning.boss.banner_ms, Continuation::LevelBannerDone);
    }

    fn advance_level(&mut self) {
        let next = self.level + 1;
        self.start_level(next);
        self.events.push(SessionEvent::LevelAdvance { level: next });
    }

    // ---- tick ----

    /// Advance the session by `dt_ms` milliseconds
    pub fn tick(&mut self, dt_ms: f64) {
        let dt_ms = dt_ms.max(0.0);
        match self.phase {
            SessionPhase::Title => self.tick_title(),
            SessionPhase::Playing | SessionPhase::LevelClear => self.tick_level(dt_ms),
            SessionPhase::GameOver => {}
        }
        self.frame_tick += 1;
        self.flush();
        self.present();
    }

    fn tick_title(&mut self) {
        self.title_ticks += 1;
        if self.title_field.should_spawn(self.title_ticks, 0) {
            let centre = field_centre(&self.tuning);
            let spawned = self.title_field.spawn(
                &centre,
                &mut self.rng,
                &self.tuning.field,
                &self.tuning.asteroids,
            );
            settle(spawned.map(|_| ()));
        }
        self.title_field.advance(&self.tuning.field);
    }

    fn tick_level(&mut self, dt_ms: f64) {
        // Timers
        self.timer_ms += dt_ms;
        self.num_ticks += 1;
        let level = self.level;
        for continuation in self.timeline.advance(dt_ms) {
            self.dispatch(continuation);
        }
        // A fresh level starts moving on the next tick
        if self.phase != SessionPhase::Playing || self.level != level {
            return;
        }

        self.update_laser();
        self.update_rocket();
        self.update_field();
        self.update_power_up(dt_ms);
        self.sweep_collisions();

        if self.phase == SessionPhase::Playing && self.rocket.alive {
            self.bookkeeping();
        }
    }

    fn update_laser(&mut self) {
        if !self.rocket.alive {
            return;
        }
        self.laser.ready_check(
            self.seconds,
            self.repair.value(),
            self.tuning.repair.laser_threshold,
            &self.tuning.laser,
            &mut self.timeline,
        );
        self.laser.advance(&self.tuning.laser);
    }

    fn update_rocket(&mut self) {
        if !self.rocket.alive {
            return;
        }
        let target = self.input.poll(self.num_ticks);
        match (target.is_some(), self.rocket.moving) {
            (true, false) => self.outbox.play_loop(AudioCue::Rocket),
            (false, true) => self.outbox.pause(AudioCue::Rocket),
            _ => {}
        }

        let steady = self
            .repair
            .steady_controls(&mut self.rng, self.tuning.rocket.control_noise_base);
        self.rocket
            .steer(target, steady, self.timer_ms, &mut self.rng, &self.tuning.rocket);

        match self.rocket.check_bounds(&self.tuning.field) {
            BoundsChange::Left => {
                log::debug!("rocket left the field at {:?}", self.rocket.pos);
                if let Some(music) = self.music {
                    self.outbox.pause(music);
                }
                self.outbox.play_loop(AudioCue::OutOfBounds);
                self.outbox.emit(GameEvent::OutOfBounds { outside: true });
            }
            BoundsChange::Entered => {
                self.outbox.stop(AudioCue::OutOfBounds);
                self.resume_music();
                self.outbox.emit(GameEvent::OutOfBounds { outside: false });
            }
            BoundsChange::Unchanged => {}
        }
    }

    fn update_field(&mut self) {
        if self.boss.is_engaged() {
            self.boss.patrol(&self.tuning.field, &self.tuning.boss);
            if self.boss.can_fire(self.seconds, &self.tuning.boss)
                && self.rng.random_bool(self.tuning.boss.dark_energy_fire_chance)
            {
                self.fire_dark_energy();
            }
            self.boss.advance_dark_energy(self.timer_ms, &self.tuning.boss);
            return;
        }

        if self.rocket.alive && self.asteroids.should_spawn(self.num_ticks, self.level) {
            self.spawn_asteroid();
        }
        let step = self.asteroids.advance(&self.tuning.field);
        for _ in 0..step.entered {
            self.outbox.play(AudioCue::AsteroidFlyBy);
        }
    }

    fn spawn_asteroid(&mut self) {
        let spawned = self.asteroids.spawn(
            &self.rocket,
            &mut self.rng,
            &self.tuning.field,
            &self.tuning.asteroids,
        );
        settle(spawned.map(|_| ()));
    }

    fn fire_dark_energy(&mut self) {
        if let Err(err) = self.boss.fire_dark_energy(self.seconds, self.rocket.pos.x) {
            report_violation(&err);
            return;
        }
        let id = self.timeline.schedule(
            self.tuning.boss.dark_energy_lifetime_ms,
            Continuation::DarkEnergyExpired,
        );
        self.dark_energy_task = Some(id);
        self.outbox.play(AudioCue::Dark);
        self.outbox.emit(GameEvent::DarkEnergyFired);
    }

    fn update_power_up(&mut self, dt_ms: f64) {
        if !self.rocket.alive {
            return;
        }
        self.power_up.advance_pickup(dt_ms, &self.tuning.field);
        let (power_up, mut ctx) = self.effect_context();
        power_up.act(&mut ctx);
        self.power_up.advance_projectiles(dt_ms);
    }

    /// Split borrow: the power-up controller plus the narrow view its effects use
    fn effect_context(&mut self) -> (&mut PowerUpController, EffectContext<'_>) {
        let ctx = EffectContext {
            rocket: &self.rocket,
            asteroids: &mut self.asteroids,
            repair: &mut self.repair,
            timeline: &mut self.timeline,
            out: &mut self.outbox,
            rng: &mut self.rng,
            field: &self.tuning.field,
            seconds: self.seconds,
            time_ms: self.timer_ms,
        };
        (&mut self.power_up, ctx)
    }

    // ---- continuations ----

    fn dispatch(&mut self, continuation: Continuation) {
        match continuation {
            Continuation::WarningFinished => {
                self.warning_visible = false;
                self.resume_music();
            }
            Continuation::BossFadedIn => {
                settle(self.boss.finish_spawn());
                log::info!("Boss active with {} health", self.boss.health);
            }
            Continuation::AsteroidsFaded => {
                let released = self.asteroids.release_all();
                log::debug!("released {released} faded asteroids");
            }
            Continuation::LaserCharged => {
                if self.rocket.alive && self.laser.on_charged(&self.rocket, self.seconds) {
                    self.outbox.play(AudioCue::Laser);
                    self.outbox.emit(GameEvent::LaserFired);
                } else {
                    self.laser.reset();
                }
            }
            Continuation::DarkEnergyExpired => {
                self.boss.expire_dark_energy();
                self.dark_energy_task = None;
            }
            Continuation::BossFadedOut => {
                self.rocket.alive = false;
                if self.rocket.moving {
                    self.outbox.pause(AudioCue::Rocket);
                }
                if self.rocket.out_of_bounds {
                    self.outbox.stop(AudioCue::OutOfBounds);
                }
                self.timeline
                    .schedule(self.tuning.boss.backdrop_fade_ms, Continuation::BackdropFaded);
            }
            Continuation::BackdropFaded => self.clear_level(),
            Continuation::LevelBannerDone => self.advance_level(),
            Continuation::PickupRevealed => self.power_up.on_pickup_revealed(&mut self.timeline),
            Continuation::PickupDrifting => self.power_up.on_pickup_drifting(&mut self.timeline),
            Continuation::PickupGone => self.power_up.on_pickup_gone(),
            Continuation::PowerUpObtained => {
                let (power_up, mut ctx) = self.effect_context();
                power_up.on_obtained(&mut ctx);
            }
            Continuation::BlastCharged => {
                let (power_up, mut ctx) = self.effect_context();
                power_up.on_blast_charged(&mut ctx);
            }
            Continuation::TurretRecharged => self.power_up.on_turret_recharged(),
            Continuation::ProjectileArrived { kind, handle } => {
                self.power_up.on_projectile_arrived(kind, handle);
            }
            Continuation::ShockwaveFinished => self
                .power_up
                .on_shockwave_finished(&mut self.timeline, &mut self.outbox),
            Continuation::PowerUpFaded => self.power_up.on_faded(),
        }
    }

    /// Run a pending effect continuation now instead of at its due time.
    /// Returns false if it already ran or was cancelled.
    pub fn complete_effect(&mut self, id: TaskId) -> bool {
        match self.timeline.take(id) {
            Some(continuation) => {
                self.dispatch(continuation);
                true
            }
            None => false,
        }
    }

    /// Earliest pending task for `continuation`, for presenters that finish effects early
    pub fn pending_task(&self, continuation: Continuation) -> Option<TaskId> {
        self.timeline.find(|c| *c == continuation)
    }

    // ---- collisions ----

    fn sweep_collisions(&mut self) {
        if self.rocket.alive {
            self.rocket_contacts();
        }
        if self.phase != SessionPhase::Playing {
            return;
        }
        self.laser_contacts();
        for kind in [ProjectileKind::RapidBlast, ProjectileKind::TurretBlast] {
            self.blast_contacts(kind);
        }
    }

    fn rocket_contacts(&mut self) {
        let rocket = [((), self.rocket.hitbox(&self.tuning.rocket))];

        let asteroids = self.asteroids.hitboxes(false);
        for ((), handle) in pair_hits(&rocket, &asteroids, false) {
            if let Some(asteroid) = self.asteroids.get_mut(handle) {
                asteroid.collided = true;
            }
            self.hit_rocket(Contact::RocketAsteroid);
            if self.phase != SessionPhase::Playing {
                return;
            }
        }

        if let Some(shot) = self.boss.dark_energy_rect(&self.tuning.boss) {
            if overlaps(&rocket[0].1, &shot) {
                self.hit_rocket(Contact::RocketDarkEnergy);
                if self.phase != SessionPhase::Playing {
                    return;
                }
            }
        }

        if self.boss.phase == BossPhase::Active
            && overlaps(&rocket[0].1, &self.boss.contact_rect(&self.tuning.boss))
        {
            self.hit_rocket(Contact::RocketBossBody);
            if self.phase != SessionPhase::Playing {
                return;
            }
        }

        if let Some(pickup) = self.power_up.pickup_rect() {
            if overlaps(&rocket[0].1, &pickup)
                && policy(Contact::RocketPickup, &self.tuning.damage).collects_pickup
            {
                settle(self.power_up.collect(&mut self.timeline, &mut self.outbox));
            }
        }
    }

    fn laser_contacts(&mut self) {
        let Some(bolt) = self.laser.hitbox(&self.tuning.laser) else {
            return;
        };
        let bolt = [((), bolt)];

        if !self.boss.is_engaged() {
            let rule = policy(Contact::LaserAsteroid, &self.tuning.damage);
            let asteroids = self.asteroids.hitboxes(false);
            for ((), handle) in pair_hits(&bolt, &asteroids, rule.consumes_shot) {
                if rule.destroys_asteroid {
                    self.destroy_asteroid(handle, DestroyCause::Laser);
                }
                if rule.consumes_shot {
                    self.laser.spend();
                }
            }
        } else if self.boss.phase == BossPhase::Active {
            let rule = policy(Contact::LaserBoss, &self.tuning.damage);
            let body = [((), self.boss.shot_rect(&self.tuning.boss))];
            if !pair_hits(&bolt, &body, true).is_empty() {
                if rule.consumes_shot {
                    self.laser.spend();
                }
                if rule.damages_boss {
                    self.hit_boss();
                }
            }
        }
    }

    fn blast_contacts(&mut self, kind: ProjectileKind) {
        let shots = self.power_up.projectile_hitboxes(kind);
        if shots.is_empty() {
            return;
        }

        if !self.boss.is_engaged() {
            let rule = policy(Contact::BlastAsteroid, &self.tuning.damage);
            let asteroids = self.asteroids.hitboxes(true);
            for (shot, handle) in pair_hits(&shots, &asteroids, rule.consumes_shot) {
                // Two shots may reach the same asteroid in one sweep
                if self.asteroids.get(handle).is_none() {
                    continue;
                }
                if rule.destroys_asteroid {
                    self.destroy_asteroid(handle, kind.destroy_cause());
                }
                if rule.consumes_shot {
                    settle(self.power_up.release_projectile(kind, shot));
                }
            }
        } else if self.boss.phase == BossPhase::Active {
            let rule = policy(Contact::BlastBoss, &self.tuning.damage);
            let body: [((), Rect); 1] = [((), self.boss.shot_rect(&self.tuning.boss))];
            for (shot, ()) in pair_hits(&shots, &body, true) {
                if rule.consumes_shot {
                    settle(self.power_up.release_projectile(kind, shot));
                }
                if rule.damages_boss {
                    self.hit_boss();
                }
            }
        }
    }

    fn destroy_asteroid(&mut self, handle: Handle, cause: DestroyCause) {
        settle(self.asteroids.destroy(handle));
        self.outbox.play(AudioCue::FireballExplosion);
        self.outbox.emit(GameEvent::AsteroidDestroyed { cause });
    }

    /// Contact damage through the rule of `contact`
    fn hit_rocket(&mut self, contact: Contact) {
        let Some(rule) = policy(contact, &self.tuning.damage).rocket_damage else {
            return;
        };
        // Cosmetic: more sparks the worse the rocket was before this hit
        let sparks = u32::from(self.repair.max() - self.repair.value()) * 10;
        let outcome = self.repair.apply_damage(rule, self.timer_ms);
        if outcome != DamageOutcome::Ignored {
            self.rocket.hit_sparks = sparks;
            log::debug!("{contact:?}: -{} repair", rule.amount);
        }
        self.on_damage(outcome, rule.amount);
    }

    fn on_damage(&mut self, outcome: DamageOutcome, amount: u8) {
        match outcome {
            DamageOutcome::Ignored => {}
            DamageOutcome::Applied { remaining } => {
                self.outbox.play(AudioCue::AsteroidHit);
                self.outbox.emit(GameEvent::RocketDamaged { amount, remaining });
            }
            DamageOutcome::Destroyed => {
                self.outbox.emit(GameEvent::RocketDamaged {
                    amount,
                    remaining: 0,
                });
                self.defeat();
            }
        }
    }

    fn hit_boss(&mut self) {
        if self.boss.phase != BossPhase::Active {
            return;
        }
        match self.boss.take_hit(self.timer_ms, &self.tuning.boss) {
            Ok(BossHit::Deflected) => {}
            Ok(BossHit::Damaged { health }) => {
                self.outbox.play(AudioCue::BossHit);
                self.outbox.emit(GameEvent::BossHit { health });
            }
            Ok(BossHit::Defeated) => {
                self.outbox.play(AudioCue::BossHit);
                self.outbox.emit(GameEvent::BossHit { health: 0 });
                self.on_boss_defeated();
            }
            Err(err) => report_violation(&err),
        }
    }

    fn on_boss_defeated(&mut self) {
        self.outbox.emit(GameEvent::BossDefeated);
        if let Some(id) = self.dark_energy_task.take() {
            self.timeline.cancel(id);
        }
        self.stop_music();
        self.timeline
            .schedule(self.tuning.boss.fade_out_ms, Continuation::BossFadedOut);
    }

    // ---- bookkeeping ----

    fn bookkeeping(&mut self) {
        let in_bounds = !self.rocket.out_of_bounds;
        if self
            .repair
            .regen(self.seconds, in_bounds, self.tuning.repair.regen_interval_secs)
        {
            self.outbox.play(AudioCue::RepairUpgrade);
            self.outbox.emit(GameEvent::Repaired {
                repair: self.repair.value(),
            });
        }

        self.update_seconds();
        if self.phase == SessionPhase::Playing {
            self.update_boss_gating();
        }
    }

    /// Once per elapsed second: out-of-bounds drain, power-up roll, expiry
    fn update_seconds(&mut self) {
        let elapsed = (self.timer_ms / 1000.0).floor() as u64;
        // A long tick may cross several seconds; each one gets its own pass
        while self.seconds < elapsed {
            self.seconds += 1;

            if self.rocket.out_of_bounds {
                let amount = self.tuning.damage.out_of_bounds;
                let outcome = self.repair.drain(amount);
                self.on_damage(outcome, amount);
                if self.phase != SessionPhase::Playing {
                    return;
                }
            }

            if self.power_up.is_idle()
                && !self.boss.is_engaged()
                && self.rng.random_bool(self.tuning.power_ups.roll_chance)
            {
                settle(
                    self.power_up
                        .offer(&mut self.rng, &mut self.timeline, &mut self.outbox),
                );
            }
            self.power_up
                .update_expiry(self.seconds, &mut self.timeline, &mut self.outbox);
        }
    }

    fn update_boss_gating(&mut self) {
        if !self.boss.is_engaged() && self.seconds >= self.tuning.boss.spawn_secs {
            self.engage_boss();
        } else if self.boss.phase == BossPhase::Dormant && self.seconds >= self.tuning.boss.warning_secs {
            self.warn_boss();
        }
    }

    fn warn_boss(&mut self) {
        if let Err(err) = self.boss.begin_warning() {
            report_violation(&err);
            return;
        }
        self.warning_visible = true;
        let pulses = f64::from(self.tuning.boss.warning_pulses);
        self.timeline.schedule(
            self.tuning.boss.warning_pulse_ms * pulses,
            Continuation::WarningFinished,
        );
        if let Some(music) = self.music {
            self.outbox.pause(music);
        }
        self.outbox.play(AudioCue::Warning);
        self.outbox.emit(GameEvent::BossWarning);
    }

    fn engage_boss(&mut self) {
        if let Err(err) = self.boss.begin_spawn() {
            report_violation(&err);
            return;
        }
        self.power_up
            .stop_running(&mut self.timeline, &mut self.outbox);
        let fading = self.asteroids.begin_fade();
        log::debug!("fading {fading} asteroids for the boss");
        self.timeline
            .schedule(self.tuning.asteroids.boss_fade_ms, Continuation::AsteroidsFaded);
        self.timeline
            .schedule(self.tuning.boss.fade_in_ms, Continuation::BossFadedIn);
        self.switch_music(AudioCue::Death);
        self.outbox.emit(GameEvent::BossSpawned);
    }

    // ---- audio ----

    fn switch_music(&mut self, cue: AudioCue) {
        if let Some(previous) = self.music.replace(cue) {
            if previous != cue {
                self.outbox.stop(previous);
            }
        }
        self.resume_music();
    }

    fn resume_music(&mut self) {
        if let Some(music) = self.music {
            if !self.rocket.out_of_bounds {
                self.outbox.play_loop(music);
            }
        }
    }

    fn stop_music(&mut self) {
        if let Some(music) = self.music.take() {
            self.outbox.stop(music);
        }
    }

    // ---- output ----

    /// Hand queued cues to the audio sink and keep the gameplay events
    fn flush(&mut self) {
        for command in self.outbox.cues.drain(..) {
            self.audio.apply(command);
        }
        self.game_events.append(&mut self.outbox.events);
    }

    fn present(&mut self) {
        let frame = self.frame();
        self.renderer.present(&frame);
    }

    /// Build the render frame for the current state
    pub fn frame(&self) -> Frame {
        let mut sprites = Vec::new();

        if self.phase == SessionPhase::Title {
            for (handle, asteroid) in self.title_field.iter() {
                sprites.push(
                    Sprite::new(SpriteKind::TitleAsteroid, asteroid.pos, asteroid.heading)
                        .with_id(handle.index() as u32),
                );
            }
            return Frame {
                tick: self.frame_tick,
                sprites,
                hud: Hud::default(),
            };
        }

        let rocket = Sprite::new(SpriteKind::Rocket, self.rocket.pos, self.rocket.angle);
        sprites.push(if self.rocket.alive { rocket } else { rocket.hidden() });

        for (handle, asteroid) in self.asteroids.iter() {
            sprites.push(
                Sprite::new(SpriteKind::Asteroid, asteroid.pos, asteroid.heading)
                    .with_id(handle.index() as u32),
            );
        }

        if self.laser.charging {
            sprites.push(Sprite::new(SpriteKind::LaserShine, self.rocket.tip(), self.rocket.angle));
        }
        if self.laser.hitbox(&self.tuning.laser).is_some() {
            sprites.push(Sprite::new(SpriteKind::Laser, self.laser.pos, crate::vector_angle(self.laser.dir)));
        }

        if self.warning_visible {
            sprites.push(Sprite::new(SpriteKind::BossWarning, field_centre(&self.tuning), 0.0));
        }
        if self.boss.is_engaged() {
            let boss = Sprite::new(SpriteKind::Boss, self.boss.pos + self.boss.size / 2.0, 0.0);
            let gone = self.boss.phase == BossPhase::Defeated && !self.rocket.alive;
            sprites.push(if gone { boss.hidden() } else { boss });
        }
        if self.boss.dark_energy.active {
            sprites.push(Sprite::new(SpriteKind::DarkEnergy, self.boss.dark_energy.pos, 0.0));
        }

        if let Some(pickup) = &self.power_up.pickup {
            let sprite = Sprite::new(SpriteKind::PowerUpPickup, pickup.pos, 0.0);
            sprites.push(if pickup.revealed { sprite } else { sprite.hidden() });
        }
        let running = matches!(self.power_up.phase, PowerUpPhase::Active | PowerUpPhase::Expiring);
        match (running, self.power_up.kind) {
            (true, Some(PowerUpKind::ForceField)) => {
                sprites.push(Sprite::new(SpriteKind::ForceField, self.power_up.pos, 0.0));
            }
            (true, Some(PowerUpKind::Shockwave)) => {
                sprites.push(Sprite::new(SpriteKind::Shockwave, self.power_up.pos, 0.0));
            }
            (true, Some(PowerUpKind::Turret)) => {
                sprites.push(Sprite::new(SpriteKind::Turret, self.power_up.pos, self.power_up.turret_angle));
            }
            _ => {}
        }
        for (kind, sprite_kind) in [
            (ProjectileKind::RapidBlast, SpriteKind::RapidBlast),
            (ProjectileKind::TurretBlast, SpriteKind::TurretBlast),
        ] {
            for (handle, shot) in self.power_up.pool(kind).iter() {
                sprites.push(Sprite::new(sprite_kind, shot.pos, shot.angle).with_id(handle.index() as u32));
            }
        }

        Frame {
            tick: self.frame_tick,
            sprites,
            hud: Hud {
                repair_percent: self.repair.percent(),
                boss_health: self.boss.is_engaged().then_some(self.boss.health),
                level: self.level,
                out_of_bounds: self.rocket.out_of_bounds,
            },
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            seed: self.seed,
            phase: self.phase,
            level: self.level,
            seconds: self.seconds,
            ticks: self.num_ticks,
            repair: self.repair.value(),
            rocket: self.rocket.pos,
            asteroids: self.asteroids.active_count(),
            boss_phase: self.boss.phase,
            boss_health: self.boss.health,
            power_up: self.power_up.kind,
        }
    }

    // ---- accessors ----

    /// Session events since the last drain
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Gameplay events since the last drain
    pub fn drain_game_events(&mut self) -> Vec<GameEvent> {
        self.flush();
        std::mem::take(&mut self.game_events)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn repair(&self) -> &RepairEconomy {
        &self.repair
    }

    pub fn rocket(&self) -> &Rocket {
        &self.rocket
    }

    pub fn asteroids(&self) -> &AsteroidField {
        &self.asteroids
    }

    pub fn title_field(&self) -> &AsteroidField {
        &self.title_field
    }

    pub fn boss(&self) -> &Boss {
        &self.boss
    }

    pub fn power_up(&self) -> &PowerUpController {
        &self.power_up
    }

    pub fn laser(&self) -> &Laser {
        &self.laser
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

fn field_centre(tuning: &Tuning) -> Vec2 {
    Vec2::new(tuning.field.width / 2.0, tuning.field.height / 2.0)
}
