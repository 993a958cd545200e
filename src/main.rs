//! Rocket Repair headless runner
//!
//! Runs one session with a scripted orbiting drag through the fixed-step loop
//! and prints a JSON summary. Usage:
//!
//! ```text
//! rocket-repair [tuning.json] [seed] [seconds]
//! ```

use std::error::Error;

use glam::Vec2;

use rocket_repair::audio::NullAudio;
use rocket_repair::consts::{FRAME_DT_MS, MAX_SUBSTEPS};
use rocket_repair::platform::InputSource;
use rocket_repair::renderer::NullRenderer;
use rocket_repair::{SessionController, SessionEvent, SessionPhase, Tuning};

/// Drags along a Lissajous curve around the field centre, letting go now and then
struct OrbitInput {
    centre: Vec2,
    reach: Vec2,
}

impl OrbitInput {
    /// Ticks held, then ticks released, per cycle
    const HOLD: u64 = 180;
    const RELEASE: u64 = 45;

    fn new(tuning: &Tuning) -> Self {
        let field = Vec2::new(tuning.field.width, tuning.field.height);
        Self {
            centre: field / 2.0,
            reach: field * 0.3,
        }
    }
}

impl InputSource for OrbitInput {
    fn poll(&mut self, tick: u64) -> Option<Vec2> {
        if tick % (Self::HOLD + Self::RELEASE) >= Self::HOLD {
            return None;
        }
        let t = tick as f32;
        Some(self.centre + Vec2::new((t * 0.013).cos(), (t * 0.021).sin()) * self.reach)
    }
}

/// Uneven host frame times, cycled
const HOST_FRAMES_MS: [f32; 4] = [14.0, 17.5, 19.0, 16.0];

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) if path != "-" => Tuning::load(&path)?,
        _ => Tuning::standard(),
    };
    let seed: u64 = match args.next() {
        Some(seed) => seed.parse()?,
        None => 0x5eed,
    };
    let seconds: f32 = match args.next() {
        Some(seconds) => seconds.parse()?,
        None => 120.0,
    };
    log::info!("Rocket Repair (headless) seed={seed} for {seconds}s");

    let input = OrbitInput::new(&tuning);
    let mut session =
        SessionController::with_collaborators(tuning, seed, input, NullAudio, NullRenderer);
    session.start()?;

    let mut accumulator = 0.0f32;
    let mut elapsed_ms = 0.0f32;
    let mut frame = 0usize;
    let mut gameplay_events = 0usize;
    while elapsed_ms < seconds * 1000.0 {
        let dt = HOST_FRAMES_MS[frame % HOST_FRAMES_MS.len()];
        frame += 1;
        elapsed_ms += dt;
        accumulator += dt;

        let mut substeps = 0;
        while accumulator >= FRAME_DT_MS && substeps < MAX_SUBSTEPS {
            session.tick(f64::from(FRAME_DT_MS));
            accumulator -= FRAME_DT_MS;
            substeps += 1;
        }

        for event in session.drain_events() {
            match event {
                SessionEvent::Start => log::info!("Session started"),
                SessionEvent::Restart => log::info!("Session restarted"),
                SessionEvent::LevelAdvance { level } => log::info!("Advanced to level {level}"),
                SessionEvent::GameOver { victory } => {
                    log::info!("Game over (victory: {victory}) at {}s", session.seconds())
                }
            }
        }
        for event in session.drain_game_events() {
            log::debug!("{event:?}");
            gameplay_events += 1;
        }
        if session.phase() == SessionPhase::GameOver {
            break;
        }
    }

    log::info!("{gameplay_events} gameplay events after {frame} host frames");
    println!("{}", serde_json::to_string_pretty(&session.summary())?);
    Ok(())
}
