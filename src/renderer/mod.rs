//! Render snapshot seam
//!
//! Each tick the simulation publishes a [`Frame`]: where every visible entity is
//! and which way it faces, plus HUD values. Presenters draw from it and never
//! write anything back.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Drawable entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpriteKind {
    Rocket,
    Asteroid,
    /// Asteroid on the idle title field
    TitleAsteroid,
    Boss,
    BossWarning,
    DarkEnergy,
    Laser,
    /// Muzzle glow while the laser charges
    LaserShine,
    PowerUpPickup,
    ForceField,
    Shockwave,
    Turret,
    RapidBlast,
    TurretBlast,
}

/// One entity's placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub kind: SpriteKind,
    /// Pool slot for pooled entities, 0 for singletons
    pub id: u32,
    pub pos: Vec2,
    pub angle: f32,
    pub visible: bool,
}

impl Sprite {
    pub fn new(kind: SpriteKind, pos: Vec2, angle: f32) -> Self {
        Self {
            kind,
            id: 0,
            pos,
            angle,
            visible: true,
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// HUD values
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Hud {
    /// Repair progress as shown to the player (0..=100)
    pub repair_percent: u32,
    /// Boss health once the encounter is engaged
    pub boss_health: Option<u32>,
    pub level: u32,
    pub out_of_bounds: bool,
}

/// Snapshot published once per tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    pub tick: u64,
    pub sprites: Vec<Sprite>,
    pub hud: Hud,
}

impl Frame {
    pub fn count(&self, kind: SpriteKind) -> usize {
        self.sprites
            .iter()
            .filter(|s| s.kind == kind && s.visible)
            .count()
    }

    pub fn find(&self, kind: SpriteKind) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.kind == kind)
    }
}

/// Receives per-tick frames
pub trait RenderSink {
    fn present(&mut self, frame: &Frame);
}

/// Drops frames (headless runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl RenderSink for NullRenderer {
    fn present(&mut self, _frame: &Frame) {}
}

/// Keeps the most recent frame
#[derive(Debug, Clone, Default)]
pub struct FrameRecorder {
    pub last: Option<Frame>,
    pub presented: u64,
}

impl RenderSink for FrameRecorder {
    fn present(&mut self, frame: &Frame) {
        self.last = Some(frame.clone());
        self.presented += 1;
    }
}
