//! Fire-and-forget audio cues
//!
//! The simulation never plays sound itself. It queues [`CueCommand`]s during a
//! tick and hands them to whatever [`AudioSink`] the host installed.

use serde::{Deserialize, Serialize};

/// Sound cue names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCue {
    /// Thruster loop while dragging
    Rocket,
    /// Auxiliary laser fired
    Laser,
    /// Rocket destroyed
    RocketExplosion,
    /// Asteroid destroyed
    FireballExplosion,
    /// Music loop for the asteroid phase
    Panic,
    /// Music loop for the boss phase
    Death,
    BossHit,
    /// Boss arrival warning
    Warning,
    /// Alarm loop while outside the field
    OutOfBounds,
    RepairUpgrade,
    NextLevel,
    Turret,
    /// Double repair
    LifeUp,
    /// Rapid blast fired
    RedLaser,
    PowerSpawn,
    /// Rocket damaged
    AsteroidHit,
    /// Dark energy released
    Dark,
    Force,
    Obtained,
    AsteroidFlyBy,
}

impl AudioCue {
    /// Asset name of the cue
    pub fn name(&self) -> &'static str {
        match self {
            AudioCue::Rocket => "rocket",
            AudioCue::Laser => "laser",
            AudioCue::RocketExplosion => "rocketExplosion",
            AudioCue::FireballExplosion => "fireBallExplosion",
            AudioCue::Panic => "panic",
            AudioCue::Death => "death",
            AudioCue::BossHit => "bossHit",
            AudioCue::Warning => "warning",
            AudioCue::OutOfBounds => "outOfBounds",
            AudioCue::RepairUpgrade => "repairUpgrade",
            AudioCue::NextLevel => "nextLevel",
            AudioCue::Turret => "turret",
            AudioCue::LifeUp => "lifeUp",
            AudioCue::RedLaser => "redLaser",
            AudioCue::PowerSpawn => "powerSpawn",
            AudioCue::AsteroidHit => "asteroidHit",
            AudioCue::Dark => "dark",
            AudioCue::Force => "force",
            AudioCue::Obtained => "obtained",
            AudioCue::AsteroidFlyBy => "asteroidFlyBy",
        }
    }

    /// Whether this cue is a background music track
    pub fn is_music(&self) -> bool {
        matches!(self, AudioCue::Panic | AudioCue::Death)
    }
}

/// One instruction for the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueCommand {
    Play { cue: AudioCue, looped: bool },
    Pause(AudioCue),
    Stop(AudioCue),
}

impl CueCommand {
    pub fn once(cue: AudioCue) -> Self {
        CueCommand::Play { cue, looped: false }
    }

    pub fn looped(cue: AudioCue) -> Self {
        CueCommand::Play { cue, looped: true }
    }

    pub fn cue(&self) -> AudioCue {
        match *self {
            CueCommand::Play { cue, .. } | CueCommand::Pause(cue) | CueCommand::Stop(cue) => cue,
        }
    }
}

/// Receives cue commands; never awaited, never read back
pub trait AudioSink {
    fn apply(&mut self, command: CueCommand);
}

/// Discards every cue (headless runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn apply(&mut self, _command: CueCommand) {}
}

/// Records cues and tracks which loops are currently running
#[derive(Debug, Clone, Default)]
pub struct CueLog {
    pub commands: Vec<CueCommand>,
    loops: Vec<AudioCue>,
}

impl CueLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loops that were started and not paused or stopped since
    pub fn running_loops(&self) -> &[AudioCue] {
        &self.loops
    }

    pub fn played(&self, cue: AudioCue) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, CueCommand::Play { cue: played, .. } if *played == cue))
            .count()
    }

    /// Currently running music track, if any
    pub fn music(&self) -> Option<AudioCue> {
        self.loops.iter().copied().find(AudioCue::is_music)
    }
}

impl AudioSink for CueLog {
    fn apply(&mut self, command: CueCommand) {
        match command {
            CueCommand::Play { cue, looped: true } => {
                if !self.loops.contains(&cue) {
                    self.loops.push(cue);
                }
            }
            CueCommand::Play { looped: false, .. } => {}
            CueCommand::Pause(cue) | CueCommand::Stop(cue) => self.loops.retain(|c| *c != cue),
        }
        self.commands.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_log_tracks_loops() {
        let mut log = CueLog::new();
        log.apply(CueCommand::looped(AudioCue::Panic));
        log.apply(CueCommand::looped(AudioCue::Panic));
        log.apply(CueCommand::once(AudioCue::Laser));
        assert_eq!(log.running_loops(), &[AudioCue::Panic]);
        assert_eq!(log.music(), Some(AudioCue::Panic));

        log.apply(CueCommand::Stop(AudioCue::Panic));
        log.apply(CueCommand::looped(AudioCue::Death));
        assert_eq!(log.music(), Some(AudioCue::Death));
        assert_eq!(log.played(AudioCue::Panic), 2);
    }

    #[test]
    fn test_cue_names() {
        assert_eq!(AudioCue::FireballExplosion.name(), "fireBallExplosion");
        assert_eq!(CueCommand::Pause(AudioCue::Rocket).cue(), AudioCue::Rocket);
        assert!(!AudioCue::Warning.is_music());
    }
}
