//! Input sources
//!
//! The simulation asks for the drag target once per tick. `None` means the
//! player is not touching the screen.

use std::collections::VecDeque;

use glam::Vec2;

/// Supplies the drag target for the coming tick
pub trait InputSource {
    fn poll(&mut self, tick: u64) -> Option<Vec2>;
}

/// Input set directly by the host (or a test) between ticks
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualInput {
    pub drag: Option<Vec2>,
}

impl ManualInput {
    pub fn press(&mut self, target: Vec2) {
        self.drag = Some(target);
    }

    pub fn release(&mut self) {
        self.drag = None;
    }
}

impl InputSource for ManualInput {
    fn poll(&mut self, _tick: u64) -> Option<Vec2> {
        self.drag
    }
}

/// Replays a fixed sequence of per-tick targets, then reports released
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    frames: VecDeque<Option<Vec2>>,
}

impl ScriptedInput {
    /// Hold `target` for `ticks` ticks
    pub fn hold(mut self, target: Vec2, ticks: usize) -> Self {
        self.frames.extend(std::iter::repeat_n(Some(target), ticks));
        self
    }

    /// Release for `ticks` ticks
    pub fn idle(mut self, ticks: usize) -> Self {
        self.frames.extend(std::iter::repeat_n(None, ticks));
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, _tick: u64) -> Option<Vec2> {
        self.frames.pop_front().flatten()
    }
}
