//! Virtual timeline of deferred continuations
//!
//! Effects that take wall time (fades, charge-ups, projectile flight) register a
//! [`Continuation`] here instead of polling. Each one is delivered exactly once
//! when its due time passes, or never if cancelled first. A presenter may also
//! finish an effect early through [`Timeline::take`].

use serde::{Deserialize, Serialize};

use super::pool::Handle;
use super::powerup::ProjectileKind;

/// Identifier of a scheduled continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

/// Work resumed when an effect completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Continuation {
    /// Boss warning pulses finished
    WarningFinished,
    /// Boss fade-in done, boss becomes interactive
    BossFadedIn,
    /// Defeated boss has faded out
    BossFadedOut,
    /// Backdrop faded after boss defeat
    BackdropFaded,
    /// Level banner finished, next level starts
    LevelBannerDone,
    /// Asteroids faded when the boss arrived
    AsteroidsFaded,
    LaserCharged,
    DarkEnergyExpired,
    /// Pickup spawn burst done, pickup visible and collectable
    PickupRevealed,
    /// Pickup fade-in done, drifting down
    PickupDrifting,
    /// Pickup drifted off uncollected
    PickupGone,
    /// Obtain effect done, power-up selected
    PowerUpObtained,
    BlastCharged,
    TurretRecharged,
    ProjectileArrived { kind: ProjectileKind, handle: Handle },
    ShockwaveFinished,
    /// Expiry animation (shrink/fade) done
    PowerUpFaded,
}

#[derive(Debug, Clone)]
struct Task {
    id: TaskId,
    due_ms: f64,
    continuation: Continuation,
}

/// Owned virtual clock plus pending continuations
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    now_ms: f64,
    next_id: u64,
    pending: Vec<Task>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Schedule `continuation` to run `delay_ms` from now
    pub fn schedule(&mut self, delay_ms: f64, continuation: Continuation) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.pending.push(Task {
            id,
            due_ms: self.now_ms + delay_ms.max(0.0),
            continuation,
        });
        log::debug!("timeline: scheduled {continuation:?} as {id:?} in {delay_ms}ms");
        id
    }

    /// Drop a pending continuation; returns false if it already ran or was cancelled
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.take(id).is_some()
    }

    /// Cancel every pending continuation matching `pred`
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&Continuation) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|task| !pred(&task.continuation));
        before - self.pending.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Remove a pending continuation so the caller can run it now
    pub fn take(&mut self, id: TaskId) -> Option<Continuation> {
        let pos = self.pending.iter().position(|task| task.id == id)?;
        Some(self.pending.remove(pos).continuation)
    }

    /// Advance the clock and return every continuation now due, ordered by due
    /// time then scheduling order
    pub fn advance(&mut self, dt_ms: f64) -> Vec<Continuation> {
        self.now_ms += dt_ms.max(0.0);
        let now = self.now_ms;

        let mut due: Vec<Task> = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due_ms <= now {
                due.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.id.cmp(&b.id)));
        due.into_iter().map(|task| task.continuation).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest-scheduled pending task matching `pred`
    pub fn find(&self, mut pred: impl FnMut(&Continuation) -> bool) -> Option<TaskId> {
        self.pending
            .iter()
            .filter(|task| pred(&task.continuation))
            .map(|task| task.id)
            .min()
    }

    /// Whether any pending continuation matches `pred`
    pub fn any(&self, mut pred: impl FnMut(&Continuation) -> bool) -> bool {
        self.pending.iter().any(|task| pred(&task.continuation))
    }
}
