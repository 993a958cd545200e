//! Simulation error taxonomy

use thiserror::Error;

/// Failures raised by pools and state machines
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Acquire with no free slot; the spawn or shot is dropped for this tick
    #[error("pool `{pool}` exhausted (capacity {capacity})")]
    PoolExhausted { pool: &'static str, capacity: usize },
    /// Release of a dead slot or through a stale handle
    #[error("pool `{pool}`: slot {index} released twice or through a stale handle")]
    DoubleRelease { pool: &'static str, index: u32 },
    #[error("{machine}: `{event}` is not valid while {from}")]
    InvalidStateTransition {
        machine: &'static str,
        from: String,
        event: &'static str,
    },
    #[error("resource value {value} outside [0, {max}]")]
    OutOfRangeResource { value: i64, max: u8 },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn transition(machine: &'static str, from: impl std::fmt::Debug, event: &'static str) -> Self {
        Self::InvalidStateTransition {
            machine,
            from: format!("{from:?}"),
            event,
        }
    }

    /// Resource-bound failures are expected under load; everything else is a bug
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PoolExhausted { .. })
    }
}

/// Report a programmer error: fatal in debug builds, a logged no-op in release
pub fn report_violation(err: &SimError) {
    log::error!("simulation invariant violated: {err}");
    debug_assert!(false, "simulation invariant violated: {err}");
}

/// Drop a recoverable failure with a warning, escalate the rest
pub fn settle(result: SimResult<()>) {
    match result {
        Ok(()) => {}
        Err(err) if err.is_recoverable() => log::warn!("{err}; request dropped"),
        Err(err) => report_violation(&err),
    }
}
