//! Monotonic lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::RuntimeFault;
use crate::observability::metrics;

/// Node lifecycle, in the only order it may be traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LifecycleState {
    Configuring = 0,
    Initializing = 1,
    Running = 2,
    Draining = 3,
    Stopped = 4,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Configuring,
            1 => Self::Initializing,
            2 => Self::Running,
            3 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuring => "configuring",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared, lock-free holder of the current state.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Configuring as u8))
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move forward to `to`. Returns the previous state.
    ///
    /// Fails when `to` is not strictly after the current state, so every
    /// state (including `Draining`) is entered at most once.
    pub fn advance(&self, to: LifecycleState) -> Result<LifecycleState, RuntimeFault> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let from = LifecycleState::from_u8(current);
            if to <= from {
                return Err(RuntimeFault::Transition { from, to });
            }
            match self
                .0
                .compare_exchange(current, to as u8, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    tracing::debug!(%from, %to, "Lifecycle transition");
                    metrics::record_lifecycle_state(to);
                    return Ok(from);
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_forward_only() {
        let cell = StateCell::new();
        assert_eq!(cell.advance(LifecycleState::Initializing).unwrap(), LifecycleState::Configuring);
        assert_eq!(cell.advance(LifecycleState::Running).unwrap(), LifecycleState::Initializing);
        assert!(cell.advance(LifecycleState::Initializing).is_err());
        assert_eq!(cell.get(), LifecycleState::Running);
    }

    #[test]
    fn test_stopped_is_terminal() {
        let cell = StateCell::new();
        cell.advance(LifecycleState::Stopped).unwrap();
        assert!(cell.advance(LifecycleState::Stopped).is_err());
    }

    #[test]
    fn test_draining_entered_once_under_contention() {
        let cell = Arc::new(StateCell::new());
        cell.advance(LifecycleState::Running).unwrap();

        let winners: usize = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || cell.advance(LifecycleState::Draining).is_ok())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
    }
}
