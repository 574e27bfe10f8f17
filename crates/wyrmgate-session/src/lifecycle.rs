//! Session lifecycle state machine.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Where a session is in its life.
///
/// Transitions only move forward:
///
/// ```text
/// Connecting ──on_connected──→ Active ──fatal error / idle──→ Closing ──teardown──→ Closed
///     └──────────────────────────────────────────────────────────┘
/// ```
///
/// - **Connecting**: accepted, not yet attached. Only `on_connected` is valid.
/// - **Active**: registered; frames are decrypted and dispatched, sends go out.
/// - **Closing**: the connection is shutting down. Sends are dropped and
///   inbound frames are ignored. Only teardown does anything.
/// - **Closed**: removed from the registry, resources released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LifecycleState {
    Connecting = 0,
    Active = 1,
    Closing = 2,
    Closed = 3,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Active,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Lock-free holder for a [`LifecycleState`] that can only move forward.
#[derive(Debug)]
pub(crate) struct AtomicLifecycle(AtomicU8);

impl AtomicLifecycle {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Connecting as u8))
    }

    pub(crate) fn load(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves from exactly `from` to `to`. Returns the observed state on
    /// failure.
    pub(crate) fn transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), LifecycleState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(LifecycleState::from_u8)
    }

    /// Moves forward to `to` unless already past it. Returns the previous
    /// state.
    pub(crate) fn advance(&self, to: LifecycleState) -> LifecycleState {
        LifecycleState::from_u8(self.0.fetch_max(to as u8, Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_from_expected_state_succeeds() {
        let state = AtomicLifecycle::new();
        assert!(state.transition(LifecycleState::Connecting, LifecycleState::Active).is_ok());
        assert_eq!(state.load(), LifecycleState::Active);
    }

    #[test]
    fn test_transition_from_wrong_state_reports_actual() {
        let state = AtomicLifecycle::new();
        state.advance(LifecycleState::Closing);
        assert_eq!(
            state.transition(LifecycleState::Connecting, LifecycleState::Active),
            Err(LifecycleState::Closing)
        );
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let state = AtomicLifecycle::new();
        state.advance(LifecycleState::Closed);
        let previous = state.advance(LifecycleState::Closing);
        assert_eq!(previous, LifecycleState::Closed);
        assert_eq!(state.load(), LifecycleState::Closed);
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(LifecycleState::Closing.to_string(), "closing");
    }
}
