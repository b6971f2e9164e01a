//! Session lifecycle state.

use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

/// Lifecycle of a session. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SessionState {
    /// Connected but not yet identified to the gateway.
    Open = 0,
    /// The identify handshake was delivered.
    Identified = 1,
    /// Closed or destroyed. Terminal.
    Closed = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Open,
            1 => Self::Identified,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Identified => "identified",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Atomic cell enforcing monotonic state transitions.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self { Self(AtomicU8::new(SessionState::Open as u8)) }

    pub(crate) fn get(&self) -> SessionState { SessionState::from_u8(self.0.load(Ordering::Acquire)) }

    /// Move to `next` unless the session is already at or past it.
    ///
    /// Returns the previous state when the transition happened.
    pub(crate) fn advance(&self, next: SessionState) -> Option<SessionState> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < next as u8).then_some(next as u8)
            })
            .ok()
            .map(SessionState::from_u8)
    }
}
