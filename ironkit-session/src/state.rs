/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Session lifecycle states.
//!
//! ```text
//! Connecting ──handshake──▶ Open
//!     ▲  │                   │
//!     └──┴──transport lost───┘
//!        │                   │
//!        └──disconnect/kick──┴──▶ Closing ──▶ Closed
//! ```
//!
//! `Closing` and `Closed` are terminal: a session never leaves them except
//! to move from `Closing` to `Closed`.

use std::fmt;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Opening a transport, handshaking, or waiting to reconnect.
    #[default]
    Connecting,
    /// Handshake completed; messages flow.
    Open,
    /// Kick sent; waiting for the transport to close.
    Closing,
    /// Torn down. Terminal.
    Closed,
}

impl SessionState {
    /// Returns true if the session is open.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the session is closing or closed.
    #[inline]
    #[must_use]
    pub const fn is_terminating(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }

    /// Returns true if moving to `next` is a valid transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Connecting | Self::Open | Self::Closing)
                | (Self::Open, Self::Connecting | Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert_eq!(SessionState::default(), SessionState::Connecting);
        assert!(SessionState::Open.is_open());
        assert!(!SessionState::Connecting.is_open());
        assert!(SessionState::Closing.is_terminating());
        assert!(SessionState::Closed.is_terminating());
        assert!(!SessionState::Open.is_terminating());
    }

    #[test]
    fn test_state_transitions() {
        use SessionState::*;

        assert!(Connecting.can_transition_to(Open));
        assert!(Connecting.can_transition_to(Connecting));
        assert!(Open.can_transition_to(Connecting));
        assert!(Open.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));

        assert!(!Open.can_transition_to(Open));
        assert!(!Closing.can_transition_to(Open));
        assert!(!Closing.can_transition_to(Connecting));
        assert!(!Closed.can_transition_to(Connecting));
        assert!(!Closed.can_transition_to(Closing));
        assert!(!Connecting.can_transition_to(Closed));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Closing.to_string(), "closing");
    }
}
