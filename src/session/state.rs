//! Session lifecycle states.

use std::fmt;

use serde::Serialize;

/// Lifecycle state of a session.
///
/// ```text
/// CONNECTING ──first unit──► OPEN ──rejected attach──► INTERRUPTED
///      │                      │                            │
///      └──────── close ───────┴────────── close ───────────┴──► CLOSED
/// ```
///
/// INTERRUPTED has no way back to OPEN; the session waits to be reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Created, no unit handled yet.
    #[default]
    Connecting,
    /// Handshake done.
    Open,
    /// A concurrent attach was rejected.
    Interrupted,
    /// Closed by the protocol layer or administratively.
    Closed,
}

impl SessionState {
    /// Returns `true` for states the session never leaves except to close
    /// or be reaped.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Interrupted | Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Interrupted => "INTERRUPTED",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_connecting() {
        assert_eq!(SessionState::default(), SessionState::Connecting);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SessionState::Connecting.is_terminal());
        assert!(!SessionState::Open.is_terminal());
        assert!(SessionState::Interrupted.is_terminal());
        assert!(SessionState::Closed.is_terminal());
    }

    #[test]
    fn test_serialize_matches_display() {
        let json = serde_json::to_string(&SessionState::Interrupted).expect("serialize");
        assert_eq!(json, format!("\"{}\"", SessionState::Interrupted));
    }
}
