//! Session frames and their wire encoding.
//!
//! Three framing units exist: open, close and message. Encoding is
//! byte-exact because clients match on it.
//!
//! | Frame | Polling / Streaming | Duplex |
//! |-------|---------------------|--------|
//! | Open | `o\n` | `o\n` |
//! | Close | `c[<code>,"<reason>"]\n` | `c[<code>,"<reason>"]\n` |
//! | Message | `a["m1","m2"]\n` | each payload raw |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::to_string;

use crate::error::Result;
use crate::transport::TransportKind;

// ============================================================================
// Constants
// ============================================================================

/// Encoded open frame.
pub const OPEN_FRAME: &str = "o\n";

// ============================================================================
// CloseReason
// ============================================================================

/// Fixed close code/reason pairs emitted by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// A unit arrived on an interrupted session.
    Interrupted,
    /// A second connection tried to attach while one was still in use.
    AnotherConnectionOpen,
    /// The session is closed.
    GoAway,
}

impl CloseReason {
    /// Numeric close code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Interrupted => 1002,
            Self::AnotherConnectionOpen => 2010,
            Self::GoAway => 3000,
        }
    }

    /// Human-readable reason.
    #[inline]
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::Interrupted => "Connection interrupted",
            Self::AnotherConnectionOpen => "Another connection still open",
            Self::GoAway => "Go away!",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A session-protocol frame written to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Session opened.
    Open,
    /// Session closed or connection rejected.
    Close(CloseReason),
    /// One or more application messages, in order.
    Message(Vec<String>),
}

impl Frame {
    /// Creates a close frame.
    #[inline]
    #[must_use]
    pub const fn close(reason: CloseReason) -> Self {
        Self::Close(reason)
    }

    /// Creates a message frame carrying a single payload.
    #[inline]
    #[must_use]
    pub fn message(payload: impl Into<String>) -> Self {
        Self::Message(vec![payload.into()])
    }

    /// Encodes the frame for the given transport.
    ///
    /// Returns one wire unit per element. Only a duplex message frame with
    /// several payloads yields more than one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if JSON encoding fails.
    pub fn encode(&self, transport: TransportKind) -> Result<Vec<String>> {
        let encoded = match self {
            Self::Open => vec![OPEN_FRAME.to_string()],
            Self::Close(reason) => {
                let body = to_string(&(reason.code(), reason.reason()))?;
                vec![format!("c{body}\n")]
            }
            Self::Message(payloads) => match transport {
                TransportKind::Polling | TransportKind::Streaming => {
                    vec![format!("a{}\n", to_string(payloads)?)]
                }
                TransportKind::Duplex => payloads.clone(),
            },
        };

        Ok(encoded)
    }
}

// ============================================================================
// Tests
// ============================================================================
