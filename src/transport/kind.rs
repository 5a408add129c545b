//! Transport shapes and their session behaviour.
//!
//! Every transport-specific decision the session layer makes lives here as
//! an exhaustive `match` on [`TransportKind`]. Adding a variant fails to
//! compile until each hook states what it does.
//!
//! | Hook | Polling | Streaming | Duplex |
//! |------|---------|-----------|--------|
//! | `on_connect` | nothing (open frame fills the response) | flush buffer | flush buffer |
//! | `on_open` | flush buffer | flush buffer | flush buffer |
//! | `on_server_close` | close open channel | close open channel | write go-away, then close |
//! | `sending_channel` | open, else connection | open, else connection | open |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::protocol::{CloseReason, Frame};
use crate::session::SessionCore;

use super::Channel;

// ============================================================================
// TransportKind
// ============================================================================

/// Physical connection shape backing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Short-lived request/response; each response carries one frame.
    Polling,
    /// Long-lived response carrying many frames.
    Streaming,
    /// Full-duplex socket.
    Duplex,
}

impl TransportKind {
    /// Maps a URL transport segment to a connect transport.
    #[must_use]
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "xhr" => Some(Self::Polling),
            "xhr_streaming" => Some(Self::Streaming),
            "websocket" => Some(Self::Duplex),
            _ => None,
        }
    }

    /// URL transport segment for this transport.
    #[inline]
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Polling => "xhr",
            Self::Streaming => "xhr_streaming",
            Self::Duplex => "websocket",
        }
    }

    /// Returns `true` if a channel of this kind accepts exactly one frame.
    #[inline]
    #[must_use]
    pub const fn is_single_frame(self) -> bool {
        match self {
            Self::Polling => true,
            Self::Streaming | Self::Duplex => false,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

// ============================================================================
// Session Hooks
// ============================================================================

impl TransportKind {
    /// Runs after the first channel opened the session.
    pub(crate) fn on_connect(self, core: &mut SessionCore, channel: &Channel) {
        match self {
            // The open frame already consumed this response.
            Self::Polling => {}
            Self::Streaming | Self::Duplex => {
                core.flush(channel);
            }
        }
    }

    /// Runs when a channel attaches to an already open session.
    pub(crate) fn on_open(self, core: &mut SessionCore, channel: &Channel) {
        match self {
            Self::Polling | Self::Streaming | Self::Duplex => {
                let flushed = core.flush(channel);
                debug!(
                    session_id = %core.id,
                    channel = %channel.id(),
                    transport = %self,
                    flushed,
                    "Channel attached"
                );
            }
        }
    }

    /// Runs on a protocol-initiated close, after the handler was notified.
    ///
    /// Pending messages can never be delivered once the session is closed.
    pub(crate) fn on_close(self, core: &mut SessionCore) {
        let dropped = core.buffer.len();
        core.buffer.clear();

        if dropped > 0 {
            debug!(session_id = %core.id, transport = %self, dropped, "Discarded pending messages");
        }
    }

    /// Runs on an administrative close, after the handler was notified.
    pub(crate) fn on_server_close(self, core: &mut SessionCore) {
        match self {
            Self::Polling | Self::Streaming => {
                if let Some(channel) = &core.open_context {
                    channel.close();
                }
            }
            Self::Duplex => {
                if let Some(channel) = self.sending_channel(core).filter(|c| c.is_writable()) {
                    channel.write_and_close(Frame::close(CloseReason::GoAway));
                }
            }
        }

        core.buffer.clear();
    }

    /// Resolves the channel that asynchronous pushes go to.
    #[must_use]
    pub(crate) fn sending_channel(self, core: &SessionCore) -> Option<&Channel> {
        match self {
            Self::Polling | Self::Streaming => core
                .open_context
                .as_ref()
                .or(core.connection_context.as_ref()),
            Self::Duplex => core.open_context.as_ref(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
