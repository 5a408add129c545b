//! Session state machine.
//!
//! [`SessionCore`] holds every mutable field of a session and
//! [`SessionCore::transition`] is the single function that moves it between
//! states. It runs under the session lock, performs channel writes (which are
//! non-blocking enqueues) directly, and returns the protocol-layer
//! notifications as [`Effect`]s for the caller to run once the lock is
//! released.
//!
//! # Transitions
//!
//! | State | Attach | Result |
//! |-------|--------|--------|
//! | CONNECTING | any | open frame, OPEN, in use |
//! | OPEN, idle | any | OPEN, in use, buffer flushed |
//! | OPEN, in use | any | `c[2010,…]` to the newcomer, INTERRUPTED |
//! | INTERRUPTED | any | `c[1002,…]`, unchanged |
//! | CLOSED | any | `c[3000,…]`, in use reset |

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::identifiers::{ChannelId, SessionId};
use crate::protocol::{CloseReason, Frame};
use crate::transport::{Channel, TransportKind};

use super::SessionState;

// ============================================================================
// SessionEvent
// ============================================================================

/// Everything that can happen to a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A connection-establishment unit arrived on `channel`.
    UnitArrived(Channel),
    /// An application message arrived on `channel`.
    MessageArrived {
        /// Channel the message was read from.
        channel: Channel,
        /// Decoded payload, relayed verbatim.
        payload: String,
    },
    /// The peer behind a channel went away.
    ChannelClosed(ChannelId),
    /// Server-side close.
    AdminCloseSession,
    /// Re-run connection establishment on `channel`.
    AdminHandleSession(Channel),
}

// ============================================================================
// Effect
// ============================================================================

/// Work deferred until the session lock is released, run in order.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Call the handler's `on_open`.
    NotifyOpen,
    /// Run the transport's connect hook for the opening channel.
    Connect(Channel),
    /// Call the handler's `on_message`.
    NotifyMessage(String),
    /// Call the handler's `on_close`.
    NotifyClose,
    /// Run the transport's server-initiated close hook.
    ServerClose,
}

// ============================================================================
// SessionCore
// ============================================================================

/// Mutable state of one session.
#[derive(Debug)]
pub struct SessionCore {
    pub(crate) id: SessionId,
    pub(crate) state: SessionState,
    pub(crate) in_use: bool,
    /// Channel that opened the session, kept for its whole life.
    pub(crate) connection_context: Option<Channel>,
    /// Channel currently allowed to push.
    pub(crate) open_context: Option<Channel>,
    /// Channel of the most recent inbound unit.
    pub(crate) current_context: Option<Channel>,
    pub(crate) buffer: VecDeque<String>,
}

impl SessionCore {
    /// Creates the core of a new CONNECTING session.
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::Connecting,
            in_use: false,
            connection_context: None,
            open_context: None,
            current_context: None,
            buffer: VecDeque::new(),
        }
    }

    /// Applies `event` and returns the notifications to run afterwards.
    pub fn transition(&mut self, transport: TransportKind, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::UnitArrived(channel) => {
                let effects = self.handle_session(transport, channel.clone());
                self.bind_current(transport, channel);
                effects
            }

            SessionEvent::AdminHandleSession(channel) => {
                let effects = self.handle_session(transport, channel);
                if transport == TransportKind::Duplex {
                    self.current_context = self.open_context.clone();
                }
                effects
            }

            SessionEvent::MessageArrived { channel, payload } => {
                self.bind_current(transport, channel);
                vec![Effect::NotifyMessage(payload)]
            }

            SessionEvent::ChannelClosed(channel_id) => {
                trace!(session_id = %self.id, channel = %channel_id, "Channel inactive, releasing session");
                self.in_use = false;
                Vec::new()
            }

            SessionEvent::AdminCloseSession => {
                if self.state == SessionState::Closed {
                    debug!(session_id = %self.id, "Session already closed");
                    return Vec::new();
                }
                debug!(session_id = %self.id, from = %self.state, "Administrative close");
                self.state = SessionState::Closed;
                vec![Effect::NotifyClose, Effect::ServerClose]
            }
        }
    }

    /// Connection-establishment logic for a unit on `channel`.
    fn handle_session(&mut self, transport: TransportKind, channel: Channel) -> Vec<Effect> {
        debug!(
            session_id = %self.id,
            channel = %channel.id(),
            state = %self.state,
            in_use = self.in_use,
            "Handling session"
        );

        match self.state {
            SessionState::Connecting => {
                if channel.write(Frame::Open).is_err() {
                    debug!(session_id = %self.id, channel = %channel.id(), "Open frame not writable");
                }
                self.connection_context = Some(channel.clone());
                self.open_context = Some(channel.clone());
                self.in_use = true;
                self.state = SessionState::Open;
                vec![Effect::NotifyOpen, Effect::Connect(channel)]
            }

            SessionState::Open if self.in_use => {
                warn!(
                    session_id = %self.id,
                    channel = %channel.id(),
                    "Another connection still open"
                );
                channel.write_and_close(Frame::close(CloseReason::AnotherConnectionOpen));
                self.state = SessionState::Interrupted;
                Vec::new()
            }

            SessionState::Open => {
                self.in_use = true;
                self.open_context = Some(channel.clone());
                transport.on_open(self, &channel);
                Vec::new()
            }

            SessionState::Interrupted => {
                channel.write_and_close(Frame::close(CloseReason::Interrupted));
                Vec::new()
            }

            SessionState::Closed => {
                channel.write_and_close(Frame::close(CloseReason::GoAway));
                self.in_use = false;
                Vec::new()
            }
        }
    }

    /// Records `channel` as the source of the latest unit.
    ///
    /// A duplex session only ever talks through its accepted socket, so its
    /// current channel stays the open one; a rejected socket never takes over.
    fn bind_current(&mut self, transport: TransportKind, channel: Channel) {
        self.current_context = match transport {
            TransportKind::Duplex => self.open_context.clone(),
            TransportKind::Polling | TransportKind::Streaming => Some(channel),
        };
    }

    /// Writes every buffered message to `channel` as one frame.
    ///
    /// Returns the number of messages written. Nothing is written, and the
    /// buffer is kept, if the channel is not writable.
    pub(crate) fn flush(&mut self, channel: &Channel) -> usize {
        if self.buffer.is_empty() || !channel.is_writable() {
            return 0;
        }

        let pending: Vec<String> = self.buffer.drain(..).collect();
        let count = pending.len();

        match channel.write(Frame::Message(pending)) {
            Ok(()) => count,
            Err(rejected) => {
                self.requeue(rejected);
                0
            }
        }
    }

    /// Puts a rejected message frame back at the front of the buffer.
    pub(crate) fn requeue(&mut self, rejected: Frame) {
        if let Frame::Message(payloads) = rejected {
            for payload in payloads.into_iter().rev() {
                self.buffer.push_front(payload);
            }
        }
    }

    /// Returns a serializable view of the core.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            state: self.state,
            in_use: self.in_use,
            buffered: self.buffer.len(),
            connection_channel: self.connection_context.as_ref().map(Channel::id),
            open_channel: self.open_context.as_ref().map(Channel::id),
            current_channel: self.current_context.as_ref().map(Channel::id),
        }
    }
}

// ============================================================================
// SessionSnapshot
// ============================================================================

/// Point-in-time view of a session for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Session id.
    pub id: SessionId,
    /// Lifecycle state.
    pub state: SessionState,
    /// Whether a channel holds the exclusive attachment.
    pub in_use: bool,
    /// Number of messages waiting for a writable channel.
    pub buffered: usize,
    /// Channel that opened the session.
    pub connection_channel: Option<ChannelId>,
    /// Channel currently allowed to push.
    pub open_channel: Option<ChannelId>,
    /// Channel of the most recent unit.
    pub current_channel: Option<ChannelId>,
}

// ============================================================================
// Tests
// ============================================================================
