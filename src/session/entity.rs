//! The session entity.
//!
//! A [`Session`] pairs the lock-guarded [`SessionCore`] with its protocol
//! handler and transport kind. All state changes go through
//! [`Session::dispatch`]; the push path goes through [`Session::send`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::identifiers::SessionId;
use crate::protocol::{CloseReason, Frame};
use crate::transport::{Channel, TransportKind};

use super::machine::{Effect, SessionCore, SessionEvent, SessionSnapshot};
use super::{SessionContext, SessionHandler, SessionState};

// ============================================================================
// Session
// ============================================================================

/// A logical client conversation spanning many physical connections.
///
/// # Thread Safety
///
/// `Session` is shared as `Arc<Session>` between the tasks of every channel
/// that ever attaches to it. The in-use check-and-set and buffer
/// append/drain happen under one lock, so they are linearizable.
pub struct Session {
    id: SessionId,
    transport: TransportKind,
    core: Mutex<SessionCore>,
    handler: Box<dyn SessionHandler>,
}

impl Session {
    /// Creates a CONNECTING session.
    #[must_use]
    pub fn new(id: SessionId, transport: TransportKind, handler: Box<dyn SessionHandler>) -> Arc<Self> {
        debug!(session_id = %id, %transport, "Session created");

        Arc::new(Self {
            core: Mutex::new(SessionCore::new(id.clone())),
            id,
            transport,
            handler,
        })
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the transport kind the session was created with.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.core.lock().state
    }

    /// Returns `true` while a channel holds the exclusive attachment.
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.core.lock().in_use
    }

    /// Returns the number of buffered messages.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.core.lock().buffer.len()
    }

    /// Returns a diagnostic snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.core.lock().snapshot()
    }

    /// Channel that first established the session.
    #[must_use]
    pub fn connection_context(&self) -> Option<Channel> {
        self.core.lock().connection_context.clone()
    }

    /// Channel that handled the most recent inbound unit.
    #[must_use]
    pub fn current_context(&self) -> Option<Channel> {
        self.core.lock().current_context.clone()
    }

    /// Returns a protocol-facing handle to this session.
    #[must_use]
    pub fn context(self: &Arc<Self>) -> SessionContext {
        SessionContext::new(self)
    }

    /// Feeds an event through the state machine and runs its effects.
    ///
    /// # Errors
    ///
    /// Propagates a failure from the handler's `on_message`.
    pub fn dispatch(self: &Arc<Self>, event: SessionEvent) -> Result<()> {
        let effects = self.core.lock().transition(self.transport, event);

        for effect in effects {
            match effect {
                Effect::NotifyOpen => self.handler.on_open(self.context()),
                Effect::Connect(channel) => {
                    let mut core = self.core.lock();
                    self.transport.on_connect(&mut core, &channel);
                }
                Effect::NotifyMessage(payload) => self.handler.on_message(&payload)?,
                Effect::NotifyClose => self.handler.on_close(),
                Effect::ServerClose => {
                    let mut core = self.core.lock();
                    self.transport.on_server_close(&mut core);
                }
            }
        }

        Ok(())
    }

    /// Pushes a message, writing now if a channel is writable.
    ///
    /// The message joins the back of the buffer and the whole buffer is
    /// flushed when possible, so pushes are delivered in FIFO order.
    pub fn send(&self, message: String) {
        let mut core = self.core.lock();
        core.buffer.push_back(message);

        if let Some(channel) = self.transport.sending_channel(&core).cloned() {
            core.flush(&channel);
        }
    }

    /// Protocol-initiated close.
    ///
    /// Marks the session CLOSED, notifies the handler, then writes a go-away
    /// frame to the sending channel if it is writable and closes it once the
    /// frame is flushed. Closing a CLOSED session does nothing.
    pub fn close(&self) {
        {
            let mut core = self.core.lock();
            if core.state == SessionState::Closed {
                debug!(session_id = %self.id, "Close on closed session ignored");
                return;
            }
            core.state = SessionState::Closed;
        }

        self.handler.on_close();

        let mut core = self.core.lock();
        self.transport.on_close(&mut core);

        let sending = self
            .transport
            .sending_channel(&core)
            .filter(|channel| channel.is_writable());

        if let Some(channel) = sending {
            debug!(session_id = %self.id, channel = %channel.id(), "Writing close frame");
            channel.write_and_close(Frame::close(CloseReason::GoAway));
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .field("core", &*self.core.lock())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
