//! Protocol-facing session interface.
//!
//! The protocol layer implements [`SessionHandler`] and receives a
//! [`SessionContext`] in `on_open`, which it keeps for pushing messages and
//! closing the session later.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use tracing::trace;

use crate::error::Result;
use crate::identifiers::SessionId;
use crate::transport::Channel;

use super::{Session, SessionState};

// ============================================================================
// SessionHandler
// ============================================================================

/// Callbacks implemented by the protocol layer.
///
/// One handler instance serves one session. Callbacks run outside the session
/// lock and may call back into the [`SessionContext`].
pub trait SessionHandler: Send + Sync + 'static {
    /// The session completed its handshake.
    fn on_open(&self, context: SessionContext);

    /// An application message arrived.
    ///
    /// # Errors
    ///
    /// A malformed payload may be rejected; the error propagates out of the
    /// gateway to the connection pipeline.
    fn on_message(&self, message: &str) -> Result<()>;

    /// The session closed.
    fn on_close(&self);
}

// ============================================================================
// SessionContext
// ============================================================================

/// Handle the protocol layer uses to talk back to its session.
///
/// Holds the session weakly: once the registry drops a session, sends through
/// a stale context are discarded.
#[derive(Clone)]
pub struct SessionContext {
    id: SessionId,
    session: Weak<Session>,
}

impl SessionContext {
    pub(crate) fn new(session: &Arc<Session>) -> Self {
        Self {
            id: session.id().clone(),
            session: Arc::downgrade(session),
        }
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the session state, or `None` if the session is gone.
    #[must_use]
    pub fn state(&self) -> Option<SessionState> {
        self.session.upgrade().map(|session| session.state())
    }

    /// Pushes a message to the client.
    ///
    /// Writes immediately if a channel is writable, buffers otherwise.
    pub fn send(&self, message: impl Into<String>) {
        match self.session.upgrade() {
            Some(session) => session.send(message.into()),
            None => trace!(session_id = %self.id, "Send on dropped session discarded"),
        }
    }

    /// Closes the session from the protocol side.
    pub fn close(&self) {
        if let Some(session) = self.session.upgrade() {
            session.close();
        }
    }

    /// Channel that first established the session.
    #[must_use]
    pub fn connection_context(&self) -> Option<Channel> {
        self.session
            .upgrade()
            .and_then(|session| session.connection_context())
    }

    /// Channel that handled the most recent inbound unit.
    #[must_use]
    pub fn current_context(&self) -> Option<Channel> {
        self.session
            .upgrade()
            .and_then(|session| session.current_context())
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session_id", &self.id)
            .finish_non_exhaustive()
    }
}
