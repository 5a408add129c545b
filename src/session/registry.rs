//! Session registry keyed by session id.
//!
//! Every physical connection names the session it belongs to; the registry
//! maps that name to the shared [`Session`], creating it on first sight.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            SessionRegistry              │
//! │  ┌─────────────────────────────────┐    │
//! │  │ "a1b2" → Session (OPEN)         │    │
//! │  │ "c3d4" → Session (INTERRUPTED)  │    │
//! │  │ "e5f6" → Session (CLOSED)       │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! When to close or reap is up to the caller: this type offers the entry
//! points, not an eviction policy.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::transport::TransportKind;

use super::{Session, SessionEvent, SessionHandler};

// ============================================================================
// HandlerFactory
// ============================================================================

/// Creates the protocol handler for a new session.
pub trait HandlerFactory: Send + Sync + 'static {
    /// Returns a handler for the session `id`.
    fn create(&self, id: &SessionId) -> Box<dyn SessionHandler>;
}

impl<F> HandlerFactory for F
where
    F: Fn(&SessionId) -> Box<dyn SessionHandler> + Send + Sync + 'static,
{
    fn create(&self, id: &SessionId) -> Box<dyn SessionHandler> {
        self(id)
    }
}

// ============================================================================
// SessionRegistry
// ============================================================================

/// Thread-safe map of live sessions.
///
/// # Example
///
/// ```ignore
/// let registry = SessionRegistry::new(|_id: &SessionId| {
///     Box::new(PushHandler::default()) as Box<dyn SessionHandler>
/// });
///
/// let session = registry.get_or_create(id, TransportKind::Polling);
/// ```
pub struct SessionRegistry {
    /// Sessions by id.
    sessions: RwLock<FxHashMap<SessionId, Arc<Session>>>,

    /// Handler factory for new sessions.
    factory: Box<dyn HandlerFactory>,
}

// ============================================================================
// SessionRegistry - Constructor
// ============================================================================

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(factory: impl HandlerFactory) -> Self {
        Self {
            sessions: RwLock::new(FxHashMap::default()),
            factory: Box::new(factory),
        }
    }
}

// ============================================================================
// SessionRegistry - Public API
// ============================================================================

impl SessionRegistry {
    /// Returns the number of registered sessions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` if no session is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Looks up a session.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Returns the session for `id`, creating a CONNECTING one if needed.
    ///
    /// `transport` only applies to a newly created session.
    pub fn get_or_create(&self, id: SessionId, transport: TransportKind) -> Arc<Session> {
        if let Some(session) = self.get(&id) {
            return session;
        }

        let mut sessions = self.sessions.write();
        let session = sessions.entry(id).or_insert_with_key(|id| {
            Session::new(id.clone(), transport, self.factory.create(id))
        });

        Arc::clone(session)
    }

    /// Removes a session without closing it.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        let removed = self.sessions.write().remove(id);

        if removed.is_some() {
            debug!(session_id = %id, "Session removed from registry");
        }

        removed
    }
}

// ============================================================================
// SessionRegistry - Lifecycle
// ============================================================================

impl SessionRegistry {
    /// Closes a session administratively.
    ///
    /// The session stays registered so later units are told to go away;
    /// [`reap`](Self::reap) removes it.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionNotFound`] if no session has this id
    /// - [`Error::Handler`] if the handler's close callback path fails
    pub fn close_session(&self, id: &SessionId) -> Result<()> {
        let session = self
            .get(id)
            .ok_or_else(|| Error::session_not_found(id.clone()))?;

        session.dispatch(SessionEvent::AdminCloseSession)
    }

    /// Removes every INTERRUPTED or CLOSED session, returning how many.
    pub fn reap(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.state().is_terminal());
        let reaped = before - sessions.len();

        if reaped > 0 {
            debug!(reaped, remaining = sessions.len(), "Reaped terminal sessions");
        }

        reaped
    }

    /// Closes and removes every session.
    pub fn shutdown(&self) {
        info!("SessionRegistry shutting down");

        let sessions: Vec<_> = {
            let mut map = self.sessions.write();
            map.drain().map(|(_, session)| session).collect()
        };

        for session in sessions {
            if let Err(e) = session.dispatch(SessionEvent::AdminCloseSession) {
                debug!(session_id = %session.id(), error = %e, "Close during shutdown failed");
            }
        }

        info!("SessionRegistry shutdown complete");
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::session::SessionState;
    use crate::session::testing::RecordingHandler;
    use crate::transport::Channel;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(|_id: &SessionId| {
            Box::new(RecordingHandler::default()) as Box<dyn SessionHandler>
        })
    }

    fn id(value: &str) -> SessionId {
        SessionId::parse(value).expect("valid id")
    }

    #[test]
    fn test_get_or_create_reuses_session() {
        let registry = registry();
        let first = registry.get_or_create(id("s1"), TransportKind::Polling);
        let again = registry.get_or_create(id("s1"), TransportKind::Duplex);

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.transport(), TransportKind::Polling);
        assert_eq!(registry.len(), 1);
        assert_eq!(first.state(), SessionState::Connecting);
    }

    #[test]
    fn test_close_unknown_session() {
        let registry = registry();
        let err = registry.close_session(&id("missing")).expect_err("not found");
        assert!(matches!(err, Error::SessionNotFound { .. }));
    }

    #[test]
    fn test_close_keeps_session_until_reaped() {
        let registry = registry();
        let session = registry.get_or_create(id("s1"), TransportKind::Streaming);
        let (channel, _rx) = Channel::new(TransportKind::Streaming);
        session
            .dispatch(SessionEvent::UnitArrived(channel))
            .expect("dispatch");
        registry.get_or_create(id("s2"), TransportKind::Streaming);

        registry.close_session(&id("s1")).expect("close");
        assert_eq!(session.state(), SessionState::Closed);
        assert!(registry.get(&id("s1")).is_some());

        assert_eq!(registry.reap(), 1);
        assert!(registry.get(&id("s1")).is_none());
        assert!(registry.get(&id("s2")).is_some());
    }

    #[test]
    fn test_remove_nonexistent_session() {
        let registry = registry();
        assert!(registry.remove(&id("nope")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_shutdown_closes_all() {
        let registry = registry();
        let a = registry.get_or_create(id("a"), TransportKind::Polling);
        let b = registry.get_or_create(id("b"), TransportKind::Duplex);

        registry.shutdown();

        assert!(registry.is_empty());
        assert_eq!(a.state(), SessionState::Closed);
        assert_eq!(b.state(), SessionState::Closed);
    }
}
