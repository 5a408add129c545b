//! Inbound units and administrative signals.
//!
//! The wire layer decodes each physical read into an [`Inbound`] unit before
//! handing it to a [`SessionGateway`](crate::SessionGateway). Administrative
//! signals arrive out of band from whoever owns the session's lifetime.

// ============================================================================
// Inbound
// ============================================================================

/// A decoded unit read from a physical connection.
///
/// `T` is whatever the wire layer uses for units the session layer does not
/// understand; those are handed back untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<T> {
    /// Connection-establishment unit (an HTTP request or WebSocket upgrade).
    Connect,
    /// Application message, already decoded into its payload string.
    Message(String),
    /// Anything else, passed through to the next stage.
    Other(T),
}

// ============================================================================
// AdminSignal
// ============================================================================

/// Out-of-band signals accepted by a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminSignal {
    /// Close the session from the server side.
    CloseSession,
    /// Re-run connection establishment on the current channel, used when the
    /// owning task changes without a new physical connection.
    HandleSession,
}
