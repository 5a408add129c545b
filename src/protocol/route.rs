//! Request path routing.
//!
//! Session URLs have the shape `<prefix>/<server>/<session>/<transport>`.
//! The transport segment selects either a connect route (`xhr`,
//! `xhr_streaming`, `websocket`) or the message-post route (`xhr_send`).

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::transport::TransportKind;

// ============================================================================
// Constants
// ============================================================================

/// Transport segment for posting client messages over polling transports.
const SEND_SEGMENT: &str = "xhr_send";

// ============================================================================
// Route
// ============================================================================

/// What a routed request asks the session layer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Attach a connection of the given transport shape.
    Connect(TransportKind),
    /// Deliver a client message.
    ///
    /// HTTP front ends answer this by feeding the request body to the
    /// session's gateway as [`Inbound::Message`](crate::protocol::Inbound::Message).
    /// [`SessionServer`](crate::transport::SessionServer) only serves duplex
    /// connections and rejects these routes during the handshake.
    Send,
}

/// A parsed session URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Server segment, used by clients for sticky load balancing.
    pub server_id: String,
    /// Target session.
    pub session_id: SessionId,
    /// Requested action.
    pub action: RouteAction,
}

impl Route {
    /// Parses a request path below `prefix`.
    ///
    /// Any query string is ignored.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRoute`] if the path is outside the prefix, has the
    ///   wrong number of segments or names an unknown transport
    /// - [`Error::InvalidSessionId`] if the session segment is invalid
    pub fn parse(prefix: &str, path: &str) -> Result<Self> {
        let path_only = path.split('?').next().unwrap_or_default();
        let prefix = prefix.trim_end_matches('/');

        let rest = path_only
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| Error::invalid_route(path))?;

        let segments: Vec<&str> = rest.split('/').collect();
        let [server, session, transport] = segments.as_slice() else {
            return Err(Error::invalid_route(path));
        };

        if server.is_empty() || server.contains('.') {
            return Err(Error::invalid_route(path));
        }

        let action = if *transport == SEND_SEGMENT {
            RouteAction::Send
        } else {
            TransportKind::from_path_segment(transport)
                .map(RouteAction::Connect)
                .ok_or_else(|| Error::invalid_route(path))?
        };

        Ok(Self {
            server_id: (*server).to_string(),
            session_id: SessionId::parse(*session)?,
            action,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
