//! Error types for SockJS sessions.
//!
//! This module defines all error types used throughout the crate.
//!
//! Note that most session-level conflicts are *not* errors: a duplicate
//! attach, a unit arriving on a dead session, or a send with no writable
//! channel are all answered in-band with close frames or buffering. The
//! variants below cover configuration, routing, protocol handler failures
//! and the I/O underneath the bundled duplex server.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use sockjs_session::{Inbound, Result};
//!
//! fn relay(gateway: &SessionGateway, text: String) -> Result<()> {
//!     gateway.on_inbound::<()>(Inbound::Message(text))?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Routing | [`Error::InvalidSessionId`], [`Error::InvalidRoute`], [`Error::SessionNotFound`] |
//! | Protocol layer | [`Error::Handler`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::SessionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when server configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Routing Errors
    // ========================================================================
    /// Session identifier failed validation.
    #[error("Invalid session id {value:?}: {reason}")]
    InvalidSessionId {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Request path does not name a session transport.
    #[error("Invalid route: {path}")]
    InvalidRoute {
        /// The offending request path.
        path: String,
    },

    /// No session registered under the given id.
    #[error("Session not found: {session_id}")]
    SessionNotFound {
        /// The missing session ID.
        session_id: SessionId,
    },

    // ========================================================================
    // Protocol Layer Errors
    // ========================================================================
    /// The protocol handler rejected an inbound message.
    ///
    /// Raised by [`SessionHandler::on_message`](crate::SessionHandler::on_message)
    /// and propagated unchanged out of the gateway.
    #[error("Handler error: {message}")]
    Handler {
        /// Description of the handler failure.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Physical connection failed.
    ///
    /// Returned when a socket cannot be accepted or upgraded.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Physical connection closed unexpectedly.
    ///
    /// Produced from WebSocket errors that only say the peer is gone.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[source] WsError),
}

impl From<WsError> for Error {
    fn from(err: WsError) -> Self {
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => Self::ConnectionClosed,
            other => Self::WebSocket(other),
        }
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid session id error.
    #[inline]
    pub fn invalid_session_id(value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidSessionId {
            value: value.into(),
            reason,
        }
    }

    /// Creates an invalid route error.
    #[inline]
    pub fn invalid_route(path: impl Into<String>) -> Self {
        Self::InvalidRoute { path: path.into() }
    }

    /// Creates a session not found error.
    #[inline]
    pub fn session_not_found(session_id: SessionId) -> Self {
        Self::SessionNotFound { session_id }
    }

    /// Creates a protocol handler error.
    #[inline]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the protocol handler raised this error.
    #[inline]
    #[must_use]
    pub fn is_handler_error(&self) -> bool {
        matches!(self, Self::Handler { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("upgrade refused");
        assert_eq!(err.to_string(), "Connection failed: upgrade refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("prefix must start with '/'");
        assert_eq!(
            err.to_string(),
            "Configuration error: prefix must start with '/'"
        );
    }

    #[test]
    fn test_invalid_session_id_display() {
        let err = Error::invalid_session_id("a.b", "must not contain '.'");
        assert_eq!(
            err.to_string(),
            "Invalid session id \"a.b\": must not contain '.'"
        );
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
        assert!(!Error::handler("bad json").is_connection_error());
    }

    #[test]
    fn test_is_handler_error() {
        assert!(Error::handler("bad json").is_handler_error());
        assert!(!Error::ConnectionClosed.is_handler_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::AddrInUse, "port taken");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_closed_websocket_maps_to_connection_closed() {
        assert!(matches!(Error::from(WsError::ConnectionClosed), Error::ConnectionClosed));
        assert!(matches!(Error::from(WsError::AlreadyClosed), Error::ConnectionClosed));

        let err = Error::from(WsError::Io(IoError::new(ErrorKind::BrokenPipe, "reset")));
        assert!(matches!(err, Error::WebSocket(_)));
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
