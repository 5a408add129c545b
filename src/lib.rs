//! SockJS-style session multiplexing.
//!
//! This library keeps durable logical sessions alive across short-lived
//! physical connections. A session outlives any single HTTP poll, HTTP
//! stream or WebSocket; each connection attaches to it, is accepted or
//! rejected with a wire-level close frame, and hands it inbound messages.
//! Pushes made while nothing is attached are buffered and delivered in order
//! on the next attach.
//!
//! # Architecture
//!
//! - **Transport (wire side)**: decodes reads into [`Inbound`] units and
//!   drains a [`Channel`]'s outbound queue
//! - **Session layer**: one [`Session`] per id, driven through a
//!   [`SessionGateway`] per connection
//! - **Protocol layer**: implements [`SessionHandler`], pushes through a
//!   [`SessionContext`]
//!
//! Key design principles:
//!
//! - At most one connection holds a session at a time (`in_use`)
//! - Session state changes in one lock-guarded transition function
//! - Handler callbacks run outside the session lock
//! - Conflicts are answered in-band with close frames, not errors
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sockjs_session::{
//!     Result, ServerConfig, SessionContext, SessionHandler, SessionId, SessionRegistry,
//!     SessionServer,
//! };
//!
//! struct Echo;
//!
//! impl SessionHandler for Echo {
//!     fn on_open(&self, context: SessionContext) {
//!         context.send("hello");
//!     }
//!
//!     fn on_message(&self, _message: &str) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     fn on_close(&self) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = Arc::new(SessionRegistry::new(|_id: &SessionId| {
//!         Box::new(Echo) as Box<dyn SessionHandler>
//!     }));
//!
//!     let config = ServerConfig::builder()
//!         .port(7777)
//!         .prefix("/simplepush")
//!         .websocket_protocol("push-notification")
//!         .build()?;
//!
//!     let server = SessionServer::bind(config, registry).await?;
//!     println!("Listening on {}", server.ws_url());
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Server configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`gateway`] | Per-connection entry point |
//! | [`identifiers`] | Session and channel ids |
//! | [`protocol`] | Frames, routes and inbound units |
//! | [`session`] | Session state machine and registry |
//! | [`transport`] | Connection shapes and the WebSocket server |

// ============================================================================
// Modules
// ============================================================================

/// Server configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Per-connection session gateway.
pub mod gateway;

/// Type-safe identifiers.
///
/// Newtype wrappers keep session and channel ids apart.
pub mod identifiers;

/// Wire frames, routes and inbound units.
pub mod protocol;

/// Durable sessions.
///
/// - [`Session`] - Shared session entity
/// - [`SessionRegistry`] - Sessions keyed by id
pub mod session;

/// Physical connection layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{ServerConfig, ServerConfigBuilder};

// Error types
pub use error::{Error, Result};

// Gateway
pub use gateway::SessionGateway;

// Identifier types
pub use identifiers::{ChannelId, SessionId};

// Protocol types
pub use protocol::{AdminSignal, CloseReason, Frame, Inbound, Route, RouteAction};

// Session types
pub use session::{
    HandlerFactory, Session, SessionContext, SessionHandler, SessionRegistry, SessionSnapshot,
    SessionState,
};

// Transport types
pub use transport::{Channel, DuplexConnection, Outbound, SessionServer, TransportKind};
