//! Physical connection layer.
//!
//! A session is served by a succession of physical connections. This module
//! describes their shapes ([`TransportKind`]), the outbound handle the
//! session writes through ([`Channel`]) and the bundled WebSocket front end.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   Outbound queue   ┌──────────────────┐
//! │    Session      │───────────────────►│ DuplexConnection │◄──── WebSocket
//! │  (via Channel)  │                    │   (event loop)   │      client
//! └─────────────────┘◄───────────────────└──────────────────┘
//!                       SessionGateway
//! ```
//!
//! Polling and streaming HTTP front ends are not bundled; they drive a
//! [`Channel`] and a [`SessionGateway`](crate::SessionGateway) the same way
//! [`DuplexConnection`] does.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `kind` | Transport shapes and their session hooks |
//! | `channel` | Outbound handle to one connection |
//! | `connection` | WebSocket connection and event loop |
//! | `server` | WebSocket server binding and acceptance |

// ============================================================================
// Submodules
// ============================================================================

/// Transport shapes.
pub mod kind;

/// Outbound connection handle.
pub mod channel;

/// WebSocket connection and event loop.
pub mod connection;

/// WebSocket server for duplex sessions.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Channel, Outbound, OutboundReceiver};
pub use connection::DuplexConnection;
pub use kind::TransportKind;
pub use server::SessionServer;
