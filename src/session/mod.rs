//! Durable logical sessions.
//!
//! A session outlives the physical connections that serve it. Each
//! connection attaches through a [`SessionGateway`](crate::SessionGateway);
//! the session decides whether the attach is accepted, rejected or answered
//! with a close frame, and buffers pushes while nothing is attached.
//!
//! # Concurrency
//!
//! ```text
//!   channel A task ──┐                      ┌── on_open / on_message / on_close
//!                    ├─► Mutex<SessionCore> ─┤        (lock released)
//!   channel B task ──┘   transition()       └── channel writes (enqueue only)
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `state` | Lifecycle states |
//! | `machine` | State machine and events |
//! | `context` | Protocol handler trait and push handle |
//! | `entity` | The shared session entity |
//! | `registry` | Sessions keyed by id |

// ============================================================================
// Submodules
// ============================================================================

/// Session lifecycle states.
pub mod state;

/// State machine, events and snapshots.
pub mod machine;

/// Protocol-facing handler trait and context.
pub mod context;

/// Session entity.
pub mod entity;

/// Session registry.
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use context::{SessionContext, SessionHandler};
pub use machine::{Effect, SessionCore, SessionEvent, SessionSnapshot};
pub use entity::Session;
pub use registry::{HandlerFactory, SessionRegistry};
pub use state::SessionState;
