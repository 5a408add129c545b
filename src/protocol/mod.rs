//! Session protocol message types.
//!
//! This module defines what flows across a physical connection from the
//! session layer's point of view.
//!
//! # Protocol Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `Frame` | Server → Client | Open / close / message framing |
//! | `Inbound` | Client → Server | Decoded connect, message or pass-through unit |
//! | `AdminSignal` | Out of band | Server-side close and re-handle |
//! | `Route` | Client → Server | Parsed session URL |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Frame type and byte-exact encoding |
//! | `event` | Inbound units and administrative signals |
//! | `route` | Session URL parsing |

// ============================================================================
// Submodules
// ============================================================================

/// Frame definitions and encoding.
pub mod frame;

/// Inbound unit and admin signal types.
pub mod event;

/// Session URL routing.
pub mod route;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{AdminSignal, Inbound};
pub use frame::{CloseReason, Frame, OPEN_FRAME};
pub use route::{Route, RouteAction};
