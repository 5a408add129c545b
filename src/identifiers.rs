//! Type-safe identifiers for sessions and channels.
//!
//! Newtype wrappers prevent mixing a logical session id with the id of the
//! physical channel currently serving it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// SessionId
// ============================================================================

/// Opaque, stable identifier of a logical session.
///
/// Chosen by the client and carried in the request path, so it is validated
/// on construction: non-empty, and free of `.` and `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Parses and validates a client-supplied session id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSessionId`] if the value is empty or contains
    /// `.` or `/`.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();

        if value.is_empty() {
            return Err(Error::invalid_session_id(value, "must not be empty"));
        }
        if value.contains('.') {
            return Err(Error::invalid_session_id(value, "must not contain '.'"));
        }
        if value.contains('/') {
            return Err(Error::invalid_session_id(value, "must not contain '/'"));
        }

        Ok(Self(value))
    }

    /// Generates a fresh random session id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ChannelId
// ============================================================================

/// Counter backing [`ChannelId::next`].
static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a physical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Allocates the next channel id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
