//! Outbound handle to one physical connection.
//!
//! A [`Channel`] is what the session layer holds on to: it can tell whether
//! the connection is still writable and enqueue frames for the connection's
//! writer task. Writes never block; the writer drains the paired
//! [`OutboundReceiver`] in order.
//!
//! # Writability
//!
//! A channel is writable while it is both *active* (the peer has not gone
//! away) and *registered* (its writer is still draining and no close has been
//! requested). A channel mid-teardown therefore reads as not writable, so
//! callers buffer instead of writing after close.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc::{self, error::SendError};
use tracing::trace;

use crate::identifiers::ChannelId;
use crate::protocol::Frame;

use super::TransportKind;

// ============================================================================
// Types
// ============================================================================

/// Receiving half drained by the connection's writer task.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

// ============================================================================
// Outbound
// ============================================================================

/// Work item for a connection's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write and flush a frame.
    Frame(Frame),
    /// Write and flush a frame, then close the connection once the flush has
    /// completed. Skip the frame if the connection is already inactive.
    CloseAfter(Frame),
    /// Close the connection without writing.
    Close,
}

// ============================================================================
// Channel
// ============================================================================

/// Shared state behind a [`Channel`].
struct ChannelInner {
    id: ChannelId,
    transport: TransportKind,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    active: AtomicBool,
    registered: AtomicBool,
}

/// Cloneable handle to one physical connection.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl Channel {
    /// Creates a channel and the receiver its writer task drains.
    #[must_use]
    pub fn new(transport: TransportKind) -> (Self, OutboundReceiver) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let channel = Self {
            inner: Arc::new(ChannelInner {
                id: ChannelId::next(),
                transport,
                outbound_tx,
                active: AtomicBool::new(true),
                registered: AtomicBool::new(true),
            }),
        };

        (channel, outbound_rx)
    }

    /// Returns the channel id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// Returns the transport shape of this connection.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> TransportKind {
        self.inner.transport
    }

    /// Returns `true` while the peer is connected.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Returns `true` while the writer is draining and no close was requested.
    #[inline]
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.inner.registered.load(Ordering::Acquire) && !self.inner.outbound_tx.is_closed()
    }

    /// Returns `true` if a frame written now would reach the peer.
    #[inline]
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.is_active() && self.is_registered()
    }

    /// Enqueues a frame.
    ///
    /// Single-frame channels deregister on their first write.
    ///
    /// # Errors
    ///
    /// Hands the frame back if the channel was not writable.
    pub fn write(&self, frame: Frame) -> Result<(), Frame> {
        if !self.claim() {
            return Err(frame);
        }

        if let Err(SendError(rejected)) = self.inner.outbound_tx.send(Outbound::Frame(frame)) {
            self.deregister();
            if let Outbound::Frame(frame) = rejected {
                return Err(frame);
            }
        }

        trace!(channel = %self.id(), "Frame queued");
        Ok(())
    }

    /// Enqueues a frame followed by a close of the connection.
    ///
    /// The channel stops being writable immediately. Returns `false` if the
    /// channel was not writable and nothing was queued.
    pub fn write_and_close(&self, frame: Frame) -> bool {
        if !self.claim() {
            return false;
        }

        self.deregister();
        let queued = self
            .inner
            .outbound_tx
            .send(Outbound::CloseAfter(frame))
            .is_ok();

        trace!(channel = %self.id(), queued, "Close frame queued");
        queued
    }

    /// Requests a close without writing a frame.
    pub fn close(&self) {
        self.deregister();
        let _ = self.inner.outbound_tx.send(Outbound::Close);
    }

    /// Records that the peer went away.
    ///
    /// Called by the connection's driver when it observes the disconnect.
    pub fn mark_inactive(&self) {
        self.inner.active.store(false, Ordering::Release);
        self.deregister();
    }

    /// Checks writability and, for single-frame channels, takes the only slot.
    fn claim(&self) -> bool {
        if !self.is_active() || self.inner.outbound_tx.is_closed() {
            return false;
        }

        if self.inner.transport.is_single_frame() {
            self.inner
                .registered
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        } else {
            self.inner.registered.load(Ordering::Acquire)
        }
    }

    fn deregister(&self) {
        self.inner.registered.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("transport", &self.inner.transport)
            .field("active", &self.is_active())
            .field("registered", &self.is_registered())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
