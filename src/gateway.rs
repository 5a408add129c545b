//! Per-connection entry point into a session.
//!
//! Each physical connection gets one [`SessionGateway`] bound to its
//! [`Channel`] and to the [`Session`] named by its route. The wire layer
//! feeds decoded [`Inbound`] units in; anything the session layer does not
//! handle comes back out unchanged.
//!
//! # Unit Handling
//!
//! | Unit | Effect |
//! |------|--------|
//! | `Connect` | Attach rules run, channel becomes current |
//! | `Message` | Channel becomes current, payload goes to `on_message` |
//!
//! A duplex session's current channel is always its accepted socket.
//! | `Other` | Returned to the caller |
//!
//! Disconnects and administrative signals arrive through
//! [`on_channel_inactive`](SessionGateway::on_channel_inactive) and
//! [`on_admin`](SessionGateway::on_admin).

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::protocol::{AdminSignal, Inbound};
use crate::session::{Session, SessionContext, SessionEvent};
use crate::transport::Channel;

// ============================================================================
// SessionGateway
// ============================================================================

/// Binds one physical connection to its logical session.
#[derive(Debug, Clone)]
pub struct SessionGateway {
    session: Arc<Session>,
    channel: Channel,
}

impl SessionGateway {
    /// Creates a gateway for `channel` into `session`.
    #[must_use]
    pub fn new(session: Arc<Session>, channel: Channel) -> Self {
        trace!(session_id = %session.id(), channel = %channel.id(), "Gateway created");
        Self { session, channel }
    }

    /// Returns the connection this gateway serves.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Returns the session this gateway feeds.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns a protocol-facing handle to the session.
    #[must_use]
    pub fn context(&self) -> SessionContext {
        self.session.context()
    }

    /// Handles one inbound unit.
    ///
    /// Returns `Some(unit)` for pass-through units, `None` if consumed.
    ///
    /// # Errors
    ///
    /// Propagates a rejection from the handler's `on_message`.
    pub fn on_inbound<T>(&self, unit: Inbound<T>) -> Result<Option<T>> {
        match unit {
            Inbound::Connect => {
                self.session
                    .dispatch(SessionEvent::UnitArrived(self.channel.clone()))?;
                Ok(None)
            }
            Inbound::Message(payload) => {
                self.session.dispatch(SessionEvent::MessageArrived {
                    channel: self.channel.clone(),
                    payload,
                })?;
                Ok(None)
            }
            Inbound::Other(unit) => {
                trace!(channel = %self.channel.id(), "Unit passed through");
                Ok(Some(unit))
            }
        }
    }

    /// Records that the peer disconnected.
    ///
    /// Releases the session's attachment; never closes the session.
    pub fn on_channel_inactive(&self) {
        self.channel.mark_inactive();

        if let Err(e) = self
            .session
            .dispatch(SessionEvent::ChannelClosed(self.channel.id()))
        {
            warn!(session_id = %self.session.id(), error = %e, "Release after disconnect failed");
        }

        debug!(session_id = %self.session.id(), channel = %self.channel.id(), "Channel inactive");
    }

    /// Handles an administrative signal.
    ///
    /// # Errors
    ///
    /// Propagates a handler failure raised while the signal is processed.
    pub fn on_admin(&self, signal: AdminSignal) -> Result<()> {
        debug!(session_id = %self.session.id(), ?signal, "Administrative signal");

        match signal {
            AdminSignal::CloseSession => self.session.dispatch(SessionEvent::AdminCloseSession),
            AdminSignal::HandleSession => self
                .session
                .dispatch(SessionEvent::AdminHandleSession(self.channel.clone())),
        }
    }

    /// Closes the session from the protocol side.
    pub fn close(&self) {
        self.session.close();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Barrier;
    use std::thread;

    use crate::identifiers::SessionId;
    use crate::protocol::{CloseReason, Frame, Route, RouteAction};
    use crate::session::SessionState;
    use crate::session::testing::RecordingHandler;
    use crate::transport::{Outbound, OutboundReceiver, TransportKind};

    fn session(transport: TransportKind) -> (Arc<Session>, RecordingHandler) {
        let handler = RecordingHandler::default();
        let session = Session::new(
            SessionId::parse("gateway-test").expect("valid id"),
            transport,
            Box::new(handler.clone()),
        );
        (session, handler)
    }

    fn attach(session: &Arc<Session>) -> (SessionGateway, OutboundReceiver) {
        let (channel, rx) = Channel::new(session.transport());
        (SessionGateway::new(Arc::clone(session), channel), rx)
    }

    /// Encodes the next outbound item the way the writer would put it on the wire.
    fn body(rx: &mut OutboundReceiver, transport: TransportKind) -> String {
        let frame = match rx.try_recv().expect("outbound item") {
            Outbound::Frame(frame) | Outbound::CloseAfter(frame) => frame,
            Outbound::Close => panic!("expected a frame"),
        };
        frame.encode(transport).expect("encode").concat()
    }

    #[test]
    fn test_polling_scenario() {
        let (session, handler) = session(TransportKind::Polling);

        let (first, mut first_rx) = attach(&session);
        assert!(first.on_inbound::<()>(Inbound::Connect).expect("connect").is_none());
        assert_eq!(body(&mut first_rx, TransportKind::Polling), "o\n");
        assert_eq!(session.state(), SessionState::Open);

        let (second, mut second_rx) = attach(&session);
        second.on_inbound::<()>(Inbound::Connect).expect("connect");
        assert_eq!(
            body(&mut second_rx, TransportKind::Polling),
            "c[2010,\"Another connection still open\"]\n"
        );
        assert_eq!(session.state(), SessionState::Interrupted);

        first.on_admin(AdminSignal::CloseSession).expect("admin close");
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(handler.closed(), 1);

        let (third, mut third_rx) = attach(&session);
        third.on_inbound::<()>(Inbound::Connect).expect("connect");
        assert_eq!(body(&mut third_rx, TransportKind::Polling), "c[3000,\"Go away!\"]\n");
        assert!(!session.is_in_use());
    }

    #[test]
    fn test_interrupted_session_answers_1002() {
        let (session, _handler) = session(TransportKind::Streaming);
        let (first, _first_rx) = attach(&session);
        first.on_inbound::<()>(Inbound::Connect).expect("connect");
        let (second, _second_rx) = attach(&session);
        second.on_inbound::<()>(Inbound::Connect).expect("connect");

        let (late, mut late_rx) = attach(&session);
        late.on_inbound::<()>(Inbound::Connect).expect("connect");

        assert_eq!(
            late_rx.try_recv().expect("close"),
            Outbound::CloseAfter(Frame::close(CloseReason::Interrupted))
        );
    }

    #[test]
    fn test_other_units_pass_through() {
        let (session, handler) = session(TransportKind::Duplex);
        let (gateway, mut rx) = attach(&session);

        let unit = gateway
            .on_inbound(Inbound::Other(vec![0x89_u8]))
            .expect("pass through");

        assert_eq!(unit, Some(vec![0x89]));
        assert!(rx.try_recv().is_err());
        assert_eq!(handler.opened(), 0);
        assert_eq!(session.state(), SessionState::Connecting);
    }

    #[test]
    fn test_message_reaches_handler_and_echoes() {
        let (session, handler) = session(TransportKind::Duplex);
        let (gateway, mut rx) = attach(&session);
        gateway.on_inbound::<()>(Inbound::Connect).expect("connect");
        assert_eq!(body(&mut rx, TransportKind::Duplex), "o\n");

        gateway
            .on_inbound::<()>(Inbound::Message("echo:{\"ping\":1}".into()))
            .expect("message");

        assert_eq!(handler.messages(), vec!["echo:{\"ping\":1}".to_string()]);
        assert_eq!(body(&mut rx, TransportKind::Duplex), "{\"ping\":1}");
    }

    #[test]
    fn test_handler_rejection_propagates() {
        let (session, _handler) = session(TransportKind::Duplex);
        let (gateway, _rx) = attach(&session);
        gateway.on_inbound::<()>(Inbound::Connect).expect("connect");

        let err = gateway
            .on_inbound::<()>(Inbound::Message(RecordingHandler::MALFORMED.into()))
            .expect_err("rejected");

        assert!(err.is_handler_error());
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn test_disconnect_releases_without_closing() {
        let (session, handler) = session(TransportKind::Streaming);
        let (gateway, _rx) = attach(&session);
        gateway.on_inbound::<()>(Inbound::Connect).expect("connect");

        gateway.on_channel_inactive();

        assert!(!session.is_in_use());
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(handler.closed(), 0);
        assert!(!gateway.channel().is_writable());
    }

    #[test]
    fn test_sends_while_detached_are_buffered_then_flushed() {
        let (session, _handler) = session(TransportKind::Streaming);
        let (first, _first_rx) = attach(&session);
        first.on_inbound::<()>(Inbound::Connect).expect("connect");
        first.on_channel_inactive();

        let context = first.context();
        context.send("one");
        context.send("two");
        assert_eq!(session.buffered(), 2);

        let (second, mut second_rx) = attach(&session);
        second.on_inbound::<()>(Inbound::Connect).expect("connect");

        assert_eq!(
            body(&mut second_rx, TransportKind::Streaming),
            "a[\"one\",\"two\"]\n"
        );
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn test_protocol_close_sequences_frame_before_close() {
        let (session, handler) = session(TransportKind::Streaming);
        let (gateway, mut rx) = attach(&session);
        gateway.on_inbound::<()>(Inbound::Connect).expect("connect");
        let _ = rx.try_recv();

        gateway.close();

        assert_eq!(
            rx.try_recv().expect("close"),
            Outbound::CloseAfter(Frame::close(CloseReason::GoAway))
        );
        assert_eq!(handler.closed(), 1);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_admin_handle_session_reruns_attach() {
        let (session, _handler) = session(TransportKind::Streaming);
        let (first, _first_rx) = attach(&session);
        first.on_inbound::<()>(Inbound::Connect).expect("connect");
        first.on_channel_inactive();

        let (second, mut second_rx) = attach(&session);
        second.on_admin(AdminSignal::HandleSession).expect("handle");

        assert!(session.is_in_use());
        assert!(second_rx.try_recv().is_err());
        assert_eq!(
            session.current_context().map(|channel| channel.id()),
            Some(first.channel().id())
        );

        second.context().send("after handle");
        assert_eq!(
            body(&mut second_rx, TransportKind::Streaming),
            "a[\"after handle\"]\n"
        );
    }

    #[test]
    fn test_duplex_admin_handle_session_takes_pushes() {
        let (session, _handler) = session(TransportKind::Duplex);
        let (first, _first_rx) = attach(&session);
        first.on_inbound::<()>(Inbound::Connect).expect("connect");
        first.on_channel_inactive();

        let (second, mut second_rx) = attach(&session);
        second.on_admin(AdminSignal::HandleSession).expect("handle");
        second.context().send("pushed");

        assert_eq!(body(&mut second_rx, TransportKind::Duplex), "pushed");
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn test_send_route_feeds_message_unit() {
        let (session, handler) = session(TransportKind::Polling);
        let (poll, mut poll_rx) = attach(&session);
        poll.on_inbound::<()>(Inbound::Connect).expect("connect");
        assert_eq!(body(&mut poll_rx, TransportKind::Polling), "o\n");

        let route = Route::parse("/simplepush", "/simplepush/1/gateway-test/xhr_send").expect("route");
        assert_eq!(route.action, RouteAction::Send);
        assert_eq!(&route.session_id, session.id());

        let (post, _post_rx) = attach(&session);
        post.on_inbound::<()>(Inbound::Message("{\"messageType\":\"hello\"}".into()))
            .expect("message");

        assert_eq!(handler.messages(), vec!["{\"messageType\":\"hello\"}".to_string()]);
        assert_eq!(
            session.current_context().map(|channel| channel.id()),
            Some(post.channel().id())
        );
    }

    #[test]
    fn test_disconnect_racing_attach_leaves_consistent_state() {
        for _ in 0..100 {
            let (session, _handler) = session(TransportKind::Streaming);
            let (old, _old_rx) = attach(&session);
            old.on_inbound::<()>(Inbound::Connect).expect("connect");
            let (incoming, mut incoming_rx) = attach(&session);
            let barrier = Barrier::new(2);

            thread::scope(|scope| {
                scope.spawn(|| {
                    barrier.wait();
                    old.on_channel_inactive();
                });
                scope.spawn(|| {
                    barrier.wait();
                    incoming.on_inbound::<()>(Inbound::Connect).expect("connect");
                });
            });

            match incoming_rx.try_recv() {
                // Disconnect won: the new channel holds the session.
                Err(_) => {
                    assert_eq!(session.state(), SessionState::Open);
                    assert!(session.is_in_use());
                    assert_eq!(session.snapshot().open_channel, Some(incoming.channel().id()));
                }
                // Attach won: rejected, then the disconnect released the session.
                Ok(item) => {
                    assert_eq!(
                        item,
                        Outbound::CloseAfter(Frame::close(CloseReason::AnotherConnectionOpen))
                    );
                    assert_eq!(session.state(), SessionState::Interrupted);
                    assert!(!session.is_in_use());
                }
            }
        }
    }
}
