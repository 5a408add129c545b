//! Duplex connection driver.
//!
//! Runs one WebSocket for the lifetime of the socket, bridging it to a
//! [`SessionGateway`].
//!
//! # Event Loop
//!
//! The driver `select!`s over two sources:
//!
//! - Incoming WebSocket messages (text → message units)
//! - The channel's [`OutboundReceiver`] (frames from the session)
//!
//! On peer close, socket error or a handler rejection the loop ends and the
//! gateway is told the channel went inactive.

// ============================================================================
// Imports
// ============================================================================

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::gateway::SessionGateway;
use crate::protocol::{Frame, Inbound};

use super::{Outbound, OutboundReceiver, TransportKind};

// ============================================================================
// Types
// ============================================================================

type WsSink<S> = SplitSink<WebSocketStream<S>, Message>;

/// What the loop does after handling one event.
enum Flow {
    Continue,
    Stop,
}

// ============================================================================
// DuplexConnection
// ============================================================================

/// Drives one WebSocket attached to a session.
pub struct DuplexConnection;

impl DuplexConnection {
    /// Serves `ws_stream` until it closes.
    ///
    /// Sends the connect unit first, so the session's open frame is the first
    /// thing the peer reads.
    pub async fn serve<S>(
        ws_stream: WebSocketStream<S>,
        gateway: SessionGateway,
        mut outbound_rx: OutboundReceiver,
    )
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let channel_id = gateway.channel().id();

        if let Err(e) = gateway.on_inbound::<Message>(Inbound::Connect) {
            warn!(channel = %channel_id, error = %e, "Connect unit failed");
            gateway.on_channel_inactive();
            let _ = ws_write.close().await;
            return;
        }

        loop {
            let flow = tokio::select! {
                // Incoming messages from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_text(&gateway, text.as_str())
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!(channel = %channel_id, "WebSocket closed by remote");
                            Flow::Stop
                        }

                        Some(Ok(other)) => {
                            if let Ok(Some(unit)) = gateway.on_inbound(Inbound::Other(other)) {
                                trace!(channel = %channel_id, ?unit, "Ignoring non-text message");
                            }
                            Flow::Continue
                        }

                        Some(Err(e)) => {
                            error!(channel = %channel_id, error = %e, "WebSocket error");
                            Flow::Stop
                        }

                        None => {
                            debug!(channel = %channel_id, "WebSocket stream ended");
                            Flow::Stop
                        }
                    }
                }

                // Frames from the session
                item = outbound_rx.recv() => {
                    match item {
                        Some(item) => Self::handle_outbound(&gateway, &mut ws_write, item).await,
                        None => {
                            debug!(channel = %channel_id, "Outbound queue closed");
                            Flow::Stop
                        }
                    }
                }
            };

            if matches!(flow, Flow::Stop) {
                break;
            }
        }

        gateway.on_channel_inactive();
        let _ = ws_write.close().await;

        debug!(channel = %channel_id, "Duplex connection terminated");
    }

    /// Relays a text message; a handler rejection ends the connection.
    fn handle_text(gateway: &SessionGateway, text: &str) -> Flow {
        match gateway.on_inbound::<Message>(Inbound::Message(text.to_string())) {
            Ok(_) => Flow::Continue,
            Err(e) => {
                warn!(
                    session_id = %gateway.session().id(),
                    channel = %gateway.channel().id(),
                    error = %e,
                    "Handler rejected message, closing connection"
                );
                Flow::Stop
            }
        }
    }

    /// Writes one outbound item.
    async fn handle_outbound<S>(
        gateway: &SessionGateway,
        ws_write: &mut WsSink<S>,
        item: Outbound,
    ) -> Flow
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match item {
            Outbound::Frame(frame) => match Self::write_frame(ws_write, &frame).await {
                Ok(()) => Flow::Continue,
                Err(Error::ConnectionClosed) => {
                    debug!(channel = %gateway.channel().id(), "Peer gone before frame write");
                    Flow::Stop
                }
                Err(e) => {
                    warn!(channel = %gateway.channel().id(), error = %e, "Frame write failed");
                    Flow::Stop
                }
            },

            Outbound::CloseAfter(frame) => {
                if gateway.channel().is_active()
                    && let Err(e) = Self::write_frame(ws_write, &frame).await
                {
                    warn!(channel = %gateway.channel().id(), error = %e, "Close frame write failed");
                }
                Flow::Stop
            }

            Outbound::Close => Flow::Stop,
        }
    }

    /// Encodes and sends a frame, flushing before returning.
    async fn write_frame<S>(ws_write: &mut WsSink<S>, frame: &Frame) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        for unit in frame.encode(TransportKind::Duplex)? {
            ws_write.send(Message::Text(unit.into())).await?;
        }

        trace!(?frame, "Frame sent");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
