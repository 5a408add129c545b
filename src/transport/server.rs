//! WebSocket server for duplex sessions.
//!
//! Accepts WebSocket upgrades on `<prefix>/<server>/<session>/websocket`,
//! resolves the session through the [`SessionRegistry`] and drives each
//! socket with a [`DuplexConnection`].
//!
//! # Connection Flow
//!
//! 1. [`SessionServer::bind`] binds a `TcpListener` and spawns the accept loop
//! 2. A client upgrades on a session URL, optionally offering a sub-protocol
//! 3. The route is parsed during the handshake; anything else gets a 404
//! 4. The session is looked up or created and a channel is attached
//! 5. The connection runs until the peer or the session closes it

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::gateway::SessionGateway;
use crate::identifiers::SessionId;
use crate::protocol::{Route, RouteAction};
use crate::session::SessionRegistry;

use super::{Channel, DuplexConnection, TransportKind};

// ============================================================================
// Constants
// ============================================================================

/// How often the accept loop checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// SessionServer
// ============================================================================

/// WebSocket front end for a [`SessionRegistry`].
///
/// # Example
///
/// ```ignore
/// let registry = Arc::new(SessionRegistry::new(factory));
/// let server = SessionServer::bind(ServerConfig::default(), registry).await?;
///
/// let url = server.session_url("1", &SessionId::generate());
/// ```
pub struct SessionServer {
    /// Configuration the server was bound with.
    config: ServerConfig,

    /// Port actually bound.
    port: u16,

    /// Sessions served by this server.
    registry: Arc<SessionRegistry>,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

// ============================================================================
// SessionServer - Constructor
// ============================================================================

impl SessionServer {
    /// Binds the listener and starts the accept loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(config: ServerConfig, registry: Arc<SessionRegistry>) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(config.socket_addr()).await?;
        let actual_port = listener.local_addr()?.port();

        debug!(port = actual_port, prefix = config.prefix(), "Session server bound");

        let server = Arc::new(Self {
            config,
            port: actual_port,
            registry,
            shutdown: AtomicBool::new(false),
        });

        let server_clone = Arc::clone(&server);
        tokio::spawn(async move {
            server_clone.accept_loop(listener).await;
        });

        info!(port = actual_port, "Session server started");

        Ok(server)
    }
}

// ============================================================================
// SessionServer - Public API
// ============================================================================

impl SessionServer {
    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the local socket address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        let ip = match self.config.ip() {
            ip if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            ip => ip,
        };
        SocketAddr::new(ip, self.port)
    }

    /// Returns the base WebSocket URL, e.g. `ws://127.0.0.1:7777`.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr())
    }

    /// Returns the WebSocket URL of a session.
    #[must_use]
    pub fn session_url(&self, server_id: &str, session_id: &SessionId) -> String {
        format!(
            "{}{}/{server_id}/{session_id}/{}",
            self.ws_url(),
            self.config.prefix().trim_end_matches('/'),
            TransportKind::Duplex.path_segment()
        )
    }

    /// Returns the registry sessions are resolved through.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Stops accepting and closes every session.
    pub fn shutdown(&self) {
        info!(port = self.port, "Session server shutting down");

        self.shutdown.store(true, Ordering::SeqCst);
        self.registry.shutdown();
    }
}

// ============================================================================
// SessionServer - Accept Loop
// ============================================================================

impl SessionServer {
    /// Background task that accepts new connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking shutdown flag
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr).await {
                            warn!(error = %e, ?addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => continue,
            }
        }

        debug!("Accept loop terminated");
    }

    /// Upgrades one TCP connection and serves it.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(?addr, "New TCP connection");

        let mut route = None;
        let callback = |request: &Request, response: Response| {
            self.check_handshake(request, response, &mut route)
        };

        let ws_stream = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        let route: Route =
            route.ok_or_else(|| Error::connection("Handshake completed without a route"))?;

        info!(
            ?addr,
            session_id = %route.session_id,
            server_id = %route.server_id,
            "WebSocket connection established"
        );

        let session = self
            .registry
            .get_or_create(route.session_id, TransportKind::Duplex);
        let (channel, outbound_rx) = Channel::new(TransportKind::Duplex);
        let gateway = SessionGateway::new(session, channel);

        DuplexConnection::serve(ws_stream, gateway, outbound_rx).await;

        Ok(())
    }

    /// Routes the upgrade request and negotiates the sub-protocol.
    fn check_handshake(
        &self,
        request: &Request,
        mut response: Response,
        route: &mut Option<Route>,
    ) -> std::result::Result<Response, ErrorResponse> {
        let path = request.uri().path();

        let parsed = match Route::parse(self.config.prefix(), path) {
            Ok(parsed) if parsed.action == RouteAction::Connect(TransportKind::Duplex) => parsed,
            Ok(_) => return Err(Self::reject(StatusCode::NOT_FOUND, path)),
            Err(e) => {
                debug!(path, error = %e, "Rejecting upgrade");
                return Err(Self::reject(StatusCode::NOT_FOUND, path));
            }
        };

        let offered = request
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|value| value.to_str().ok());

        if let Some(offered) = offered {
            match self
                .config
                .select_protocol(offered)
                .and_then(|selected| HeaderValue::from_str(selected).ok())
            {
                Some(value) => {
                    response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
                }
                None => debug!(offered, "No offered sub-protocol accepted"),
            }
        }

        *route = Some(parsed);
        Ok(response)
    }

    fn reject(status: StatusCode, path: &str) -> ErrorResponse {
        let mut response = ErrorResponse::new(Some(format!("No session transport at {path}")));
        *response.status_mut() = status;
        response
    }
}

impl std::fmt::Debug for SessionServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionServer")
            .field("port", &self.port)
            .field("prefix", &self.config.prefix())
            .field("sessions", &self.registry.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
