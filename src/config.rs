//! Server configuration.
//!
//! [`ServerConfig`] describes where the bundled duplex server listens and
//! which URLs and sub-protocols it accepts. Build one with
//! [`ServerConfig::builder`].
//!
//! # Example
//!
//! ```
//! use sockjs_session::ServerConfig;
//!
//! # fn example() -> sockjs_session::Result<()> {
//! let config = ServerConfig::builder()
//!     .port(7777)
//!     .prefix("/simplepush")
//!     .websocket_protocol("push-notification")
//!     .build()?;
//!
//! assert_eq!(config.prefix(), "/simplepush");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (localhost).
const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default URL prefix.
const DEFAULT_PREFIX: &str = "/";

// ============================================================================
// ServerConfig
// ============================================================================

/// Validated server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    ip: IpAddr,
    port: u16,
    prefix: String,
    websocket_protocols: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: DEFAULT_BIND_IP,
            port: 0,
            prefix: DEFAULT_PREFIX.to_string(),
            websocket_protocols: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Returns the bind IP.
    #[inline]
    #[must_use]
    pub const fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Returns the requested port (0 means OS-assigned).
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the requested socket address.
    #[inline]
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Returns the URL prefix session routes live under.
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the accepted `Sec-WebSocket-Protocol` values.
    #[inline]
    #[must_use]
    pub fn websocket_protocols(&self) -> &[String] {
        &self.websocket_protocols
    }

    /// Picks the sub-protocol to answer a client's offer with.
    ///
    /// `offered` is the raw comma-separated header value. The client's order
    /// wins; `None` if nothing offered is accepted.
    #[must_use]
    pub fn select_protocol(&self, offered: &str) -> Option<&str> {
        offered
            .split(',')
            .map(str::trim)
            .find_map(|candidate| {
                self.websocket_protocols
                    .iter()
                    .find(|accepted| accepted.eq_ignore_ascii_case(candidate))
            })
            .map(String::as_str)
    }
}

// ============================================================================
// ServerConfigBuilder
// ============================================================================

/// Builder for [`ServerConfig`].
#[derive(Debug, Default, Clone)]
pub struct ServerConfigBuilder {
    ip: Option<IpAddr>,
    port: Option<u16>,
    prefix: Option<String>,
    websocket_protocols: Vec<String>,
}

impl ServerConfigBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bind IP.
    #[inline]
    #[must_use]
    pub fn ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Sets the port. Use 0 for an OS-assigned port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the URL prefix, e.g. `/simplepush`.
    #[inline]
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Adds an accepted `Sec-WebSocket-Protocol` value.
    #[inline]
    #[must_use]
    pub fn websocket_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.websocket_protocols.push(protocol.into());
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the prefix does not start with `/`
    /// - [`Error::Config`] if a sub-protocol is empty or not a header token
    pub fn build(self) -> Result<ServerConfig> {
        let prefix = self.validate_prefix()?;
        self.validate_protocols()?;

        Ok(ServerConfig {
            ip: self.ip.unwrap_or(DEFAULT_BIND_IP),
            port: self.port.unwrap_or(0),
            prefix,
            websocket_protocols: self.websocket_protocols,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ServerConfigBuilder {
    /// Validates the prefix and strips trailing slashes.
    fn validate_prefix(&self) -> Result<String> {
        let Some(prefix) = &self.prefix else {
            return Ok(DEFAULT_PREFIX.to_string());
        };

        if !prefix.starts_with('/') {
            return Err(Error::config(format!(
                "Prefix must start with '/': {prefix:?}\n\
                 Example: ServerConfig::builder().prefix(\"/simplepush\")"
            )));
        }

        if prefix.contains(['?', '#']) {
            return Err(Error::config(format!(
                "Prefix must be a plain path: {prefix:?}"
            )));
        }

        let trimmed = prefix.trim_end_matches('/');
        Ok(if trimmed.is_empty() {
            DEFAULT_PREFIX.to_string()
        } else {
            trimmed.to_string()
        })
    }

    /// Validates sub-protocol names.
    fn validate_protocols(&self) -> Result<()> {
        let invalid = self.websocket_protocols.iter().find(|protocol| {
            protocol.is_empty()
                || !protocol
                    .bytes()
                    .all(|b| b.is_ascii_graphic() && !b",;\"()<>@:/[]?={}\\".contains(&b))
        });

        match invalid {
            Some(protocol) => Err(Error::config(format!(
                "Invalid WebSocket sub-protocol: {protocol:?}"
            ))),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
