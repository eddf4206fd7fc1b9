/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Client builder for fluent configuration.
//!
//! This module provides a builder API for configuring and starting clients.

use crate::client::Client;
use crate::error::ClientError;
use ironkit_session::config::{SessionConfig, SessionConfigBuilder};
use ironkit_transport::{Dialer, TcpDialer};
use std::time::Duration;

/// Builder for configuring a client.
#[derive(Debug)]
pub struct ClientBuilder {
    /// Session configuration being assembled.
    session: SessionConfigBuilder,
    /// Target, kept for inspection before building.
    target: Option<String>,
    /// Whether `TCP_NODELAY` is set on connections.
    nodelay: bool,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Creates a new client builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: SessionConfigBuilder::new(),
            target: None,
            nodelay: true,
        }
    }

    /// Sets the connection target (`host:port`).
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        self.session = self.session.target(target.clone());
        self.target = Some(target);
        self
    }

    /// Enables lifecycle logging at info level.
    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.session = self.session.logging(enabled);
        self
    }

    /// Sets the maximum consecutive reconnection attempts.
    #[must_use]
    pub fn with_reconnect_max_attempts(mut self, attempts: u32) -> Self {
        self.session = self.session.reconnect_max_attempts(attempts);
        self
    }

    /// Sets the delay before each reconnection attempt.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.session = self.session.reconnect_delay(delay);
        self
    }

    /// Sets the time granted to the kick packet before the transport closes.
    #[must_use]
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.session = self.session.close_grace(grace);
        self
    }

    /// Sets the maximum inbound packet body size.
    #[must_use]
    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.session = self.session.max_packet_size(size);
        self
    }

    /// Sets whether `TCP_NODELAY` is enabled on TCP connections.
    #[must_use]
    pub const fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Returns the configured target.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Returns whether `TCP_NODELAY` is enabled.
    #[must_use]
    pub const fn nodelay(&self) -> bool {
        self.nodelay
    }

    /// Builds the session configuration without connecting.
    ///
    /// # Errors
    /// Returns `ClientError::Session` if the configuration is invalid.
    pub fn build(self) -> Result<SessionConfig, ClientError> {
        Ok(self.session.build()?)
    }

    /// Connects over TCP and starts the client task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `ClientError::Session` if the configuration is invalid.
    pub fn connect(self) -> Result<Client, ClientError> {
        let dialer = TcpDialer::new().with_nodelay(self.nodelay);
        self.connect_with(dialer)
    }

    /// Connects through `dialer` and starts the client task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `ClientError::Session` if the configuration is invalid.
    pub fn connect_with<D: Dialer>(self, dialer: D) -> Result<Client, ClientError> {
        let config = self.build()?;
        Client::spawn(config, dialer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironkit_core::error::SessionError;

    #[test]
    fn test_client_builder_default() {
        let builder = ClientBuilder::new();
        assert!(builder.target().is_none());
        assert!(builder.nodelay());
    }

    #[test]
    fn test_client_builder_build() {
        let config = ClientBuilder::new()
            .with_target("127.0.0.1:3250")
            .with_logging(true)
            .with_reconnect_max_attempts(4)
            .with_reconnect_delay(Duration::from_millis(250))
            .with_close_grace(Duration::from_millis(10))
            .with_max_packet_size(1024)
            .build()
            .unwrap();

        assert_eq!(config.target, "127.0.0.1:3250");
        assert!(config.logging);
        assert_eq!(config.reconnect_max_attempts, 4);
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.close_grace, Duration::from_millis(10));
        assert_eq!(config.max_packet_size, 1024);
    }

    #[test]
    fn test_client_builder_requires_target() {
        let err = ClientBuilder::new().with_nodelay(false).build().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Session(SessionError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_client_builder_connect_requires_target() {
        let result = ClientBuilder::new().connect();
        assert!(matches!(result, Err(ClientError::Session(_))));
    }
}
