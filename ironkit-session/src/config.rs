/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Session configuration.
//!
//! This module provides configuration options for IronKit sessions.

use ironkit_core::error::SessionError;
use ironkit_core::packet::PACKET_MAX_SIZE;
use std::time::Duration;

/// Default maximum number of consecutive reconnection attempts.
pub const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 10;

/// Default delay between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Default delay between sending a kick packet and closing the transport.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_millis(100);

/// Configuration for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Connection target handed to the connector (e.g. `host:port`).
    pub target: String,
    /// Whether lifecycle transitions are logged at info level.
    pub logging: bool,
    /// Maximum consecutive reconnection attempts before giving up.
    pub reconnect_max_attempts: u32,
    /// Fixed delay before each reconnection attempt.
    pub reconnect_delay: Duration,
    /// Time granted to the kick packet to flush before the transport is closed.
    pub close_grace: Duration,
    /// Maximum inbound packet body size in bytes.
    pub max_packet_size: usize,
}

impl SessionConfig {
    /// Creates a new session configuration for the given target.
    ///
    /// # Arguments
    /// * `target` - The connection target
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            logging: false,
            reconnect_max_attempts: DEFAULT_RECONNECT_MAX_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            close_grace: DEFAULT_CLOSE_GRACE,
            max_packet_size: PACKET_MAX_SIZE,
        }
    }

    /// Sets whether lifecycle transitions are logged at info level.
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Sets the maximum consecutive reconnection attempts.
    #[must_use]
    pub const fn with_reconnect_max_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_max_attempts = attempts;
        self
    }

    /// Sets the delay before each reconnection attempt.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the close grace delay.
    #[must_use]
    pub const fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Sets the maximum inbound packet body size.
    #[must_use]
    pub const fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size;
        self
    }

    /// Checks that the configuration can be used to open a session.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if the target is missing or the
    /// packet size limit is zero.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.target.trim().is_empty() {
            return Err(SessionError::Configuration(
                "connection target is required".to_string(),
            ));
        }
        if self.max_packet_size == 0 {
            return Err(SessionError::Configuration(
                "max packet size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for session configuration.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    target: Option<String>,
    logging: bool,
    reconnect_max_attempts: Option<u32>,
    reconnect_delay: Option<Duration>,
    close_grace: Option<Duration>,
    max_packet_size: Option<usize>,
}

impl SessionConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection target.
    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Enables lifecycle logging.
    #[must_use]
    pub const fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Sets the maximum reconnection attempts.
    #[must_use]
    pub const fn reconnect_max_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_max_attempts = Some(attempts);
        self
    }

    /// Sets the reconnection delay.
    #[must_use]
    pub const fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = Some(delay);
        self
    }

    /// Sets the close grace delay.
    #[must_use]
    pub const fn close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = Some(grace);
        self
    }

    /// Sets the maximum inbound packet body size.
    #[must_use]
    pub const fn max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = Some(size);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if no usable target was set.
    pub fn build(self) -> Result<SessionConfig, SessionError> {
        let target = self.target.ok_or_else(|| {
            SessionError::Configuration("connection target is required".to_string())
        })?;

        let mut config = SessionConfig::new(target).with_logging(self.logging);
        if let Some(attempts) = self.reconnect_max_attempts {
            config.reconnect_max_attempts = attempts;
        }
        if let Some(delay) = self.reconnect_delay {
            config.reconnect_delay = delay;
        }
        if let Some(grace) = self.close_grace {
            config.close_grace = grace;
        }
        if let Some(size) = self.max_packet_size {
            config.max_packet_size = size;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_new() {
        let config = SessionConfig::new("127.0.0.1:3250");

        assert_eq!(config.target, "127.0.0.1:3250");
        assert!(!config.logging);
        assert_eq!(config.reconnect_max_attempts, 10);
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.close_grace, Duration::from_millis(100));
        assert_eq!(config.max_packet_size, 64 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_config_validate_target() {
        let err = SessionConfig::new("  ").validate().unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfigBuilder::new()
            .target("example.org:3250")
            .logging(true)
            .reconnect_max_attempts(3)
            .reconnect_delay(Duration::from_millis(500))
            .close_grace(Duration::from_millis(20))
            .build()
            .unwrap();

        assert_eq!(config.target, "example.org:3250");
        assert!(config.logging);
        assert_eq!(config.reconnect_max_attempts, 3);
        assert_eq!(config.reconnect_delay, Duration::from_millis(500));
        assert_eq!(config.close_grace, Duration::from_millis(20));
    }

    #[test]
    fn test_session_config_builder_requires_target() {
        let result = SessionConfigBuilder::new().reconnect_max_attempts(1).build();
        assert_eq!(
            result,
            Err(SessionError::Configuration(
                "connection target is required".to_string()
            ))
        );

        let result = SessionConfigBuilder::new()
            .target("host:1")
            .max_packet_size(0)
            .build();
        assert!(result.is_err());
    }
}
