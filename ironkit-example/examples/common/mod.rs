//! Common utilities shared across examples.

#![allow(dead_code)]

use std::env;

/// Default server port.
pub const DEFAULT_PORT: u16 = 3250;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Example configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ExampleConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Heartbeat interval advertised by the server, in seconds.
    pub heartbeat_interval: u64,
}

impl ExampleConfig {
    /// Loads the configuration from `KIT_HOST`, `KIT_PORT` and `KIT_HEARTBEAT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            host: env::var("KIT_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("KIT_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            heartbeat_interval: env::var("KIT_HEARTBEAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }

    /// Returns the socket address string.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Initializes logging for examples.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}
