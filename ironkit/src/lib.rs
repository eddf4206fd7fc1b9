/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # IronKit
//!
//! Reconnecting client sessions over a framed, bidirectional protocol.
//!
//! IronKit keeps one logical session with a server alive across transport
//! failures. Requests are correlated with responses, notifications are fire
//! and forget, and server pushes are delivered to named-event subscribers.
//!
//! ## Features
//!
//! - **Sans-I/O core**: The session state machine is driven by plain method calls
//! - **Reconnection**: Fixed-delay retries that resume the server-side session
//! - **Buffering**: Messages sent while connecting are flushed in order on open
//! - **Async support**: Built on Tokio for networking and timers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ironkit::prelude::*;
//!
//! let client = ClientBuilder::new()
//!     .with_target("127.0.0.1:3250")
//!     .connect()?;
//! client.wait_ready().await?;
//! let user = client.request("user.get", &serde_json::json!({"id": 1})).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Packet and message framing, types, and error definitions
//! - [`transport`]: Transport adapter contract and tokio stream transport
//! - [`session`]: Session state machine, timers, and event bus
//! - [`engine`]: Tokio client runtime

pub mod core {
    //! Packet and message framing, types, and error definitions.
    pub use ironkit_core::*;
}

pub mod transport {
    //! Transport adapter contract and tokio stream transport.
    pub use ironkit_transport::*;
}

pub mod session {
    //! Session state machine, timers, and event bus.
    pub use ironkit_session::*;
}

pub mod engine {
    //! Tokio client runtime.
    pub use ironkit_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use ironkit_core::{
        DecodeError, EncodeError, KitError, Message, MessageType, Packet, PacketType, RequestId,
        Result, Route, SessionError,
    };

    // Transport
    pub use ironkit_transport::{
        ConnectionId, Connector, Dialer, PacketCodec, StreamConnector, TcpDialer, TransportEvent,
        TransportHandle,
    };

    // Session
    pub use ironkit_session::{
        EVENT_CLOSE, EVENT_RECONNECT, EVENT_RECONNECTED, EVENT_TRANSPORT_ERROR, ManualScheduler,
        Scheduler, Session, SessionConfig, SessionConfigBuilder, SessionState, SubscriptionId,
        TimerId, TokioScheduler,
    };

    // Engine
    pub use ironkit_engine::{Client, ClientBuilder, ClientError};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let config = SessionConfig::new("127.0.0.1:3250");
        assert!(config.validate().is_ok());
        assert_eq!(SessionState::default(), SessionState::Connecting);
        assert!(Route::new("chat.say").is_some());
    }

    #[test]
    fn test_prelude_session_with_manual_scheduler() {
        struct Silent;
        struct SilentHandle;

        impl TransportHandle for SilentHandle {
            fn send(&mut self, _data: bytes::Bytes) {}
            fn close(&mut self) {}
        }

        impl Connector for Silent {
            type Handle = SilentHandle;

            fn open(&mut self, _target: &str, _id: ConnectionId) -> SilentHandle {
                SilentHandle
            }
        }

        let config = SessionConfig::new("127.0.0.1:3250");
        let mut session = Session::new(config, Silent, ManualScheduler::new(), || {}).unwrap();
        session.notify("chat.say", &serde_json::json!({"text": "hi"}));
        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(session.buffered_packets(), 1);

        session.disconnect();
        assert_eq!(session.state(), SessionState::Closing);
    }
}
