/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # IronKit Session
//!
//! Client session layer for the IronKit framed protocol.
//!
//! This crate provides:
//! - **State machine**: Sans-I/O session driven by transport events and timers
//! - **Reconnection**: Fixed-delay retries that resume the server-side session
//! - **Heartbeat handling**: Heartbeats at the interval the server advertises
//! - **Request correlation**: Process-wide request ids and pending callbacks
//! - **Events**: Named-event publish/subscribe for pushes and lifecycle signals
//! - **Timers**: Tokio-backed and virtual-clock schedulers
//! - **Configuration**: Session configuration options

pub mod buffer;
pub mod config;
pub mod events;
pub mod heartbeat;
pub mod pending;
pub mod reconnect;
pub mod session;
pub mod state;
pub mod timer;

pub use buffer::OutboundBuffer;
pub use config::{SessionConfig, SessionConfigBuilder};
pub use events::{
    EVENT_CLOSE, EVENT_RECONNECT, EVENT_RECONNECTED, EVENT_TRANSPORT_ERROR, EventBus, Handler,
    SubscriptionId,
};
pub use heartbeat::HeartbeatManager;
pub use pending::{PendingRequests, RequestIds, ResponseCallback};
pub use reconnect::{ReconnectDecision, ReconnectPolicy};
pub use session::{ReadyCallback, Session};
pub use state::SessionState;
pub use timer::{ManualScheduler, Scheduler, TimerId, TimerReceiver, TimerSender, TokioScheduler};
