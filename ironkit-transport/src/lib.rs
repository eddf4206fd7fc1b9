/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # IronKit Transport
//!
//! Network transport layer for IronKit sessions.
//!
//! This crate provides:
//! - **Adapter contract**: `Connector` / `TransportHandle` and tagged transport events
//! - **Stream transport**: Tokio connector over any dialable byte stream (TCP by default)
//! - **Codec**: Tokio codec for packet framing

pub mod adapter;
pub mod codec;
pub mod stream;

pub use adapter::{ConnectionId, Connector, TransportEvent, TransportHandle};
pub use codec::{CodecError, PacketCodec};
pub use stream::{Dialer, EventReceiver, EventSender, StreamConnector, StreamHandle, TcpDialer};
