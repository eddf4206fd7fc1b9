/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # IronKit Core
//!
//! Core types, wire framing, and error definitions for IronKit sessions.
//!
//! This crate provides the fundamental building blocks used across all IronKit crates:
//! - **Error types**: Unified error handling with `thiserror`
//! - **Packet framing**: Type + length framed packets with incremental decoding
//! - **Messages**: Request/notify/response/push encoding with varint ids
//! - **Core types**: `RequestId`, `Route`, handshake bodies

pub mod error;
pub mod message;
pub mod packet;
pub mod types;

pub use error::{DecodeError, EncodeError, KitError, Result, SessionError};
pub use message::{Message, MessageType, encode_body};
pub use packet::{
    PACKET_HEAD_LENGTH, PACKET_MAX_SIZE, Packet, PacketType, decode_packet,
    decode_packet_with_limit,
};
pub use types::{
    HEARTBEAT_MAX_SECS, HandshakeRequest, HandshakeResponse, ROUTE_MAX_LEN, RequestId, Route,
};
