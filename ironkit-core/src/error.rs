/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Error types for IronKit sessions.
//!
//! This module provides a unified error hierarchy using `thiserror` for typed,
//! domain-specific errors across framing, message encoding and session setup.

use thiserror::Error;

/// Result type alias using [`KitError`] as the error type.
pub type Result<T> = std::result::Result<T, KitError>;

/// Top-level error type for all IronKit operations.
#[derive(Debug, Error)]
pub enum KitError {
    /// Error while decoding a packet or message.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error while encoding a packet or message.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error in session layer operations.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// I/O error from underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while decoding packets and messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Packet header carries an unknown packet type.
    #[error("wrong packet type: 0x{0:02x}")]
    WrongPacketType(u8),

    /// Packet body length exceeds the allowed maximum.
    #[error("packet too large: {size} bytes exceeds maximum {max_size}")]
    PacketTooLarge {
        /// Declared body length.
        size: usize,
        /// Maximum allowed body length.
        max_size: usize,
    },

    /// Message flag carries an unknown message type.
    #[error("wrong message type: {0}")]
    WrongMessageType(u8),

    /// Message is shorter than the minimal header.
    #[error("message too short: {length} bytes")]
    MessageTooShort {
        /// Actual message length.
        length: usize,
    },

    /// Message ends in the middle of a header field.
    #[error("truncated message: missing {0}")]
    Truncated(&'static str),

    /// Request id does not fit into 64 bits.
    #[error("request id overflows 64 bits")]
    IdOverflow,

    /// Route is not valid UTF-8.
    #[error("invalid utf-8 in route: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Message body is not valid structured text.
    #[error("invalid message body: {0}")]
    InvalidBody(String),

    /// Handshake body is not a structured record.
    #[error("invalid handshake body: {0}")]
    InvalidHandshake(String),
}

/// Errors that occur while encoding packets and messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Packet body does not fit the three byte length field.
    #[error("packet too large: {size} bytes exceeds maximum {max_size}")]
    PacketTooLarge {
        /// Body length.
        size: usize,
        /// Maximum allowed body length.
        max_size: usize,
    },

    /// Route does not fit the one byte length field.
    #[error("route too long: {length} bytes exceeds max {max_length}")]
    RouteTooLong {
        /// Route length in bytes.
        length: usize,
        /// Maximum route length in bytes.
        max_length: usize,
    },

    /// Message body could not be serialized.
    #[error("body serialization failed: {0}")]
    Body(String),
}

/// Errors in session layer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Session is closing or closed.
    #[error("session closed")]
    Closed,

    /// Route is empty or too long.
    #[error("invalid route: {0:?}")]
    InvalidRoute(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::PacketTooLarge {
            size: 70000,
            max_size: 65536,
        };
        assert_eq!(
            err.to_string(),
            "packet too large: 70000 bytes exceeds maximum 65536"
        );
        assert_eq!(
            DecodeError::WrongPacketType(9).to_string(),
            "wrong packet type: 0x09"
        );
    }

    #[test]
    fn test_kit_error_from_decode() {
        let kit_err: KitError = DecodeError::IdOverflow.into();
        assert!(matches!(kit_err, KitError::Decode(DecodeError::IdOverflow)));
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Configuration("connection target is required".into());
        assert_eq!(
            err.to_string(),
            "configuration error: connection target is required"
        );
        assert_eq!(SessionError::Closed.to_string(), "session closed");
    }

    #[test]
    fn test_encode_error_display() {
        let err = EncodeError::RouteTooLong {
            length: 300,
            max_length: 255,
        };
        assert_eq!(err.to_string(), "route too long: 300 bytes exceeds max 255");
    }
}
