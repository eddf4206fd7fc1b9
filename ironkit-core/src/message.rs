/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Application messages carried in data packets.
//!
//! The message kind lives in bits 1-3 of the leading flag byte. The fields
//! following the flag depend on the kind:
//!
//! ```text
//! | kind     | flag     | header              |
//! |----------|----------|---------------------|
//! | request  | ----000- | <id> <route>        |
//! | notify   | ----001- | <route>             |
//! | response | ----010- | <id>                |
//! | push     | ----011- | <route>             |
//! ```
//!
//! Ids are base-128 varints, least significant group first. Routes are a
//! length byte followed by UTF-8 bytes. The remainder is the body, which
//! carries structured text.

use crate::error::{DecodeError, EncodeError};
use crate::types::{ROUTE_MAX_LEN, RequestId};
use bytes::{BufMut, Bytes, BytesMut};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

const MSG_TYPE_MASK: u8 = 0x07;
const MSG_HEAD_LENGTH: usize = 2;

/// Message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum MessageType {
    /// Client request expecting a response.
    Request = 0x00,
    /// Fire-and-forget client message.
    Notify = 0x01,
    /// Server response to a request.
    Response = 0x02,
    /// Server-initiated event.
    Push = 0x03,
}

impl MessageType {
    /// Returns true if messages of this kind carry an id.
    #[inline]
    #[must_use]
    pub const fn has_id(self) -> bool {
        matches!(self, Self::Request | Self::Response)
    }

    /// Returns true if messages of this kind carry a route.
    #[inline]
    #[must_use]
    pub const fn has_route(self) -> bool {
        matches!(self, Self::Request | Self::Notify | Self::Push)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Request => "Request",
            Self::Notify => "Notify",
            Self::Response => "Response",
            Self::Push => "Push",
        };
        f.write_str(name)
    }
}

/// An application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message kind.
    pub message_type: MessageType,
    /// Correlation id, [`RequestId::NONE`] for kinds without one.
    pub id: RequestId,
    /// Route, empty for kinds without one.
    pub route: String,
    /// Encoded body.
    pub body: Bytes,
}

impl Message {
    /// Creates a request message.
    #[must_use]
    pub fn request(id: RequestId, route: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            message_type: MessageType::Request,
            id,
            route: route.into(),
            body: body.into(),
        }
    }

    /// Creates a notify message.
    #[must_use]
    pub fn notify(route: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            message_type: MessageType::Notify,
            id: RequestId::NONE,
            route: route.into(),
            body: body.into(),
        }
    }

    /// Creates a response message.
    #[must_use]
    pub fn response(id: RequestId, body: impl Into<Bytes>) -> Self {
        Self {
            message_type: MessageType::Response,
            id,
            route: String::new(),
            body: body.into(),
        }
    }

    /// Creates a push message.
    #[must_use]
    pub fn push(route: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            message_type: MessageType::Push,
            id: RequestId::NONE,
            route: route.into(),
            body: body.into(),
        }
    }

    /// Returns true if this message answers a request.
    ///
    /// Servers may answer with either a response or a request-kind message
    /// echoing the id, so only the id is inspected.
    #[inline]
    #[must_use]
    pub fn is_response(&self) -> bool {
        !self.id.is_none()
    }

    /// Encodes the message.
    ///
    /// # Errors
    /// Returns `EncodeError::RouteTooLong` if the route exceeds 255 bytes.
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut buf = BytesMut::with_capacity(
            MSG_HEAD_LENGTH + 10 + self.route.len() + self.body.len(),
        );
        buf.put_u8((self.message_type as u8) << 1);

        if self.message_type.has_id() {
            let mut n = self.id.value();
            loop {
                let group = (n & 0x7F) as u8;
                n >>= 7;
                if n == 0 {
                    buf.put_u8(group);
                    break;
                }
                buf.put_u8(group | 0x80);
            }
        }

        if self.message_type.has_route() {
            let length = self.route.len();
            if length > ROUTE_MAX_LEN {
                return Err(EncodeError::RouteTooLong {
                    length,
                    max_length: ROUTE_MAX_LEN,
                });
            }
            buf.put_u8(length as u8);
            buf.put_slice(self.route.as_bytes());
        }

        buf.put_slice(&self.body);
        Ok(buf.freeze())
    }

    /// Decodes a message, copying its body.
    ///
    /// # Errors
    /// See [`Message::decode_bytes`].
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_bytes(Bytes::copy_from_slice(data))
    }

    /// Decodes a message, slicing its body out of `data` without copying.
    ///
    /// # Errors
    /// Returns `DecodeError` if the buffer is too short, carries an unknown
    /// kind, ends inside the id or route, or the route is not UTF-8.
    pub fn decode_bytes(data: Bytes) -> Result<Self, DecodeError> {
        if data.len() < MSG_HEAD_LENGTH {
            return Err(DecodeError::MessageTooShort { length: data.len() });
        }

        let kind = (data[0] >> 1) & MSG_TYPE_MASK;
        let message_type =
            MessageType::from_u8(kind).ok_or(DecodeError::WrongMessageType(kind))?;
        let mut offset = 1;

        let mut id = 0u64;
        if message_type.has_id() {
            let mut shift = 0u32;
            loop {
                let byte = *data.get(offset).ok_or(DecodeError::Truncated("request id"))?;
                offset += 1;
                let group = u64::from(byte & 0x7F);
                if shift >= 64 || (shift > 0 && group >> (64 - shift) != 0) {
                    return Err(DecodeError::IdOverflow);
                }
                id |= group << shift;
                if byte & 0x80 == 0 {
                    break;
                }
                shift += 7;
            }
        }

        let mut route = String::new();
        if message_type.has_route() {
            let length = usize::from(*data.get(offset).ok_or(DecodeError::Truncated("route"))?);
            offset += 1;
            let bytes = data
                .get(offset..offset + length)
                .ok_or(DecodeError::Truncated("route"))?;
            route = std::str::from_utf8(bytes)?.to_string();
            offset += length;
        }

        Ok(Self {
            message_type,
            id: RequestId::new(id),
            route,
            body: data.slice(offset..),
        })
    }

    /// Parses the body as structured text.
    ///
    /// An empty body is parsed as JSON `null`.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidBody` if the body is not valid for `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let body: &[u8] = if self.body.is_empty() {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(|e| DecodeError::InvalidBody(e.to_string()))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Type: {}, ID: {}, Route: {}, BodyLength: {}",
            self.message_type,
            self.id,
            self.route,
            self.body.len()
        )
    }
}

/// Serializes a message body as structured text.
///
/// # Errors
/// Returns `EncodeError::Body` if `body` cannot be serialized.
pub fn encode_body<T: Serialize + ?Sized>(body: &T) -> Result<Bytes, EncodeError> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| EncodeError::Body(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_encode_request_layout() {
        let msg = Message::request(RequestId::new(300), "m.echo", &b"{}"[..]);
        let encoded = msg.encode().unwrap();
        // 300 = 0b10_0101100 -> [0xAC, 0x02]
        assert_eq!(
            &encoded[..],
            &[0x00, 0xAC, 0x02, 6, b'm', b'.', b'e', b'c', b'h', b'o', b'{', b'}']
        );
    }

    #[test]
    fn test_encode_notify_layout() {
        let encoded = Message::notify("chat", &b"1"[..]).encode().unwrap();
        assert_eq!(&encoded[..], &[0x02, 4, b'c', b'h', b'a', b't', b'1']);
    }

    #[test]
    fn test_encode_route_too_long() {
        let msg = Message::notify("r".repeat(256), Bytes::new());
        assert!(matches!(
            msg.encode(),
            Err(EncodeError::RouteTooLong { length: 256, .. })
        ));
    }

    #[test]
    fn test_decode_response() {
        let msg = Message::decode(&[0x04, 0x2A, b'{', b'}']).unwrap();
        assert_eq!(msg.message_type, MessageType::Response);
        assert_eq!(msg.id.value(), 42);
        assert!(msg.route.is_empty());
        assert!(msg.is_response());
        assert_eq!(&msg.body[..], b"{}");
    }

    #[test]
    fn test_decode_request_kind_response() {
        // servers answer requests with the request kind and an empty route
        let msg = Message::decode(&[0x00, 0x05, 0x00, b'1']).unwrap();
        assert_eq!(msg.message_type, MessageType::Request);
        assert!(msg.is_response());
        assert_eq!(msg.id.value(), 5);
        assert_eq!(msg.body_as::<u32>().unwrap(), 1);
    }

    #[test]
    fn test_decode_push() {
        let encoded = Message::push("chat", &br#"{"msg":"welcome"}"#[..])
            .encode()
            .unwrap();
        let msg = Message::decode(&encoded).unwrap();
        assert_eq!(msg.message_type, MessageType::Push);
        assert!(!msg.is_response());
        assert_eq!(msg.route, "chat");
        let body: Value = msg.body_as().unwrap();
        assert_eq!(body, json!({"msg": "welcome"}));
    }

    #[test]
    fn test_decode_large_id() {
        let id = RequestId::new(u64::MAX);
        let encoded = Message::response(id, Bytes::new()).encode().unwrap();
        assert_eq!(Message::decode(&encoded).unwrap().id, id);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            Message::decode(&[0x00]),
            Err(DecodeError::MessageTooShort { length: 1 })
        );
        assert_eq!(
            Message::decode(&[0x0E, 0x00]),
            Err(DecodeError::WrongMessageType(7))
        );
        assert_eq!(
            Message::decode(&[0x04, 0x80]),
            Err(DecodeError::Truncated("request id"))
        );
        assert_eq!(
            Message::decode(&[0x06, 0x05, b'a']),
            Err(DecodeError::Truncated("route"))
        );
        assert!(matches!(
            Message::decode(&[0x06, 0x01, 0xFF]),
            Err(DecodeError::InvalidUtf8(_))
        ));
        assert_eq!(
            Message::decode(&[0x04, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]),
            Err(DecodeError::IdOverflow)
        );
    }

    #[test]
    fn test_body_as_empty_is_null() {
        let msg = Message::push("tick", Bytes::new());
        assert_eq!(msg.body_as::<Value>().unwrap(), Value::Null);
        let msg = Message::push("tick", &b"{oops"[..]);
        assert!(matches!(
            msg.body_as::<Value>(),
            Err(DecodeError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_encode_body() {
        let body = encode_body(&json!({"text": "hi"})).unwrap();
        assert_eq!(&body[..], br#"{"text":"hi"}"#);
    }
}
