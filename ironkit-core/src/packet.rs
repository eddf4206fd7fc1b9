/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Packet framing.
//!
//! Every unit on the wire is a packet:
//!
//! ```text
//! -<type>-|--------<length>--------|-<body>-
//! 1 byte  | 3 bytes, big endian    | length bytes
//! ```
//!
//! A single read from the transport may contain several coalesced packets or
//! only part of one, so decoding works incrementally on a [`BytesMut`] buffer.

use crate::error::{DecodeError, EncodeError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use std::fmt;

/// Length of the packet header in bytes.
pub const PACKET_HEAD_LENGTH: usize = 4;

/// Default maximum packet body length in bytes.
pub const PACKET_MAX_SIZE: usize = 64 * 1024;

/// Largest body length representable by the three byte length field.
const LENGTH_FIELD_MAX: usize = 0x00FF_FFFF;

/// Packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum PacketType {
    /// Handshake request (client) and handshake response (server).
    Handshake = 0x01,
    /// Handshake acknowledgement sent by the client.
    HandshakeAck = 0x02,
    /// Keep-alive.
    Heartbeat = 0x03,
    /// Application message.
    Data = 0x04,
    /// Session termination, sent by either side.
    Kick = 0x05,
}

impl PacketType {
    /// Returns the wire byte of this packet type.
    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PacketType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(DecodeError::WrongPacketType(value))
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Handshake => "Handshake",
            Self::HandshakeAck => "HandshakeAck",
            Self::Heartbeat => "Heartbeat",
            Self::Data => "Data",
            Self::Kick => "Kick",
        };
        f.write_str(name)
    }
}

/// A decoded or to-be-encoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet type.
    pub packet_type: PacketType,
    /// Packet body.
    pub body: Bytes,
}

impl Packet {
    /// Creates a packet with the given body.
    #[must_use]
    pub fn new(packet_type: PacketType, body: impl Into<Bytes>) -> Self {
        Self {
            packet_type,
            body: body.into(),
        }
    }

    /// Creates a packet without body.
    #[must_use]
    pub const fn empty(packet_type: PacketType) -> Self {
        Self {
            packet_type,
            body: Bytes::new(),
        }
    }

    /// Returns the encoded size of this packet.
    #[inline]
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        PACKET_HEAD_LENGTH + self.body.len()
    }

    /// Appends the encoded packet to `dst`.
    ///
    /// # Errors
    /// Returns `EncodeError::PacketTooLarge` if the body exceeds [`PACKET_MAX_SIZE`].
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        let len = self.body.len();
        if len > PACKET_MAX_SIZE {
            return Err(EncodeError::PacketTooLarge {
                size: len,
                max_size: PACKET_MAX_SIZE,
            });
        }

        dst.reserve(self.encoded_len());
        dst.put_u8(self.packet_type.as_byte());
        dst.put_uint(len as u64, 3);
        dst.put_slice(&self.body);
        Ok(())
    }

    /// Encodes the packet into a new buffer.
    ///
    /// # Errors
    /// Returns `EncodeError::PacketTooLarge` if the body exceeds [`PACKET_MAX_SIZE`].
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Decodes one packet from the front of `src` using [`PACKET_MAX_SIZE`].
///
/// # Errors
/// See [`decode_packet_with_limit`].
pub fn decode_packet(src: &mut BytesMut) -> Result<Option<Packet>, DecodeError> {
    decode_packet_with_limit(src, PACKET_MAX_SIZE)
}

/// Decodes one packet from the front of `src`.
///
/// Returns `Ok(None)` and leaves `src` untouched when it does not yet hold a
/// complete packet. On success exactly one packet is consumed.
///
/// # Errors
/// Returns `DecodeError::WrongPacketType` for an unknown type byte and
/// `DecodeError::PacketTooLarge` if the declared length exceeds `max_size`.
pub fn decode_packet_with_limit(
    src: &mut BytesMut,
    max_size: usize,
) -> Result<Option<Packet>, DecodeError> {
    if src.len() < PACKET_HEAD_LENGTH {
        return Ok(None);
    }

    let packet_type = PacketType::try_from(src[0])?;
    let size = (usize::from(src[1]) << 16) | (usize::from(src[2]) << 8) | usize::from(src[3]);

    let max_size = max_size.min(LENGTH_FIELD_MAX);
    if size > max_size {
        return Err(DecodeError::PacketTooLarge { size, max_size });
    }

    let total = PACKET_HEAD_LENGTH + size;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(PACKET_HEAD_LENGTH);
    let body = src.split_to(size).freeze();
    Ok(Some(Packet { packet_type, body }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header_layout() {
        let packet = Packet::new(PacketType::Data, vec![0xAA; 0x010203]);
        let err = packet.encode().unwrap_err();
        assert!(matches!(err, EncodeError::PacketTooLarge { .. }));

        let packet = Packet::new(PacketType::Data, &b"hello"[..]);
        let encoded = packet.encode().unwrap();
        assert_eq!(&encoded[..4], &[0x04, 0x00, 0x00, 0x05]);
        assert_eq!(&encoded[4..], b"hello");
    }

    #[test]
    fn test_encode_empty() {
        let encoded = Packet::empty(PacketType::Heartbeat).encode().unwrap();
        assert_eq!(&encoded[..], &[0x03, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_decode_incomplete() {
        let mut buf = BytesMut::from(&[0x04, 0x00, 0x00][..]);
        assert!(decode_packet(&mut buf).unwrap().is_none());

        let mut buf = BytesMut::from(&[0x04, 0x00, 0x00, 0x05, b'h', b'e'][..]);
        assert!(decode_packet(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_decode_coalesced() {
        let mut buf = BytesMut::new();
        Packet::empty(PacketType::Heartbeat)
            .encode_into(&mut buf)
            .unwrap();
        Packet::new(PacketType::Data, &b"abc"[..])
            .encode_into(&mut buf)
            .unwrap();
        buf.extend_from_slice(&[0x05, 0x00]);

        let first = decode_packet(&mut buf).unwrap().unwrap();
        assert_eq!(first.packet_type, PacketType::Heartbeat);
        assert!(first.body.is_empty());

        let second = decode_packet(&mut buf).unwrap().unwrap();
        assert_eq!(second.packet_type, PacketType::Data);
        assert_eq!(&second.body[..], b"abc");

        assert!(decode_packet(&mut buf).unwrap().is_none());
        assert_eq!(&buf[..], &[0x05, 0x00]);
    }

    #[test]
    fn test_decode_wrong_type() {
        let mut buf = BytesMut::from(&[0x09, 0x00, 0x00, 0x00][..]);
        assert_eq!(
            decode_packet(&mut buf),
            Err(DecodeError::WrongPacketType(0x09))
        );
    }

    #[test]
    fn test_decode_too_large() {
        let mut buf = BytesMut::from(&[0x04, 0x00, 0x01, 0x00][..]);
        assert_eq!(
            decode_packet_with_limit(&mut buf, 128),
            Err(DecodeError::PacketTooLarge {
                size: 256,
                max_size: 128
            })
        );
    }

    #[test]
    fn test_packet_type_from_byte() {
        assert_eq!(PacketType::try_from(0x01), Ok(PacketType::Handshake));
        assert_eq!(PacketType::try_from(0x05), Ok(PacketType::Kick));
        assert!(PacketType::try_from(0x00).is_err());
        assert_eq!(PacketType::Kick.to_string(), "Kick");
    }
}
