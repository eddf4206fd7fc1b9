/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Tokio codec for packet framing.
//!
//! This module provides a codec that frames IronKit packets over a byte
//! stream, for use with `tokio_util::codec::Framed` on either end.

use bytes::{BufMut, Bytes, BytesMut};
use ironkit_core::error::{DecodeError, EncodeError};
use ironkit_core::packet::{PACKET_MAX_SIZE, Packet, decode_packet_with_limit};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Errors that can occur during codec operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Malformed packet header.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Packet could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Tokio codec for packet framing.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    /// Maximum packet body size in bytes.
    max_packet_size: usize,
}

impl PacketCodec {
    /// Creates a new codec with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_packet_size: PACKET_MAX_SIZE,
        }
    }

    /// Sets the maximum packet body size.
    #[must_use]
    pub const fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size;
        self
    }

    /// Returns the maximum packet body size.
    #[must_use]
    pub const fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decode_packet_with_limit(src, self.max_packet_size)?)
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.body.len() > self.max_packet_size {
            return Err(EncodeError::PacketTooLarge {
                size: item.body.len(),
                max_size: self.max_packet_size,
            }
            .into());
        }
        item.encode_into(dst)?;
        Ok(())
    }
}

/// Already encoded packets are written verbatim.
impl Encoder<Bytes> for PacketCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironkit_core::packet::PacketType;

    #[test]
    fn test_codec_decode_complete_packet() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&[0x04, 0x00, 0x00, 0x02, b'{', b'}'][..]);

        let packet = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(packet.packet_type, PacketType::Data);
        assert_eq!(&packet.body[..], b"{}");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_decode_incomplete() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&[0x04, 0x00, 0x00, 0x02, b'{'][..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_decode_invalid_type() {
        let mut codec = PacketCodec::new();
        let mut buf = BytesMut::from(&[0x07, 0x00, 0x00, 0x00][..]);

        let result = codec.decode(&mut buf);
        assert!(matches!(
            result,
            Err(CodecError::Decode(DecodeError::WrongPacketType(0x07)))
        ));
    }

    #[test]
    fn test_codec_size_limit() {
        let mut codec = PacketCodec::new().with_max_packet_size(4);
        assert_eq!(codec.max_packet_size(), 4);

        let mut buf = BytesMut::from(&[0x04, 0x00, 0x00, 0x05][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::Decode(DecodeError::PacketTooLarge { .. }))
        ));

        let mut dst = BytesMut::new();
        let result = codec.encode(Packet::new(PacketType::Data, &b"hello"[..]), &mut dst);
        assert!(matches!(
            result,
            Err(CodecError::Encode(EncodeError::PacketTooLarge { .. }))
        ));
    }

    #[test]
    fn test_codec_encode() {
        let mut codec = PacketCodec::new();
        let mut dst = BytesMut::new();

        codec
            .encode(Packet::empty(PacketType::HandshakeAck), &mut dst)
            .unwrap();
        codec
            .encode(Bytes::from_static(&[0x03, 0x00, 0x00, 0x00]), &mut dst)
            .unwrap();
        assert_eq!(&dst[..], &[0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00]);
    }
}
