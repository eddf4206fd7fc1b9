/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Core types for IronKit sessions.
//!
//! This module provides fundamental types used throughout the workspace:
//! - [`RequestId`]: Correlation identifier matching responses to requests
//! - [`Route`]: Validated route name addressing a server handler
//! - [`HandshakeRequest`] / [`HandshakeResponse`]: Structured handshake bodies

use crate::error::DecodeError;
use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Maximum length for route strings in bytes.
pub const ROUTE_MAX_LEN: usize = 255;

/// Longest heartbeat interval accepted from a server, in seconds.
pub const HEARTBEAT_MAX_SECS: u64 = 86_400;

/// Correlation identifier of a request.
///
/// Zero means "no response expected" and is never allocated for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// The "no response expected" identifier.
    pub const NONE: Self = Self(0);

    /// Creates a new request identifier.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns true if this is the "no response expected" identifier.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RequestId> for u64 {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Route name addressing a server handler or a pushed event.
///
/// Routes are non-empty and at most 255 bytes, the limit of the one byte
/// length field on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Route(ArrayString<ROUTE_MAX_LEN>);

impl Route {
    /// Creates a new route from a string slice.
    ///
    /// # Returns
    /// `Some(Route)` if the string is non-empty and fits within the maximum length.
    #[must_use]
    pub fn new(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        ArrayString::from(s).ok().map(Self)
    }

    /// Returns the route as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the length of the route in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; routes are never empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for Route {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Route {
    type Err = crate::error::SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| crate::error::SessionError::InvalidRoute(s.to_string()))
    }
}

/// Body of the handshake packet sent by the client.
///
/// Carries the previously assigned session identifier so the server can
/// resume the logical session; empty on the first attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Known session identifier.
    pub sid: String,
}

impl HandshakeRequest {
    /// Creates a handshake request for the given session identifier.
    #[must_use]
    pub fn new(sid: impl Into<String>) -> Self {
        Self { sid: sid.into() }
    }

    /// Serializes the request as structured text.
    #[must_use]
    pub fn to_body(&self) -> Vec<u8> {
        // a struct with one string field always serializes
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Body of the handshake packet answered by the server.
///
/// Every field is optional. Fields of the wrong type are treated as absent
/// so a partially usable record still completes the handshake. The heartbeat
/// interval is kept as sent and checked by [`HandshakeResponse::heartbeat_secs`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// Status code reported by the server.
    pub code: Option<u64>,
    /// Session identifier assigned by the server.
    pub sid: Option<String>,
    /// Heartbeat interval in seconds, as sent by the server.
    pub hb: Option<Value>,
}

impl HandshakeResponse {
    /// Parses a handshake response body.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidHandshake` if the body is not a structured record.
    pub fn parse(body: &[u8]) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| DecodeError::InvalidHandshake(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(DecodeError::InvalidHandshake(
                "expected a structured record".to_string(),
            ));
        };

        Ok(Self {
            code: fields.get("code").and_then(Value::as_u64),
            sid: fields
                .get("sid")
                .and_then(Value::as_str)
                .filter(|sid| !sid.is_empty())
                .map(str::to_string),
            hb: fields.get("hb").filter(|hb| !hb.is_null()).cloned(),
        })
    }

    /// Returns the heartbeat interval in seconds, zero when absent.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidHandshake` if the interval is present but
    /// not a whole number of seconds up to [`HEARTBEAT_MAX_SECS`].
    pub fn heartbeat_secs(&self) -> Result<u64, DecodeError> {
        let Some(hb) = &self.hb else {
            return Ok(0);
        };
        hb.as_u64()
            .filter(|secs| *secs <= HEARTBEAT_MAX_SECS)
            .ok_or_else(|| {
                DecodeError::InvalidHandshake(format!("unusable heartbeat interval {hb}"))
            })
    }
}
