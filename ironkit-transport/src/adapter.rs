/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Transport adapter contract.
//!
//! A session never owns sockets directly. It asks a [`Connector`] to open a
//! connection and receives a [`TransportHandle`] for sending and closing.
//! Lifecycle and data events arrive later, tagged with the [`ConnectionId`]
//! the connection was opened with. A session only listens to the id of its
//! current connection, so dropping interest in an old connection is a matter
//! of forgetting its id.

use bytes::Bytes;
use std::fmt;

/// Identifies one opened connection within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a connection identifier.
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

    /// Returns the identifier following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Events reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and ready to send.
    Open,
    /// Bytes were received. May hold partial or several packets.
    Message(Bytes),
    /// The connection failed.
    Error(String),
    /// The connection was closed by the peer or the network.
    Closed(String),
}

/// Handle to one opened connection.
pub trait TransportHandle {
    /// Queues bytes for transmission.
    fn send(&mut self, data: Bytes);

    /// Closes the connection. No events are reported afterwards.
    fn close(&mut self);
}

/// Opens connections to a target.
pub trait Connector {
    /// Handle type of opened connections.
    type Handle: TransportHandle;

    /// Starts opening a connection to `target`.
    ///
    /// Returns immediately; the outcome is reported through events tagged
    /// with `id`.
    fn open(&mut self, target: &str, id: ConnectionId) -> Self::Handle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id() {
        let id = ConnectionId::new(1);
        assert_eq!(id.value(), 1);
        assert_eq!(id.next(), ConnectionId::new(2));
        assert_eq!(id.to_string(), "conn#1");
    }
}
