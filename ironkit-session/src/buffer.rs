/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Outbound packet buffer.
//!
//! Encoded packets queued while no handshake has completed. The buffer is
//! unbounded and flushed in FIFO order once the session opens.

use bytes::Bytes;
use std::collections::VecDeque;
use std::collections::vec_deque::Drain;

/// FIFO of encoded packets awaiting an open session.
#[derive(Debug, Default)]
pub struct OutboundBuffer {
    queue: VecDeque<Bytes>,
    bytes: usize,
}

impl OutboundBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an encoded packet.
    pub fn push(&mut self, packet: Bytes) {
        self.bytes += packet.len();
        self.queue.push_back(packet);
    }

    /// Removes every packet in insertion order.
    pub fn drain(&mut self) -> Drain<'_, Bytes> {
        self.bytes = 0;
        self.queue.drain(..)
    }

    /// Discards every packet.
    pub fn clear(&mut self) {
        self.bytes = 0;
        self.queue.clear();
    }

    /// Returns the number of buffered packets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the total size of buffered packets in bytes.
    #[must_use]
    pub const fn bytes(&self) -> usize {
        self.bytes
    }
}
