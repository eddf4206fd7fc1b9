/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Request identifiers and the pending-request table.

use ironkit_core::types::RequestId;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Next request identifier, shared by every session in the process.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide request identifier allocator.
///
/// Identifiers start at 1, increase monotonically and are never reused, even
/// across sessions and reconnects.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIds;

impl RequestIds {
    /// Allocates the next request identifier.
    #[inline]
    pub fn next() -> RequestId {
        loop {
            let value = NEXT_REQUEST_ID.fetch_add(1, Ordering::SeqCst);
            // zero marks a message without id
            if value != 0 {
                return RequestId::new(value);
            }
        }
    }
}

/// Callback invoked with the decoded body of a response.
pub type ResponseCallback = Box<dyn FnOnce(Value) + Send>;

/// Requests awaiting a response, keyed by request identifier.
#[derive(Default)]
pub struct PendingRequests {
    entries: HashMap<RequestId, ResponseCallback>,
}

impl PendingRequests {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the callback for `id`, replacing any previous one.
    pub fn insert(&mut self, id: RequestId, callback: ResponseCallback) {
        self.entries.insert(id, callback);
    }

    /// Removes and returns the callback for `id`.
    pub fn resolve(&mut self, id: RequestId) -> Option<ResponseCallback> {
        self.entries.remove(&id)
    }

    /// Returns the number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no requests are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every callback without invoking it. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }
}

impl fmt::Debug for PendingRequests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequests")
            .field("len", &self.entries.len())
            .finish()
    }
}
