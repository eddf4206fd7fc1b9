/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Named-event publish/subscribe.
//!
//! Server pushes are published under their route. Session lifecycle signals
//! use the reserved names below.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// Published once when the session starts closing.
pub const EVENT_CLOSE: &str = "close";

/// Published when a reconnection attempt is scheduled. Payload: attempt number.
pub const EVENT_RECONNECT: &str = "reconnect";

/// Published when a handshake completes after reconnection.
pub const EVENT_RECONNECTED: &str = "reconnected";

/// Published on transport failures. Payload: the failure reason.
pub const EVENT_TRANSPORT_ERROR: &str = "transport-error";

/// Identifies a subscription within an [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Returns the raw identifier value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Event handler.
pub type Handler<T> = Box<dyn FnMut(&T) + Send>;

struct Subscription<T> {
    id: SubscriptionId,
    once: bool,
    handler: Handler<T>,
}

/// Registry of handlers keyed by event name.
///
/// Handlers for one event run in subscription order.
pub struct EventBus<T> {
    next_id: u64,
    handlers: HashMap<String, SmallVec<[Subscription<T>; 2]>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            handlers: HashMap::new(),
        }
    }
}

impl<T> EventBus<T> {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for every publication of `event`.
    pub fn subscribe<F>(&mut self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.register(event.into(), false, Box::new(handler))
    }

    /// Registers a handler for the next publication of `event` only.
    pub fn subscribe_once<F>(&mut self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let mut handler = Some(handler);
        self.register(
            event.into(),
            true,
            Box::new(move |payload| {
                if let Some(handler) = handler.take() {
                    handler(payload);
                }
            }),
        )
    }

    fn register(&mut self, event: String, once: bool, handler: Handler<T>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.handlers
            .entry(event)
            .or_default()
            .push(Subscription { id, once, handler });
        id
    }

    /// Removes one handler. Returns true if it was registered for `event`.
    pub fn unsubscribe(&mut self, event: &str, id: SubscriptionId) -> bool {
        let Some(list) = self.handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|sub| sub.id != id);
        let removed = list.len() < before;
        if list.is_empty() {
            self.handlers.remove(event);
        }
        removed
    }

    /// Removes every handler of `event`. Returns how many were removed.
    pub fn unsubscribe_all(&mut self, event: &str) -> usize {
        self.handlers.remove(event).map_or(0, |list| list.len())
    }

    /// Removes every handler of every event.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Delivers `payload` to the handlers of `event`.
    ///
    /// One-shot handlers are removed after running. Returns the number of
    /// handlers invoked.
    pub fn publish(&mut self, event: &str, payload: &T) -> usize {
        let Some(list) = self.handlers.get_mut(event) else {
            return 0;
        };
        let mut delivered = 0;
        list.retain(|sub| {
            (sub.handler)(payload);
            delivered += 1;
            !sub.once
        });
        if list.is_empty() {
            self.handlers.remove(event);
        }
        delivered
    }

    /// Returns the number of handlers registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, |list| list.len())
    }

    /// Returns true if `event` has at least one handler.
    #[must_use]
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<(&str, usize)> = self
            .handlers
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        events.sort_unstable();
        f.debug_struct("EventBus").field("events", &events).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn FnMut(&u32) + Send>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&log);
        let make = move |tag: &str| {
            let log = Arc::clone(&shared);
            let tag = tag.to_string();
            Box::new(move |value: &u32| log.lock().push(format!("{tag}:{value}")))
                as Box<dyn FnMut(&u32) + Send>
        };
        (log, make)
    }

    #[test]
    fn test_publish_in_subscription_order() {
        let (log, make) = recorder();
        let mut bus = EventBus::new();
        bus.subscribe("chat", make("a"));
        bus.subscribe("chat", make("b"));
        bus.subscribe("other", make("c"));

        assert_eq!(bus.publish("chat", &1), 2);
        assert_eq!(*log.lock(), vec!["a:1", "b:1"]);
        assert_eq!(bus.publish("missing", &1), 0);
    }

    #[test]
    fn test_subscribe_once() {
        let (log, make) = recorder();
        let mut bus = EventBus::new();
        let mut once = make("once");
        bus.subscribe_once("tick", move |value: &u32| once(value));
        bus.subscribe("tick", make("always"));

        bus.publish("tick", &1);
        bus.publish("tick", &2);
        assert_eq!(*log.lock(), vec!["once:1", "always:1", "always:2"]);
        assert_eq!(bus.listener_count("tick"), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let (log, make) = recorder();
        let mut bus = EventBus::new();
        let first = bus.subscribe("chat", make("a"));
        bus.subscribe("chat", make("b"));

        assert!(!bus.unsubscribe("other", first));
        assert!(bus.unsubscribe("chat", first));
        assert!(!bus.unsubscribe("chat", first));
        bus.publish("chat", &7);
        assert_eq!(*log.lock(), vec!["b:7"]);

        assert_eq!(bus.unsubscribe_all("chat"), 1);
        assert!(!bus.has_listeners("chat"));
    }

    #[test]
    fn test_clear() {
        let (_log, make) = recorder();
        let mut bus = EventBus::new();
        bus.subscribe("a", make("a"));
        bus.subscribe("b", make("b"));
        assert_eq!(format!("{bus:?}"), r#"EventBus { events: [("a", 1), ("b", 1)] }"#);

        bus.clear();
        assert!(!bus.has_listeners("a"));
        assert!(!bus.has_listeners("b"));
    }
}
