/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Client session state machine.
//!
//! A [`Session`] owns one logical conversation with a server across any
//! number of transport connections. It performs no I/O of its own: it opens
//! connections through a [`Connector`], schedules timers through a
//! [`Scheduler`], and is driven by three kinds of input:
//! - public operations (`notify`, `request`, `disconnect`, subscriptions)
//! - transport events, via [`Session::handle_transport_event`]
//! - fired timers, via [`Session::handle_timer`]
//!
//! Every input is handled to completion before the next one, so callbacks
//! and handlers run on the caller's thread with no locking.

use crate::buffer::OutboundBuffer;
use crate::config::SessionConfig;
use crate::events::{
    EVENT_CLOSE, EVENT_RECONNECT, EVENT_RECONNECTED, EVENT_TRANSPORT_ERROR, EventBus,
    SubscriptionId,
};
use crate::heartbeat::HeartbeatManager;
use crate::pending::{PendingRequests, RequestIds};
use crate::reconnect::{ReconnectDecision, ReconnectPolicy};
use crate::state::SessionState;
use crate::timer::{Scheduler, TimerId};
use bytes::{Bytes, BytesMut};
use ironkit_core::error::SessionError;
use ironkit_core::message::{Message, encode_body};
use ironkit_core::packet::{Packet, PacketType, decode_packet_with_limit};
use ironkit_core::types::{HandshakeRequest, HandshakeResponse, RequestId, Route};
use ironkit_transport::{ConnectionId, Connector, TransportEvent, TransportHandle};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, trace, warn};

/// Encoded kick packet: type 5 with an empty body.
const KICK_PACKET: [u8; 4] = [0x05, 0x00, 0x00, 0x00];

/// Encoded handshake acknowledgement: type 2 with an empty body.
const HANDSHAKE_ACK_PACKET: [u8; 4] = [0x02, 0x00, 0x00, 0x00];

/// Callback invoked once, on the first completed handshake.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// The current transport connection.
struct Link<H> {
    id: ConnectionId,
    handle: H,
    /// Bytes received but not yet framed into packets.
    inbound: BytesMut,
}

/// Client session over a framed transport.
pub struct Session<C: Connector, S: Scheduler> {
    config: SessionConfig,
    state: SessionState,
    sid: String,
    connector: C,
    scheduler: S,
    link: Option<Link<C::Handle>>,
    last_connection: ConnectionId,
    heartbeat: HeartbeatManager,
    reconnect: ReconnectPolicy,
    close_timer: Option<TimerId>,
    outbound: OutboundBuffer,
    pending: PendingRequests,
    events: EventBus<Value>,
    on_ready: Option<ReadyCallback>,
}

impl<C: Connector, S: Scheduler> Session<C, S> {
    /// Creates a session and starts connecting.
    ///
    /// # Arguments
    /// * `config` - Session configuration
    /// * `connector` - Opens transport connections
    /// * `scheduler` - Schedules heartbeat, reconnect and close timers
    /// * `on_ready` - Invoked once when the first handshake completes
    ///
    /// # Errors
    /// Returns `SessionError::Configuration` if the configuration is invalid.
    /// No connection is attempted in that case.
    pub fn new<F>(
        config: SessionConfig,
        connector: C,
        scheduler: S,
        on_ready: F,
    ) -> Result<Self, SessionError>
    where
        F: FnOnce() + Send + 'static,
    {
        config.validate()?;
        let reconnect = ReconnectPolicy::new(config.reconnect_max_attempts, config.reconnect_delay);
        let mut session = Self {
            config,
            state: SessionState::Connecting,
            sid: String::new(),
            connector,
            scheduler,
            link: None,
            last_connection: ConnectionId::new(0),
            heartbeat: HeartbeatManager::new(),
            reconnect,
            close_timer: None,
            outbound: OutboundBuffer::new(),
            pending: PendingRequests::new(),
            events: EventBus::new(),
            on_ready: Some(Box::new(on_ready)),
        };
        session.connect();
        Ok(session)
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the session identifier assigned by the server, empty before
    /// the first handshake.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.sid
    }

    /// Returns the heartbeat interval in seconds last advertised by the server.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> u64 {
        self.heartbeat.interval_secs()
    }

    /// Returns the reconnection attempts made since the last handshake.
    #[must_use]
    pub const fn reconnect_attempts(&self) -> u32 {
        self.reconnect.attempts()
    }

    /// Returns the number of requests awaiting a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Returns the number of packets waiting for the session to open.
    #[must_use]
    pub fn buffered_packets(&self) -> usize {
        self.outbound.len()
    }

    /// Returns the id of the current connection, if one is attached.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.link.as_ref().map(|link| link.id)
    }

    /// Returns the scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Sends a notification. No response is expected.
    ///
    /// Buffered while connecting, dropped once closing.
    pub fn notify<B: Serialize + ?Sized>(&mut self, route: &str, body: &B) {
        if self.state.is_terminating() {
            trace!(route, state = %self.state, "notify dropped");
            return;
        }
        let Some(route) = Route::new(route) else {
            warn!(route, "notify dropped: invalid route");
            return;
        };
        let body = match encode_body(body) {
            Ok(body) => body,
            Err(err) => {
                warn!(%route, error = %err, "notify dropped: body not encodable");
                return;
            }
        };
        if let Some(packet) = Self::encode_data(&Message::notify(route.as_str(), body)) {
            self.send_packet(packet);
        }
    }

    /// Sends a request and registers `callback` for its response.
    ///
    /// Returns the allocated request id, or `None` if nothing was sent
    /// because the session is closing, the route is invalid or the body
    /// could not be encoded.
    pub fn request<B, F>(&mut self, route: &str, body: &B, callback: F) -> Option<RequestId>
    where
        B: Serialize + ?Sized,
        F: FnOnce(Value) + Send + 'static,
    {
        if self.state.is_terminating() {
            trace!(route, state = %self.state, "request dropped");
            return None;
        }
        let Some(route) = Route::new(route) else {
            warn!(route, "request dropped: invalid route");
            return None;
        };
        let body = match encode_body(body) {
            Ok(body) => body,
            Err(err) => {
                warn!(%route, error = %err, "request dropped: body not encodable");
                return None;
            }
        };

        let id = RequestIds::next();
        let packet = Self::encode_data(&Message::request(id, route.as_str(), body))?;
        self.pending.insert(id, Box::new(callback));
        self.send_packet(packet);
        Some(id)
    }

    /// Closes the session.
    ///
    /// Publishes `close`, sends a kick packet and closes the transport after
    /// the configured grace period. Calling it again has no effect.
    pub fn disconnect(&mut self) {
        if self.state.is_terminating() {
            return;
        }
        self.set_state(SessionState::Closing);
        self.heartbeat.stop(&mut self.scheduler);
        self.reconnect.cancel(&mut self.scheduler);
        self.lifecycle("session closing");
        self.events.publish(EVENT_CLOSE, &Value::Null);

        if self.link.is_some() {
            self.transmit(Bytes::from_static(&KICK_PACKET));
            self.close_timer = Some(self.scheduler.schedule_once(self.config.close_grace));
        } else {
            self.finish_close();
        }
    }

    /// Registers a handler for pushes on `route` or a lifecycle event.
    pub fn subscribe<F>(&mut self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.events.subscribe(event, handler)
    }

    /// Registers a handler for the next publication of `event` only.
    pub fn subscribe_once<F>(&mut self, event: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: FnOnce(&Value) + Send + 'static,
    {
        self.events.subscribe_once(event, handler)
    }

    /// Removes a handler. Returns true if it was registered for `event`.
    pub fn unsubscribe(&mut self, event: &str, id: SubscriptionId) -> bool {
        self.events.unsubscribe(event, id)
    }

    /// Removes every handler of `event`.
    pub fn unsubscribe_all(&mut self, event: &str) -> usize {
        self.events.unsubscribe_all(event)
    }

    /// Returns true if `event` has at least one handler.
    #[must_use]
    pub fn has_listeners(&self, event: &str) -> bool {
        self.events.has_listeners(event)
    }

    /// Handles an event reported by the transport.
    ///
    /// Events for any connection other than the current one are ignored.
    pub fn handle_transport_event(&mut self, id: ConnectionId, event: TransportEvent) {
        if self.connection_id() != Some(id) {
            trace!(conn = %id, "event from detached connection ignored");
            return;
        }
        match event {
            TransportEvent::Open => self.on_transport_open(),
            TransportEvent::Message(data) => self.on_transport_data(id, &data),
            TransportEvent::Error(reason) => self.on_transport_lost(reason),
            TransportEvent::Closed(reason) => self.on_transport_lost(reason),
        }
    }

    /// Handles a fired timer. Unknown ids are ignored.
    pub fn handle_timer(&mut self, id: TimerId) {
        if self.heartbeat.is_timer(id) {
            trace!("heartbeat");
            self.transmit(HeartbeatManager::packet());
        } else if self.reconnect.on_timer(id) {
            if self.state == SessionState::Connecting && self.link.is_none() {
                self.lifecycle_attempt();
                self.connect();
            }
        } else if self.close_timer == Some(id) {
            self.close_timer = None;
            if self.state == SessionState::Closing {
                self.finish_close();
            }
        } else {
            trace!(timer = %id, "stale timer ignored");
        }
    }

    fn set_state(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    fn lifecycle(&self, what: &str) {
        if self.config.logging {
            info!(target: "ironkit::session", sid = %self.sid, state = %self.state, "{what}");
        } else {
            debug!(target: "ironkit::session", sid = %self.sid, state = %self.state, "{what}");
        }
    }

    fn lifecycle_attempt(&self) {
        let attempt = self.reconnect.attempts();
        let max = self.reconnect.max_attempts();
        if self.config.logging {
            info!(target: "ironkit::session", attempt, max, "reconnecting");
        } else {
            debug!(target: "ironkit::session", attempt, max, "reconnecting");
        }
    }

    fn connect(&mut self) {
        self.set_state(SessionState::Connecting);
        self.last_connection = self.last_connection.next();
        let id = self.last_connection;
        let handle = self.connector.open(&self.config.target, id);
        self.link = Some(Link {
            id,
            handle,
            inbound: BytesMut::new(),
        });
        debug!(conn = %id, target = %self.config.target, "connecting");
    }

    fn encode_data(message: &Message) -> Option<Bytes> {
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "message dropped: not encodable");
                return None;
            }
        };
        match Packet::new(PacketType::Data, payload).encode() {
            Ok(packet) => Some(packet),
            Err(err) => {
                warn!(error = %err, "message dropped: packet not encodable");
                None
            }
        }
    }

    /// Sends an application packet, buffering it until the session opens.
    fn send_packet(&mut self, packet: Bytes) {
        match self.state {
            SessionState::Open => self.transmit(packet),
            SessionState::Connecting => self.outbound.push(packet),
            SessionState::Closing | SessionState::Closed => {}
        }
    }

    /// Writes a packet to the current connection, if any.
    fn transmit(&mut self, packet: Bytes) {
        if let Some(link) = self.link.as_mut() {
            link.handle.send(packet);
        }
    }

    /// Stops heartbeats and closes the current connection without waiting
    /// for its events.
    fn release_transport(&mut self) {
        self.heartbeat.stop(&mut self.scheduler);
        if let Some(mut link) = self.link.take() {
            link.handle.close();
        }
    }

    fn finish_close(&mut self) {
        self.release_transport();
        self.reconnect.cancel(&mut self.scheduler);
        if let Some(timer) = self.close_timer.take() {
            self.scheduler.cancel(timer);
        }
        let dropped = self.pending.clear();
        if dropped > 0 {
            debug!(dropped, "pending requests dropped");
        }
        self.outbound.clear();
        self.set_state(SessionState::Closed);
        self.lifecycle("session closed");
    }

    fn on_transport_open(&mut self) {
        if self.state != SessionState::Connecting {
            return;
        }
        let body = HandshakeRequest::new(self.sid.as_str()).to_body();
        match Packet::new(PacketType::Handshake, body).encode() {
            Ok(packet) => self.transmit(packet),
            Err(err) => warn!(error = %err, "handshake not encodable"),
        }
    }

    fn on_transport_data(&mut self, id: ConnectionId, data: &[u8]) {
        if self.state.is_terminating() {
            trace!(bytes = data.len(), "inbound data ignored while closing");
            return;
        }
        let max_packet_size = self.config.max_packet_size;
        if let Some(link) = self.link.as_mut() {
            link.inbound.extend_from_slice(data);
        }

        loop {
            let Some(link) = self.link.as_mut().filter(|link| link.id == id) else {
                return;
            };
            let packet = match decode_packet_with_limit(&mut link.inbound, max_packet_size) {
                Ok(Some(packet)) => packet,
                Ok(None) => return,
                Err(err) => {
                    warn!(conn = %id, error = %err, "malformed packet");
                    self.on_transport_lost(format!("malformed packet: {err}"));
                    return;
                }
            };
            self.dispatch(packet);
            if self.state.is_terminating() {
                return;
            }
        }
    }

    fn dispatch(&mut self, packet: Packet) {
        match packet.packet_type {
            PacketType::Handshake => self.on_handshake(&packet.body),
            PacketType::Heartbeat => trace!("heartbeat received"),
            PacketType::Data => self.on_data(packet.body),
            PacketType::Kick => {
                self.lifecycle("kicked by server");
                self.disconnect();
            }
            PacketType::HandshakeAck => warn!("unexpected handshake ack from server"),
        }
    }

    fn on_handshake(&mut self, body: &[u8]) {
        if self.state != SessionState::Connecting {
            warn!(state = %self.state, "unexpected handshake ignored");
            return;
        }
        let response = HandshakeResponse::parse(body).unwrap_or_else(|err| {
            warn!(error = %err, "malformed handshake body");
            HandshakeResponse::default()
        });

        let heartbeat_secs = response.heartbeat_secs().unwrap_or_else(|err| {
            warn!(error = %err, "heartbeat disabled");
            0
        });

        self.set_state(SessionState::Open);
        match response.sid {
            Some(sid) => self.sid = sid,
            None => warn!("handshake without session id"),
        }
        self.heartbeat.restart(heartbeat_secs, &mut self.scheduler);
        if let Some(interval) = self.heartbeat.interval() {
            debug!(?interval, "heartbeat started");
        }
        self.transmit(Bytes::from_static(&HANDSHAKE_ACK_PACKET));

        if !self.outbound.is_empty() {
            debug!(
                packets = self.outbound.len(),
                bytes = self.outbound.bytes(),
                "flushing outbound buffer"
            );
        }
        if let Some(link) = self.link.as_mut() {
            for packet in self.outbound.drain() {
                link.handle.send(packet);
            }
        }

        self.lifecycle("session open");
        let reconnected = self.reconnect.on_open();
        if let Some(on_ready) = self.on_ready.take() {
            on_ready();
        } else if reconnected {
            self.events.publish(EVENT_RECONNECTED, &Value::Null);
        }
    }

    fn on_data(&mut self, body: Bytes) {
        let message = match Message::decode_bytes(body) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "malformed message dropped");
                return;
            }
        };
        let payload: Value = match message.body_as() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%message, error = %err, "message body not decodable");
                return;
            }
        };

        if message.is_response() {
            match self.pending.resolve(message.id) {
                Some(callback) => callback(payload),
                None => trace!(id = %message.id, "response without pending request"),
            }
        } else {
            let delivered = self.events.publish(&message.route, &payload);
            trace!(route = %message.route, delivered, "push");
        }
    }

    fn on_transport_lost(&mut self, reason: String) {
        match self.state {
            SessionState::Closing => {
                self.finish_close();
                return;
            }
            SessionState::Closed => return,
            SessionState::Connecting | SessionState::Open => {}
        }

        warn!(reason = %reason, state = %self.state, "transport lost");
        self.events
            .publish(EVENT_TRANSPORT_ERROR, &Value::String(reason));
        self.release_transport();
        self.set_state(SessionState::Connecting);

        match self.reconnect.on_failure(&mut self.scheduler) {
            ReconnectDecision::Scheduled { attempt, delay } => {
                debug!(attempt, delay = ?delay, "reconnect scheduled");
                self.events.publish(EVENT_RECONNECT, &Value::from(attempt));
            }
            ReconnectDecision::Exhausted { attempts } => {
                warn!(attempts, "reconnect attempts exhausted");
                self.disconnect();
            }
        }
    }
}

impl<C: Connector, S: Scheduler> Drop for Session<C, S> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            self.release_transport();
            self.reconnect.cancel(&mut self.scheduler);
            if let Some(timer) = self.close_timer.take() {
                self.scheduler.cancel(timer);
            }
        }
    }
}

impl<C: Connector, S: Scheduler> fmt::Debug for Session<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("target", &self.config.target)
            .field("state", &self.state)
            .field("sid", &self.sid)
            .field("connection", &self.connection_id())
            .field("heartbeat_active", &self.heartbeat.is_active())
            .field("reconnect", &self.reconnect)
            .field("pending", &self.pending)
            .field("buffered", &self.outbound.len())
            .field("buffered_bytes", &self.outbound.bytes())
            .finish_non_exhaustive()
    }
}
