/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Tokio client runtime.
//!
//! A [`Client`] is a cloneable handle to a task that owns the [`Session`].
//! The task serializes transport events, fired timers and client commands
//! through one `select!` loop, so the session itself never needs locking.
//! The task ends once the session is closed.

use crate::error::ClientError;
use ironkit_core::error::SessionError;
use ironkit_core::types::Route;
use ironkit_session::config::SessionConfig;
use ironkit_session::events::{Handler, SubscriptionId};
use ironkit_session::session::Session;
use ironkit_session::state::SessionState;
use ironkit_session::timer::{TimerReceiver, TokioScheduler};
use ironkit_transport::{Dialer, EventReceiver, StreamConnector};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace};

/// Commands sent from handles to the client task.
enum Command {
    Notify {
        route: String,
        body: Value,
    },
    Request {
        route: String,
        body: Value,
        reply: oneshot::Sender<Value>,
    },
    Subscribe {
        event: String,
        once: bool,
        handler: Handler<Value>,
        reply: oneshot::Sender<SubscriptionId>,
    },
    Unsubscribe {
        event: String,
        id: SubscriptionId,
        reply: oneshot::Sender<bool>,
    },
    Disconnect,
}

/// Handle to a running client session.
#[derive(Debug, Clone)]
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
    ready: watch::Receiver<bool>,
}

impl Client {
    /// Starts a session connecting through `dialer`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `ClientError::Session` if the configuration is invalid.
    pub fn spawn<D: Dialer>(config: SessionConfig, dialer: D) -> Result<Self, ClientError> {
        let (connector, transport) = StreamConnector::channel(dialer);
        let (scheduler, timers) = TokioScheduler::channel();
        let (ready_tx, ready_rx) = watch::channel(false);

        let session = Session::new(config, connector, scheduler, move || {
            let _ = ready_tx.send(true);
        })?;

        let (state_tx, state_rx) = watch::channel(session.state());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        tokio::spawn(run(session, transport, timers, commands_rx, state_tx));

        Ok(Self {
            commands: commands_tx,
            state: state_rx,
            ready: ready_rx,
        })
    }

    /// Returns the current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Waits for the first completed handshake.
    ///
    /// # Errors
    /// Returns `ClientError::Closed` if the session closed first.
    pub async fn wait_ready(&self) -> Result<(), ClientError> {
        let mut ready = self.ready.clone();
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| ClientError::Closed)
    }

    /// Waits until the session is closed.
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        // an ended task means the session is closed
        let _ = state.wait_for(|state| *state == SessionState::Closed).await;
    }

    /// Sends a notification. Buffered until the session opens.
    ///
    /// # Errors
    /// Returns `ClientError::Session` for an invalid route,
    /// `ClientError::Body` if the body cannot be serialized and
    /// `ClientError::Closed` once the session is closed.
    pub fn notify<B: Serialize + ?Sized>(&self, route: &str, body: &B) -> Result<(), ClientError> {
        let route = checked_route(route)?;
        let body = serde_json::to_value(body)?;
        self.send(Command::Notify { route, body })
    }

    /// Sends a request and waits for its response body.
    ///
    /// # Errors
    /// Returns `ClientError::Session` for an invalid route,
    /// `ClientError::Body` if the body cannot be serialized and
    /// `ClientError::Closed` if the session closed before a response arrived.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        route: &str,
        body: &B,
    ) -> Result<Value, ClientError> {
        let route = checked_route(route)?;
        let body = serde_json::to_value(body)?;
        let (reply, response) = oneshot::channel();
        self.send(Command::Request { route, body, reply })?;
        response.await.map_err(|_| ClientError::Closed)
    }

    /// Registers a handler for pushes on `event` or a lifecycle event.
    ///
    /// # Errors
    /// Returns `ClientError::Closed` once the session is closed.
    pub async fn subscribe<F>(&self, event: &str, handler: F) -> Result<SubscriptionId, ClientError>
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.register(event, false, Box::new(handler)).await
    }

    /// Registers a handler for the next publication of `event` only.
    ///
    /// # Errors
    /// Returns `ClientError::Closed` once the session is closed.
    pub async fn subscribe_once<F>(
        &self,
        event: &str,
        handler: F,
    ) -> Result<SubscriptionId, ClientError>
    where
        F: FnOnce(&Value) + Send + 'static,
    {
        let mut handler = Some(handler);
        let handler: Handler<Value> = Box::new(move |payload| {
            if let Some(handler) = handler.take() {
                handler(payload);
            }
        });
        self.register(event, true, handler).await
    }

    /// Removes a handler. Returns true if it was registered for `event`.
    ///
    /// # Errors
    /// Returns `ClientError::Closed` once the session is closed.
    pub async fn unsubscribe(&self, event: &str, id: SubscriptionId) -> Result<bool, ClientError> {
        let (reply, removed) = oneshot::channel();
        self.send(Command::Unsubscribe {
            event: event.to_string(),
            id,
            reply,
        })?;
        removed.await.map_err(|_| ClientError::Closed)
    }

    /// Starts closing the session. Has no effect once closing.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    async fn register(
        &self,
        event: &str,
        once: bool,
        handler: Handler<Value>,
    ) -> Result<SubscriptionId, ClientError> {
        let (reply, id) = oneshot::channel();
        self.send(Command::Subscribe {
            event: event.to_string(),
            once,
            handler,
            reply,
        })?;
        id.await.map_err(|_| ClientError::Closed)
    }

    fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands.send(command).map_err(|_| ClientError::Closed)
    }
}

fn checked_route(route: &str) -> Result<String, ClientError> {
    Route::new(route)
        .map(|route| route.as_str().to_string())
        .ok_or_else(|| SessionError::InvalidRoute(route.to_string()).into())
}

type ClientSession<D> = Session<StreamConnector<D>, TokioScheduler>;

fn apply<D: Dialer>(session: &mut ClientSession<D>, command: Command) {
    match command {
        Command::Notify { route, body } => session.notify(&route, &body),
        Command::Request { route, body, reply } => {
            // dropping `reply` reports the session as closed
            let _ = session.request(&route, &body, move |response| {
                let _ = reply.send(response);
            });
        }
        Command::Subscribe {
            event,
            once,
            handler,
            reply,
        } => {
            let id = if once {
                session.subscribe_once(event, handler)
            } else {
                session.subscribe(event, handler)
            };
            let _ = reply.send(id);
        }
        Command::Unsubscribe { event, id, reply } => {
            let _ = reply.send(session.unsubscribe(&event, id));
        }
        Command::Disconnect => session.disconnect(),
    }
}

async fn run<D: Dialer>(
    mut session: ClientSession<D>,
    mut transport: EventReceiver,
    mut timers: TimerReceiver,
    mut commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<SessionState>,
) {
    let mut handles_open = true;
    loop {
        tokio::select! {
            Some((id, event)) = transport.recv() => {
                trace!(conn = %id, "transport event");
                session.handle_transport_event(id, event);
            }
            Some(timer) = timers.recv() => session.handle_timer(timer),
            command = commands.recv(), if handles_open => match command {
                Some(command) => apply(&mut session, command),
                None => {
                    debug!("all client handles dropped");
                    handles_open = false;
                    session.disconnect();
                }
            },
            else => break,
        }

        state.send_replace(session.state());
        if session.state() == SessionState::Closed {
            break;
        }
    }
    debug!(sid = %session.session_id(), "client task finished");
}
