/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Tokio stream transport.
//!
//! [`StreamConnector`] implements the adapter contract on top of any byte
//! stream a [`Dialer`] can produce. Each opened connection runs in its own
//! task which dials, reports [`TransportEvent::Open`], forwards every read as
//! [`TransportEvent::Message`] and writes queued sends in order. Events for
//! all connections are multiplexed over one channel, tagged with their
//! [`ConnectionId`].

use crate::adapter::{ConnectionId, Connector, TransportEvent, TransportHandle};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Sending half of the transport event channel.
pub type EventSender = mpsc::UnboundedSender<(ConnectionId, TransportEvent)>;

/// Receiving half of the transport event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<(ConnectionId, TransportEvent)>;

const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Produces connected byte streams.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Stream type produced by this dialer.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connects to `target`.
    ///
    /// # Errors
    /// Returns the I/O error that prevented the connection.
    async fn dial(&self, target: &str) -> io::Result<Self::Stream>;
}

/// Dials `host:port` targets over TCP.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    /// Whether to disable Nagle's algorithm.
    nodelay: bool,
}

impl TcpDialer {
    /// Creates a TCP dialer with `TCP_NODELAY` enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self { nodelay: true }
    }

    /// Sets whether to disable Nagle's algorithm.
    #[must_use]
    pub const fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, target: &str) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(target).await?;
        stream.set_nodelay(self.nodelay)?;
        Ok(stream)
    }
}

/// Commands from a handle to its connection task.
#[derive(Debug)]
enum Outbound {
    Data(Bytes),
    Close,
}

/// Connector spawning one tokio task per connection.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct StreamConnector<D: Dialer> {
    dialer: Arc<D>,
    events: EventSender,
    read_buffer_size: usize,
}

impl<D: Dialer> StreamConnector<D> {
    /// Creates a connector reporting events to `events`.
    #[must_use]
    pub fn new(dialer: D, events: EventSender) -> Self {
        Self {
            dialer: Arc::new(dialer),
            events,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    /// Creates a connector together with its event channel.
    #[must_use]
    pub fn channel(dialer: D) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(dialer, tx), rx)
    }

    /// Sets the initial capacity of the read buffer.
    #[must_use]
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }
}

impl<D: Dialer> Connector for StreamConnector<D> {
    type Handle = StreamHandle;

    fn open(&mut self, target: &str, id: ConnectionId) -> StreamHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_connection(
            Arc::clone(&self.dialer),
            target.to_string(),
            id,
            rx,
            self.events.clone(),
            self.read_buffer_size,
        ));
        StreamHandle {
            id,
            commands: tx,
            closed: false,
        }
    }
}

/// Handle to a connection opened by [`StreamConnector`].
#[derive(Debug)]
pub struct StreamHandle {
    id: ConnectionId,
    commands: mpsc::UnboundedSender<Outbound>,
    closed: bool,
}

impl StreamHandle {
    /// Returns the connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }
}

impl TransportHandle for StreamHandle {
    fn send(&mut self, data: Bytes) {
        if self.closed {
            return;
        }
        if self.commands.send(Outbound::Data(data)).is_err() {
            trace!(conn = %self.id, "send on finished connection dropped");
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.commands.send(Outbound::Close);
    }
}

/// Drains commands until the handle asks to close or goes away.
async fn wait_for_close(commands: &mut mpsc::UnboundedReceiver<Outbound>) {
    while let Some(command) = commands.recv().await {
        if matches!(command, Outbound::Close) {
            return;
        }
    }
}

async fn run_connection<D: Dialer>(
    dialer: Arc<D>,
    target: String,
    id: ConnectionId,
    mut commands: mpsc::UnboundedReceiver<Outbound>,
    events: EventSender,
    read_buffer_size: usize,
) {
    let dialed = tokio::select! {
        result = dialer.dial(&target) => result,
        () = wait_for_close(&mut commands) => {
            trace!(conn = %id, "closed while dialing");
            return;
        }
    };

    let stream = match dialed {
        Ok(stream) => stream,
        Err(err) => {
            debug!(conn = %id, %target, error = %err, "dial failed");
            let _ = events.send((id, TransportEvent::Error(err.to_string())));
            return;
        }
    };

    debug!(conn = %id, %target, "connected");
    let _ = events.send((id, TransportEvent::Open));

    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut buf = BytesMut::with_capacity(read_buffer_size);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Outbound::Data(data)) => {
                    if let Err(err) = writer.write_all(&data).await {
                        debug!(conn = %id, error = %err, "write failed");
                        let _ = events.send((id, TransportEvent::Error(err.to_string())));
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = writer.shutdown().await;
                    trace!(conn = %id, "closed locally");
                    return;
                }
            },
            read = reader.read_buf(&mut buf) => match read {
                Ok(0) => {
                    debug!(conn = %id, "closed by peer");
                    let _ = events.send((
                        id,
                        TransportEvent::Closed("connection closed by peer".to_string()),
                    ));
                    return;
                }
                Ok(n) => {
                    trace!(conn = %id, bytes = n, "read");
                    let _ = events.send((id, TransportEvent::Message(buf.split().freeze())));
                    buf.reserve(read_buffer_size);
                }
                Err(err) => {
                    debug!(conn = %id, error = %err, "read failed");
                    let _ = events.send((id, TransportEvent::Error(err.to_string())));
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::io::DuplexStream;
    use tokio::time::timeout;

    /// Hands out one pre-connected in-memory stream.
    struct PairDialer {
        stream: Mutex<Option<DuplexStream>>,
    }

    impl PairDialer {
        fn new(stream: DuplexStream) -> Self {
            Self {
                stream: Mutex::new(Some(stream)),
            }
        }
    }

    #[async_trait]
    impl Dialer for PairDialer {
        type Stream = DuplexStream;

        async fn dial(&self, _target: &str) -> io::Result<DuplexStream> {
            self.stream
                .lock()
                .take()
                .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "no stream"))
        }
    }

    #[tokio::test]
    async fn test_stream_connector_round_trip() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (mut connector, mut events) = StreamConnector::channel(PairDialer::new(client));
        let id = ConnectionId::new(1);
        let mut handle = connector.open("memory", id);
        assert_eq!(handle.id(), id);

        assert_eq!(events.recv().await, Some((id, TransportEvent::Open)));

        handle.send(Bytes::from_static(b"ping"));
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        server.write_all(b"pong").await.unwrap();
        match events.recv().await {
            Some((got, TransportEvent::Message(data))) => {
                assert_eq!(got, id);
                assert_eq!(&data[..], b"pong");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        drop(server);
        assert!(matches!(
            events.recv().await,
            Some((_, TransportEvent::Closed(_)))
        ));
    }

    #[tokio::test]
    async fn test_stream_connector_dial_failure() {
        let (client, _server) = tokio::io::duplex(64);
        let dialer = PairDialer::new(client);
        dialer.stream.lock().take();
        let (mut connector, mut events) = StreamConnector::channel(dialer);
        let _handle = connector.open("memory", ConnectionId::new(3));

        assert!(matches!(
            events.recv().await,
            Some((id, TransportEvent::Error(_))) if id == ConnectionId::new(3)
        ));
    }

    #[tokio::test]
    async fn test_stream_handle_close_is_silent() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (mut connector, mut events) = StreamConnector::channel(PairDialer::new(client));
        let mut handle = connector.open("memory", ConnectionId::new(1));
        assert!(matches!(events.recv().await, Some((_, TransportEvent::Open))));

        handle.send(Bytes::from_static(b"bye"));
        handle.close();
        handle.send(Bytes::from_static(b"late"));

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"bye");

        let next = timeout(Duration::from_millis(50), events.recv()).await;
        assert!(next.is_err(), "no events after close");
    }
}
