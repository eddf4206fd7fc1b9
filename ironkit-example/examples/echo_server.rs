//! Echo Server Example
//!
//! Assigns session ids, advertises a heartbeat interval, answers every
//! request with its own body, rebroadcasts notifications as pushes and
//! greets each client once its handshake completes.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Decoder;
use tracing::{error, info, warn};

use ironkit_core::{HandshakeRequest, Message, MessageType, Packet, PacketType, encode_body};
use ironkit_transport::PacketCodec;

mod common;
use common::{ExampleConfig, init_logging};

static NEXT_SID: AtomicU64 = AtomicU64::new(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ExampleConfig::from_env();
    info!("Starting echo server on {}", cfg.addr());

    let listener = TcpListener::bind(&cfg.addr()).await?;
    loop {
        let (socket, addr) = listener.accept().await?;
        info!("Connection from {}", addr);
        let heartbeat = cfg.heartbeat_interval;
        tokio::spawn(async move {
            if let Err(e) = handle(socket, heartbeat).await {
                error!("Error: {}", e);
            }
        });
    }
}

async fn handle(mut sock: TcpStream, heartbeat: u64) -> anyhow::Result<()> {
    let mut codec = PacketCodec::new();
    let mut buf = BytesMut::with_capacity(4096);
    let mut sid = String::new();

    loop {
        while let Some(packet) = codec.decode(&mut buf)? {
            match packet.packet_type {
                PacketType::Handshake => {
                    let hello: HandshakeRequest =
                        serde_json::from_slice(&packet.body).unwrap_or_default();
                    sid = if hello.sid.is_empty() {
                        format!("sid-{}", NEXT_SID.fetch_add(1, Ordering::Relaxed))
                    } else {
                        hello.sid
                    };
                    info!("Handshake from {}", sid);
                    let body = json!({"code": 200, "sid": sid, "hb": heartbeat}).to_string();
                    write(&mut sock, Packet::new(PacketType::Handshake, body)).await?;
                }
                PacketType::HandshakeAck => {
                    let greeting = encode_body(&json!({"text": "welcome", "sid": sid}))?;
                    write_message(&mut sock, Message::push("greeting", greeting)).await?;
                }
                PacketType::Heartbeat => {
                    write(&mut sock, Packet::empty(PacketType::Heartbeat)).await?;
                }
                PacketType::Data => {
                    let msg = Message::decode_bytes(packet.body)?;
                    match msg.message_type {
                        MessageType::Request => {
                            info!("Request {} on {}", msg.id, msg.route);
                            write_message(&mut sock, Message::response(msg.id, msg.body)).await?;
                        }
                        MessageType::Notify => {
                            info!("Notify on {}", msg.route);
                            write_message(&mut sock, Message::push("chat.msg", msg.body)).await?;
                        }
                        other => warn!("Unexpected {} from client", other),
                    }
                }
                PacketType::Kick => {
                    info!("Client {} disconnected", sid);
                    return Ok(());
                }
            }
        }

        if sock.read_buf(&mut buf).await? == 0 {
            info!("Connection from {} closed", sid);
            return Ok(());
        }
    }
}

async fn write(sock: &mut TcpStream, packet: Packet) -> anyhow::Result<()> {
    sock.write_all(&packet.encode()?).await?;
    Ok(())
}

async fn write_message(sock: &mut TcpStream, msg: Message) -> anyhow::Result<()> {
    write(sock, Packet::new(PacketType::Data, msg.encode()?)).await
}
