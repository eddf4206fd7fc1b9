//! Chat Client Example
//!
//! Connects to the echo server, prints pushes and lifecycle events, sends a
//! notification and a request, then disconnects.

use std::time::Duration;

use serde_json::json;
use tracing::info;

use ironkit_engine::ClientBuilder;
use ironkit_session::{EVENT_CLOSE, EVENT_RECONNECT, EVENT_RECONNECTED};

mod common;
use common::{ExampleConfig, init_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ExampleConfig::from_env();
    info!("Connecting to {}", cfg.addr());

    let client = ClientBuilder::new()
        .with_target(cfg.addr())
        .with_logging(true)
        .with_reconnect_max_attempts(5)
        .with_reconnect_delay(Duration::from_secs(1))
        .connect()?;

    client
        .subscribe("greeting", |body| info!("Greeting: {}", body))
        .await?;
    client
        .subscribe("chat.msg", |body| info!("Chat: {}", body))
        .await?;
    client
        .subscribe(EVENT_RECONNECT, |attempt| info!("Reconnect attempt {}", attempt))
        .await?;
    client
        .subscribe(EVENT_RECONNECTED, |_| info!("Reconnected"))
        .await?;
    client
        .subscribe_once(EVENT_CLOSE, |_| info!("Session closing"))
        .await?;

    client.wait_ready().await?;
    info!("Session ready");

    client.notify("chat.say", &json!({"text": "hello from ironkit"}))?;
    let reply = client
        .request("echo.ping", &json!({"seq": 1, "text": "ping"}))
        .await?;
    info!("Reply: {}", reply);

    tokio::time::sleep(Duration::from_millis(500)).await;
    client.disconnect();
    client.closed().await;
    info!("Done");
    Ok(())
}
