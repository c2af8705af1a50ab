use std::sync::Arc;

use tapestry_core::{BroadcastSink, TopologyConfig};
use tapestry_viewer::{ViewerServer, ViewerState};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env before reading any TAPESTRY_* variable
    let _ = dotenvy::dotenv();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,tapestry_core=info,tapestry_viewer=info")
            }),
        )
        .compact()
        .init();

    let config = TopologyConfig::load();
    if !config.enabled {
        tracing::info!(target: "viewer", "Topology viewer disabled (TAPESTRY_ENABLED=false)");
        return Ok(());
    }

    // Published test messages are logged; no broker is attached here
    let sink = BroadcastSink::default();
    let mut published = sink.subscribe();
    tokio::spawn(async move {
        loop {
            match published.recv().await {
                Ok(msg) => tracing::info!(
                    target: "viewer",
                    channel = %msg.channel,
                    bytes = msg.payload.len(),
                    "Test message published"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(target: "viewer", skipped = n, "Publish log lagging");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let state = ViewerState::from_config(&config, Arc::new(sink));
    ViewerServer::new(&config, state).serve().await
}
