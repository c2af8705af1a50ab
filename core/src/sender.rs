// Test message sending
//
// Validates send requests against the local topology and hands the payload
// to a MessageSink. The default sink fans out over a tokio broadcast channel.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::info;

use crate::model::{Direction, ServiceTopology};
use crate::{Result, TapestryError};

/// Destination for published test messages
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn publish(&self, channel: &str, payload: String) -> Result<()>;
}

/// Message as delivered to broadcast subscribers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublishedMessage {
    /// Timestamp (ISO 8601)
    pub timestamp: String,
    pub channel: String,
    pub payload: String,
}

/// Sink that broadcasts every message to all current subscribers
#[derive(Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<PublishedMessage>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl MessageSink for BroadcastSink {
    async fn publish(&self, channel: &str, payload: String) -> Result<()> {
        // Ignore error if no subscribers
        let _ = self.sender.send(PublishedMessage {
            timestamp: chrono::Utc::now().to_rfc3339(),
            channel: channel.to_string(),
            payload,
        });
        Ok(())
    }
}

/// Body of a send request
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub success: bool,
    pub message: String,
    pub channel: String,
    pub topic: String,
}

/// Publishes test messages on the local service's outgoing channels
pub struct MessageSender {
    local: Arc<ServiceTopology>,
    sink: Arc<dyn MessageSink>,
}

impl MessageSender {
    pub fn new(local: Arc<ServiceTopology>, sink: Arc<dyn MessageSink>) -> Self {
        Self { local, sink }
    }

    pub async fn send(&self, request: SendRequest) -> Result<SendReceipt> {
        let (channel, payload) = match (request.channel, request.payload) {
            (Some(channel), Some(payload)) if !payload.is_null() => (channel, payload),
            _ => {
                return Err(TapestryError::InvalidRequest(
                    "Missing channel or payload".to_string(),
                ))
            }
        };

        if self
            .local
            .find_channel(&channel, Direction::Outgoing)
            .is_none()
        {
            return Err(TapestryError::ChannelNotFound(channel));
        }

        let body = match payload {
            Value::String(s) => s,
            other => serde_json::to_string(&other)?,
        };

        info!(target: "sender", channel = %channel, bytes = body.len(), "Publishing test message");
        self.sink.publish(&channel, body).await?;

        Ok(SendReceipt {
            success: true,
            message: format!("Message sent to {}", channel),
            topic: request.topic.unwrap_or_else(|| channel.clone()),
            channel,
        })
    }
}
