// Topology descriptor model
//
// Wire shape of the JSON report every service emits about its own channels.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::schema;

/// Channel direction as seen from the reporting service
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Service consumes from the topic
    Incoming,
    /// Service produces to the topic
    Outgoing,
    /// Anything else a service reported, or nothing; ignored by aggregation
    #[default]
    #[serde(other)]
    Unknown,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
            Direction::Unknown => "unknown",
        }
    }

    /// Lenient parse used for query parameters
    pub fn parse(s: &str) -> Self {
        match s {
            "incoming" => Direction::Incoming,
            "outgoing" => Direction::Outgoing,
            _ => Direction::Unknown,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared message-passing endpoint of a service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub channel_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub direction: Direction,
    #[serde(default, deserialize_with = "null_as_default")]
    pub method_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_payload: Option<Value>,
}

impl Channel {
    pub fn new(
        channel_name: impl Into<String>,
        direction: Direction,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            channel_name: channel_name.into(),
            topic: None,
            direction,
            method_name: method_name.into(),
            class_name: None,
            connector: None,
            schema: None,
            example_payload: None,
        }
    }

    pub fn incoming(channel_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self::new(channel_name, Direction::Incoming, method_name)
    }

    pub fn outgoing(channel_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self::new(channel_name, Direction::Outgoing, method_name)
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_connector(mut self, connector: impl Into<String>) -> Self {
        self.connector = Some(connector.into());
        self
    }

    /// Attach the schema of `T` and an example generated from it
    pub fn with_payload<T: JsonSchema>(mut self) -> crate::Result<Self> {
        let schema = schema::introspect::<T>()?;
        self.example_payload = Some(schema::example_payload(&schema, chrono::Utc::now()));
        self.schema = Some(schema);
        Ok(self)
    }

    /// Broker topic backing this channel. Never empty: falls back to the channel name.
    pub fn resolved_topic(&self) -> &str {
        match self.topic.as_deref() {
            Some(topic) if !topic.is_empty() => topic,
            _ => &self.channel_name,
        }
    }

    pub fn matches(&self, channel_name: &str, direction: Direction) -> bool {
        self.channel_name == channel_name && self.direction == direction
    }
}

/// Topology descriptor reported by one service
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTopology {
    #[serde(default, deserialize_with = "null_as_default")]
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, deserialize_with = "skip_null_entries")]
    pub channels: Vec<Channel>,
}

impl ServiceTopology {
    pub fn new(service_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            version: Some(version.into()),
            ..Default::default()
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn find_channel(&self, channel_name: &str, direction: Direction) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|c| c.matches(channel_name, direction))
    }

    /// Copy without per-channel schemas and example payloads
    pub fn without_schemas(&self) -> Self {
        let mut stripped = self.clone();
        for channel in &mut stripped.channels {
            channel.schema = None;
            channel.example_payload = None;
        }
        stripped
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null` list and `null` elements both read as absent
fn skip_null_entries<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let entries = Option::<Vec<Option<T>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries.into_iter().flatten().collect())
}
