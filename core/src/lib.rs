// Tapestry Core Library
// Messaging topology inspection: topology aggregation and schema-driven forms

pub mod config;
pub mod directory;
pub mod discovery;
pub mod form;
pub mod model;
pub mod schema;
pub mod sender;
pub mod topology;

// Export core types
pub use config::TopologyConfig;
pub use directory::ServiceDirectory;
pub use discovery::{DiscoveryReport, RemoteDiscovery};
pub use form::{
    collect_payload, describe_fields, has_form_schema, populate_example, Control, ControlValue,
    FieldDescriptor, FieldKind, PrefillValue, StringFormat,
};
pub use model::{Channel, Direction, ServiceTopology};
pub use sender::{
    BroadcastSink, MessageSender, MessageSink, PublishedMessage, SendReceipt, SendRequest,
};
pub use topology::{aggregate, DiagramStatement, Endpoint, TopicNode, TopologyGraph, TopologyStats};

/// Path under which every service exposes its own topology descriptor
pub const TOPOLOGY_PATH: &str = "/q/messaging-topology";

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TapestryError {
    #[error("Channel not found or not outgoing: {0}")]
    ChannelNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unexpected status from {url}: HTTP {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}
pub type Result<T> = std::result::Result<T, TapestryError>;
