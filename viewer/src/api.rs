// Viewer HTTP API server
//
// JSON endpoints under /q/messaging-topology for the local topology, the
// service registry, the aggregated diagram and message forms.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tapestry_core::schema::example_payload;
use tapestry_core::{
    aggregate, collect_payload, describe_fields, has_form_schema, populate_example, Channel,
    Control, ControlValue, Direction, DiscoveryReport, FieldDescriptor, MessageSender,
    MessageSink, PrefillValue, RemoteDiscovery, SendReceipt, SendRequest, ServiceDirectory,
    ServiceTopology, TapestryError, TopologyConfig, TopologyStats, TOPOLOGY_PATH,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

/// Viewer handler state
#[derive(Clone)]
pub struct ViewerState {
    local: Arc<ServiceTopology>,
    directory: Arc<ServiceDirectory>,
    discovery: RemoteDiscovery,
    sender: Arc<MessageSender>,
    include_schema: bool,
    auto_discover: bool,
}

impl ViewerState {
    pub fn new(local: ServiceTopology, sink: Arc<dyn MessageSink>) -> Self {
        let local = Arc::new(local);
        Self {
            sender: Arc::new(MessageSender::new(local.clone(), sink)),
            local,
            directory: Arc::new(ServiceDirectory::new()),
            discovery: RemoteDiscovery::new(),
            include_schema: true,
            auto_discover: true,
        }
    }

    pub fn from_config(config: &TopologyConfig, sink: Arc<dyn MessageSink>) -> Self {
        Self::new(config.local_topology(), sink)
            .with_directory(Arc::new(ServiceDirectory::with_urls(&config.services)))
            .with_discovery(RemoteDiscovery::with_timeout(Duration::from_millis(
                config.request_timeout_ms,
            )))
            .with_include_schema(config.include_schema)
            .with_auto_discover(config.auto_discover)
    }

    pub fn with_directory(mut self, directory: Arc<ServiceDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_discovery(mut self, discovery: RemoteDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_include_schema(mut self, include_schema: bool) -> Self {
        self.include_schema = include_schema;
        self
    }

    pub fn with_auto_discover(mut self, auto_discover: bool) -> Self {
        self.auto_discover = auto_discover;
        self
    }

    /// Local topology for a service name, else a remote one via the directory
    async fn resolve_service(&self, service: Option<&str>) -> Option<Arc<ServiceTopology>> {
        match service.filter(|s| !s.is_empty()) {
            None => Some(self.local.clone()),
            Some(name) if name == self.local.service_name => Some(self.local.clone()),
            Some(name) => self
                .discovery
                .fetch_service(&self.directory, name)
                .await
                .map(Arc::new),
        }
    }
}

/// Build the viewer router
pub fn router(state: ViewerState) -> Router {
    let path = |suffix: &str| format!("{}{}", TOPOLOGY_PATH, suffix);

    Router::new()
        .route(TOPOLOGY_PATH, get(topology_handler))
        .route(
            &path("/services"),
            get(services_handler).post(register_service_handler),
        )
        .route(&path("/schema"), get(schema_handler))
        .route(&path("/example"), get(example_handler))
        .route(&path("/send"), post(send_handler))
        .route(&path("/diagram"), get(diagram_handler))
        .route(&path("/form"), get(form_handler))
        .route(&path("/form/payload"), post(form_payload_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Viewer HTTP server
pub struct ViewerServer {
    addr: String,
    state: ViewerState,
}

impl ViewerServer {
    pub fn new(config: &TopologyConfig, state: ViewerState) -> Self {
        Self {
            addr: config.bind_addr(),
            state,
        }
    }

    /// Start the viewer
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            target: "viewer",
            addr = %self.addr,
            service = %self.state.local.service_name,
            channels = self.state.local.channels.len(),
            registered = self.state.directory.len(),
            "Starting topology viewer"
        );

        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!(
            target: "viewer",
            url = %format!("http://{}{}", self.addr, TOPOLOGY_PATH),
            "Topology viewer ready"
        );

        axum::serve(listener, app).await?;

        Ok(())
    }
}

// =========================
// Errors
// =========================

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<TapestryError> for ApiError {
    fn from(err: TapestryError) -> Self {
        match err {
            TapestryError::InvalidRequest(message) => Self::bad_request(message),
            TapestryError::ChannelNotFound(_) => Self::not_found(err.to_string()),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// =========================
// Local topology and registry
// =========================

async fn topology_handler(State(state): State<ViewerState>) -> Json<ServiceTopology> {
    if state.include_schema {
        Json(state.local.as_ref().clone())
    } else {
        Json(state.local.without_schemas())
    }
}

async fn services_handler(State(state): State<ViewerState>) -> Json<Vec<String>> {
    Json(state.directory.urls())
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    url: String,
}

async fn register_service_handler(
    State(state): State<ViewerState>,
    Json(req): Json<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    let url = req.url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("Missing url"));
    }
    state.directory.register(url);
    info!(target: "viewer", url = %url, "Registered service");
    Ok(StatusCode::NO_CONTENT)
}

// =========================
// Channel schema, example and send
// =========================

#[derive(Deserialize)]
struct ChannelQuery {
    channel: Option<String>,
    direction: Option<String>,
}

/// Channel by name, narrowed to a direction when one is given
fn lookup_channel<'a>(
    topology: &'a ServiceTopology,
    channel: &str,
    direction: Option<&str>,
) -> Option<&'a Channel> {
    match direction.filter(|d| !d.is_empty()) {
        Some(d) => topology.find_channel(channel, Direction::parse(d)),
        None => topology.channels.iter().find(|c| c.channel_name == channel),
    }
}

async fn schema_handler(
    State(state): State<ViewerState>,
    Query(q): Query<ChannelQuery>,
) -> Result<Json<Value>, ApiError> {
    let channel = q.channel.unwrap_or_default();
    lookup_channel(&state.local, &channel, q.direction.as_deref())
        .and_then(|c| c.schema.clone())
        .filter(|s| s.as_object().is_some_and(|o| !o.is_empty()))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Schema not found for channel: {}", channel)))
}

async fn example_handler(
    State(state): State<ViewerState>,
    Query(q): Query<ChannelQuery>,
) -> Json<Value> {
    let channel = q.channel.unwrap_or_default();
    let now = Utc::now();
    let example = match lookup_channel(&state.local, &channel, q.direction.as_deref()) {
        Some(Channel {
            example_payload: Some(example),
            ..
        }) => example.clone(),
        Some(Channel {
            schema: Some(schema),
            ..
        }) => example_payload(schema, now),
        _ => {
            debug!(target: "viewer", channel = %channel, "No schema for channel, using fallback example");
            example_payload(&Value::Null, now)
        }
    };
    Json(example)
}

async fn send_handler(
    State(state): State<ViewerState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendReceipt>, ApiError> {
    match state.sender.send(req).await {
        Ok(receipt) => Ok(Json(receipt)),
        Err(e) => {
            warn!(target: "viewer", error = %e, "Send failed");
            Err(e.into())
        }
    }
}

// =========================
// Diagram
// =========================

#[derive(Deserialize)]
struct DiagramQuery {
    auto: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiagramResponse {
    mermaid: String,
    stats: TopologyStats,
    failed_services: Vec<String>,
    discovered_services_count: usize,
}

async fn diagram_handler(
    State(state): State<ViewerState>,
    Query(q): Query<DiagramQuery>,
) -> Json<DiagramResponse> {
    let report = if q.auto.unwrap_or(state.auto_discover) {
        state.discovery.discover(&state.directory).await
    } else {
        DiscoveryReport::default()
    };

    let all = || {
        std::iter::once(Some(state.local.as_ref()))
            .chain(report.topologies.iter().map(Option::as_ref))
    };
    let graph = aggregate(all());
    let stats = TopologyStats::collect(all());

    debug!(
        target: "viewer",
        services = graph.services.len(),
        topics = graph.topics.len(),
        failed = report.failed.len(),
        "Rendered topology diagram"
    );

    Json(DiagramResponse {
        mermaid: graph.to_mermaid(),
        stats,
        discovered_services_count: report.discovered_count(),
        failed_services: report.failed,
    })
}

// =========================
// Message forms
// =========================

#[derive(Deserialize)]
struct FormQuery {
    service: Option<String>,
    channel: Option<String>,
    direction: Option<String>,
}

#[derive(Serialize)]
struct FormField {
    #[serde(flatten)]
    field: FieldDescriptor,
    #[serde(flatten)]
    control: Control,
}

#[derive(Serialize, Default)]
struct FormResponse {
    available: bool,
    fields: Vec<FormField>,
    prefill: IndexMap<String, PrefillValue>,
}

async fn form_handler(
    State(state): State<ViewerState>,
    Query(q): Query<FormQuery>,
) -> Result<Json<FormResponse>, ApiError> {
    let service = q.service.unwrap_or_default();
    let topology = state
        .resolve_service(Some(service.as_str()))
        .await
        .ok_or_else(|| ApiError::not_found(format!("Service not found: {}", service)))?;

    let channel_name = q.channel.unwrap_or_default();
    let found = lookup_channel(&topology, &channel_name, q.direction.as_deref());
    let schema = found
        .and_then(|c| c.schema.as_ref())
        .filter(|s| has_form_schema(s));
    let (Some(channel), Some(schema)) = (found, schema) else {
        debug!(target: "viewer", service = %service, channel = %channel_name, "No form schema for channel");
        return Ok(Json(FormResponse::default()));
    };

    let fields = describe_fields(schema);
    let example = channel
        .example_payload
        .clone()
        .unwrap_or_else(|| example_payload(schema, Utc::now()));
    let prefill = populate_example(&fields, &example);

    Ok(Json(FormResponse {
        available: true,
        fields: fields
            .into_iter()
            .map(|field| FormField {
                control: field.control(),
                field,
            })
            .collect(),
        prefill,
    }))
}

#[derive(Deserialize)]
struct PayloadRequest {
    service: Option<String>,
    channel: Option<String>,
    direction: Option<String>,
    #[serde(default)]
    values: Map<String, Value>,
}

async fn form_payload_handler(
    State(state): State<ViewerState>,
    Json(req): Json<PayloadRequest>,
) -> Result<Json<Value>, ApiError> {
    let service = req.service.unwrap_or_default();
    let topology = state
        .resolve_service(Some(service.as_str()))
        .await
        .ok_or_else(|| ApiError::not_found(format!("Service not found: {}", service)))?;

    let channel_name = req.channel.unwrap_or_default();
    let schema = lookup_channel(&topology, &channel_name, req.direction.as_deref())
        .and_then(|c| c.schema.as_ref())
        .ok_or_else(|| {
            ApiError::not_found(format!("Schema not found for channel: {}", channel_name))
        })?;

    let fields = describe_fields(schema);
    let values = req
        .values
        .into_iter()
        .map(|(name, value)| (name, control_value(value)));

    Ok(Json(Value::Object(collect_payload(&fields, values))))
}

/// Raw JSON from the client as the state of a control
fn control_value(value: Value) -> ControlValue {
    match value {
        Value::Bool(b) => ControlValue::Checked(b),
        Value::String(s) => ControlValue::Text(s),
        Value::Null => ControlValue::Text(String::new()),
        other => ControlValue::Text(other.to_string()),
    }
}
