use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tapestry_core::{BroadcastSink, Channel, ServiceDirectory, ServiceTopology};
use tapestry_viewer::{router, ViewerState};
use tower::ServiceExt;

fn order_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "orderId": {"type": "string"},
            "quantity": {"type": "integer"},
            "express": {"type": "boolean"},
            "placedAt": {"type": "string", "format": "date-time"}
        },
        "required": ["orderId"]
    })
}

fn local() -> ServiceTopology {
    let mut orders_out = Channel::outgoing("orders-out", "publish").with_topic("orders");
    orders_out.schema = Some(order_schema());
    orders_out.example_payload = Some(json!({
        "orderId": "o-1",
        "quantity": 2,
        "express": true,
        "placedAt": "2024-05-06T07:08:09.000Z"
    }));

    ServiceTopology::new("order-service", "1.0.0")
        .with_channel(orders_out)
        .with_channel(Channel::incoming("payments-in", "onPayment").with_topic("payments"))
}

fn state() -> (ViewerState, BroadcastSink) {
    let sink = BroadcastSink::new(8);
    let state = ViewerState::new(local(), Arc::new(sink.clone())).with_auto_discover(false);
    (state, sink)
}

async fn call(state: ViewerState, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =============================================================================
// Local topology and registry
// =============================================================================

#[tokio::test]
async fn serves_local_topology() {
    let (state, _) = state();
    let (status, body) = call(state, get("/q/messaging-topology")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["serviceName"], "order-service");
    assert_eq!(body["channels"][0]["channelName"], "orders-out");
    assert_eq!(body["channels"][0]["schema"]["type"], "object");
}

#[tokio::test]
async fn strips_schemas_when_disabled() {
    let (state, _) = state();
    let state = state.with_include_schema(false);
    let (_, body) = call(state, get("/q/messaging-topology")).await;

    assert!(body["channels"][0].get("schema").is_none());
    assert!(body["channels"][0].get("examplePayload").is_none());
}

#[tokio::test]
async fn registers_services() {
    let (state, _) = state();
    let directory = Arc::new(ServiceDirectory::new());
    let state = state.with_directory(directory.clone());

    let (status, _) = call(
        state.clone(),
        post("/q/messaging-topology/services", json!({"url": "http://billing:8081/"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(directory.contains("http://billing:8081"));

    let (status, body) = call(state.clone(), get("/q/messaging-topology/services")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["http://billing:8081"]));

    let (status, _) = call(state, post("/q/messaging-topology/services", json!({"url": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Schema, example and send
// =============================================================================

#[tokio::test]
async fn schema_lookup_and_not_found() {
    let (state, _) = state();
    let (status, body) = call(
        state.clone(),
        get("/q/messaging-topology/schema?channel=orders-out&direction=outgoing"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, order_schema());

    let (status, body) = call(
        state,
        get("/q/messaging-topology/schema?channel=payments-in&direction=incoming"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Schema not found for channel: payments-in");
}

#[tokio::test]
async fn example_prefers_declared_then_falls_back() {
    let (state, _) = state();
    let (status, body) = call(
        state.clone(),
        get("/q/messaging-topology/example?channel=orders-out&direction=outgoing"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orderId"], "o-1");

    let (status, body) = call(state, get("/q/messaging-topology/example?channel=nope")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Example message");
    assert!(body["id"].as_str().unwrap().starts_with("example-"));
}

#[tokio::test]
async fn send_maps_outcomes_to_status_codes() {
    let (state, sink) = state();
    let mut rx = sink.subscribe();

    let (status, body) = call(
        state.clone(),
        post(
            "/q/messaging-topology/send",
            json!({"channel": "orders-out", "topic": "orders", "payload": {"orderId": "o-2"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Message sent to orders-out");
    assert_eq!(rx.try_recv().unwrap().payload, r#"{"orderId":"o-2"}"#);

    let (status, body) = call(
        state.clone(),
        post("/q/messaging-topology/send", json!({"channel": "orders-out"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing channel or payload");

    let (status, _) = call(
        state,
        post(
            "/q/messaging-topology/send",
            json!({"channel": "payments-in", "payload": {}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Diagram
// =============================================================================

#[tokio::test]
async fn diagram_covers_local_topology() {
    let (state, _) = state();
    let (status, body) = call(state, get("/q/messaging-topology/diagram?auto=false")).await;

    assert_eq!(status, StatusCode::OK);
    let mermaid = body["mermaid"].as_str().unwrap();
    assert!(mermaid.starts_with("graph LR"));
    assert!(mermaid.contains("order_service"));
    assert!(mermaid.contains("topic_orders"));
    assert_eq!(body["stats"]["servicesCount"], 1);
    assert_eq!(body["stats"]["topicsCount"], 2);
    assert_eq!(body["failedServices"], json!([]));
    assert_eq!(body["discoveredServicesCount"], 0);
}

#[tokio::test]
async fn diagram_reports_unreachable_services() {
    let (state, _) = state();
    let state = state.with_directory(Arc::new(ServiceDirectory::with_urls(["http://127.0.0.1:1"])));
    let (status, body) = call(state, get("/q/messaging-topology/diagram?auto=true")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["discoveredServicesCount"], 1);
    assert_eq!(body["failedServices"].as_array().unwrap().len(), 1);
    assert_eq!(body["stats"]["servicesCount"], 1);
}

// =============================================================================
// Message forms
// =============================================================================

#[tokio::test]
async fn form_describes_fields_and_prefills_example() {
    let (state, _) = state();
    let (status, body) = call(
        state,
        get("/q/messaging-topology/form?service=order-service&channel=orders-out&direction=outgoing"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);
    assert_eq!(body["fields"][0]["name"], "orderId");
    assert_eq!(body["fields"][0]["required"], true);
    assert_eq!(body["fields"][1]["control"], "number");
    assert_eq!(body["fields"][1]["step"], "1");
    assert_eq!(body["fields"][2]["control"], "toggle");
    assert_eq!(body["fields"][3]["control"], "date_time_local");
    assert_eq!(body["prefill"]["express"], true);
    assert_eq!(body["prefill"]["quantity"], "2");
    assert_eq!(body["prefill"]["placedAt"], "2024-05-06T07:08");
}

#[tokio::test]
async fn form_is_unavailable_without_schema() {
    let (state, _) = state();
    let (status, body) = call(
        state,
        get("/q/messaging-topology/form?channel=payments-in&direction=incoming"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], false);
    assert_eq!(body["fields"], json!([]));
}

#[tokio::test]
async fn form_payload_coerces_values() {
    let (state, _) = state();
    let (status, body) = call(
        state,
        post(
            "/q/messaging-topology/form/payload",
            json!({
                "service": "order-service",
                "channel": "orders-out",
                "direction": "outgoing",
                "values": {
                    "orderId": "o-3",
                    "quantity": "5",
                    "express": false,
                    "placedAt": ""
                }
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"orderId": "o-3", "quantity": 5, "express": false})
    );
}
