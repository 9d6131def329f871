use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use flowbridge_core::Paths;
use flowbridge_flows::{
    CloudEvent, FlowExecutor, FlowStore, HttpFlowExecutor, RESULT_EVENT_SOURCE,
    RESULT_EVENT_TYPE, SPECVERSION,
};

/// Shared state passed to HTTP handlers.
#[derive(Clone)]
pub struct GatewayState {
    store: Arc<FlowStore>,
    executor: Arc<dyn FlowExecutor>,
    expected_event_type: String,
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", post(handle_dispatch))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Structured mode carries the whole envelope as the JSON body; binary mode
/// carries the attributes as `ce-*` headers with the data as the body.
fn parse_event(headers: &HeaderMap, body: &[u8]) -> flowbridge_core::Result<CloudEvent> {
    if headers.contains_key("ce-type") {
        let attr = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        CloudEvent::from_binary(
            attr("ce-id"),
            attr("ce-source"),
            attr("ce-specversion"),
            attr("ce-type"),
            body,
        )
    } else {
        CloudEvent::from_json(body)
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Echo the result-event metadata on the response.
fn apply_ce_headers(response: &mut Response) {
    let headers = response.headers_mut();
    if let Ok(id) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
        headers.insert("Ce-Id", id);
    }
    headers.insert("Ce-Source", HeaderValue::from_static(RESULT_EVENT_SOURCE));
    headers.insert("Ce-Specversion", HeaderValue::from_static(SPECVERSION));
    headers.insert("Ce-Type", HeaderValue::from_static(RESULT_EVENT_TYPE));
}

async fn handle_dispatch(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = match parse_event(&headers, &body) {
        Ok(event) => event,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    info!(
        id = %event.id,
        source = %event.source,
        event_type = %event.event_type,
        specversion = %event.specversion,
        "Received event"
    );

    // Type check comes before any store access.
    if event.expect_type(&state.expected_event_type).is_err() {
        return error_response(StatusCode::BAD_REQUEST, "Invalid event type");
    }

    match dispatch(&state, &event).await {
        Ok(result) => {
            let mut response = (StatusCode::OK, Json(result)).into_response();
            apply_ce_headers(&mut response);
            response
        }
        Err(e) => {
            // The boundary converts every failure to a generic error body;
            // only the message leaves the process.
            error!(error = %e, "Event dispatch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

async fn dispatch(state: &GatewayState, event: &CloudEvent) -> flowbridge_core::Result<Value> {
    let data = event.dispatch_data()?;
    let record = state.store.lookup(&data.name).await?;
    info!(flow_id = %record.id, flow_name = ?record.name, "Flow definition loaded");
    state.executor.execute(&record, &data.tweaks, &data.inputs).await
}

pub async fn run(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let (config, _paths) = super::load_config()?;
    let host = host.unwrap_or_else(|| config.gateway.host.clone());
    let port = port.unwrap_or(config.gateway.port);

    let db_path = Paths::expand(&config.flows.db_path);
    let store = FlowStore::new(&db_path);
    store.init_schema()?;

    let state = GatewayState {
        store: Arc::new(store),
        executor: Arc::new(HttpFlowExecutor::new(&config.flows.runner_url)),
        expected_event_type: config.flows.event_type.clone(),
    };

    let app = build_router(state);
    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
