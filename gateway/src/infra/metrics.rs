use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, IntCounterVec, IntGauge, TextEncoder, register_histogram,
    register_int_counter_vec, register_int_gauge,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

pub static CALL_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "gateway_call_latency_ms",
        "Latency of dispatched tool calls in ms"
    )
    .unwrap()
});

pub static CALLS_INFLIGHT: Lazy<IntGauge> =
    Lazy::new(|| register_int_gauge!("gateway_calls_inflight", "In-flight tool calls").unwrap());

pub static TOOL_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "gateway_tool_calls_total",
        "Dispatched tool calls by outcome",
        &["outcome"]
    )
    .unwrap()
});

pub static REGISTERED_TOOLS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "gateway_registered_tools",
        "Tools registered at initialization"
    )
    .unwrap()
});

pub struct PendingGaugeGuard;

impl PendingGaugeGuard {
    pub fn new() -> Self {
        CALLS_INFLIGHT.inc();
        PendingGaugeGuard
    }
}

impl Default for PendingGaugeGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PendingGaugeGuard {
    fn drop(&mut self) {
        CALLS_INFLIGHT.dec();
    }
}

#[derive(Clone)]
struct MetricsState {
    auth_token: Option<String>,
}

/// Serve `/metrics` on `addr`. Plain HTTP with optional bearer auth; meant
/// for loopback scrapes.
pub async fn spawn_metrics_server(addr: SocketAddr, auth_token: Option<String>) {
    let state = MetricsState { auth_token };
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    tokio::spawn(async move {
        info!(%addr, "metrics server starting");
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                    error!(%addr, %err, "metrics server terminated");
                }
            }
            Err(err) => {
                error!(%addr, %err, "failed to bind metrics listener");
            }
        }
    });
}

async fn metrics_handler(
    State(state): State<MetricsState>,
    headers: HeaderMap,
) -> axum::response::Response {
    if let Some(token) = &state.auth_token {
        if !is_authorized(headers.get(header::AUTHORIZATION), token) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let encoder = TextEncoder::new();
    let metrics = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(err) = encoder.encode(&metrics, &mut buf) {
        error!(%err, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response();
    }

    let content_type = HeaderValue::from_str(encoder.format_type())
        .unwrap_or(HeaderValue::from_static("text/plain"));
    ([(header::CONTENT_TYPE, content_type)], buf).into_response()
}

fn is_authorized(header: Option<&HeaderValue>, token: &str) -> bool {
    match header.and_then(|value| value.to_str().ok()) {
        Some(value) if value.starts_with("Bearer ") => value[7..].trim() == token,
        _ => false,
    }
}
