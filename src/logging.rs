// Tracing subscriber setup and the per-request span

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response},
};
use tracing::{Level, Span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Environment;

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "content_api=info,tower_http=info",
        Environment::Development | Environment::Test => "content_api=debug,tower_http=debug",
    }
}

/// Install the global subscriber. Call once from the binary.
pub fn init_tracing(environment: Environment) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(environment).into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Span carrying method, path and client address for one request
pub fn request_span(request: &Request<Body>) -> Span {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::span!(
        Level::INFO,
        "http",
        method = %request.method(),
        path = %request.uri().path(),
        client = %client
    )
}

/// One log line per response
pub fn log_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    tracing::info!(
        status = %response.status(),
        elapsed_ms = latency.as_millis() as u64,
        "response"
    );
}
