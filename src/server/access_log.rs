//! Per-request access log.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use http::header::CONTENT_LENGTH;
use tracing::info;

/// Log target for access records, filterable separately from application logs.
pub const ACCESS_LOG_TARGET: &str = "widdler::access";

/// Middleware that records one access event per request.
///
/// The event is emitted after the inner service has produced its response, so
/// it always carries the final status. The response is returned untouched.
pub async fn access_log(request: Request, next: Next) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let version = request.version();
    let content_length = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let response = next.run(request).await;

    info!(
        target: ACCESS_LOG_TARGET,
        remote = %remote,
        method = %method,
        path = %path,
        version = ?version,
        content_length,
        status = response.status().as_u16(),
        "{} {} {:?}",
        method,
        path,
        version
    );

    response
}
