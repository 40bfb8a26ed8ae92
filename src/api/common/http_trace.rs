//! Span and log callbacks for `tower_http::trace::TraceLayer`.

use axum::http::{Request, Response};
use std::time::Duration;
use tower_http::classify::ServerErrorsFailureClass;
use tracing::{info_span, Span};

pub fn make_request_span<B>(request: &Request<B>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri().path(),
        query = ?request.uri().query(),
        request_id = request_id,
        content_type = ?request.headers().get("content-type"),
        content_length = ?request.headers().get("content-length"),
    )
}

pub fn on_request<B>(request: &Request<B>, _span: &Span) {
    tracing::info!(method = %request.method(), uri = %request.uri(), "Incoming HTTP request");
}

pub fn on_response<B>(response: &Response<B>, latency: Duration, _span: &Span) {
    let status = response.status();
    let latency_ms = latency.as_millis();

    match status.as_u16() {
        400..=499 => tracing::warn!(status = %status, latency_ms, "HTTP request completed with client error"),
        500..=599 => tracing::error!(status = %status, latency_ms, "HTTP request completed with server error"),
        _ => tracing::info!(status = %status, latency_ms, "HTTP request completed"),
    }
}

pub fn on_failure(error: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
    let error_type = match &error {
        ServerErrorsFailureClass::StatusCode(code) => format!("HTTP {}", code.as_u16()),
        ServerErrorsFailureClass::Error(_) => "Internal Error".to_string(),
    };

    tracing::error!(
        error = ?error,
        latency_ms = latency.as_millis(),
        error_type = error_type,
        "HTTP request failed"
    );
}
