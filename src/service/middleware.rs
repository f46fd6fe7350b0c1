//! Service middleware for metrics and request tracking.
//!
//! [`request_logging_middleware`] writes one access log line per request under
//! the `tagged_blog::access` target and echoes `X-Request-Id`, generating one
//! when the caller sent none.
//!
//! ## Metrics Emitted
//!
//! All metrics are structured `tracing` events under the
//! `tagged_blog::metrics` target, aggregated from logs:
//!
//! - `request` - path pattern, method, status, latency
//! - `listing` - page, returned and matching counts
//! - `access_check` - outcome of session evaluation on gated routes
//! - `login` - outcome of a login attempt

use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use regex_lite::Regex;
use tracing::{info, info_span, Instrument};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Access logging keyed by the caller's request id or a fresh UUID.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next
        .run(request)
        .instrument(info_span!("request", request_id = %request_id))
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    info!(
        target: "tagged_blog::access",
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "tagged_blog::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Numeric segments (item ids, page numbers) become `:n`.
fn normalize_path(path: &str) -> String {
    static NUMERIC_SEGMENT: OnceLock<Regex> = OnceLock::new();
    let re = NUMERIC_SEGMENT
        .get_or_init(|| Regex::new(r"/[0-9]+(?:/|$)").expect("numeric segment pattern is valid"));

    // Matches consume the trailing slash, so run until stable for `/1/2`.
    let mut normalized = path.to_string();
    loop {
        let next = re
            .replace_all(&normalized, |caps: &regex_lite::Captures<'_>| {
                if caps[0].ends_with('/') {
                    "/:n/".to_string()
                } else {
                    "/:n".to_string()
                }
            })
            .into_owned();
        if next == normalized {
            return normalized;
        }
        normalized = next;
    }
}

/// Record listing metrics after a ranked page is served.
pub fn record_listing_metrics(page: i64, returned: usize, matching: u64, filtered: bool) {
    info!(
        target: "tagged_blog::metrics",
        metric_type = "listing",
        page = page,
        returned = returned,
        matching = matching,
        filtered = filtered,
        "listing_metric"
    );
}

/// Record the outcome of a session check on a gated route.
pub fn record_access_check(authenticated: bool) {
    let result = if authenticated { "authenticated" } else { "anonymous" };
    info!(
        target: "tagged_blog::metrics",
        metric_type = "access_check",
        result = result,
        "access_check_metric"
    );
}

/// Record a login attempt.
pub fn record_login(success: bool) {
    let result = if success { "success" } else { "rejected" };
    info!(
        target: "tagged_blog::metrics",
        metric_type = "login",
        result = result,
        "login_metric"
    );
}
