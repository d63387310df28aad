use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use super::ip::{remote_addr, resolve_client_ip};
use crate::metrics::Metrics;

fn set_control_headers(headers: &mut HeaderMap) {
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET, POST, PATCH, PUT, DELETE, OPTIONS"),
    );
    // Chromium caps the preflight cache at two hours; anything larger is ignored.
    headers.insert(HeaderName::from_static("access-control-max-age"), HeaderValue::from_static("7200"));
}

/// Outermost gate: records method, URI, client IP and the time spent in the rest of the chain.
///
/// Never changes the outcome of a request, only adds the CORS control headers.
pub async fn logging_middleware(State(metrics): State<Metrics>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let ip = resolve_client_ip(req.headers(), remote_addr(&req));
    metrics.inc_requests();

    let start = Instant::now();
    let mut res = next.run(req).await;
    set_control_headers(res.headers_mut());
    tracing::info!("{} {} from {} ({:?}) -> {}", method, uri, ip, start.elapsed(), res.status().as_u16());
    res
}
