use axum::{
    extract::{connect_info::ConnectInfo, FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Resolve the client IP from proxy headers, falling back to the transport address.
///
/// Precedence: a non-empty `X-Real-IP`, then the first entry of `X-Forwarded-For`
/// (trimmed), then the host part of the socket address. Without any of those the
/// result is an empty string.
pub fn resolve_client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    if let Some(real) = headers.get("x-real-ip").and_then(|hv| hv.to_str().ok()) {
        if !real.is_empty() {
            return real.to_string();
        }
    }
    if let Some(fwd) = headers.get("x-forwarded-for").and_then(|hv| hv.to_str().ok()) {
        let first = fwd.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }
    remote.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// Socket address recorded by `into_make_service_with_connect_info`, if any.
pub fn remote_addr(req: &Request) -> Option<SocketAddr> {
    req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0)
}

/// The client IP of a request, resolved with [`resolve_client_ip`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0);
        Ok(ClientIp(resolve_client_ip(&parts.headers, remote)))
    }
}
