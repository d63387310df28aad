use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use super::ip::{remote_addr, resolve_client_ip};
use super::status_text_response;
use crate::authority::AuthorityTable;
use crate::metrics::Metrics;
use crate::policy::IdentityPolicy;

/// State captured by the identity gate.
#[derive(Clone)]
pub struct IdentityGate {
    pub policy: Arc<IdentityPolicy>,
    pub ip_list: Arc<AuthorityTable<bool>>,
    pub metrics: Metrics,
}

/// Why a request failed the identity gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    UnknownIp,
    BadKey,
}

impl IdentityGate {
    /// Runs the IP check first and the key check second; the first failure wins.
    pub fn check(&self, ip: &str, presented_key: Option<&str>) -> Result<(), Denial> {
        if self.policy.enforce_ip && !self.ip_list.contains(ip) {
            return Err(Denial::UnknownIp);
        }
        if self.policy.enforce_key && !constant_time_eq(presented_key.unwrap_or(""), &self.policy.key) {
            return Err(Denial::BadKey);
        }
        Ok(())
    }
}

pub(crate) fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        return false;
    }
    let mut diff = 0u8;
    for (a, b) in provided.iter().zip(expected) {
        diff |= a ^ b;
    }
    diff == 0
}

/// Middleware enforcing the IP allow-list and the shared API key.
///
/// The key is compared against the raw `Authorization` header value. Both checks are
/// individually switchable through the [`IdentityPolicy`]; a failed check answers
/// `401 Unauthorized` without reaching the handler.
pub async fn identity_middleware(State(gate): State<IdentityGate>, req: Request, next: Next) -> Response {
    let ip = resolve_client_ip(req.headers(), remote_addr(&req));
    let key = req.headers().get(header::AUTHORIZATION).and_then(|h| h.to_str().ok());

    match gate.check(&ip, key) {
        Ok(()) => next.run(req).await,
        Err(Denial::UnknownIp) => {
            tracing::info!("{} is not authorized.", ip);
            gate.metrics.inc_unauthorized();
            status_text_response(StatusCode::UNAUTHORIZED)
        }
        Err(Denial::BadKey) => {
            tracing::info!("{} failed API key check.", ip);
            gate.metrics.inc_unauthorized();
            status_text_response(StatusCode::UNAUTHORIZED)
        }
    }
}
