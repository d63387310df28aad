//! Request admission gates.
//!
//! Every request passes the gates in a fixed order before reaching a handler:
//!
//! 1. [`logging`]: timing and access log, always on.
//! 2. [`recovery`]: turns handler panics into `500`, always on.
//! 3. [`rate_limit`]: global admission counter, only when enabled.
//! 4. [`auth`]: IP allow-list and API key, always installed, checks are policy driven.
//!
//! Below the identity gate an optional request timeout bounds the handler with
//! `408 Request Timeout`.
//!
//! A gate either forwards to the next stage or short-circuits with its own response.
//! [`Pipeline::wrap`] installs them on any router in that order.

pub mod auth;
pub mod ip;
pub mod logging;
pub mod rate_limit;
pub mod recovery;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::timeout::TimeoutLayer;

pub use auth::IdentityGate;
pub use rate_limit::{RateGate, RateLimiter};

use crate::authority::Authorities;
use crate::metrics::Metrics;
use crate::policy::Policy;

/// Plain-text response carrying only the canonical reason phrase, e.g. `Unauthorized\n`.
pub fn status_text_response(status: StatusCode) -> Response {
    let body = format!("{}\n", status.canonical_reason().unwrap_or(""));
    let mut res = (status, body).into_response();
    let headers = res.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    res
}

/// The ordered gate chain, built once at startup from the policy and shared components.
#[derive(Clone)]
pub struct Pipeline {
    metrics: Metrics,
    rate: Option<RateGate>,
    identity: IdentityGate,
    timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new(policy: &Policy, limiter: Arc<RateLimiter>, authorities: &Authorities, metrics: Metrics) -> Self {
        let rate = policy.rate.enable.then(|| RateGate { limiter, metrics: metrics.clone() });
        let identity = IdentityGate {
            policy: Arc::new(policy.identity.clone()),
            ip_list: authorities.ip_list.clone(),
            metrics: metrics.clone(),
        };
        Self { metrics, rate, identity, timeout: None }
    }

    /// Bounds every admitted request; a zero duration leaves requests unbounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    #[cfg(test)]
    pub(crate) fn rate_limited(&self) -> bool {
        self.rate.is_some()
    }

    /// Wraps `router` so requests flow logging -> recovery -> rate -> identity -> timeout -> handler.
    ///
    /// Layers added later run first, so they are added innermost to outermost.
    pub fn wrap<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let mut router = router;
        if let Some(timeout) = self.timeout {
            router = router.layer(TimeoutLayer::new(timeout));
        }
        router = router.layer(from_fn_with_state(self.identity, auth::identity_middleware));
        if let Some(rate) = self.rate {
            router = router.layer(from_fn_with_state(rate, rate_limit::rate_limit_middleware));
        }
        router
            .layer(recovery::recovery_layer(self.metrics.clone()))
            .layer(from_fn_with_state(self.metrics, logging::logging_middleware))
    }
}
