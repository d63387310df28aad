use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;

use super::status_text_response;
use crate::metrics::Metrics;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LimiterError {
    #[error("rate limit window must be greater than zero")]
    ZeroWindow,
}

#[derive(Debug)]
struct Window {
    start: Instant,
    counter: u64,
}

/// A process-wide fixed-window admission counter.
///
/// Every call to [`RateLimiter::admit`] adds `step` to the counter and admits the request
/// while the counter stays at or below `max`. Once `window` has elapsed since the window
/// started, the next call resets the counter to its initial offset before incrementing.
/// The reset check and the increment share one critical section, so concurrent callers
/// can never both observe a stale counter.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<Window>,
    step: u64,
    max: u64,
    window: Duration,
    initial: u64,
}

impl RateLimiter {
    /// Creates a new `RateLimiter`.
    ///
    /// # Arguments
    ///
    /// * `step` - Amount added to the counter per call.
    /// * `max` - Highest counter value that is still admitted.
    /// * `window` - Length of one counting window. Must be non-zero.
    /// * `initial` - Counter value at the start of every window.
    pub fn new(step: u64, max: u64, window: Duration, initial: u64) -> Result<Self, LimiterError> {
        if window.is_zero() {
            return Err(LimiterError::ZeroWindow);
        }
        Ok(Self {
            state: Mutex::new(Window { start: Instant::now(), counter: initial }),
            step,
            max,
            window,
            initial,
        })
    }

    /// Records one request and reports whether it is admitted.
    pub fn admit(&self) -> bool {
        self.admit_at(Instant::now())
    }

    pub(crate) fn admit_at(&self, now: Instant) -> bool {
        let mut w = self.state.lock();
        if now.saturating_duration_since(w.start) >= self.window {
            w.start = now;
            w.counter = self.initial;
        }
        w.counter = w.counter.saturating_add(self.step);
        w.counter <= self.max
    }
}

/// State captured by the rate gate.
#[derive(Clone)]
pub struct RateGate {
    pub limiter: Arc<RateLimiter>,
    pub metrics: Metrics,
}

/// An Axum middleware for global rate limiting.
///
/// Rejects with `429 Too Many Requests` once the shared limiter refuses admission.
/// Rejections are never rolled back, even if the client disconnects afterwards.
pub async fn rate_limit_middleware(State(gate): State<RateGate>, req: Request, next: Next) -> Response {
    if !gate.limiter.admit() {
        tracing::warn!("Received too many requests.");
        gate.metrics.inc_rate_limited();
        return status_text_response(StatusCode::TOO_MANY_REQUESTS);
    }
    next.run(req).await
}
