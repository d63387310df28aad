use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Request admission counters for monitoring
#[derive(Clone)]
pub struct Metrics {
    pub requests_total: Arc<AtomicU64>,
    pub rate_limited: Arc<AtomicU64>,
    pub unauthorized: Arc<AtomicU64>,
    pub panics_recovered: Arc<AtomicU64>,
    pub table_reloads: Arc<AtomicU64>,
    pub table_reload_failures: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            rate_limited: Arc::new(AtomicU64::new(0)),
            unauthorized: Arc::new(AtomicU64::new(0)),
            panics_recovered: Arc::new(AtomicU64::new(0)),
            table_reloads: Arc::new(AtomicU64::new(0)),
            table_reload_failures: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unauthorized(&self) {
        self.unauthorized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_panics_recovered(&self) {
        self.panics_recovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_table_reloads(&self) {
        self.table_reloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_table_reload_failures(&self) {
        self.table_reload_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            unauthorized: self.unauthorized.load(Ordering::Relaxed),
            panics_recovered: self.panics_recovered.load(Ordering::Relaxed),
            table_reloads: self.table_reloads.load(Ordering::Relaxed),
            table_reload_failures: self.table_reload_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub rate_limited: u64,
    pub unauthorized: u64,
    pub panics_recovered: u64,
    pub table_reloads: u64,
    pub table_reload_failures: u64,
    pub uptime_seconds: u64,
}
