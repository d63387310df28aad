use std::sync::Arc;

use crate::authority::Authorities;
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::RateLimiter;
use crate::policy::Policy;
use crate::store::CharacterStore;

/// The shared application state.
///
/// Built once in `main` before the listener is bound and cloned into every handler.
/// The rate limiter and the authority tables inside are the same instances the
/// admission gates use.
#[derive(Clone)]
pub struct AppState {
    /// Character persistence.
    pub store: Arc<dyn CharacterStore>,
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Enforcement toggles derived from `config`.
    pub policy: Arc<Policy>,
    /// IP, ban, map and admin tables.
    pub authorities: Authorities,
    /// The global admission counter.
    pub limiter: Arc<RateLimiter>,
    pub metrics: Metrics,
}

impl AppState {
    /// Creates the state, building the policy and the global limiter from `config`.
    ///
    /// Fails when the rate limit window is zero.
    pub fn new(
        store: Arc<dyn CharacterStore>,
        config: AppConfig,
        authorities: Authorities,
        metrics: Metrics,
    ) -> anyhow::Result<Self> {
        let policy = Policy::from_config(&config);
        let limiter = RateLimiter::new(1, policy.rate.max_requests, policy.rate.window, 0)?;
        Ok(Self {
            store,
            config: Arc::new(config),
            policy: Arc::new(policy),
            authorities,
            limiter: Arc::new(limiter),
            metrics,
        })
    }
}
