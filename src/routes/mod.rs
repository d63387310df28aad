//! HTTP route handlers and router assembly.
//!
//! - `admin`: authority table reload
//! - `characters`: character record CRUD and export
//! - `health`: liveness, readiness and counters
//! - `verify`: map, ban and shortcode verification

pub mod admin;
pub mod characters;
pub mod health;
pub mod verify;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::middleware::Pipeline;
use crate::state::AppState;

/// Routes served under `server.root_path`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(verify::root))
        .route("/ping", get(verify::ping))
        .route("/map/{name}/{hash}", get(verify::map_verify))
        .route("/ban/{steamid}", get(verify::ban_verify))
        .route("/sc/{hash}", get(verify::sc_verify))
        .route("/character", get(characters::list_all).post(characters::create))
        .route("/character/id/{uid}", get(characters::get_by_id))
        .route("/character/export/{steamid}/{slot}", get(characters::export))
        // GET takes a steam id, PUT/DELETE a character uid
        .route(
            "/character/{id}",
            get(characters::list_for_player).put(characters::update).delete(characters::delete),
        )
        .route("/character/{id}/{slot}", get(characters::get_by_slot))
        .route("/reload", post(admin::reload))
}

/// Builds the complete application: operational routes plus the API nested under the
/// configured root path, all wrapped in the admission pipeline.
pub fn build_router(state: AppState) -> Router {
    let pipeline =
        Pipeline::new(&state.policy, state.limiter.clone(), &state.authorities, state.metrics.clone())
            .with_timeout(Duration::from_secs(state.config.server.request_timeout_secs));
    let root = state.config.server.root_path.trim_end_matches('/').to_string();

    let ops = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics));
    let router = if root.is_empty() { ops.merge(api_routes()) } else { ops.nest(&root, api_routes()) };

    let router = router
        .with_state(state)
        // Global body limit (10 MB)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024));
    pipeline.wrap(router)
}
