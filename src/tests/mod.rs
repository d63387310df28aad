//! Router-level tests for the Nexus application.
//!
//! Every test here drives the fully assembled router (or a small router wrapped in the
//! same [`crate::middleware::Pipeline`]) with `tower::ServiceExt::oneshot`, backed by an
//! in-memory SQLite database.
//!
//! ## Test Modules
//!
//! - **pipeline_tests**: Gate order, rate limiting, identity checks and panic recovery
//! - **api_tests**: Verification, character and reload endpoints

pub mod pipeline_tests;

use std::io::Write;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;

use crate::authority::{Authorities, TablePaths};
use crate::config::AppConfig;
use crate::db;
use crate::metrics::Metrics;
use crate::state::AppState;
use crate::store::SqliteCharacterStore;

/// Default config with every gate open and no list files, served from the root.
pub(crate) fn open_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.server.root_path = "/".to_string();
    cfg.rate_limit.enable = false;
    cfg.api_auth.ip_list_file = String::new();
    cfg.verify.map_list_file = String::new();
    cfg.verify.ban_list_file = String::new();
    cfg.verify.admin_list_file = String::new();
    cfg
}

pub(crate) async fn test_state(cfg: AppConfig) -> AppState {
    let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
    db::init_db(&pool).await.unwrap();
    let metrics = Metrics::new();
    let authorities = Authorities::new(TablePaths::from_config(&cfg), metrics.clone());
    authorities.reload_all();
    AppState::new(Arc::new(SqliteCharacterStore::new(pool)), cfg, authorities, metrics).unwrap()
}

/// Writes `json` into a fresh temp file and returns its handle (keep it alive).
pub(crate) fn list_file(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub(crate) fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub(crate) fn get_from(uri: &str, ip: &str) -> Request<Body> {
    Request::builder().uri(uri).header("x-real-ip", ip).body(Body::empty()).unwrap()
}

pub(crate) fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub(crate) async fn body_string(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub(crate) async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
