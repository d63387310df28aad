//! # Nexus Backend Library
//!
//! Character record and verification API. Every request passes an admission pipeline
//! before any handler runs: access logging, panic recovery, a global rate limiter and an
//! identity check against a hot-reloadable IP allow-list and a shared API key.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server, routing and middleware
//! - **SQLx**: Asynchronous SQLite access for character records
//! - **Tokio**: Async runtime
//! - **Serde**: JSON payloads and authority list documents
//!
//! ## Core Components
//!
//! - [`authority`]: Reloadable IP, ban, map-hash and admin tables
//! - [`config`]: Layered configuration loading and validation
//! - [`db`]: Database schema initialization
//! - [`error`]: Handler errors and HTTP error responses
//! - [`logging`]: Tracing subscriber and log file rotation
//! - [`metrics`]: Admission and reload counters
//! - [`middleware`]: The ordered admission gates
//! - [`policy`]: Immutable enforcement toggles handed to each gate
//! - [`routes`]: HTTP endpoint handlers and router assembly
//! - [`state`]: Shared application state
//! - [`store`]: Character persistence
//! - [`types`]: Request and response payloads

pub mod authority;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod policy;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;
