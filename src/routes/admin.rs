use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};

use crate::{
    authority::ReloadOutcome,
    error::{AppError, AppResult},
    middleware::{auth::constant_time_eq, ip::ClientIp},
    state::AppState,
    types::DataResponse,
};

/// Reloads always demand the configured API key, whether or not `api_auth.enforce_key`
/// gates the rest of the API. Without a configured key the endpoint is disabled.
fn authorize_reload(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let expected = state.config.api_auth.key.as_str();
    if expected.is_empty() {
        return Err(AppError::Forbidden("reload is disabled: api_auth.key is not set".to_string()));
    }
    let presented = headers.get(header::AUTHORIZATION).and_then(|h| h.to_str().ok()).unwrap_or("");
    if !constant_time_eq(presented, expected) {
        return Err(AppError::Forbidden("reload requires the API key".to_string()));
    }
    Ok(())
}

// POST /reload
// Re-reads every configured authority table from disk. Tables that fail keep their contents.
pub async fn reload(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
) -> AppResult<Json<DataResponse<Vec<ReloadOutcome>>>> {
    if let Err(e) = authorize_reload(&state, &headers) {
        tracing::warn!("Rejected authority table reload from {}: {}", ip, e);
        return Err(e);
    }
    tracing::info!("Authority table reload requested by {}", ip);
    let authorities = state.authorities.clone();
    let outcomes = tokio::task::spawn_blocking(move || authorities.reload_all())
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("reload task failed: {}", e)))?;
    Ok(Json(DataResponse { data: outcomes }))
}
