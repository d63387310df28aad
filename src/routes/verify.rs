use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    authority::Authorities,
    error::{params, AppError, AppResult},
    policy::VerifyPolicy,
    state::AppState,
    store::CharacterStore,
    types::{NewCharacter, VerifyResult},
};

/// Map check: passes when enforcement is off, otherwise the stored hash (0 if unknown) must match.
pub fn map_verified(policy: &VerifyPolicy, auth: &Authorities, name: &str, hash: u32) -> bool {
    !policy.enforce_map || auth.map_hash_matches(name, hash)
}

/// Ban check: `false` (not banned) whenever enforcement is off.
pub fn banned(policy: &VerifyPolicy, auth: &Authorities, steamid: &str) -> bool {
    policy.enforce_ban && auth.is_banned(steamid)
}

/// Shortcode check against the single configured hash.
pub fn shortcode_verified(policy: &VerifyPolicy, hash: u32) -> bool {
    !policy.enforce_sc || policy.sc_hash == hash
}

const DEBUG_STEAMID: &str = "76561198092541763";

async fn seed_debug(store: &dyn CharacterStore) -> AppResult<()> {
    let sample = NewCharacter { steamid: DEBUG_STEAMID.to_string(), slot: 1, size: None, data: "data".to_string() };
    match store.create(sample).await {
        Ok(c) => {
            tracing::debug!("Seeded debug character {}", c.id);
            Ok(())
        }
        Err(AppError::Conflict(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

// GET /
pub async fn root(State(state): State<AppState>) -> AppResult<Json<VerifyResult>> {
    if state.config.server.debug {
        seed_debug(state.store.as_ref()).await?;
    }
    Ok(Json(VerifyResult::new(true)))
}

// GET /ping
pub async fn ping() -> Json<VerifyResult> {
    Json(VerifyResult::new(true))
}

// GET /map/{name}/{hash}
pub async fn map_verify(
    State(state): State<AppState>,
    Path((name, hash)): Path<(String, String)>,
) -> AppResult<Json<VerifyResult>> {
    if !state.policy.verify.enforce_map {
        return Ok(Json(VerifyResult::new(true)));
    }
    let hash = params::parse_hash(&hash)?;
    Ok(Json(VerifyResult::new(map_verified(&state.policy.verify, &state.authorities, &name, hash))))
}

// GET /ban/{steamid}
// `true` means the player is banned.
pub async fn ban_verify(
    State(state): State<AppState>,
    Path(steamid): Path<String>,
) -> AppResult<Json<VerifyResult>> {
    let steamid = params::parse_steamid(&steamid)?;
    Ok(Json(VerifyResult::new(banned(&state.policy.verify, &state.authorities, steamid))))
}

// GET /sc/{hash}
pub async fn sc_verify(State(state): State<AppState>, Path(hash): Path<String>) -> AppResult<Json<VerifyResult>> {
    if !state.policy.verify.enforce_sc {
        return Ok(Json(VerifyResult::new(true)));
    }
    let hash = params::parse_hash(&hash)?;
    Ok(Json(VerifyResult::new(shortcode_verified(&state.policy.verify, hash))))
}
