use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use super::verify::banned;
use crate::{
    error::{params, AppError, AppResult},
    state::AppState,
    types::{Character, CharacterResponse, CharacterUpdate, DataResponse, NewCharacter},
};

fn with_flags<T>(state: &AppState, steamid: &str, data: T) -> CharacterResponse<T> {
    CharacterResponse {
        is_banned: banned(&state.policy.verify, &state.authorities, steamid),
        is_admin: state.authorities.is_admin(steamid),
        data,
    }
}

// GET /character
pub async fn list_all(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Character>>>> {
    let chars = state.store.all().await?;
    Ok(Json(DataResponse { data: chars }))
}

// GET /character/{steamid}
pub async fn list_for_player(
    State(state): State<AppState>,
    Path(steamid): Path<String>,
) -> AppResult<Json<CharacterResponse<Vec<Character>>>> {
    let steamid = params::parse_steamid(&steamid)?;
    let chars = state.store.by_steamid(steamid).await?;
    Ok(Json(with_flags(&state, steamid, chars)))
}

// GET /character/{steamid}/{slot}
pub async fn get_by_slot(
    State(state): State<AppState>,
    Path((steamid, slot)): Path<(String, String)>,
) -> AppResult<Json<CharacterResponse<Character>>> {
    let steamid = params::parse_steamid(&steamid)?;
    let slot = params::parse_slot(&slot)?;
    let char = state.store.by_steamid_slot(steamid, slot).await?;
    Ok(Json(with_flags(&state, steamid, char)))
}

// GET /character/id/{uid}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<Json<CharacterResponse<Character>>> {
    let uid = params::parse_uid(&uid)?;
    let char = state.store.by_id(uid).await?;
    let steamid = char.steamid.clone();
    Ok(Json(with_flags(&state, &steamid, char)))
}

// GET /character/export/{steamid}/{slot}
pub async fn export(State(state): State<AppState>, Path((steamid, slot)): Path<(String, String)>) -> AppResult<Response> {
    let steamid = params::parse_steamid(&steamid)?;
    let slot = params::parse_slot(&slot)?;
    let char = state.store.by_steamid_slot(steamid, slot).await?;
    let disposition = format!("attachment; filename=\"{}_{}.char\"", steamid, slot);
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream".to_string()), (header::CONTENT_DISPOSITION, disposition)],
        char.data,
    )
        .into_response())
}

// POST /character
pub async fn create(
    State(state): State<AppState>,
    Json(new): Json<NewCharacter>,
) -> AppResult<Json<DataResponse<Character>>> {
    params::parse_steamid(&new.steamid)?;
    if new.slot > 9 {
        return Err(AppError::BadRequest(format!("invalid slot {}: must be a single digit", new.slot)));
    }
    let char = state.store.create(new).await?;
    tracing::info!("Created character {} for {} in slot {}", char.id, char.steamid, char.slot);
    Ok(Json(DataResponse { data: char }))
}

// PUT /character/{uid}
pub async fn update(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(update): Json<CharacterUpdate>,
) -> AppResult<Json<DataResponse<Character>>> {
    let uid = params::parse_uid(&uid)?;
    let char = state.store.update(uid, update).await?;
    Ok(Json(DataResponse { data: char }))
}

// DELETE /character/{uid}
pub async fn delete(State(state): State<AppState>, Path(uid): Path<String>) -> AppResult<Json<DataResponse<Uuid>>> {
    let uid = params::parse_uid(&uid)?;
    state.store.delete(uid).await?;
    tracing::info!("Deleted character {}", uid);
    Ok(Json(DataResponse { data: uid }))
}
