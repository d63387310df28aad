use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored character record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Character {
    pub id: Uuid,
    pub steamid: String,
    pub slot: u8,
    pub size: i64,
    pub data: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCharacter {
    pub steamid: String,
    pub slot: u8,
    #[serde(default)]
    pub size: Option<i64>,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterUpdate {
    pub size: i64,
    pub data: String,
}

/// `{"result": bool}` payload returned by the verification endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyResult {
    pub result: bool,
}

impl VerifyResult {
    pub fn new(result: bool) -> Self {
        Self { result }
    }
}

/// Plain data envelope.
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Character payload together with the owner's ban and admin state.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterResponse<T> {
    pub is_banned: bool,
    pub is_admin: bool,
    pub data: T,
}
