//! Character persistence.
//!
//! Handlers talk to a [`CharacterStore`] trait object so the admission tests can run
//! against an in-memory SQLite database without any other wiring.

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::error::{AppError, AppResult, OptionExt};
use crate::types::{Character, CharacterUpdate, NewCharacter};

const COLUMNS: &str = "id, steamid, slot, size, data, created_at, updated_at";

#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn all(&self) -> AppResult<Vec<Character>>;
    async fn by_steamid(&self, steamid: &str) -> AppResult<Vec<Character>>;
    async fn by_steamid_slot(&self, steamid: &str, slot: u8) -> AppResult<Character>;
    async fn by_id(&self, id: Uuid) -> AppResult<Character>;
    async fn create(&self, new: NewCharacter) -> AppResult<Character>;
    async fn update(&self, id: Uuid, update: CharacterUpdate) -> AppResult<Character>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SqliteCharacterStore {
    pool: SqlitePool,
}

impl SqliteCharacterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_character(row: &SqliteRow) -> AppResult<Character> {
    let id: String = row.try_get("id")?;
    let slot: i64 = row.try_get("slot")?;
    Ok(Character {
        id: Uuid::parse_str(&id).map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt id {}: {}", id, e)))?,
        steamid: row.try_get("steamid")?,
        slot: u8::try_from(slot)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("corrupt slot {} for {}", slot, id)))?,
        size: row.try_get("size")?,
        data: row.try_get("data")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn rows_to_characters(rows: &[SqliteRow]) -> AppResult<Vec<Character>> {
    rows.iter().map(row_to_character).collect()
}

#[async_trait]
impl CharacterStore for SqliteCharacterStore {
    async fn all(&self) -> AppResult<Vec<Character>> {
        let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM characters ORDER BY steamid, slot"))
            .fetch_all(&self.pool)
            .await?;
        rows_to_characters(&rows)
    }

    async fn by_steamid(&self, steamid: &str) -> AppResult<Vec<Character>> {
        let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM characters WHERE steamid = ?1 ORDER BY slot"))
            .bind(steamid)
            .fetch_all(&self.pool)
            .await?;
        rows_to_characters(&rows)
    }

    async fn by_steamid_slot(&self, steamid: &str, slot: u8) -> AppResult<Character> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM characters WHERE steamid = ?1 AND slot = ?2"))
            .bind(steamid)
            .bind(i64::from(slot))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_not_found("character")?;
        row_to_character(&row)
    }

    async fn by_id(&self, id: Uuid) -> AppResult<Character> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM characters WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_not_found("character")?;
        row_to_character(&row)
    }

    async fn create(&self, new: NewCharacter) -> AppResult<Character> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!(
            "INSERT INTO characters (id, steamid, slot, size, data) VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&new.steamid)
        .bind(i64::from(new.slot))
        .bind(new.size.unwrap_or(0))
        .bind(&new.data)
        .fetch_one(&mut *tx)
        .await?;
        let character = row_to_character(&row)?;
        tx.commit().await?;
        Ok(character)
    }

    async fn update(&self, id: Uuid, update: CharacterUpdate) -> AppResult<Character> {
        let row = sqlx::query(&format!(
            r#"UPDATE characters
               SET size = ?1, data = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now')
               WHERE id = ?3
               RETURNING {COLUMNS}"#
        ))
        .bind(update.size)
        .bind(&update.data)
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_not_found("character")?;
        row_to_character(&row)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let res = sqlx::query("DELETE FROM characters WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound("character not found".to_string()));
        }
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
