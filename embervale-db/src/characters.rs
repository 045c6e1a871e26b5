//! Character persistence: the row a player's in-world state is loaded
//! from and periodically written back to.

use sqlx::{PgPool, Row};

use crate::error::DbError;

/// A character's persisted fields, independent of the `World`'s live
/// in-memory representation. Loaded on login, written back by the
/// background position-persistence writer and on clean logout.
#[derive(Debug, Clone)]
pub struct CharacterRecord {
    /// The account this character belongs to.
    pub account_id: i64,
    /// Display name.
    pub name: String,
    /// Last known world tile position.
    pub position: (i32, i32),
    /// Last known current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Requested visibility radius, or `None` to use the world default.
    pub visibility_radius: Option<i32>,
}

/// The character repository.
#[derive(Debug, Clone)]
pub struct CharacterStore {
    pool: PgPool,
}

impl CharacterStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the character belonging to `account_id`, if one exists.
    pub async fn load(&self, account_id: i64) -> Result<Option<CharacterRecord>, DbError> {
        let row = sqlx::query(
            "SELECT account_id, name, position_x, position_y, health, max_health, visibility_radius \
             FROM characters WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| CharacterRecord {
            account_id: row.get("account_id"),
            name: row.get("name"),
            position: (row.get("position_x"), row.get("position_y")),
            health: row.get("health"),
            max_health: row.get("max_health"),
            visibility_radius: row.get("visibility_radius"),
        }))
    }

    /// Creates a brand new character row for an account logging in for the
    /// first time.
    pub async fn create(&self, account_id: i64, name: &str, spawn_position: (i32, i32), max_health: i32) -> Result<CharacterRecord, DbError> {
        sqlx::query(
            "INSERT INTO characters (account_id, name, position_x, position_y, health, max_health) \
             VALUES ($1, $2, $3, $4, $5, $5)",
        )
        .bind(account_id)
        .bind(name)
        .bind(spawn_position.0)
        .bind(spawn_position.1)
        .bind(max_health)
        .execute(&self.pool)
        .await?;

        Ok(CharacterRecord {
            account_id,
            name: name.to_string(),
            position: spawn_position,
            health: max_health,
            max_health,
            visibility_radius: None,
        })
    }

    /// Writes back a character's current position and health. Called
    /// periodically by the background persistence writer and once more on
    /// clean logout.
    pub async fn save_state(&self, account_id: i64, position: (i32, i32), health: i32) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE characters SET position_x = $2, position_y = $3, health = $4 WHERE account_id = $1",
        )
        .bind(account_id)
        .bind(position.0)
        .bind(position.1)
        .bind(health)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
