//! Account/session persistence.
//!
//! Tracks one `active_sessions` row per account so a second login attempt
//! for an account whose session is still fresh is rejected at the
//! database level too, not just by the in-memory `SessionTable` the
//! running world keeps. A stale row (no heartbeat in the reconnect window)
//! is silently reclaimed rather than treated as a conflict.
//!
//! Uses `sqlx`'s runtime-checked query API rather than the `query!` macro
//! family, since the latter needs a live database (or a checked-in offline
//! cache) at compile time.

use sqlx::{PgPool, Row};

use crate::error::DbError;

/// Whether an upsert attempt found and reused a stale session, or created
/// a brand new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpsert {
    /// No prior session existed for this account.
    Created,
    /// A session existed but its last heartbeat was stale enough to
    /// reclaim.
    Reclaimed,
}

/// The account/session repository.
#[derive(Debug, Clone)]
pub struct AccountStore {
    pool: PgPool,
}

impl AccountStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new `active_sessions` row for `account_id`, or reclaims
    /// an existing one whose `last_heartbeat` is older than 30 seconds.
    /// Returns `None` if a live session already exists (the caller should
    /// reject the login as a duplicate).
    pub async fn upsert_session(&self, account_id: i64) -> Result<Option<SessionUpsert>, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO active_sessions (account_id, last_heartbeat)
            VALUES ($1, now())
            ON CONFLICT (account_id) DO UPDATE
                SET last_heartbeat = now()
                WHERE active_sessions.last_heartbeat < now() - interval '30 seconds'
            RETURNING (xmax = 0) AS created
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            if row.get::<bool, _>("created") {
                SessionUpsert::Created
            } else {
                SessionUpsert::Reclaimed
            }
        }))
    }

    /// Returns the ban reason for `account_id` if it is currently banned
    /// (`users.ban_until` is set and in the future), or `None` if the
    /// account may log in.
    pub async fn ban_reason(&self, account_id: i64) -> Result<Option<String>, DbError> {
        let row = sqlx::query(
            "SELECT ban_reason FROM users WHERE id = $1 AND ban_until IS NOT NULL AND ban_until > now()",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get::<Option<String>, _>("ban_reason").unwrap_or_else(|| "no reason given".to_string())))
    }

    /// Refreshes `last_heartbeat` for an already-live session.
    pub async fn touch_session(&self, account_id: i64) -> Result<(), DbError> {
        sqlx::query("UPDATE active_sessions SET last_heartbeat = now() WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Removes an account's session row entirely, on full logout.
    pub async fn remove_session(&self, account_id: i64) -> Result<(), DbError> {
        sqlx::query("DELETE FROM active_sessions WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_upsert_variants_are_distinct() {
        assert_ne!(SessionUpsert::Created, SessionUpsert::Reclaimed);
    }
}
