//! Persistence-layer error type.

use thiserror::Error;

/// Errors returned by the account/session and character stores.
#[derive(Error, Debug)]
pub enum DbError {
    /// The underlying query failed.
    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),
    /// No row matched the lookup.
    #[error("no row found for {0}")]
    NotFound(String),
}
