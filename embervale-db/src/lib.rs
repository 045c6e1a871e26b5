//! Persistence adapter: account/session store, character store, and
//! bearer-token parsing. Everything here is a thin `sqlx`/`jsonwebtoken`
//! wrapper with no gameplay logic of its own — `embervale-core` owns the
//! in-memory world state this crate loads from and writes back to.

pub mod accounts;
pub mod characters;
pub mod error;
pub mod jwt;

pub use accounts::{AccountStore, SessionUpsert};
pub use characters::{CharacterRecord, CharacterStore};
pub use error::DbError;
pub use jwt::{decode_account_id, JwtError};
