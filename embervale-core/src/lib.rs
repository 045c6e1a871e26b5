//! The in-memory world simulation: tick orchestration, character state,
//! combat, pathing glue, and the connect/disconnect session lifecycle.
//!
//! Nothing in this crate touches the network or persistence layers
//! directly. `embervale-net` feeds [`tick::Intent`]s and
//! [`tick::ControlMessage`]s in and relays [`tick::TickReport`]s out;
//! `embervale-db` loads and saves [`character::Player`] state around the
//! edges of a connection's lifetime.

pub mod admin;
pub mod ai;
pub mod character;
pub mod chunk;
pub mod combat;
pub mod config;
pub mod damage;
pub mod error;
pub mod player_state;
pub mod session;
pub mod skill;
pub mod tick;
pub mod visibility;
pub mod zone;

pub use error::{WorldError, WorldResult};
