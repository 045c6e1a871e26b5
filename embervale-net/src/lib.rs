//! The network layer: wire message shapes, connection transport, and the
//! glue binding connections to a running [`embervale_core::tick::World`].
//!
//! This crate never touches `World` directly — it only ever sends
//! [`embervale_core::tick::ControlMessage`]s and [`embervale_core::tick::Intent`]s
//! in and relays [`embervale_core::tick::TickReport`]s back out, so the tick
//! task remains the sole owner of world state.

pub mod dispatch;
pub mod message;
pub mod transport;

pub use dispatch::{relay_tick, EgressRegistry, ServerState};
pub use message::{ClientMessage, ServerMessage};
pub use transport::websocket_handler;
