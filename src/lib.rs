//! Ephemeral raffle rooms.
//!
//! Clients create a room, drop string entries into it and later draw them
//! back out one at a time, uniformly at random. Rooms live in memory only and
//! are swept away after a period of inactivity.

pub mod api;
pub mod config;
pub mod error;
pub mod rooms;

pub use error::{RaffleError, Result};
