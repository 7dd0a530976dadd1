//! Core types: player ids, per-player storage, seeded RNG.
//!
//! These are the game-agnostic building blocks shared by every agent.
//! Games never configure them; they only consume them through the
//! simulation contract.

pub mod player;
pub mod rng;

pub use player::{PlayerId, PlayerMap};
pub use rng::SearchRng;
