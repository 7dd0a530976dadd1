//! Demonstration games for the test suite.
//!
//! These are deliberately small: enough rules to exercise the simulation
//! contract, the budget discipline, and the redeterminization contract,
//! and nothing more.

pub mod blind_war;
pub mod nim;

pub use blind_war::{BlindWar, BlindWarBuilder, BlindWarState, Card, Play};
pub use nim::{Nim, NimState, Take};
