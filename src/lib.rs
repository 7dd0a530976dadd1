//! # horizon-search
//!
//! Game-agnostic rolling-horizon search agents for turn-based games.
//!
//! ## Design Principles
//!
//! 1. **Game-Agnostic**: No rule logic in the search core. Games plug in
//!    through the [`ForwardModel`] simulation contract.
//!
//! 2. **Deterministic**: All randomness for one decision flows from a single
//!    seeded generator threaded by reference through every sub-routine.
//!
//! 3. **Budget-Disciplined**: Every search loop is bounded by one
//!    [`BudgetTracker`] per decision (time, iterations, or model-call
//!    counts), created fresh per call and never shared.
//!
//! ## Architecture
//!
//! - **Rolling-Horizon Evolution**: populations of fixed-length action
//!   plans, each with its own exclusively-owned simulated trajectory, are
//!   evolved by selection, crossover, and mutation. Plans whose stored
//!   actions become illegal on replay are silently repaired, never rejected.
//!
//! - **Redeterminization**: games with hidden information implement
//!   [`Determinizable`] so searches can re-sample unseen components into
//!   mutually consistent guesses. A reusable conformance checker verifies
//!   the contract for each game.
//!
//! ## Modules
//!
//! - `core`: player ids, per-player storage, seeded RNG
//! - `sim`: the simulation contract and redeterminization conformance
//! - `budget`: budget kinds, per-decision tracking, exhaustion rules
//! - `search`: the evolutionary rollout engine, greedy one-step lookahead,
//!   hill-climbing, and the shared action-value memory
//! - `games`: small demonstration games used by the test suite

pub mod core;
pub mod sim;
pub mod budget;
pub mod search;
pub mod games;

// Re-export commonly used types
pub use crate::core::{PlayerId, PlayerMap, SearchRng};

pub use crate::sim::{Determinizable, ForwardModel};

pub use crate::budget::{Budget, BudgetKind, BudgetTracker};

pub use crate::search::{
    ActionStats, ActionValueMemory, Agent, CrossoverKind, DecisionStats, EvolverConfig,
    FitnessKind, Genome, GreedyAgent, GreedyConfig, HillClimber, HillClimberConfig,
    RolloutCtx, RolloutEvolver, SearchError, SelectionKind,
};
