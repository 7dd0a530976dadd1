//! Search agents and their shared machinery.
//!
//! Three agents share the genome/rollout representation and the budget
//! discipline:
//!
//! - [`RolloutEvolver`]: population-based rolling-horizon evolution
//! - [`GreedyAgent`]: single-ply exhaustive lookahead
//! - [`HillClimber`]: single-genome strict-improvement mutation
//!
//! All randomness for one decision flows from the agent's [`SearchRng`],
//! passed by reference (inside a [`RolloutCtx`]) into every sub-routine.

pub mod evolver;
pub mod genome;
pub mod greedy;
pub mod hill_climb;
pub mod mast;

pub use evolver::{CrossoverKind, EvolverConfig, RolloutEvolver, SelectionKind};
pub use genome::{FitnessKind, Genome};
pub use greedy::{GreedyAgent, GreedyConfig};
pub use hill_climb::{HillClimber, HillClimberConfig};
pub use mast::{ActionStats, ActionValueMemory};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::budget::BudgetTracker;
use crate::core::{PlayerId, SearchRng};
use crate::sim::ForwardModel;

/// Errors surfaced by a decision call.
///
/// Stale actions inside a plan are never errors (they are repaired); the
/// only hard failure is being asked to decide with nothing to choose from,
/// which violates the simulation contract's non-empty-legal-actions rule.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A decision was requested but no legal action exists.
    #[error("no legal action available for {player} at a non-terminal decision point")]
    NoLegalActions {
        /// The player the decision was requested for.
        player: PlayerId,
    },
}

/// Statistics from the most recent decision, for diagnostics and tuning.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DecisionStats {
    /// Search iterations completed (generations, climb steps).
    pub iterations: u64,

    /// Forward-model calls made.
    pub fm_calls: u64,

    /// State copies made (clones and determinizations).
    pub copy_calls: u64,

    /// Stored actions replaced because they were illegal on replay.
    pub repairs: u64,

    /// Total decision time (microseconds).
    pub time_us: u64,
}

impl DecisionStats {
    /// Reset all statistics to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fill counter fields from a finished tracker.
    pub(crate) fn absorb(&mut self, tracker: &BudgetTracker) {
        self.iterations = tracker.iterations();
        self.fm_calls = tracker.fm_calls();
        self.copy_calls = tracker.copy_calls();
        self.time_us = tracker.elapsed_us();
    }

    /// Forward-model calls per second over the decision.
    #[must_use]
    pub fn fm_calls_per_second(&self) -> f64 {
        if self.time_us == 0 {
            0.0
        } else {
            self.fm_calls as f64 / (self.time_us as f64 / 1_000_000.0)
        }
    }
}

/// Per-decision context threaded through every rollout sub-routine.
///
/// Bundles the single seeded generator, the single budget tracker, and
/// (when enabled) the shared action-value memory, so none of them ever
/// live in ambient or static state.
pub struct RolloutCtx<'a, A> {
    /// The decision's random generator.
    pub rng: &'a mut SearchRng,

    /// The decision's budget tracker.
    pub budget: &'a mut BudgetTracker,

    /// Action-value memory, when the rollout policy should be biased.
    pub memory: Option<&'a mut ActionValueMemory<A>>,

    /// Repairs performed so far in this decision.
    pub repairs: u64,
}

impl<'a, A> RolloutCtx<'a, A> {
    /// Create a context without action-value memory.
    pub fn new(rng: &'a mut SearchRng, budget: &'a mut BudgetTracker) -> Self {
        Self {
            rng,
            budget,
            memory: None,
            repairs: 0,
        }
    }

    /// Create a context with action-value memory attached.
    pub fn with_memory(
        rng: &'a mut SearchRng,
        budget: &'a mut BudgetTracker,
        memory: &'a mut ActionValueMemory<A>,
    ) -> Self {
        Self {
            rng,
            budget,
            memory: Some(memory),
            repairs: 0,
        }
    }
}

/// A search-based decision maker for one player of a game.
///
/// `decide` is the sole per-turn entry point, called once by the enclosing
/// turn loop with the current state and its legal actions. `fork` produces
/// an independent instance with a freshly reseeded generator, for
/// self-play tournaments.
pub trait Agent<M: ForwardModel> {
    /// Choose an action for `player` in `state`.
    fn decide(
        &mut self,
        state: &M::State,
        player: PlayerId,
        legal: &[M::Action],
    ) -> Result<M::Action, SearchError>;

    /// Produce an independent copy with a forked random generator.
    fn fork(&mut self) -> Self
    where
        Self: Sized;

    /// Statistics from the most recent decision.
    fn stats(&self) -> &DecisionStats;
}

/// Choose a rollout action: memory-weighted when a table is attached and
/// has evidence for this actor, uniform otherwise.
pub(crate) fn rollout_policy_choice<A>(
    legal: &[A],
    actor: PlayerId,
    ctx: &mut RolloutCtx<'_, A>,
) -> A
where
    A: Clone + Eq + std::hash::Hash,
{
    debug_assert!(!legal.is_empty());

    if let Some(memory) = ctx.memory.as_deref_mut() {
        if let Some(choice) = memory.sample(actor, legal, ctx.rng) {
            return choice;
        }
    }

    legal[ctx.rng.gen_range_usize(0..legal.len())].clone()
}
