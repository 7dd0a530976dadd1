//! Random-mutation hill climbing over a single plan.
//!
//! A degenerate one-member population: each iteration clones the best
//! plan, randomizes its tail from one random index, re-rolls, and accepts
//! the mutant only on strictly greater fitness. No acceptance on tie or
//! regression: this is true hill climbing, not simulated annealing.
//!
//! Like the greedy agent, the climber ranks plans by the absolute score of
//! the trajectory's final state rather than by discounted deltas.

use serde::{Deserialize, Serialize};

use crate::budget::{Budget, BudgetTracker};
use crate::core::{PlayerId, SearchRng};
use crate::search::{Agent, DecisionStats, FitnessKind, Genome, RolloutCtx, SearchError};
use crate::sim::ForwardModel;

/// Configuration for the hill-climbing agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HillClimberConfig {
    /// Number of future decision steps the plan covers.
    pub horizon: usize,

    /// Discount factor carried by the plan; only felt when `fitness` is
    /// switched to discounted deltas.
    pub discount: f64,

    /// Which evaluator drives plan fitness. Final score by default; the
    /// evolutionary engine's delta fitness is deliberately not shared.
    pub fitness: FitnessKind,

    /// Resource budget per decision.
    pub budget: Budget,

    /// Seed for the decision generator.
    pub seed: u64,
}

impl Default for HillClimberConfig {
    fn default() -> Self {
        Self {
            horizon: 10,
            discount: 0.9,
            fitness: FitnessKind::FinalScore,
            budget: Budget::default(),
            seed: 42,
        }
    }
}

impl HillClimberConfig {
    /// Set the planning horizon.
    #[must_use]
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the per-decision budget.
    #[must_use]
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Set the generator seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Random-mutation hill-climbing agent.
pub struct HillClimber<M: ForwardModel> {
    model: M,
    config: HillClimberConfig,
    rng: SearchRng,
    stats: DecisionStats,
}

impl<M: ForwardModel> HillClimber<M> {
    /// Create a new hill climber around `model`.
    pub fn new(model: M, config: HillClimberConfig) -> Self {
        let rng = SearchRng::new(config.seed);
        Self {
            model,
            config,
            rng,
            stats: DecisionStats::default(),
        }
    }

    /// Get the forward model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }
}

/// Strict-improvement acceptance: ties and regressions are rejected.
fn improves<M: ForwardModel>(candidate: &Genome<M>, incumbent: &Genome<M>) -> bool {
    candidate.fitness() > incumbent.fitness()
}

impl<M: ForwardModel + Clone> Agent<M> for HillClimber<M> {
    fn decide(
        &mut self,
        state: &M::State,
        player: PlayerId,
        legal: &[M::Action],
    ) -> Result<M::Action, SearchError> {
        if legal.is_empty() {
            return Err(SearchError::NoLegalActions { player });
        }
        assert!(self.config.horizon > 0, "horizon must be at least 1");

        self.stats.reset();
        let mut tracker = BudgetTracker::new(self.config.budget);
        let model = &self.model;
        let mut ctx: RolloutCtx<'_, M::Action> = RolloutCtx::new(&mut self.rng, &mut tracker);

        let mut best = Genome::new_rolled(
            model,
            state,
            player,
            self.config.horizon,
            self.config.discount,
            self.config.fitness,
            &mut ctx,
        );

        while ctx.budget.may_continue() {
            if !best.is_empty() {
                let mut candidate = best.duplicate(&mut ctx);
                let start = ctx.rng.gen_range_usize(0..candidate.len());
                candidate.randomize_from(model, start, player, self.config.fitness, &mut ctx);

                if improves(&candidate, &best) {
                    best = candidate;
                }
            }
            ctx.budget.complete_iteration();
        }

        let repairs = ctx.repairs;
        let choice = best.first_action().cloned();

        self.stats.absorb(&tracker);
        self.stats.repairs = repairs;

        choice.ok_or(SearchError::NoLegalActions { player })
    }

    fn fork(&mut self) -> Self {
        let mut config = self.config.clone();
        config.seed = self.rng.fork().seed();
        Self {
            model: self.model.clone(),
            rng: SearchRng::new(config.seed),
            config,
            stats: DecisionStats::default(),
        }
    }

    fn stats(&self) -> &DecisionStats {
        &self.stats
    }
}
