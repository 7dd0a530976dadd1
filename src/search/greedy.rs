//! Greedy one-step lookahead agent.
//!
//! Exhaustively tries every legal action once, scores the resulting state,
//! and returns the argmax. A small symmetric multiplicative noise term,
//! seeded per action index, breaks exact ties deterministically for a
//! given seed without disturbing the ranking beyond the noise magnitude.
//!
//! Unlike the evolutionary engine, this agent ranks actions by absolute
//! score, not by discounted heuristic deltas; the two fitness definitions
//! deliberately coexist per agent type.

use serde::{Deserialize, Serialize};

use crate::budget::{Budget, BudgetTracker};
use crate::core::{PlayerId, SearchRng};
use crate::search::{Agent, DecisionStats, SearchError};
use crate::sim::ForwardModel;

/// Configuration for the greedy lookahead agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GreedyConfig {
    /// Magnitude of the tie-break noise.
    pub epsilon: f64,

    /// Seed for the decision generator.
    pub seed: u64,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            seed: 42,
        }
    }
}

impl GreedyConfig {
    /// Set the generator seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Single-ply exhaustive lookahead agent.
pub struct GreedyAgent<M: ForwardModel> {
    model: M,
    config: GreedyConfig,
    rng: SearchRng,
    stats: DecisionStats,
}

impl<M: ForwardModel> GreedyAgent<M> {
    /// Create a new greedy agent around `model`.
    pub fn new(model: M, config: GreedyConfig) -> Self {
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

    /// Perturb a raw value with index-seeded symmetric noise.
    fn noised(&self, value: f64, index: usize) -> f64 {
        let eps = self.config.epsilon;
        let u = self.rng.for_context(&format!("tie-break-{index}")).next_f64();
        (value + eps) * (1.0 + eps * (u - 0.5))
    }
}

impl<M: ForwardModel + Clone> Agent<M> for GreedyAgent<M> {
    fn decide(
        &mut self,
        state: &M::State,
        player: PlayerId,
        legal: &[M::Action],
    ) -> Result<M::Action, SearchError> {
        if legal.is_empty() {
            return Err(SearchError::NoLegalActions { player });
        }

        self.stats.reset();
        let mut tracker = BudgetTracker::new(Budget::fm_calls(legal.len() as u64));

        let mut best: Option<(f64, &M::Action)> = None;
        for (index, action) in legal.iter().enumerate() {
            let mut next = state.clone();
            tracker.note_copy();
            self.model.apply(&mut next, action);
            tracker.note_fm_call();

            let value = self.noised(self.model.score(&next, player), index);
            if best.map_or(true, |(best_value, _)| value > best_value) {
                best = Some((value, action));
            }
        }
        tracker.complete_iteration();

        self.stats.absorb(&tracker);

        best.map(|(_, action)| action.clone())
            .ok_or(SearchError::NoLegalActions { player })
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

#[cfg(test)]
mod tests {
    use super::*;

    /// One shot: pick a number, score it, done.
    #[derive(Clone)]
    struct PickOne;

    #[derive(Clone, Debug, PartialEq)]
    struct PickState {
        picked: Option<i64>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    struct Pick(i64);

    impl ForwardModel for PickOne {
        type State = PickState;
        type Action = Pick;

        fn player_count(&self) -> usize {
            1
        }

        fn legal_actions(&self, state: &PickState) -> Vec<Pick> {
            if state.picked.is_some() {
                vec![]
            } else {
                vec![Pick(3), Pick(9), Pick(5)]
            }
        }

        fn apply(&self, state: &mut PickState, action: &Pick) {
            state.picked = Some(action.0);
        }

        fn is_terminal(&self, state: &PickState) -> bool {
            state.picked.is_some()
        }

        fn current_player(&self, _state: &PickState) -> PlayerId {
            PlayerId::new(0)
        }

        fn score(&self, state: &PickState, _player: PlayerId) -> f64 {
            state.picked.map_or(0.0, |v| v as f64)
        }
    }

    #[test]
    fn test_picks_highest_scoring_action() {
        let mut agent = GreedyAgent::new(PickOne, GreedyConfig::default());
        let state = PickState { picked: None };
        let legal = PickOne.legal_actions(&state);

        let action = agent.decide(&state, PlayerId::new(0), &legal).unwrap();
        assert_eq!(action, Pick(9));
    }

    #[test]
    fn test_noise_does_not_reorder_distinct_values() {
        let agent = GreedyAgent::new(PickOne, GreedyConfig::default());

        // Values a full unit apart stay ordered under 1e-6 noise.
        let low = agent.noised(1.0, 0);
        let high = agent.noised(2.0, 1);
        assert!(high > low);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let agent1 = GreedyAgent::new(PickOne, GreedyConfig::default().with_seed(7));
        let agent2 = GreedyAgent::new(PickOne, GreedyConfig::default().with_seed(7));

        for index in 0..5 {
            assert_eq!(agent1.noised(1.0, index), agent2.noised(1.0, index));
        }
    }

    #[test]
    fn test_tie_break_differs_by_index() {
        let agent = GreedyAgent::new(PickOne, GreedyConfig::default());
        assert_ne!(agent.noised(1.0, 0), agent.noised(1.0, 1));
    }

    #[test]
    fn test_no_legal_actions_is_fatal() {
        let mut agent = GreedyAgent::new(PickOne, GreedyConfig::default());
        let state = PickState { picked: None };

        let err = agent.decide(&state, PlayerId::new(0), &[]).unwrap_err();
        assert!(matches!(err, SearchError::NoLegalActions { .. }));
    }

    #[test]
    fn test_stats_count_one_call_per_action() {
        let mut agent = GreedyAgent::new(PickOne, GreedyConfig::default());
        let state = PickState { picked: None };
        let legal = PickOne.legal_actions(&state);

        agent.decide(&state, PlayerId::new(0), &legal).unwrap();

        assert_eq!(agent.stats().fm_calls, 3);
        assert_eq!(agent.stats().copy_calls, 3);
    }
}
