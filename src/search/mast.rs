//! Shared action-value memory (MAST) for biasing rollout policies.
//!
//! One table per player maps actions to visit/value statistics. Tables are
//! updated once per completed rollout for every action actually traversed,
//! and every entry decays by the discount factor once per real decision
//! (not per rollout), modeling staleness of older evidence. The memory
//! lives as long as its owning agent and is never shared across agents.

use rustc_hash::FxHashMap;
use std::hash::Hash;

use crate::core::{PlayerId, PlayerMap, SearchRng};

/// Accumulated evidence for one action.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionStats {
    /// Decayed visit count.
    pub visits: f64,
    /// Decayed accumulated rollout value.
    pub value: f64,
}

impl ActionStats {
    /// Mean value per visit.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.visits > 0.0 {
            self.value / self.visits
        } else {
            0.0
        }
    }
}

/// Per-player decaying action statistics.
pub struct ActionValueMemory<A> {
    tables: PlayerMap<FxHashMap<A, ActionStats>>,
    discount: f64,
}

impl<A: Clone + Eq + Hash> ActionValueMemory<A> {
    /// Create empty tables for `player_count` players.
    #[must_use]
    pub fn new(player_count: usize, discount: f64) -> Self {
        Self {
            tables: PlayerMap::new(player_count, |_| FxHashMap::default()),
            discount,
        }
    }

    /// Record one traversal of `action` by `player` in a rollout whose
    /// fitness was `fitness`.
    pub fn record(&mut self, player: PlayerId, action: &A, fitness: f64) {
        let stats = self.tables[player].entry(action.clone()).or_default();
        stats.visits += 1.0;
        stats.value += fitness;
    }

    /// Decay every entry in every table. Call once per real decision.
    pub fn decay(&mut self) {
        for (_, table) in self.tables.iter_mut() {
            for stats in table.values_mut() {
                stats.visits *= self.discount;
                stats.value *= self.discount;
            }
        }
    }

    /// Look up the statistics for one of `player`'s actions.
    #[must_use]
    pub fn get(&self, player: PlayerId, action: &A) -> Option<&ActionStats> {
        self.tables[player].get(action)
    }

    /// Number of distinct actions remembered for `player`.
    #[must_use]
    pub fn len(&self, player: PlayerId) -> usize {
        self.tables[player].len()
    }

    /// Whether nothing has been remembered for `player`.
    #[must_use]
    pub fn is_empty(&self, player: PlayerId) -> bool {
        self.tables[player].is_empty()
    }

    /// Sample one of `legal` for `player`, weighted by remembered mean
    /// values. Unvisited actions get the best known mean (optimism), and
    /// all weights are shifted positive before the draw.
    ///
    /// Returns `None` when there is no evidence for any legal action, so
    /// the caller can fall back to a uniform choice.
    pub fn sample(&self, player: PlayerId, legal: &[A], rng: &mut SearchRng) -> Option<A> {
        if legal.is_empty() {
            return None;
        }

        let table = &self.tables[player];
        let means: Vec<Option<f64>> = legal
            .iter()
            .map(|a| table.get(a).filter(|s| s.visits > 0.0).map(ActionStats::mean))
            .collect();

        let best = means
            .iter()
            .flatten()
            .copied()
            .fold(None::<f64>, |acc, m| Some(acc.map_or(m, |b| b.max(m))))?;

        let raw: Vec<f64> = means.iter().map(|m| m.unwrap_or(best)).collect();
        let min = raw.iter().copied().fold(f64::INFINITY, f64::min);

        // Shift into positive territory with a floor so no legal action
        // is starved entirely.
        let weights: Vec<f64> = raw.iter().map(|w| w - min + 0.1).collect();

        rng.choose_weighted(&weights).map(|i| legal[i].clone())
    }
}
