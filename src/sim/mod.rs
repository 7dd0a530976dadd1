//! The simulation contract between games and the search core.
//!
//! Games implement [`ForwardModel`] to define:
//! - Legal actions for each game state
//! - How actions modify state
//! - Terminal detection, turn order, and state evaluation
//!
//! The search core calls into the contract but never interprets
//! game-specific concepts directly. Games with hidden information
//! additionally implement [`Determinizable`] so searches can re-sample
//! unseen components; `conformance` verifies that implementation.

pub mod conformance;

use std::fmt::Debug;
use std::hash::Hash;

use crate::core::{PlayerId, SearchRng};

/// Forward model trait: the rules seam every agent searches through.
///
/// ## Implementation Notes
///
/// - `legal_actions` must be a pure function of the given state and must
///   be non-empty unless the state is terminal
/// - `apply` mutates the state in place and must be deterministic
/// - `heuristic` defaults to `score`; games may provide a denser signal
///   for rollout fitness without changing their terminal scoring
///
/// State cloning is plain `Clone::clone`; the caller accounts for each
/// clone as one copy call against its budget.
pub trait ForwardModel {
    /// Game state. Exclusively owned by whoever holds it; the search core
    /// never aliases one state between two trajectories.
    type State: Clone;

    /// A single atomic move. Hashable so the action-value memory can key
    /// statistics by action identity.
    type Action: Clone + Debug + PartialEq + Eq + Hash;

    /// Number of players in this game.
    fn player_count(&self) -> usize;

    /// Enumerate the legal actions in `state` for the player to move.
    ///
    /// Must be non-empty unless `is_terminal(state)`.
    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Apply an action to the state in place. One forward-model call.
    fn apply(&self, state: &mut Self::State, action: &Self::Action);

    /// Check whether the game is over in `state`.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// The player to move in `state`.
    fn current_player(&self, state: &Self::State) -> PlayerId;

    /// Evaluate `state` from `player`'s perspective.
    fn score(&self, state: &Self::State, player: PlayerId) -> f64;

    /// Heuristic evaluation used for rollout fitness deltas.
    ///
    /// Defaults to `score`.
    fn heuristic(&self, state: &Self::State, player: PlayerId) -> f64 {
        self.score(state, player)
    }
}

/// Redeterminization: re-sampling hidden information from one player's
/// point of view.
///
/// `determinize` must:
/// 1. leave every component `observer` can legally observe identical to
///    the source state,
/// 2. reassign the components hidden from `observer` via a seeded shuffle
///    that exactly preserves the multiset of hidden component types,
/// 3. be safe to call repeatedly and independently from the same decision
///    point, producing different, mutually consistent guesses.
///
/// `observation` and `hidden_fingerprint` expose the two sides of that
/// split so [`conformance::check_determinization`] can verify rules 1-3
/// generically instead of trusting each game's bespoke reshuffle.
pub trait Determinizable: ForwardModel {
    /// Everything `observer` can see of a state, in comparable form.
    type Observation: PartialEq + Debug;

    /// Produce a state consistent with `observer`'s observation but with
    /// hidden components re-sampled. One copy call.
    fn determinize(
        &self,
        state: &Self::State,
        observer: PlayerId,
        rng: &mut SearchRng,
    ) -> Self::State;

    /// The portion of `state` visible to `observer`.
    fn observation(&self, state: &Self::State, observer: PlayerId) -> Self::Observation;

    /// The components hidden from `observer`, in positional order, encoded
    /// as comparable values. Sorting this yields the hidden multiset.
    fn hidden_fingerprint(&self, state: &Self::State, observer: PlayerId) -> Vec<u64>;
}
