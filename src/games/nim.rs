//! Subtraction game: remove 1 to `max_take` objects, last to move wins.
//!
//! Fully deterministic and perfectly informed, which makes it the
//! reference game for end-to-end agent tests: positions where the pile is
//! a multiple of `max_take + 1` are lost for the player to move, so a
//! correct searcher facing any other count moves to the nearest such
//! multiple.

use crate::core::PlayerId;
use crate::sim::ForwardModel;

/// Remove this many objects from the pile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Take(pub u32);

/// Pile state and turn order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NimState {
    /// Objects left in the pile.
    pub remaining: u32,
    /// Player to move.
    pub to_move: PlayerId,
    /// Winner, once the pile is empty.
    pub winner: Option<PlayerId>,
}

/// The subtraction game rules.
#[derive(Clone, Debug)]
pub struct Nim {
    players: u8,
    start: u32,
    max_take: u32,
}

impl Nim {
    /// Two-player game starting at `start` objects, removing 1-3 per turn.
    #[must_use]
    pub fn new(start: u32) -> Self {
        Self {
            players: 2,
            start,
            max_take: 3,
        }
    }

    /// Single-player variant: no opposing turns, useful for exercising
    /// trajectories where every decision point belongs to one player.
    #[must_use]
    pub fn solitaire(start: u32) -> Self {
        Self {
            players: 1,
            start,
            max_take: 3,
        }
    }

    /// Override the per-turn removal cap.
    #[must_use]
    pub fn with_max_take(mut self, max_take: u32) -> Self {
        assert!(max_take >= 1, "must be able to remove at least one object");
        self.max_take = max_take;
        self
    }

    /// The initial state, first player to move.
    #[must_use]
    pub fn initial_state(&self) -> NimState {
        NimState {
            remaining: self.start,
            to_move: PlayerId::new(0),
            winner: None,
        }
    }

    fn next_player(&self, player: PlayerId) -> PlayerId {
        PlayerId::new((player.0 + 1) % self.players)
    }
}

impl ForwardModel for Nim {
    type State = NimState;
    type Action = Take;

    fn player_count(&self) -> usize {
        self.players as usize
    }

    fn legal_actions(&self, state: &NimState) -> Vec<Take> {
        if self.is_terminal(state) {
            return vec![];
        }
        (1..=self.max_take.min(state.remaining)).map(Take).collect()
    }

    fn apply(&self, state: &mut NimState, action: &Take) {
        let take = action.0.min(state.remaining);
        state.remaining -= take;
        if state.remaining == 0 {
            state.winner = Some(state.to_move);
        } else {
            state.to_move = self.next_player(state.to_move);
        }
    }

    fn is_terminal(&self, state: &NimState) -> bool {
        state.winner.is_some()
    }

    fn current_player(&self, state: &NimState) -> PlayerId {
        state.to_move
    }

    /// Game-theoretic value: a pile that is a multiple of `max_take + 1`
    /// is lost for the player to move.
    fn score(&self, state: &NimState, player: PlayerId) -> f64 {
        if let Some(winner) = state.winner {
            return if winner == player { 1.0 } else { -1.0 };
        }
        let mover_loses = state.remaining % (self.max_take + 1) == 0;
        let mover_value = if mover_loses { -1.0 } else { 1.0 };
        if state.to_move == player {
            mover_value
        } else {
            -mover_value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_actions_shrink_near_empty() {
        let game = Nim::new(10);

        let state = NimState {
            remaining: 2,
            to_move: PlayerId::new(0),
            winner: None,
        };
        assert_eq!(game.legal_actions(&state), vec![Take(1), Take(2)]);

        let full = game.initial_state();
        assert_eq!(game.legal_actions(&full), vec![Take(1), Take(2), Take(3)]);
    }

    #[test]
    fn test_last_to_move_wins() {
        let game = Nim::new(3);
        let mut state = game.initial_state();

        game.apply(&mut state, &Take(3));

        assert!(game.is_terminal(&state));
        assert_eq!(state.winner, Some(PlayerId::new(0)));
        assert!(game.legal_actions(&state).is_empty());
    }

    #[test]
    fn test_turns_alternate() {
        let game = Nim::new(10);
        let mut state = game.initial_state();

        game.apply(&mut state, &Take(2));
        assert_eq!(game.current_player(&state), PlayerId::new(1));

        game.apply(&mut state, &Take(1));
        assert_eq!(game.current_player(&state), PlayerId::new(0));
    }

    #[test]
    fn test_score_marks_multiples_of_four_lost() {
        let game = Nim::new(10);
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);

        // 8 left and p0 to move: p0 is losing, p1 winning.
        let state = NimState {
            remaining: 8,
            to_move: p0,
            winner: None,
        };
        assert_eq!(game.score(&state, p0), -1.0);
        assert_eq!(game.score(&state, p1), 1.0);

        // 10 left and p0 to move: p0 is winning.
        let state = NimState {
            remaining: 10,
            to_move: p0,
            winner: None,
        };
        assert_eq!(game.score(&state, p0), 1.0);
    }

    #[test]
    fn test_terminal_score() {
        let game = Nim::new(1);
        let mut state = game.initial_state();
        game.apply(&mut state, &Take(1));

        assert_eq!(game.score(&state, PlayerId::new(0)), 1.0);
        assert_eq!(game.score(&state, PlayerId::new(1)), -1.0);
    }

    #[test]
    fn test_solitaire_has_single_player() {
        let game = Nim::solitaire(10);
        let mut state = game.initial_state();

        game.apply(&mut state, &Take(3));
        assert_eq!(game.current_player(&state), PlayerId::new(0));
        assert_eq!(game.player_count(), 1);
    }
}
