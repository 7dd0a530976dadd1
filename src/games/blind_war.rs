//! Two-player trick-taking card game with hidden hands and a face-down
//! deck.
//!
//! The leader plays a card face up, the follower answers, and the higher
//! rank captures both (leader wins ties). The trick winner draws from the
//! deck and leads next. Hands and the deck are hidden from the opponent,
//! which makes this the reference game for the redeterminization contract:
//! a redeterminized copy keeps everything the observer can see and
//! reshuffles exactly the cards they cannot.
//!
//! Piles are `im::Vector`s so rollout-heavy search can clone states
//! cheaply.

use im::Vector;

use crate::core::{PlayerId, PlayerMap, SearchRng};
use crate::sim::{Determinizable, ForwardModel};

/// A playing card, identified by rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card(pub u8);

/// Play a card from hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Play(pub Card);

/// Full game state, including components hidden from each player.
#[derive(Clone, Debug, PartialEq)]
pub struct BlindWarState {
    /// Face-down draw pile, top at the front.
    pub deck: Vector<Card>,
    /// Each player's hand, visible only to its owner.
    pub hands: PlayerMap<Vector<Card>>,
    /// Cards captured by each player, face up.
    pub captured: PlayerMap<Vector<Card>>,
    /// The card led into the current trick, if any.
    pub led: Option<Card>,
    /// Player to move.
    pub to_move: PlayerId,
}

/// What one player can see of a [`BlindWarState`].
#[derive(Debug, PartialEq)]
pub struct BlindWarObservation {
    own_hand: Vec<Card>,
    captured: Vec<Vec<Card>>,
    led: Option<Card>,
    to_move: PlayerId,
    hand_sizes: Vec<usize>,
    deck_size: usize,
}

/// The game rules.
#[derive(Clone, Debug)]
pub struct BlindWar;

/// Builder for a game and its dealt initial state.
pub struct BlindWarBuilder {
    ranks: u8,
    copies: u8,
    hand_size: usize,
}

impl Default for BlindWarBuilder {
    fn default() -> Self {
        Self {
            ranks: 6,
            copies: 2,
            hand_size: 4,
        }
    }
}

impl BlindWarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct ranks in the deck.
    pub fn ranks(mut self, ranks: u8) -> Self {
        assert!(ranks >= 1);
        self.ranks = ranks;
        self
    }

    /// Copies of each rank in the deck.
    pub fn copies(mut self, copies: u8) -> Self {
        assert!(copies >= 1);
        self.copies = copies;
        self
    }

    /// Cards dealt to each hand.
    pub fn hand_size(mut self, size: usize) -> Self {
        self.hand_size = size;
        self
    }

    /// Shuffle with `seed`, deal, and return the game with its state.
    pub fn build(self, seed: u64) -> (BlindWar, BlindWarState) {
        let deck_size = self.ranks as usize * self.copies as usize;
        assert!(
            deck_size >= 2 * self.hand_size,
            "deck must cover both starting hands"
        );

        let mut cards: Vec<Card> = (1..=self.ranks)
            .flat_map(|rank| std::iter::repeat(Card(rank)).take(self.copies as usize))
            .collect();
        let mut rng = SearchRng::new(seed);
        rng.shuffle(&mut cards);

        let mut hands = PlayerMap::with_value(2, Vector::new());
        for player in PlayerId::all(2) {
            for _ in 0..self.hand_size {
                hands[player].push_back(cards.pop().expect("deal checked above"));
            }
        }

        let state = BlindWarState {
            deck: cards.into_iter().collect(),
            hands,
            captured: PlayerMap::with_value(2, Vector::new()),
            led: None,
            to_move: PlayerId::new(0),
        };

        (BlindWar, state)
    }
}

impl BlindWar {
    fn other(player: PlayerId) -> PlayerId {
        PlayerId::new(1 - player.0)
    }

    fn remove_from_hand(state: &mut BlindWarState, player: PlayerId, card: Card) {
        let position = state.hands[player].iter().position(|c| *c == card);
        debug_assert!(position.is_some(), "played card must be in hand");
        if let Some(position) = position {
            state.hands[player].remove(position);
        }
    }

    /// Sum of captured ranks for one player.
    #[must_use]
    pub fn captured_sum(state: &BlindWarState, player: PlayerId) -> i64 {
        state.captured[player].iter().map(|c| c.0 as i64).sum()
    }
}

impl ForwardModel for BlindWar {
    type State = BlindWarState;
    type Action = Play;

    fn player_count(&self) -> usize {
        2
    }

    fn legal_actions(&self, state: &BlindWarState) -> Vec<Play> {
        if self.is_terminal(state) {
            return vec![];
        }
        let mut cards: Vec<Card> = state.hands[state.to_move].iter().copied().collect();
        cards.sort_unstable();
        cards.dedup();
        cards.into_iter().map(Play).collect()
    }

    fn apply(&self, state: &mut BlindWarState, action: &Play) {
        let player = state.to_move;
        let card = action.0;
        Self::remove_from_hand(state, player, card);

        match state.led {
            None => {
                state.led = Some(card);
                state.to_move = Self::other(player);
            }
            Some(led) => {
                // Follower wins only with a strictly higher rank.
                let leader = Self::other(player);
                let winner = if card > led { player } else { leader };

                state.captured[winner].push_back(led);
                state.captured[winner].push_back(card);
                state.led = None;

                if let Some(drawn) = state.deck.pop_front() {
                    state.hands[winner].push_back(drawn);
                }
                state.to_move = winner;
            }
        }
    }

    fn is_terminal(&self, state: &BlindWarState) -> bool {
        state.led.is_none()
            && PlayerId::all(2).any(|p| state.hands[p].is_empty())
    }

    fn current_player(&self, state: &BlindWarState) -> PlayerId {
        state.to_move
    }

    fn score(&self, state: &BlindWarState, player: PlayerId) -> f64 {
        (Self::captured_sum(state, player) - Self::captured_sum(state, Self::other(player)))
            as f64
    }
}

impl Determinizable for BlindWar {
    type Observation = BlindWarObservation;

    fn determinize(
        &self,
        state: &BlindWarState,
        observer: PlayerId,
        rng: &mut SearchRng,
    ) -> BlindWarState {
        let opponent = Self::other(observer);

        // Everything the observer cannot see goes into one pool.
        let mut pool: Vec<Card> = state.hands[opponent].iter().copied().collect();
        pool.extend(state.deck.iter().copied());
        rng.shuffle(&mut pool);

        let mut sampled = state.clone();
        let opponent_hand_size = state.hands[opponent].len();
        sampled.hands[opponent] = pool.drain(..opponent_hand_size).collect();
        sampled.deck = pool.into_iter().collect();

        sampled
    }

    fn observation(&self, state: &BlindWarState, observer: PlayerId) -> BlindWarObservation {
        BlindWarObservation {
            own_hand: state.hands[observer].iter().copied().collect(),
            captured: PlayerId::all(2)
                .map(|p| state.captured[p].iter().copied().collect())
                .collect(),
            led: state.led,
            to_move: state.to_move,
            hand_sizes: PlayerId::all(2).map(|p| state.hands[p].len()).collect(),
            deck_size: state.deck.len(),
        }
    }

    fn hidden_fingerprint(&self, state: &BlindWarState, observer: PlayerId) -> Vec<u64> {
        let opponent = Self::other(observer);
        state.hands[opponent]
            .iter()
            .chain(state.deck.iter())
            .map(|c| c.0 as u64)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_sizes() {
        let (_, state) = BlindWarBuilder::new().build(42);

        assert_eq!(state.hands[PlayerId::new(0)].len(), 4);
        assert_eq!(state.hands[PlayerId::new(1)].len(), 4);
        assert_eq!(state.deck.len(), 4);
        assert!(state.led.is_none());
    }

    #[test]
    fn test_legal_actions_are_distinct_hand_cards() {
        let (game, state) = BlindWarBuilder::new().build(42);
        let player = state.to_move;

        let actions = game.legal_actions(&state);
        assert!(!actions.is_empty());
        for Play(card) in &actions {
            assert!(state.hands[player].contains(card));
        }

        // No duplicates even when the hand holds duplicate ranks.
        let mut ranks: Vec<u8> = actions.iter().map(|Play(c)| c.0).collect();
        ranks.dedup();
        assert_eq!(ranks.len(), actions.len());
    }

    #[test]
    fn test_trick_resolution_higher_card_captures() {
        let (game, _) = BlindWarBuilder::new().build(42);

        let mut hands = PlayerMap::with_value(2, Vector::new());
        hands[PlayerId::new(0)].push_back(Card(2));
        hands[PlayerId::new(1)].push_back(Card(5));

        let mut state = BlindWarState {
            deck: Vector::new(),
            hands,
            captured: PlayerMap::with_value(2, Vector::new()),
            led: None,
            to_move: PlayerId::new(0),
        };

        game.apply(&mut state, &Play(Card(2)));
        assert_eq!(state.led, Some(Card(2)));
        assert_eq!(state.to_move, PlayerId::new(1));

        game.apply(&mut state, &Play(Card(5)));
        assert!(state.led.is_none());
        assert_eq!(BlindWar::captured_sum(&state, PlayerId::new(1)), 7);
        assert!(game.is_terminal(&state));
        assert_eq!(game.score(&state, PlayerId::new(1)), 7.0);
        assert_eq!(game.score(&state, PlayerId::new(0)), -7.0);
    }

    #[test]
    fn test_leader_wins_ties() {
        let (game, _) = BlindWarBuilder::new().build(42);

        let mut hands = PlayerMap::with_value(2, Vector::new());
        hands[PlayerId::new(0)].push_back(Card(4));
        hands[PlayerId::new(1)].push_back(Card(4));

        let mut state = BlindWarState {
            deck: Vector::new(),
            hands,
            captured: PlayerMap::with_value(2, Vector::new()),
            led: None,
            to_move: PlayerId::new(0),
        };

        game.apply(&mut state, &Play(Card(4)));
        game.apply(&mut state, &Play(Card(4)));

        assert_eq!(BlindWar::captured_sum(&state, PlayerId::new(0)), 8);
        assert_eq!(BlindWar::captured_sum(&state, PlayerId::new(1)), 0);
    }

    #[test]
    fn test_trick_winner_draws_and_leads() {
        let (game, _) = BlindWarBuilder::new().build(42);

        let mut hands = PlayerMap::with_value(2, Vector::new());
        hands[PlayerId::new(0)].push_back(Card(6));
        hands[PlayerId::new(0)].push_back(Card(1));
        hands[PlayerId::new(1)].push_back(Card(3));
        hands[PlayerId::new(1)].push_back(Card(2));

        let mut deck = Vector::new();
        deck.push_back(Card(5));

        let mut state = BlindWarState {
            deck,
            hands,
            captured: PlayerMap::with_value(2, Vector::new()),
            led: None,
            to_move: PlayerId::new(0),
        };

        game.apply(&mut state, &Play(Card(6)));
        game.apply(&mut state, &Play(Card(3)));

        // Player 0 won the trick, drew the 5, and leads again.
        assert_eq!(state.to_move, PlayerId::new(0));
        assert!(state.hands[PlayerId::new(0)].contains(&Card(5)));
        assert!(state.deck.is_empty());
        assert!(!game.is_terminal(&state));
    }

    #[test]
    fn test_game_plays_to_completion() {
        let (game, mut state) = BlindWarBuilder::new().build(7);
        let mut rng = SearchRng::new(11);

        let mut steps = 0;
        while !game.is_terminal(&state) && steps < 200 {
            let actions = game.legal_actions(&state);
            assert!(!actions.is_empty());
            let choice = *rng.choose(&actions).unwrap();
            game.apply(&mut state, &choice);
            steps += 1;
        }

        assert!(game.is_terminal(&state));
        // Cards are conserved across hands, captures, and the deck.
        let total: usize = PlayerId::all(2)
            .map(|p| state.captured[p].len() + state.hands[p].len())
            .sum::<usize>()
            + state.deck.len();
        assert_eq!(total, 12);
    }

    #[test]
    fn test_determinize_keeps_observer_view() {
        let (game, state) = BlindWarBuilder::new().build(42);
        let observer = PlayerId::new(0);
        let mut rng = SearchRng::new(99);

        let sampled = game.determinize(&state, observer, &mut rng);

        assert_eq!(state.hands[observer], sampled.hands[observer]);
        assert_eq!(state.captured, sampled.captured);
        assert_eq!(state.led, sampled.led);
        assert_eq!(state.to_move, sampled.to_move);
        assert_eq!(
            state.hands[PlayerId::new(1)].len(),
            sampled.hands[PlayerId::new(1)].len()
        );
        assert_eq!(state.deck.len(), sampled.deck.len());
    }
}
