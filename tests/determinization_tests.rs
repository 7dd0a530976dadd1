//! Redeterminization conformance tests for the hidden-hand card game.

use proptest::prelude::*;

use horizon_search::core::{PlayerId, SearchRng};
use horizon_search::games::blind_war::BlindWarBuilder;
use horizon_search::sim::conformance::check_determinization;
use horizon_search::sim::{Determinizable, ForwardModel};

const SEEDS: &[u64] = &[1, 2, 3, 4, 5, 6, 7, 8];

#[test]
fn test_initial_state_conforms() {
    let (game, state) = BlindWarBuilder::new().build(42);

    for observer in PlayerId::all(2) {
        let report = check_determinization(&game, &state, observer, SEEDS);
        assert!(report.distinct_arrangements >= 2);
    }
}

#[test]
fn test_midgame_state_conforms() {
    let (game, mut state) = BlindWarBuilder::new().build(42);
    let mut rng = SearchRng::new(17);

    // Play a few tricks so captures and draws have happened.
    for _ in 0..6 {
        if game.is_terminal(&state) {
            break;
        }
        let actions = game.legal_actions(&state);
        let choice = *rng.choose(&actions).unwrap();
        game.apply(&mut state, &choice);
    }

    for observer in PlayerId::all(2) {
        check_determinization(&game, &state, observer, SEEDS);
    }
}

#[test]
fn test_mid_trick_state_conforms() {
    let (game, mut state) = BlindWarBuilder::new().build(3);

    // Lead one card so a face-up card is on the table.
    let actions = game.legal_actions(&state);
    game.apply(&mut state, &actions[0]);
    assert!(state.led.is_some());

    for observer in PlayerId::all(2) {
        check_determinization(&game, &state, observer, SEEDS);
    }
}

#[test]
fn test_observer_keeps_own_hand_exactly() {
    let (game, state) = BlindWarBuilder::new().build(42);

    for observer in PlayerId::all(2) {
        for &seed in SEEDS {
            let mut rng = SearchRng::new(seed);
            let sampled = game.determinize(&state, observer, &mut rng);
            assert_eq!(state.hands[observer], sampled.hands[observer]);
        }
    }
}

#[test]
fn test_wrong_observer_disturbs_hidden_hand() {
    // Redeterminizing through player 0's lens treats player 1's hand as
    // hidden, so an agent consulting the wrong lens sees its own cards
    // reshuffled. That mis-identification must be observable.
    let (game, state) = BlindWarBuilder::new().build(42);

    let disturbed = SEEDS.iter().any(|&seed| {
        let mut rng = SearchRng::new(seed);
        let sampled = game.determinize(&state, PlayerId::new(0), &mut rng);
        game.observation(&sampled, PlayerId::new(1))
            != game.observation(&state, PlayerId::new(1))
    });

    assert!(disturbed);
}

proptest! {
    /// The hidden multiset is preserved from any reachable state, for any
    /// observer, under any determinization seed.
    #[test]
    fn prop_hidden_multiset_preserved(
        deal_seed in 0u64..500,
        play_seed in 0u64..500,
        steps in 0usize..8,
        det_seed in 0u64..500,
        observer_index in 0u8..2,
    ) {
        let (game, mut state) = BlindWarBuilder::new().build(deal_seed);
        let mut rng = SearchRng::new(play_seed);

        for _ in 0..steps {
            if game.is_terminal(&state) {
                break;
            }
            let actions = game.legal_actions(&state);
            let choice = *rng.choose(&actions).unwrap();
            game.apply(&mut state, &choice);
        }

        let observer = PlayerId::new(observer_index);
        let mut det_rng = SearchRng::new(det_seed);
        let sampled = game.determinize(&state, observer, &mut det_rng);

        let mut before = game.hidden_fingerprint(&state, observer);
        let mut after = game.hidden_fingerprint(&sampled, observer);
        before.sort_unstable();
        after.sort_unstable();
        prop_assert_eq!(before, after);

        prop_assert_eq!(
            game.observation(&state, observer),
            game.observation(&sampled, observer)
        );
    }
}
