//! Redeterminization conformance checking.
//!
//! Every game that implements [`Determinizable`] must pass this check from
//! its test suite. The check is generic so games cannot drift apart in how
//! strictly they honor the contract: the visible portion must survive
//! byte-for-byte, the hidden multiset must be preserved exactly, and
//! independent samples must actually vary.

use crate::core::{PlayerId, SearchRng};
use crate::sim::Determinizable;

/// Outcome of a conformance run, for reporting in test failures.
#[derive(Debug)]
pub struct ConformanceReport {
    /// Number of determinizations sampled.
    pub samples: usize,
    /// Number of distinct hidden arrangements observed.
    pub distinct_arrangements: usize,
}

/// Verify the redeterminization contract for one state and observer.
///
/// Panics with a descriptive message on any violation:
/// - the observer-visible observation differs from the source,
/// - the hidden component multiset differs from the source,
/// - every sample produced the identical hidden arrangement even though
///   the hidden space admits more than one (requires at least 3 seeds and
///   at least two distinct hidden component values).
///
/// Intended for use inside `#[test]` functions; returns a report on
/// success so tests can assert further if they wish.
pub fn check_determinization<M: Determinizable>(
    model: &M,
    state: &M::State,
    observer: PlayerId,
    seeds: &[u64],
) -> ConformanceReport {
    assert!(!seeds.is_empty(), "conformance check needs at least one seed");

    let source_observation = model.observation(state, observer);
    let source_hidden = model.hidden_fingerprint(state, observer);
    let mut source_multiset = source_hidden.clone();
    source_multiset.sort_unstable();

    let mut arrangements: Vec<Vec<u64>> = Vec::with_capacity(seeds.len());

    for &seed in seeds {
        let mut rng = SearchRng::new(seed);
        let sampled = model.determinize(state, observer, &mut rng);

        let observation = model.observation(&sampled, observer);
        assert!(
            observation == source_observation,
            "determinize changed the portion visible to {observer}: \
             {source_observation:?} became {observation:?}"
        );

        let hidden = model.hidden_fingerprint(&sampled, observer);
        let mut multiset = hidden.clone();
        multiset.sort_unstable();
        assert!(
            multiset == source_multiset,
            "determinize changed the hidden multiset for {observer}: \
             {source_multiset:?} became {multiset:?}"
        );

        if !arrangements.contains(&hidden) {
            arrangements.push(hidden);
        }
    }

    // Only demand variety when the hidden space can vary at all.
    let distinct_values = {
        let mut v = source_multiset.clone();
        v.dedup();
        v.len()
    };
    if seeds.len() >= 3 && distinct_values >= 2 {
        assert!(
            arrangements.len() >= 2,
            "determinize produced the same hidden arrangement for all \
             {} seeds; expected independent samples to vary",
            seeds.len()
        );
    }

    ConformanceReport {
        samples: seeds.len(),
        distinct_arrangements: arrangements.len(),
    }
}
