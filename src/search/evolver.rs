//! The evolutionary rollout engine: rolling-horizon evolution of action
//! plans under a resource budget.
//!
//! Each decision evolves a population of [`Genome`]s: elites survive
//! unchanged, children are recombined from selected parents, and the whole
//! working set is mutated before truncation back to the population size.
//! The mutation pass covers the full working set, not only the new
//! children; the elite copies made at the start of each generation are the
//! only individuals exempt for that generation.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::budget::{Budget, BudgetTracker};
use crate::core::{PlayerId, SearchRng};
use crate::search::{
    ActionValueMemory, Agent, DecisionStats, FitnessKind, Genome, RolloutCtx, SearchError,
};
use crate::sim::{Determinizable, ForwardModel};

/// Parent selection scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionKind {
    /// Draw `tournament_size` individuals uniformly with replacement and
    /// keep the fittest.
    Tournament,
    /// Weight selection probability inversely by sort position, rank 1
    /// most likely.
    Rank,
}

/// Recombination scheme for producing children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossoverKind {
    /// Child is the first parent verbatim.
    None,
    /// Each gene position is copied from either parent with equal
    /// probability.
    Uniform,
    /// A contiguous suffix of length `min(len1, len2) / 2` is copied
    /// wholesale from the second parent.
    OnePoint,
    /// Both a prefix and a suffix, each of length `min(len1, len2) / 3`,
    /// are copied from the second parent; the middle stays.
    TwoPoint,
}

/// Configuration for the evolutionary rollout engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvolverConfig {
    /// Number of future decision steps each plan covers.
    pub horizon: usize,

    /// Discount factor for per-step heuristic gains, also used to decay
    /// the action-value memory between decisions.
    pub discount: f64,

    /// Plans kept between generations.
    pub population_size: usize,

    /// Fittest plans copied unchanged into the next generation.
    pub elite_count: usize,

    /// Children recombined per generation.
    pub child_count: usize,

    /// Gene positions mutated per plan per generation.
    pub mutation_count: usize,

    /// Parent selection scheme.
    pub selection: SelectionKind,

    /// Tournament size for `SelectionKind::Tournament`.
    pub tournament_size: usize,

    /// Recombination scheme.
    pub crossover: CrossoverKind,

    /// Carry the previous decision's population over, dropping the
    /// executed gene and re-rolling against the new current state.
    pub shift_left: bool,

    /// Bias rollout action choice with the action-value memory instead of
    /// uniform randomness.
    pub use_memory: bool,

    /// Which evaluator drives rollout fitness.
    pub fitness: FitnessKind,

    /// Resource budget per decision.
    pub budget: Budget,

    /// Seed for the decision generator.
    pub seed: u64,
}

impl Default for EvolverConfig {
    fn default() -> Self {
        Self {
            horizon: 10,
            discount: 0.9,
            population_size: 10,
            elite_count: 2,
            child_count: 10,
            mutation_count: 1,
            selection: SelectionKind::Tournament,
            tournament_size: 4,
            crossover: CrossoverKind::Uniform,
            shift_left: false,
            use_memory: false,
            fitness: FitnessKind::DiscountedDelta,
            budget: Budget::default(),
            seed: 42,
        }
    }
}

impl EvolverConfig {
    /// Set the planning horizon.
    #[must_use]
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the discount factor.
    #[must_use]
    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    /// Set the population size.
    #[must_use]
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Set the elite count.
    #[must_use]
    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count;
        self
    }

    /// Set the child count.
    #[must_use]
    pub fn with_child_count(mut self, count: usize) -> Self {
        self.child_count = count;
        self
    }

    /// Set the per-plan mutation count.
    #[must_use]
    pub fn with_mutation_count(mut self, count: usize) -> Self {
        self.mutation_count = count;
        self
    }

    /// Set the selection scheme.
    #[must_use]
    pub fn with_selection(mut self, selection: SelectionKind) -> Self {
        self.selection = selection;
        self
    }

    /// Set the tournament size.
    #[must_use]
    pub fn with_tournament_size(mut self, size: usize) -> Self {
        self.tournament_size = size;
        self
    }

    /// Set the crossover scheme.
    #[must_use]
    pub fn with_crossover(mut self, crossover: CrossoverKind) -> Self {
        self.crossover = crossover;
        self
    }

    /// Enable or disable shift-left population reuse.
    #[must_use]
    pub fn with_shift_left(mut self, enabled: bool) -> Self {
        self.shift_left = enabled;
        self
    }

    /// Enable or disable the action-value memory rollout bias.
    #[must_use]
    pub fn with_memory(mut self, enabled: bool) -> Self {
        self.use_memory = enabled;
        self
    }

    /// Set which evaluator drives rollout fitness.
    #[must_use]
    pub fn with_fitness(mut self, fitness: FitnessKind) -> Self {
        self.fitness = fitness;
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

/// Rolling-horizon evolutionary agent.
///
/// Owns the forward model, its configuration, the decision generator, the
/// action-value memory (persisted across decisions), and the population
/// (persisted only when shift-left is enabled).
pub struct RolloutEvolver<M: ForwardModel> {
    model: M,
    config: EvolverConfig,
    rng: SearchRng,
    memory: ActionValueMemory<M::Action>,
    population: Vec<Genome<M>>,
    stats: DecisionStats,
}

impl<M: ForwardModel> RolloutEvolver<M> {
    /// Create a new evolver around `model`.
    pub fn new(model: M, config: EvolverConfig) -> Self {
        let player_count = model.player_count();
        let rng = SearchRng::new(config.seed);
        let memory = ActionValueMemory::new(player_count, config.discount);

        Self {
            model,
            config,
            rng,
            memory,
            population: Vec::new(),
            stats: DecisionStats::default(),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &EvolverConfig {
        &self.config
    }

    /// Get the forward model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get the action-value memory.
    #[must_use]
    pub fn memory(&self) -> &ActionValueMemory<M::Action> {
        &self.memory
    }

    /// The population left by the most recent decision, best first.
    #[must_use]
    pub fn population(&self) -> &[Genome<M>] {
        &self.population
    }

    fn decide_with_reanchor(
        &mut self,
        state: &M::State,
        player: PlayerId,
        legal: &[M::Action],
        reanchor: &dyn Fn(&M, &M::State, &mut SearchRng) -> M::State,
    ) -> Result<M::Action, SearchError> {
        if legal.is_empty() {
            return Err(SearchError::NoLegalActions { player });
        }
        assert!(self.config.horizon > 0, "horizon must be at least 1");
        assert!(
            self.config.population_size > 0,
            "population size must be at least 1"
        );

        self.stats.reset();
        self.memory.decay();

        let mut tracker = BudgetTracker::new(self.config.budget);
        let config = self.config.clone();
        let model = &self.model;
        let population = &mut self.population;
        let memory = config.use_memory.then_some(&mut self.memory);

        let mut ctx = RolloutCtx {
            rng: &mut self.rng,
            budget: &mut tracker,
            memory,
            repairs: 0,
        };

        let reuse = config.shift_left && !population.is_empty();
        if reuse {
            // Hidden information may have changed since the last decision:
            // every carried-over plan is re-anchored on a fresh copy of
            // the true current state and re-rolled from the start.
            for genome in population.iter_mut() {
                genome.shift_left();
                let root = reanchor(model, state, ctx.rng);
                ctx.budget.note_copy();
                genome.reanchor(root);
                genome.rollout_from(model, 0, player, config.fitness, &mut ctx);
            }
        } else {
            population.clear();
            for _ in 0..config.population_size {
                population.push(Genome::new_rolled(
                    model,
                    state,
                    player,
                    config.horizon,
                    config.discount,
                    config.fitness,
                    &mut ctx,
                ));
            }
        }

        while ctx.budget.may_continue() {
            run_generation(model, &config, player, population, &mut ctx);
            ctx.budget.complete_iteration();
            debug!(
                "generation {}: best fitness {:.4}",
                ctx.budget.iterations(),
                population[0].fitness()
            );
        }

        sort_by_fitness(population);

        let repairs = ctx.repairs;
        let choice = population[0].first_action().cloned();

        self.stats.absorb(&tracker);
        self.stats.repairs = repairs;

        choice.ok_or(SearchError::NoLegalActions { player })
    }
}

impl<M: Determinizable> RolloutEvolver<M> {
    /// Decide under hidden information: shift-left re-anchoring samples a
    /// fresh redeterminization of the current state per carried-over plan.
    pub fn decide_determinized(
        &mut self,
        state: &M::State,
        player: PlayerId,
        legal: &[M::Action],
    ) -> Result<M::Action, SearchError> {
        self.decide_with_reanchor(state, player, legal, &|model, s, rng| {
            model.determinize(s, player, rng)
        })
    }
}

impl<M: ForwardModel + Clone> Agent<M> for RolloutEvolver<M> {
    fn decide(
        &mut self,
        state: &M::State,
        player: PlayerId,
        legal: &[M::Action],
    ) -> Result<M::Action, SearchError> {
        self.decide_with_reanchor(state, player, legal, &|_, s, _| s.clone())
    }

    fn fork(&mut self) -> Self {
        let player_count = self.model.player_count();
        Self {
            model: self.model.clone(),
            config: self.config.clone(),
            rng: self.rng.fork(),
            memory: ActionValueMemory::new(player_count, self.config.discount),
            population: Vec::new(),
            stats: DecisionStats::default(),
        }
    }

    fn stats(&self) -> &DecisionStats {
        &self.stats
    }
}

/// One generation: elitism, recombination, whole-population mutation,
/// truncation.
fn run_generation<M: ForwardModel>(
    model: &M,
    config: &EvolverConfig,
    player: PlayerId,
    population: &mut Vec<Genome<M>>,
    ctx: &mut RolloutCtx<'_, M::Action>,
) {
    sort_by_fitness(population);

    let elite_count = config
        .elite_count
        .min(config.population_size)
        .min(population.len());

    let mut next: Vec<Genome<M>> = Vec::with_capacity(config.population_size);
    for genome in population.iter().take(elite_count) {
        next.push(genome.duplicate(ctx));
    }

    // Children join the working set as they are produced, so later
    // selections may pick earlier children.
    for _ in 0..config.child_count {
        let first = select_parent_index(population, config, ctx.rng);
        let second = select_parent_index(population, config, ctx.rng);
        let child = crossover(model, config, player, first, second, population, ctx);
        population.push(child);
    }

    // The whole working set is mutated; only this generation's elite
    // copies are exempt.
    for genome in population.iter_mut() {
        genome.mutate(model, player, config.mutation_count, config.fitness, ctx);
    }

    sort_by_fitness(population);

    let survivors = config.population_size.saturating_sub(elite_count);
    next.extend(population.drain(..).take(survivors));

    *population = next;
    sort_by_fitness(population);
}

fn sort_by_fitness<M: ForwardModel>(population: &mut [Genome<M>]) {
    population.sort_by(|a, b| {
        b.fitness()
            .partial_cmp(&a.fitness())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn select_parent_index<M: ForwardModel>(
    population: &[Genome<M>],
    config: &EvolverConfig,
    rng: &mut SearchRng,
) -> usize {
    match config.selection {
        SelectionKind::Tournament => {
            let rounds = config.tournament_size.max(1);
            let mut best = rng.gen_range_usize(0..population.len());
            for _ in 1..rounds {
                let challenger = rng.gen_range_usize(0..population.len());
                if population[challenger].fitness() > population[best].fitness() {
                    best = challenger;
                }
            }
            best
        }
        SelectionKind::Rank => {
            // Rank over an index permutation; the working set itself is
            // not reordered between the two parent draws.
            let mut order: Vec<usize> = (0..population.len()).collect();
            order.sort_by(|&a, &b| {
                population[b]
                    .fitness()
                    .partial_cmp(&population[a].fitness())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let n = order.len();
            let weights: Vec<f64> = (0..n).map(|i| (n - i) as f64).collect();
            let pick = rng.choose_weighted(&weights).unwrap_or(0);
            order[pick]
        }
    }
}

/// Recombine two parents into a child whose trajectory invariant is
/// restored by re-rolling from the first position the gene mix disturbs.
fn crossover<M: ForwardModel>(
    model: &M,
    config: &EvolverConfig,
    player: PlayerId,
    first: usize,
    second: usize,
    population: &[Genome<M>],
    ctx: &mut RolloutCtx<'_, M::Action>,
) -> Genome<M> {
    let p1 = &population[first];
    let p2 = &population[second];
    let l1 = p1.len();
    let l2 = p2.len();
    let min_len = l1.min(l2);

    match config.crossover {
        CrossoverKind::None => p1.duplicate(ctx),
        CrossoverKind::Uniform => {
            let mut child = p1.duplicate(ctx);
            let mut seam = None;
            for i in 0..min_len {
                if ctx.rng.gen_bool(0.5) {
                    child.actions[i] = p2.actions[i].clone();
                    if seam.is_none() {
                        seam = Some(i);
                    }
                }
            }
            if let Some(seam) = seam {
                child.states.truncate(seam + 1);
                child.rollout_from(model, seam, player, config.fitness, ctx);
            }
            child
        }
        CrossoverKind::OnePoint => {
            let tail = min_len / 2;
            if tail == 0 {
                return p1.duplicate(ctx);
            }
            let mut child = p1.duplicate(ctx);
            let seam = l1 - tail;
            for i in 0..tail {
                child.actions[seam + i] = p2.actions[l2 - tail + i].clone();
            }
            child.states.truncate(seam + 1);
            child.rollout_from(model, seam, player, config.fitness, ctx);
            child
        }
        CrossoverKind::TwoPoint => {
            let cut = min_len / 3;
            if cut == 0 {
                return p1.duplicate(ctx);
            }
            let mut child = p1.duplicate(ctx);
            for i in 0..cut {
                child.actions[i] = p2.actions[i].clone();
                child.actions[l1 - cut + i] = p2.actions[l2 - cut + i].clone();
            }
            // The opening segment's states come from the second parent,
            // matching its genes; everything after the seam is re-rolled.
            child.states.clear();
            child.states.extend(p2.states[..=cut].iter().cloned());
            ctx.budget.note_copies(cut as u64 + 1);
            child.rollout_from(model, cut, player, config.fitness, ctx);
            child
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single-player accumulation game: add 0, 1, or 2 to a total each
    /// turn for a fixed number of turns. Always adding 2 is optimal, so a
    /// working optimizer must open with Add(2).
    #[derive(Clone)]
    struct Accumulate {
        turns: u32,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct AccState {
        total: i64,
        turn: u32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    struct Add(i64);

    impl ForwardModel for Accumulate {
        type State = AccState;
        type Action = Add;

        fn player_count(&self) -> usize {
            1
        }

        fn legal_actions(&self, state: &AccState) -> Vec<Add> {
            if self.is_terminal(state) {
                vec![]
            } else {
                vec![Add(0), Add(1), Add(2)]
            }
        }

        fn apply(&self, state: &mut AccState, action: &Add) {
            state.total += action.0;
            state.turn += 1;
        }

        fn is_terminal(&self, state: &AccState) -> bool {
            state.turn >= self.turns
        }

        fn current_player(&self, _state: &AccState) -> PlayerId {
            PlayerId::new(0)
        }

        fn score(&self, state: &AccState, _player: PlayerId) -> f64 {
            state.total as f64
        }
    }

    fn root() -> AccState {
        AccState { total: 0, turn: 0 }
    }

    #[test]
    fn test_evolver_finds_greedy_opening() {
        let model = Accumulate { turns: 4 };
        let config = EvolverConfig::default()
            .with_horizon(4)
            .with_discount(1.0)
            .with_budget(Budget::iterations(50))
            .with_seed(9);
        let mut evolver = RolloutEvolver::new(model.clone(), config);

        let state = root();
        let legal = model.legal_actions(&state);
        let action = evolver.decide(&state, PlayerId::new(0), &legal).unwrap();

        assert_eq!(action, Add(2));
    }

    #[test]
    fn test_iteration_budget_runs_exact_generations() {
        let model = Accumulate { turns: 4 };
        let config = EvolverConfig::default()
            .with_horizon(4)
            .with_budget(Budget::iterations(7));
        let mut evolver = RolloutEvolver::new(model.clone(), config);

        let state = root();
        let legal = model.legal_actions(&state);
        evolver.decide(&state, PlayerId::new(0), &legal).unwrap();

        assert_eq!(evolver.stats().iterations, 7);
    }

    #[test]
    fn test_no_legal_actions_is_fatal() {
        let model = Accumulate { turns: 4 };
        let mut evolver = RolloutEvolver::new(model, EvolverConfig::default());

        let err = evolver.decide(&root(), PlayerId::new(0), &[]).unwrap_err();
        assert!(matches!(err, SearchError::NoLegalActions { .. }));
    }

    #[test]
    fn test_same_seed_same_decision() {
        let model = Accumulate { turns: 6 };
        let config = EvolverConfig::default()
            .with_horizon(6)
            .with_budget(Budget::iterations(10))
            .with_seed(1234);

        let state = root();
        let legal = model.legal_actions(&state);

        let mut first = RolloutEvolver::new(model.clone(), config.clone());
        let mut second = RolloutEvolver::new(model.clone(), config);

        let a = first.decide(&state, PlayerId::new(0), &legal).unwrap();
        let b = second.decide(&state, PlayerId::new(0), &legal).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_fork_diverges_from_parent() {
        let model = Accumulate { turns: 6 };
        let config = EvolverConfig::default()
            .with_horizon(6)
            .with_budget(Budget::iterations(5));
        let mut parent = RolloutEvolver::new(model, config);
        let fork = parent.fork();

        assert_ne!(parent.rng.seed(), fork.rng.seed());
        assert!(fork.population().is_empty());
    }

    #[test]
    fn test_shift_left_carries_population() {
        let model = Accumulate { turns: 8 };
        let config = EvolverConfig::default()
            .with_horizon(4)
            .with_shift_left(true)
            .with_budget(Budget::iterations(5));
        let mut evolver = RolloutEvolver::new(model.clone(), config);

        let mut state = root();
        let legal = model.legal_actions(&state);
        let action = evolver.decide(&state, PlayerId::new(0), &legal).unwrap();
        assert!(!evolver.population().is_empty());

        model.apply(&mut state, &action);
        let legal = model.legal_actions(&state);
        let action = evolver.decide(&state, PlayerId::new(0), &legal).unwrap();

        // The carried-over population was re-anchored on the new state.
        assert!(legal.contains(&action));
        for genome in evolver.population() {
            assert_eq!(genome.states()[0], state);
        }
    }

    #[test]
    fn test_memory_populated_when_enabled() {
        let model = Accumulate { turns: 4 };
        let config = EvolverConfig::default()
            .with_horizon(4)
            .with_memory(true)
            .with_budget(Budget::iterations(5));
        let mut evolver = RolloutEvolver::new(model.clone(), config);

        let state = root();
        let legal = model.legal_actions(&state);
        evolver.decide(&state, PlayerId::new(0), &legal).unwrap();

        assert!(!evolver.memory().is_empty(PlayerId::new(0)));
    }

    #[test]
    fn test_all_crossover_kinds_produce_decisions() {
        for crossover in [
            CrossoverKind::None,
            CrossoverKind::Uniform,
            CrossoverKind::OnePoint,
            CrossoverKind::TwoPoint,
        ] {
            let model = Accumulate { turns: 6 };
            let config = EvolverConfig::default()
                .with_horizon(6)
                .with_crossover(crossover)
                .with_budget(Budget::iterations(10));
            let mut evolver = RolloutEvolver::new(model.clone(), config);

            let state = root();
            let legal = model.legal_actions(&state);
            let action = evolver.decide(&state, PlayerId::new(0), &legal).unwrap();
            assert!(legal.contains(&action), "{crossover:?}");
        }
    }

    #[test]
    fn test_rank_selection_produces_decisions() {
        let model = Accumulate { turns: 6 };
        let config = EvolverConfig::default()
            .with_horizon(6)
            .with_selection(SelectionKind::Rank)
            .with_budget(Budget::iterations(10));
        let mut evolver = RolloutEvolver::new(model.clone(), config);

        let state = root();
        let legal = model.legal_actions(&state);
        let action = evolver.decide(&state, PlayerId::new(0), &legal).unwrap();
        assert!(legal.contains(&action));
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = EvolverConfig::default()
            .with_horizon(5)
            .with_crossover(CrossoverKind::TwoPoint)
            .with_selection(SelectionKind::Rank)
            .with_seed(77);

        let json = serde_json::to_string(&config).unwrap();
        let back: EvolverConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.horizon, 5);
        assert_eq!(back.crossover, CrossoverKind::TwoPoint);
        assert_eq!(back.selection, SelectionKind::Rank);
        assert_eq!(back.seed, 77);
    }
}
