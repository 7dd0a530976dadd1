//! Candidate action plans and their cached simulated trajectories.
//!
//! A [`Genome`] is a fixed-horizon action sequence together with the chain
//! of states it produces when replayed from its root, and a scalar fitness.
//! The trajectory is exclusively owned: no state is ever shared between two
//! genomes or with the real game, which is what makes it safe to mutate
//! rollout copies freely.
//!
//! Replay never fails. A stored action that is no longer legal at its
//! decision point is repaired in place with a policy-chosen legal action;
//! legality is state-dependent, and the same plan may be replayed against
//! different hidden-information guesses.

use log::trace;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::PlayerId;
use crate::search::{rollout_policy_choice, RolloutCtx};
use crate::sim::ForwardModel;

/// How a rollout turns its trajectory into a scalar fitness.
///
/// This is the agents' heuristic-selection knob: `DiscountedDelta` drives
/// fitness through `ForwardModel::heuristic`, `FinalScore` through
/// `ForwardModel::score`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessKind {
    /// Discounted telescoping sum of per-step heuristic gains. Rewards
    /// earlier progress and is less sensitive to rollout-tail noise than
    /// scoring only the final state.
    DiscountedDelta,

    /// The absolute score of the trajectory's final state.
    FinalScore,
}

/// A candidate plan: actions, cached trajectory, fitness.
///
/// Invariants:
/// - `actions.len() == states.len() - 1 <= horizon`
/// - `states[0]` is the root; `states[i + 1]` results from applying
///   `actions[i]` to `states[i]` (plus, in multi-player games, the
///   fast-forward through intervening opponents' decision points)
/// - if `actions.len() < horizon`, the final state is terminal
pub struct Genome<M: ForwardModel> {
    pub(crate) actions: Vec<M::Action>,
    pub(crate) states: Vec<M::State>,
    pub(crate) fitness: f64,
    horizon: usize,
    discount: f64,
}

impl<M: ForwardModel> Genome<M> {
    /// Build a genome rooted at a copy of `root` and roll it out end to
    /// end with policy-chosen actions.
    pub fn new_rolled(
        model: &M,
        root: &M::State,
        player: PlayerId,
        horizon: usize,
        discount: f64,
        kind: FitnessKind,
        ctx: &mut RolloutCtx<'_, M::Action>,
    ) -> Self {
        let mut genome = Self {
            actions: Vec::with_capacity(horizon),
            states: Vec::with_capacity(horizon + 1),
            fitness: 0.0,
            horizon,
            discount,
        };
        genome.states.push(root.clone());
        ctx.budget.note_copy();
        genome.rollout_from(model, 0, player, kind, ctx);
        genome
    }

    /// Deep copy, charging one copy call per cached state.
    pub fn duplicate(&self, ctx: &mut RolloutCtx<'_, M::Action>) -> Self {
        ctx.budget.note_copies(self.states.len() as u64);
        Self {
            actions: self.actions.clone(),
            states: self.states.clone(),
            fitness: self.fitness,
            horizon: self.horizon,
            discount: self.discount,
        }
    }

    /// Number of valid genes (the plan's length, at most the horizon).
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the plan holds no genes (root was terminal).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The planning horizon this genome was built for.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// The plan's fitness from its last rollout.
    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// The planned actions.
    #[must_use]
    pub fn actions(&self) -> &[M::Action] {
        &self.actions
    }

    /// The cached trajectory, root first.
    #[must_use]
    pub fn states(&self) -> &[M::State] {
        &self.states
    }

    /// The first planned action, if any.
    #[must_use]
    pub fn first_action(&self) -> Option<&M::Action> {
        self.actions.first()
    }

    /// Drop the first (already executed) gene, keeping the rest of the
    /// plan. The trajectory becomes stale; callers re-anchor and re-roll.
    pub(crate) fn shift_left(&mut self) {
        if !self.actions.is_empty() {
            self.actions.remove(0);
        }
    }

    /// Replace the trajectory root with `new_root`, discarding all cached
    /// states but keeping the planned genes. Must be followed by
    /// `rollout_from(0, ..)` to restore the invariants.
    pub(crate) fn reanchor(&mut self, new_root: M::State) {
        self.states.clear();
        self.states.push(new_root);
    }

    /// Replay and extend the plan from `start`, reusing the cached states
    /// before it and recomputing everything after.
    ///
    /// Genes from `start` onward are kept where still legal, repaired
    /// where not, and freshly chosen where the plan runs short of the
    /// horizon. After the acting player's move, intervening decision
    /// points of other players are fast-forwarded with policy-chosen
    /// moves, so each stored state is again a decision point for `player`
    /// (or terminal). Fitness is recomputed over the whole trajectory.
    pub fn rollout_from(
        &mut self,
        model: &M,
        start: usize,
        player: PlayerId,
        kind: FitnessKind,
        ctx: &mut RolloutCtx<'_, M::Action>,
    ) {
        debug_assert!(
            start < self.states.len(),
            "rollout start must lie within the cached trajectory"
        );

        let planned: Vec<M::Action> = self.actions.split_off(start);
        self.states.truncate(start + 1);

        let mut fast_forward: SmallVec<[(PlayerId, M::Action); 8]> = SmallVec::new();

        for slot in start..self.horizon {
            let current = self
                .states
                .last()
                .expect("a trajectory always holds its root state");
            if model.is_terminal(current) {
                break;
            }

            let legal = model.legal_actions(current);
            debug_assert!(
                !legal.is_empty(),
                "legal_actions must be non-empty on a non-terminal state"
            );
            if legal.is_empty() {
                break;
            }

            let actor = model.current_player(current);
            let action = match planned.get(slot - start) {
                Some(a) if legal.contains(a) => a.clone(),
                Some(_) => {
                    ctx.repairs += 1;
                    trace!("repairing stale action at slot {slot}");
                    rollout_policy_choice(&legal, actor, ctx)
                }
                None => rollout_policy_choice(&legal, actor, ctx),
            };

            let mut next = current.clone();
            ctx.budget.note_copy();
            model.apply(&mut next, &action);
            ctx.budget.note_fm_call();

            // Fast-forward other players' decision points so the next
            // stored state is ours again.
            while !model.is_terminal(&next) && model.current_player(&next) != player {
                let moves = model.legal_actions(&next);
                if moves.is_empty() {
                    break;
                }
                let mover = model.current_player(&next);
                let reply = rollout_policy_choice(&moves, mover, ctx);
                model.apply(&mut next, &reply);
                ctx.budget.note_fm_call();
                fast_forward.push((mover, reply));
            }

            self.actions.push(action);
            self.states.push(next);
        }

        self.fitness = self.evaluate(model, player, kind);
        debug_assert!(self.fitness.is_finite(), "fitness must be a number");

        if let Some(memory) = ctx.memory.as_deref_mut() {
            for action in &self.actions {
                memory.record(player, action, self.fitness);
            }
            for (mover, reply) in &fast_forward {
                memory.record(*mover, reply, self.fitness);
            }
        }
    }

    /// Mutate `mutation_count` random gene positions with uniformly chosen
    /// legal actions, then re-roll from the earliest mutated position,
    /// reusing the cached prefix.
    pub fn mutate(
        &mut self,
        model: &M,
        player: PlayerId,
        mutation_count: usize,
        kind: FitnessKind,
        ctx: &mut RolloutCtx<'_, M::Action>,
    ) {
        if self.actions.is_empty() {
            return;
        }

        let mut earliest = self.actions.len();
        for _ in 0..mutation_count {
            let position = ctx.rng.gen_range_usize(0..self.actions.len());
            let legal = model.legal_actions(&self.states[position]);
            if legal.is_empty() {
                continue;
            }
            self.actions[position] = legal[ctx.rng.gen_range_usize(0..legal.len())].clone();
            earliest = earliest.min(position);
        }

        if earliest < self.actions.len() {
            self.rollout_from(model, earliest, player, kind, ctx);
        }
    }

    /// Discard the plan from `start` onward and re-roll it with fresh
    /// policy choices.
    pub fn randomize_from(
        &mut self,
        model: &M,
        start: usize,
        player: PlayerId,
        kind: FitnessKind,
        ctx: &mut RolloutCtx<'_, M::Action>,
    ) {
        let start = start.min(self.actions.len());
        self.actions.truncate(start);
        self.states.truncate(start + 1);
        self.rollout_from(model, start, player, kind, ctx);
    }

    fn evaluate(&self, model: &M, player: PlayerId, kind: FitnessKind) -> f64 {
        match kind {
            FitnessKind::DiscountedDelta => {
                let mut previous = model.heuristic(&self.states[0], player);
                let mut delta = 0.0;
                for (i, state) in self.states.iter().skip(1).enumerate() {
                    let h = model.heuristic(state, player);
                    delta += self.discount.powi(i as i32) * (h - previous);
                    previous = h;
                }
                delta
            }
            FitnessKind::FinalScore => {
                let last = self
                    .states
                    .last()
                    .expect("a trajectory always holds its root state");
                model.score(last, player)
            }
        }
    }
}
