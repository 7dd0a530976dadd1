//! Search budgets and per-decision budget tracking.
//!
//! Every decision call owns exactly one [`BudgetTracker`], created fresh
//! for that call and never shared. Agents record iterations, forward-model
//! calls, and state copies through it, and query [`BudgetTracker::
//! may_continue`] at each iteration boundary. The tracker is a one-way
//! state machine: once it reports exhaustion it stays exhausted.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// The resource a budget is denominated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetKind {
    /// Wall-clock milliseconds.
    Time,
    /// Search loop iterations (generations, climb steps).
    Iterations,
    /// Calls to `ForwardModel::apply`.
    ForwardModelCalls,
    /// State copies (clones and determinizations).
    CopyCalls,
    /// Combined forward-model and copy calls.
    ForwardModelAndCopyCalls,
}

/// A resource limit bounding one search invocation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// What the limit counts.
    pub kind: BudgetKind,

    /// The numeric limit (milliseconds for `Time`, a count otherwise).
    pub limit: u64,

    /// For `Time` only: stop once remaining time drops to this margin, so
    /// the best action can still be read out and returned.
    pub break_margin_ms: u64,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            kind: BudgetKind::ForwardModelCalls,
            limit: 4000,
            break_margin_ms: 10,
        }
    }
}

impl Budget {
    /// Wall-clock budget in milliseconds, with the default break margin.
    #[must_use]
    pub fn time_ms(limit: u64) -> Self {
        Self {
            kind: BudgetKind::Time,
            limit,
            ..Self::default()
        }
    }

    /// Iteration-count budget.
    #[must_use]
    pub fn iterations(limit: u64) -> Self {
        Self {
            kind: BudgetKind::Iterations,
            limit,
            ..Self::default()
        }
    }

    /// Forward-model-call budget.
    #[must_use]
    pub fn fm_calls(limit: u64) -> Self {
        Self {
            kind: BudgetKind::ForwardModelCalls,
            limit,
            ..Self::default()
        }
    }

    /// State-copy budget.
    #[must_use]
    pub fn copy_calls(limit: u64) -> Self {
        Self {
            kind: BudgetKind::CopyCalls,
            limit,
            ..Self::default()
        }
    }

    /// Combined forward-model and copy budget.
    #[must_use]
    pub fn fm_and_copy_calls(limit: u64) -> Self {
        Self {
            kind: BudgetKind::ForwardModelAndCopyCalls,
            limit,
            ..Self::default()
        }
    }

    /// Override the break margin (Time budgets only).
    #[must_use]
    pub fn with_break_margin_ms(mut self, margin: u64) -> Self {
        self.break_margin_ms = margin;
        self
    }
}

/// Per-decision budget accounting.
///
/// Tracks elapsed time, iterations, forward-model calls, and copy calls,
/// and decides when a search loop must stop. For the `Time` kind the
/// tracker stops while there is still headroom: once remaining time drops
/// below the break margin or below the running average cost of one
/// iteration, whichever is larger.
#[derive(Debug)]
pub struct BudgetTracker {
    budget: Budget,
    started: Instant,
    iterations: u64,
    fm_calls: u64,
    copy_calls: u64,
    acc_iteration_ms: f64,
    exhausted: bool,
}

impl BudgetTracker {
    /// Start tracking against `budget`. The clock starts now.
    #[must_use]
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            started: Instant::now(),
            iterations: 0,
            fm_calls: 0,
            copy_calls: 0,
            acc_iteration_ms: 0.0,
            exhausted: false,
        }
    }

    /// Record one forward-model call.
    pub fn note_fm_call(&mut self) {
        self.fm_calls += 1;
    }

    /// Record one state copy.
    pub fn note_copy(&mut self) {
        self.copy_calls += 1;
    }

    /// Record `n` state copies at once.
    pub fn note_copies(&mut self, n: u64) {
        self.copy_calls += n;
    }

    /// Record the completion of one search iteration.
    pub fn complete_iteration(&mut self) {
        self.iterations += 1;
        self.acc_iteration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
    }

    /// Whether another iteration may start.
    ///
    /// Latches: after the first `false`, every later call returns `false`.
    pub fn may_continue(&mut self) -> bool {
        if self.exhausted {
            return false;
        }

        let ok = match self.budget.kind {
            BudgetKind::Time => {
                let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
                let remaining = self.budget.limit as f64 - elapsed_ms;
                let avg_iteration_ms = if self.iterations == 0 {
                    0.0
                } else {
                    self.acc_iteration_ms / self.iterations as f64
                };
                remaining > self.budget.break_margin_ms as f64 && remaining > avg_iteration_ms
            }
            BudgetKind::Iterations => self.iterations < self.budget.limit,
            BudgetKind::ForwardModelCalls => self.fm_calls < self.budget.limit,
            BudgetKind::CopyCalls => self.copy_calls < self.budget.limit,
            BudgetKind::ForwardModelAndCopyCalls => {
                self.fm_calls + self.copy_calls < self.budget.limit
            }
        };

        if !ok {
            self.exhausted = true;
        }
        ok
    }

    /// Whether the tracker has latched into the exhausted state.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Iterations completed so far.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Forward-model calls recorded so far.
    #[must_use]
    pub fn fm_calls(&self) -> u64 {
        self.fm_calls
    }

    /// State copies recorded so far.
    #[must_use]
    pub fn copy_calls(&self) -> u64 {
        self.copy_calls
    }

    /// Microseconds elapsed since tracking started.
    #[must_use]
    pub fn elapsed_us(&self) -> u64 {
        self.started.elapsed().as_micros() as u64
    }
}
