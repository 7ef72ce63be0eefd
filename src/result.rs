//! Iteration history and the outcome of a run

use std::fmt;
use std::ops::Index;
use std::slice;

use crate::linesearch::LineSearchError;
use ndarray::prelude::*;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Snapshot of one iteration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IterationRecord<S> {
    pub iteration: usize,
    pub location: Array1<S>,
    pub objective_value: S,
}

/// Iterates of a single run, starting with the initial point as iteration 0
///
/// Only the minimizer appends to a history; callers get it read-only.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct History<S> {
    records: Vec<IterationRecord<S>>,
}

impl<S> History<S> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        History {
            records: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, location: Array1<S>, objective_value: S) {
        let iteration = self.records.len();
        self.records.push(IterationRecord {
            iteration,
            location,
            objective_value,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of steps taken, one less than the number of records
    pub fn iterations(&self) -> usize {
        self.records.len().saturating_sub(1)
    }

    pub fn first(&self) -> Option<&IterationRecord<S>> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&IterationRecord<S>> {
        self.records.last()
    }

    pub fn iter(&self) -> slice::Iter<'_, IterationRecord<S>> {
        self.records.iter()
    }

    pub fn records(&self) -> &[IterationRecord<S>] {
        &self.records
    }
}

impl<S: Copy> History<S> {
    /// Objective values in iteration order
    pub fn values(&self) -> Vec<S> {
        self.records.iter().map(|r| r.objective_value).collect()
    }
}

impl<S> Index<usize> for History<S> {
    type Output = IterationRecord<S>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.records[index]
    }
}

impl<'a, S> IntoIterator for &'a History<S> {
    type Item = &'a IterationRecord<S>;
    type IntoIter = slice::Iter<'a, IterationRecord<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// The test that declared convergence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Criterion {
    /// $`\|\nabla f(x)\| \leq`$ `grad_tol`, no step taken
    GradientNorm,
    /// $`\frac12\lambda^2 <`$ `obj_tol` for the Newton direction, no step taken
    NewtonDecrement,
    /// $`|f(x') - f(x)| <`$ `obj_tol`
    ObjectiveChange,
    /// $`\|x' - x\| <`$ `param_tol`
    StepSize,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::GradientNorm => write!(f, "gradient norm below tolerance"),
            Criterion::NewtonDecrement => write!(f, "Newton decrement below tolerance"),
            Criterion::ObjectiveChange => write!(f, "objective change below tolerance"),
            Criterion::StepSize => write!(f, "step size below tolerance"),
        }
    }
}

/// Conditions that end a run early without convergence
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Failure {
    #[error(transparent)]
    LineSearch(#[from] LineSearchError),

    #[error("objective did not return a Hessian at iteration {iteration}")]
    MissingHessian { iteration: usize },

    #[error("objective returned {what} of shape {found:?}, expected {expected:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

/// Why a run stopped
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum StopReason {
    Converged(Criterion),
    /// The iteration budget ran out. Not an error.
    MaxIterations,
    /// The callback asked to stop.
    Cancelled,
    Failed(Failure),
}

impl StopReason {
    pub fn is_converged(&self) -> bool {
        matches!(self, StopReason::Converged(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Converged(criterion) => write!(f, "converged: {}", criterion),
            StopReason::MaxIterations => write!(f, "maximum iterations reached"),
            StopReason::Cancelled => write!(f, "cancelled by callback"),
            StopReason::Failed(failure) => write!(f, "failed: {}", failure),
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct OptimizationResult<S> {
    stop_reason: StopReason,
    history: History<S>,
    evaluations: usize,
    fallbacks: usize,
}

impl<S> OptimizationResult<S> {
    /// # Panics
    /// if `history` is empty, a run always records its starting point
    pub(crate) fn new(
        stop_reason: StopReason,
        history: History<S>,
        evaluations: usize,
        fallbacks: usize,
    ) -> Self {
        assert!(!history.is_empty(), "history must hold the starting point");
        OptimizationResult {
            stop_reason,
            history,
            evaluations,
            fallbacks,
        }
    }

    fn last(&self) -> &IterationRecord<S> {
        &self.history[self.history.len() - 1]
    }

    /// Location of the last record
    pub fn final_location(&self) -> ArrayView1<'_, S> {
        self.last().location.view()
    }

    pub fn converged(&self) -> bool {
        self.stop_reason.is_converged()
    }

    pub fn stop_reason(&self) -> &StopReason {
        &self.stop_reason
    }

    pub fn history(&self) -> &History<S> {
        &self.history
    }

    pub fn into_history(self) -> History<S> {
        self.history
    }

    /// Number of steps taken
    pub fn iterations(&self) -> usize {
        self.history.iterations()
    }

    /// Total calls made to the objective, line search trials included
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Newton iterations that fell back to steepest descent
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }
}

impl<S: Copy> OptimizationResult<S> {
    /// Objective value of the last record
    pub fn final_value(&self) -> S {
        self.last().objective_value
    }
}
