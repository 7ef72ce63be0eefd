//! Objective functions and their evaluations
//!
//! The minimizers never differentiate anything themselves. An [`Objective`]
//! hands back the value, the gradient and, when asked for it, the Hessian
//! at a point. Evaluating the same point twice must give the same answer.

use std::cell::Cell;

use ndarray::prelude::*;
use ndarray::NdFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Value, gradient and optional Hessian of an objective at one point
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Evaluation<S> {
    /// $`f(x)`$
    pub value: S,
    /// $`\nabla f(x)`$, same length as $`x`$
    pub gradient: Array1<S>,
    /// $`\nabla^2 f(x)`$, or `None` when it was not computed
    pub hessian: Option<Array2<S>>,
}

impl<S> Evaluation<S> {
    /// An evaluation without second order information
    pub fn first_order(value: S, gradient: Array1<S>) -> Self {
        Evaluation {
            value,
            gradient,
            hessian: None,
        }
    }

    /// An evaluation carrying the Hessian
    pub fn second_order(value: S, gradient: Array1<S>, hessian: Array2<S>) -> Self {
        Evaluation {
            value,
            gradient,
            hessian: Some(hessian),
        }
    }
}

/// A smooth function to be minimized
///
/// Closures of the form `|x: ArrayView1<f64>, hessian_needed: bool| -> Evaluation<f64>`
/// implement this trait, so most callers never implement it by hand.
pub trait Objective<S> {
    /// Evaluate at `x`. The Hessian only has to be returned when `hessian_needed` is set.
    fn evaluate(&self, x: ArrayView1<S>, hessian_needed: bool) -> Evaluation<S>;

    /// Value only, used while backtracking.
    ///
    /// Override this when the value is much cheaper than the gradient.
    fn value(&self, x: ArrayView1<S>) -> S {
        self.evaluate(x, false).value
    }

    /// Length of the points it accepts, if known
    ///
    /// A starting point of another length is rejected before the first evaluation.
    fn dim(&self) -> Option<usize> {
        None
    }
}

impl<S, F> Objective<S> for F
where
    F: Fn(ArrayView1<S>, bool) -> Evaluation<S>,
{
    fn evaluate(&self, x: ArrayView1<S>, hessian_needed: bool) -> Evaluation<S> {
        self(x, hessian_needed)
    }
}

/// Counts every call made to the wrapped objective
pub(crate) struct Counted<'a, F: ?Sized> {
    inner: &'a F,
    calls: Cell<usize>,
}

impl<'a, F: ?Sized> Counted<'a, F> {
    pub(crate) fn new(inner: &'a F) -> Self {
        Counted {
            inner,
            calls: Cell::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl<S, F> Objective<S> for Counted<'_, F>
where
    F: Objective<S> + ?Sized,
{
    fn evaluate(&self, x: ArrayView1<S>, hessian_needed: bool) -> Evaluation<S> {
        self.calls.set(self.calls.get() + 1);
        self.inner.evaluate(x, hessian_needed)
    }

    fn value(&self, x: ArrayView1<S>) -> S {
        self.calls.set(self.calls.get() + 1);
        self.inner.value(x)
    }

    fn dim(&self) -> Option<usize> {
        self.inner.dim()
    }
}

/// Quadratic objective
///
/// ```math
/// f(x) = \frac12 x^T A x - b^T x, \qquad \nabla f(x) = Ax - b, \qquad \nabla^2 f(x) = A
/// ```
///
/// For symmetric positive definite $`A`$ the unique minimizer is $`x^* = A^{-1}b`$.
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct Quadratic<S> {
    A: Array2<S>,
    b: Array1<S>,
}

#[allow(non_snake_case)]
impl<S: NdFloat> Quadratic<S> {
    /// $`\frac12 x^T A x`$, minimized at the origin when `A` is positive definite
    ///
    /// # Panics
    /// if `A` is not square
    pub fn new(A: Array2<S>) -> Self {
        assert!(A.is_square(), "quadratic form must be square");
        let b = Array1::zeros(A.nrows());
        Quadratic { A, b }
    }

    /// Adds the linear term $`-b^T x`$
    ///
    /// # Panics
    /// if `b` does not match the dimension of `A`
    #[must_use]
    pub fn with_linear(self, b: Array1<S>) -> Self {
        assert_eq!(b.len(), self.A.nrows(), "linear term has the wrong length");
        Quadratic { b, ..self }
    }

    /// Diagonal quadratic $`\frac12 \sum_i d_i x_i^2`$
    pub fn diagonal(d: ArrayView1<S>) -> Self {
        Self::new(Array2::from_diag(&d))
    }
}

#[allow(non_snake_case)]
impl<S: NdFloat> Objective<S> for Quadratic<S> {
    fn evaluate(&self, x: ArrayView1<S>, hessian_needed: bool) -> Evaluation<S> {
        let Ax = self.A.dot(&x);
        let two = S::one() + S::one();
        let value = x.dot(&Ax) / two - self.b.dot(&x);
        let gradient = Ax - &self.b;
        Evaluation {
            value,
            gradient,
            hessian: if hessian_needed {
                Some(self.A.clone())
            } else {
                None
            },
        }
    }

    fn value(&self, x: ArrayView1<S>) -> S {
        let two = S::one() + S::one();
        x.dot(&self.A.dot(&x)) / two - self.b.dot(&x)
    }

    fn dim(&self) -> Option<usize> {
        Some(self.b.len())
    }
}
