//! Backtracking line search
//!
//! Given a point $`x`$, a gradient $`g`$ and a descent direction $`d`$ with
//! $`g^T d < 0`$, find a step length satisfying the Armijo sufficient decrease
//! condition
//! ```math
//! f(x + \alpha d) \leq f(x) + c_1 \alpha g^T d
//! ```
//! by trying $`\alpha = \alpha_0, \rho\alpha_0, \rho^2\alpha_0, \dots`$
//! until it holds or $`\alpha`$ drops below a floor.

use crate::objective::Objective;
use log::trace;
use ndarray::prelude::*;
use ndarray::NdFloat;
use num_traits::ToPrimitive;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters of the backtracking line search
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Backtracking<S> {
    /// Sufficient decrease constant, in (0, 0.5)
    pub c1: S,
    /// Contraction factor, in (0, 1)
    pub rho: S,
    /// First step length tried
    pub alpha0: S,
    /// The search gives up once the step length falls below this
    pub alpha_min: S,
}

impl<S: NdFloat> Default for Backtracking<S> {
    fn default() -> Self {
        Backtracking {
            c1: S::from(1e-4).unwrap(),
            rho: S::from(0.5).unwrap(),
            alpha0: S::one(),
            alpha_min: S::from(1e-10).unwrap(),
        }
    }
}

impl<S> Backtracking<S> {
    #[must_use]
    pub fn with_c1(self, c1: S) -> Self {
        Self { c1, ..self }
    }

    #[must_use]
    pub fn with_rho(self, rho: S) -> Self {
        Self { rho, ..self }
    }

    #[must_use]
    pub fn with_alpha0(self, alpha0: S) -> Self {
        Self { alpha0, ..self }
    }

    #[must_use]
    pub fn with_alpha_min(self, alpha_min: S) -> Self {
        Self { alpha_min, ..self }
    }
}

/// An accepted step
#[derive(Clone, Debug, PartialEq)]
pub struct Step<S> {
    /// Accepted step length
    pub alpha: S,
    /// $`x + \alpha d`$
    pub point: Array1<S>,
    /// $`f(x + \alpha d)`$
    pub value: S,
    /// Number of objective values computed to find it
    pub trials: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum LineSearchError {
    /// The direction does not point downhill, $`g^T d \geq 0`$ (or is NaN).
    #[error("search direction is not a descent direction (g.d = {slope:e})")]
    AscentDirection { slope: f64 },

    /// No step length above the floor gave a sufficient decrease.
    #[error("line search did not find a decrease: step length {alpha:e} fell below {alpha_min:e}")]
    NoDecrease { alpha: f64, alpha_min: f64 },
}

fn as_f64<S: ToPrimitive>(s: S) -> f64 {
    s.to_f64().unwrap_or(std::f64::NAN)
}

/// Armijo backtracking line search
///
/// Parameters
/// ----------
/// - __objective:__ function being minimized, only its values are used here
/// - __x:__         current point
/// - __fx:__        $`f(x)`$
/// - __grad:__      $`\nabla f(x)`$
/// - __dir:__       search direction, must satisfy $`g^T d < 0`$
/// - __params:__    sufficient decrease constant, contraction and step bounds
///
/// The returned point is exactly the one whose value was accepted, so the
/// caller never needs to evaluate it again.
pub fn backtracking<S, F>(
    objective: &F,
    x: ArrayView1<S>,
    fx: S,
    grad: ArrayView1<S>,
    dir: ArrayView1<S>,
    params: &Backtracking<S>,
) -> Result<Step<S>, LineSearchError>
where
    S: NdFloat,
    F: Objective<S> + ?Sized,
{
    let slope = grad.dot(&dir);
    // also rejects NaN
    if !(slope < S::zero()) {
        return Err(LineSearchError::AscentDirection {
            slope: as_f64(slope),
        });
    }

    let mut alpha = params.alpha0;
    let mut trials = 0;
    while alpha >= params.alpha_min {
        let point = &x + &(&dir * alpha);
        let value = objective.value(point.view());
        trials += 1;
        trace!("backtracking: alpha = {:e}, f = {:e}", alpha, value);

        // false for NaN and infinite values, which shrinks the step
        if value <= fx + params.c1 * alpha * slope {
            return Ok(Step {
                alpha,
                point,
                value,
                trials,
            });
        }
        alpha = alpha * params.rho;
    }
    Err(LineSearchError::NoDecrease {
        alpha: as_f64(alpha),
        alpha_min: as_f64(params.alpha_min),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::{Evaluation, Quadratic};
    use approx::assert_abs_diff_eq;

    #[test]
    fn accepts_full_newton_step() {
        let f = Quadratic::diagonal(array![2., 2.].view());
        let x = array![1., 1.];
        let eval = f.evaluate(x.view(), false);
        let dir = array![-1., -1.];
        let step = backtracking(
            &f,
            x.view(),
            eval.value,
            eval.gradient.view(),
            dir.view(),
            &Backtracking::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(step.alpha, 1.);
        assert_abs_diff_eq!(step.point, array![0., 0.]);
        assert_abs_diff_eq!(step.value, 0.);
        assert_eq!(step.trials, 1);
    }

    #[test]
    fn halves_until_sufficient_decrease() {
        // x^2 + y^2 from (1, 1) along -g = (-2, -2): alpha = 1 overshoots to (-1, -1)
        let f = Quadratic::diagonal(array![2., 2.].view());
        let x = array![1., 1.];
        let eval = f.evaluate(x.view(), false);
        let dir = -&eval.gradient;
        let step = backtracking(
            &f,
            x.view(),
            eval.value,
            eval.gradient.view(),
            dir.view(),
            &Backtracking::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(step.alpha, 0.5);
        assert_abs_diff_eq!(step.point, array![0., 0.]);
        assert_eq!(step.trials, 2);
    }

    #[test]
    fn armijo_condition_holds() {
        let f = Quadratic::diagonal(array![2., 200.].view());
        let x = array![1., 1.];
        let eval = f.evaluate(x.view(), false);
        let dir = -&eval.gradient;
        let params = Backtracking::default().with_c1(0.3).with_rho(0.7);
        let step = backtracking(
            &f,
            x.view(),
            eval.value,
            eval.gradient.view(),
            dir.view(),
            &params,
        )
        .unwrap();
        let slope = eval.gradient.dot(&dir);
        assert!(step.value <= eval.value + params.c1 * step.alpha * slope);
        assert!(step.value < eval.value);
        // the previous, longer step must have failed the test
        let longer = step.alpha / params.rho;
        let f_longer = f.value((&x + &(&dir * longer)).view());
        assert!(f_longer > eval.value + params.c1 * longer * slope);
    }

    #[test]
    fn rejects_ascent_direction() {
        let f = Quadratic::diagonal(array![1., 1.].view());
        let x = array![1., 0.];
        let eval = f.evaluate(x.view(), false);
        let err = backtracking(
            &f,
            x.view(),
            eval.value,
            eval.gradient.view(),
            eval.gradient.view(),
            &Backtracking::default(),
        )
        .unwrap_err();
        assert_eq!(err, LineSearchError::AscentDirection { slope: 1. });

        // orthogonal directions are not descent directions either
        let err = backtracking(
            &f,
            x.view(),
            eval.value,
            eval.gradient.view(),
            array![0., 1.].view(),
            &Backtracking::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LineSearchError::AscentDirection { .. }));
    }

    #[test]
    fn gives_up_below_floor() {
        // the gradient reported here points the wrong way,
        // so every step along -g increases the true value
        let f = |x: ArrayView1<f64>, _hessian_needed: bool| {
            Evaluation::first_order(x.dot(&x), &x * -2.)
        };
        let x = array![1., -1.];
        let eval = f.evaluate(x.view(), false);
        let dir = -&eval.gradient;
        let err = backtracking(
            &f,
            x.view(),
            eval.value,
            eval.gradient.view(),
            dir.view(),
            &Backtracking::default(),
        )
        .unwrap_err();
        match err {
            LineSearchError::NoDecrease { alpha, alpha_min } => {
                assert!(alpha < alpha_min);
                assert_abs_diff_eq!(alpha_min, 1e-10);
            }
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn shrinks_past_non_finite_values() {
        let f = |x: ArrayView1<f64>, _hessian_needed: bool| {
            let value = if x[0] < 0. { std::f64::NAN } else { x[0] * x[0] };
            Evaluation::first_order(value, array![2. * x[0]])
        };
        let x = array![1.];
        let eval = f.evaluate(x.view(), false);
        let dir = array![-4.];
        let step = backtracking(
            &f,
            x.view(),
            eval.value,
            eval.gradient.view(),
            dir.view(),
            &Backtracking::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(step.alpha, 0.25);
        assert_abs_diff_eq!(step.value, 0.);
    }
}
