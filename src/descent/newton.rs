use std::fmt;

use super::gd::steepest_descent_direction;
use super::{descend, Direction};
use crate::objective::{Evaluation, Objective};
use crate::options::{ConfigError, Method, Options};
use crate::result::{Criterion, Failure, OptimizationResult, StopReason};
use log::warn;
use ndarray::prelude::*;
use ndarray::NdFloat;
use ndarray_linalg::{Lapack, Scalar, Solve};
use num_traits::Float;

/// Why the Newton system gave no usable direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// $`\nabla^2 f(x)`$ could not be factorized
    Singular,
    /// The solution is not finite, or $`g^T d \geq 0`$
    /// because the Hessian is not positive definite
    NotDescent,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Singular => write!(f, "singular Hessian"),
            FallbackReason::NotDescent => write!(f, "Newton direction is not a descent direction"),
        }
    }
}

/// Search direction of one Newton iteration
#[derive(Debug, Clone, PartialEq)]
pub enum NewtonDirection<S> {
    /// Solution of $`\nabla^2 f(x) d = -\nabla f(x)`$ together with
    /// the Newton decrement $`\lambda^2 = -g^T d > 0`$
    Newton { dir: Array1<S>, decrement: S },
    /// Steepest descent, used for this iteration only
    Fallback { dir: Array1<S>, reason: FallbackReason },
}

impl<S> NewtonDirection<S> {
    pub fn dir(&self) -> &Array1<S> {
        match self {
            NewtonDirection::Newton { dir, .. } | NewtonDirection::Fallback { dir, .. } => dir,
        }
    }

    pub fn into_dir(self) -> Array1<S> {
        match self {
            NewtonDirection::Newton { dir, .. } | NewtonDirection::Fallback { dir, .. } => dir,
        }
    }
}

/// Newton search direction with a steepest descent fallback
///
/// Solves $`H d = -g`$ by LU factorization. Where $`H`$ is singular or not
/// positive definite, so that $`d`$ is not a descent direction, the steepest
/// descent direction $`-g`$ is returned instead.
pub fn newton_direction<S>(grad: ArrayView1<S>, hessian: ArrayView2<S>) -> NewtonDirection<S>
where
    S: NdFloat + Scalar + Lapack,
{
    let neg_grad = steepest_descent_direction(grad);
    match hessian.solve(&neg_grad) {
        Ok(dir) => {
            let slope = grad.dot(&dir);
            if dir.iter().all(|&d| Float::is_finite(d)) && slope < S::zero() {
                NewtonDirection::Newton {
                    dir,
                    decrement: -slope,
                }
            } else {
                NewtonDirection::Fallback {
                    dir: neg_grad,
                    reason: FallbackReason::NotDescent,
                }
            }
        }
        Err(_) => NewtonDirection::Fallback {
            dir: neg_grad,
            reason: FallbackReason::Singular,
        },
    }
}

/// Direction of Newton iteration `iter` (counted from 1) at the evaluated point
///
/// Stops when the objective gave no Hessian, or when half the Newton decrement
/// is below `obj_tol`.
fn newton_step<S>(eval: &Evaluation<S>, iter: usize, obj_tol: S) -> Direction<S>
where
    S: NdFloat + Scalar + Lapack,
{
    let hessian = match &eval.hessian {
        Some(hessian) => hessian,
        None => {
            return Direction::Stop(StopReason::Failed(Failure::MissingHessian {
                iteration: iter - 1,
            }))
        }
    };
    match newton_direction(eval.gradient.view(), hessian.view()) {
        NewtonDirection::Newton { dir, decrement } => {
            if decrement / (S::one() + S::one()) < obj_tol {
                Direction::Stop(StopReason::Converged(Criterion::NewtonDecrement))
            } else {
                Direction::Descent(dir)
            }
        }
        NewtonDirection::Fallback { dir, reason } => {
            warn!("newton: {} at iteration {}, using -g", reason, iter);
            Direction::Fallback(dir)
        }
    }
}

/// Newton's Method with a backtracking line search
///
/// Algorithm
/// ---------
/// ```math
/// \begin{aligned}
/// \nabla^2 f(x_i) d_i &= -\nabla f(x_i) \\
/// \alpha_i &= \max\{\rho^k\alpha_0 : f(x_i + \rho^k\alpha_0 d_i) \leq f(x_i) + c_1 \rho^k\alpha_0 \nabla f(x_i)^T d_i\} \\
/// x_{i+1} &= x_i + \alpha_i d_i
/// \end{aligned}
/// ```
/// with $`d_i = -\nabla f(x_i)`$ on iterations where the Hessian gives no descent
/// direction. Besides the tests of [`Options`], the run also stops when
/// $`\frac12\lambda^2 = -\frac12\nabla f(x_i)^T d_i`$ drops below `obj_tol`.
///
/// For a strictly convex quadratic the first full step lands on the minimizer.
///
/// Parameters
/// ----------
/// - __objective:__ value, gradient and Hessian of the function to minimize
/// - __x0:__        initial guess
/// - __options:__   tolerances, iteration budget and line search parameters
/// - __callback:__  User-defined function to be evaluated with two arguments (x,iter).
///                   It is evaluated at (x0,0) and then after each iteration.
///                   If it returns True, the function terminates early.
pub fn newton<S, F>(
    objective: &F,
    x0: ArrayView1<S>,
    options: &Options<S>,
    callback: impl FnMut(ArrayView1<S>, usize) -> bool,
) -> Result<OptimizationResult<S>, ConfigError>
where
    S: NdFloat + Scalar + Lapack,
    F: Objective<S> + ?Sized,
{
    let obj_tol = options.obj_tol;
    descend(
        Method::Newton,
        options,
        objective,
        x0,
        |eval, iter| newton_step(eval, iter, obj_tol),
        callback,
    )
}
