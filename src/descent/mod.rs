//! Descent Methods for Smooth Unconstrained Minimization
//!
//! Both methods share one loop. Each iteration evaluates the objective at the
//! current point $`x_i`$, picks a search direction $`d_i`$, finds a step length
//! $`\alpha_i`$ with a [backtracking line search](../linesearch/fn.backtracking.html)
//! and moves to $`x_{i+1} = x_i + \alpha_i d_i`$. The methods differ only in
//! the direction:
//! - [Gradient Descent](fn.gradient_descent.html): $`d_i = -\nabla f(x_i)`$
//! - [Newton](fn.newton.html): $`\nabla^2 f(x_i) d_i = -\nabla f(x_i)`$
//!
//! Only Newton's Method solves linear systems, so only [`newton`], [`Minimizer::run`]
//! and [`minimize`] need a LAPACK backend. [`gradient_descent`] works for any `NdFloat`.
//!
//! Every iterate is recorded in the [`History`](../result/struct.History.html)
//! of the run. A run that fails keeps everything recorded up to the failure.

mod gd;
pub use gd::*;
mod newton;
pub use newton::*;

use crate::linesearch::backtracking;
use crate::objective::{Counted, Evaluation, Objective};
use crate::options::{ConfigError, Method, Options};
use crate::result::{Criterion, Failure, History, OptimizationResult, StopReason};
use log::{debug, info, warn};
use ndarray::prelude::*;
use ndarray::NdFloat;
use ndarray_linalg::{Lapack, Scalar};
use num_traits::Float;

/// Do nothing function for optional user callback (returns false)
#[allow(clippy::needless_pass_by_value)]
pub fn nop<T, D>(_x: ArrayView<T, D>, _itr: usize) -> bool {
    false
}

#[inline]
fn norm<S: NdFloat>(v: ArrayView1<S>) -> S {
    v.dot(&v).sqrt()
}

/// Minimize `objective` from `x0` with the method named `method`
///
/// `method` is `"gradient_descent"` or `"newton"`; anything else is
/// reported as [`ConfigError::UnknownMethod`] without evaluating the objective.
/// The remaining options keep their [defaults](../options/struct.Options.html#impl-Default).
///
/// ```no_run
/// use ndarray::prelude::*;
/// use ndarray_descent::{minimize, Quadratic};
///
/// // f(x, y) = x^2 + y^2
/// let f = Quadratic::diagonal(array![2., 2.].view());
/// let res = minimize(&f, array![1., 1.].view(), "newton", 1e-8, 1e-8, 100).unwrap();
/// assert!(res.converged());
/// assert_eq!(res.iterations(), 1);
/// ```
pub fn minimize<S, F>(
    objective: &F,
    x0: ArrayView1<S>,
    method: &str,
    obj_tol: S,
    param_tol: S,
    max_iter: usize,
) -> Result<OptimizationResult<S>, ConfigError>
where
    S: NdFloat + Scalar + Lapack,
    F: Objective<S> + ?Sized,
{
    let options = Options::default()
        .with_obj_tol(obj_tol)
        .with_param_tol(param_tol)
        .with_max_iter(max_iter);
    Minimizer::from_name(method)?
        .with_options(options)
        .run(objective, x0)
}

/// A configured minimizer, reusable across runs
#[derive(Debug, Clone, PartialEq)]
pub struct Minimizer<S> {
    method: Method,
    options: Options<S>,
}

impl<S: NdFloat> Minimizer<S> {
    pub fn new(method: Method) -> Self {
        Minimizer {
            method,
            options: Options::default(),
        }
    }

    /// Select the method by name, see [`Method`](../options/enum.Method.html)
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(name.parse()?))
    }

    #[must_use]
    pub fn with_options(self, options: Options<S>) -> Self {
        Minimizer { options, ..self }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn options(&self) -> &Options<S> {
        &self.options
    }
}

impl<S> Minimizer<S>
where
    S: NdFloat + Scalar + Lapack,
{
    pub fn run<F>(
        &self,
        objective: &F,
        x0: ArrayView1<S>,
    ) -> Result<OptimizationResult<S>, ConfigError>
    where
        F: Objective<S> + ?Sized,
    {
        self.run_with_callback(objective, x0, nop)
    }

    /// Run with a user callback
    ///
    /// The callback is evaluated with two arguments (x,iter), at (x0,0) and then
    /// after each iteration. If it returns true the run stops with
    /// [`StopReason::Cancelled`](../result/enum.StopReason.html), unless that
    /// last step already met a convergence test.
    pub fn run_with_callback<F>(
        &self,
        objective: &F,
        x0: ArrayView1<S>,
        callback: impl FnMut(ArrayView1<S>, usize) -> bool,
    ) -> Result<OptimizationResult<S>, ConfigError>
    where
        F: Objective<S> + ?Sized,
    {
        match self.method {
            Method::GradientDescent => gradient_descent(objective, x0, &self.options, callback),
            Method::Newton => newton(objective, x0, &self.options, callback),
        }
    }
}

/// Search direction chosen for one iteration
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Direction<S> {
    /// The method's own direction
    Descent(Array1<S>),
    /// Steepest descent in place of the method's own direction
    Fallback(Array1<S>),
    /// Stop before stepping
    Stop(StopReason),
}

/// Shared driver of both methods, `direction` picks $`d_i`$ from the evaluation at $`x_i`$
pub(crate) fn descend<S, F, D>(
    method: Method,
    options: &Options<S>,
    objective: &F,
    x0: ArrayView1<S>,
    direction: D,
    mut callback: impl FnMut(ArrayView1<S>, usize) -> bool,
) -> Result<OptimizationResult<S>, ConfigError>
where
    S: NdFloat,
    F: Objective<S> + ?Sized,
    D: FnMut(&Evaluation<S>, usize) -> Direction<S>,
{
    options.validate()?;
    if x0.is_empty() {
        return Err(ConfigError::EmptyStartingPoint);
    }
    if let Some(dim) = objective.dim() {
        if dim != x0.len() {
            return Err(ConfigError::DimensionMismatch {
                expected: dim,
                found: x0.len(),
            });
        }
    }

    let objective = Counted::new(objective);
    // budgets are often generous, don't reserve all of it up front
    let mut history = History::with_capacity(options.max_iter.min(1023) + 1);
    let mut fallbacks = 0;
    let stop_reason = iterate(
        method,
        options,
        &objective,
        x0,
        &mut history,
        &mut fallbacks,
        direction,
        &mut callback,
    );

    let last = &history[history.len() - 1];
    match &stop_reason {
        StopReason::Failed(failure) => warn!(
            "{}: {} after {} iterations, f = {:e}",
            method,
            failure,
            history.iterations(),
            last.objective_value
        ),
        reason => info!(
            "{}: {} after {} iterations, f = {:e}",
            method,
            reason,
            history.iterations(),
            last.objective_value
        ),
    }
    Ok(OptimizationResult::new(
        stop_reason,
        history,
        objective.calls(),
        fallbacks,
    ))
}

#[allow(clippy::too_many_arguments)]
fn iterate<S, F, D>(
    method: Method,
    opts: &Options<S>,
    objective: &F,
    x0: ArrayView1<S>,
    history: &mut History<S>,
    fallbacks: &mut usize,
    mut direction: D,
    callback: &mut impl FnMut(ArrayView1<S>, usize) -> bool,
) -> StopReason
where
    S: NdFloat,
    F: Objective<S> + ?Sized,
    D: FnMut(&Evaluation<S>, usize) -> Direction<S>,
{
    let hessian_needed = method.needs_hessian();

    let mut x = x0.to_owned();
    let mut eval = objective.evaluate(x.view(), hessian_needed);
    history.push(x.clone(), eval.value);
    if callback(x.view(), 0) {
        return StopReason::Cancelled;
    }

    for iter in 1..=opts.max_iter {
        if let Err(failure) = check_shapes(&eval, x.len(), hessian_needed) {
            return StopReason::Failed(failure);
        }
        let grad_norm = norm(eval.gradient.view());
        debug!(
            "{}: iter = {}, f = {:e}, |g| = {:e}, x = {}",
            method, iter, eval.value, grad_norm, x
        );
        if grad_norm <= opts.grad_tol {
            return StopReason::Converged(Criterion::GradientNorm);
        }

        let dir = match direction(&eval, iter) {
            Direction::Descent(dir) => dir,
            Direction::Fallback(dir) => {
                *fallbacks += 1;
                dir
            }
            Direction::Stop(reason) => return reason,
        };

        let step = match backtracking(
            objective,
            x.view(),
            eval.value,
            eval.gradient.view(),
            dir.view(),
            &opts.line_search,
        ) {
            Ok(step) => step,
            Err(err) => return StopReason::Failed(err.into()),
        };

        // Either test alone is enough: a flat objective or a vanishing step
        let change = Float::abs(step.value - eval.value);
        let step_len = norm((&step.point - &x).view());
        debug!(
            "{}: iter = {}, alpha = {:e} after {} trials, |dx| = {:e}, df = {:e}",
            method, iter, step.alpha, step.trials, step_len, change
        );
        history.push(step.point.clone(), step.value);
        let converged = if change < opts.obj_tol {
            Some(Criterion::ObjectiveChange)
        } else if step_len < opts.param_tol {
            Some(Criterion::StepSize)
        } else {
            None
        };

        x = step.point;
        let cancel = callback(x.view(), iter);
        if let Some(criterion) = converged {
            return StopReason::Converged(criterion);
        }
        if cancel {
            return StopReason::Cancelled;
        }
        if iter < opts.max_iter {
            eval = objective.evaluate(x.view(), hessian_needed);
        }
    }
    StopReason::MaxIterations
}

fn check_shapes<S>(eval: &Evaluation<S>, n: usize, hessian_needed: bool) -> Result<(), Failure> {
    if eval.gradient.len() != n {
        return Err(Failure::DimensionMismatch {
            what: "gradient",
            expected: vec![n],
            found: eval.gradient.shape().to_vec(),
        });
    }
    match &eval.hessian {
        Some(hessian) if hessian_needed && hessian.dim() != (n, n) => {
            Err(Failure::DimensionMismatch {
                what: "Hessian",
                expected: vec![n, n],
                found: hessian.shape().to_vec(),
            })
        }
        _ => Ok(()),
    }
}


#[cfg(all(rustc_nightly, test))]
mod benches {
    use super::*;
    use crate::objective::Quadratic;
    use test::Bencher;

    #[bench]
    fn bench_gradient_descent_ill_conditioned(b: &mut Bencher) {
        let f = Quadratic::diagonal(Array1::linspace(1., 100., 20).view());
        let x0 = Array1::ones(20);
        let gd = Minimizer::new(Method::GradientDescent);
        b.iter(|| gd.run(&f, x0.view()).unwrap());
    }

    #[bench]
    fn bench_newton_ill_conditioned(b: &mut Bencher) {
        let f = Quadratic::diagonal(Array1::linspace(1., 100., 20).view());
        let x0 = Array1::ones(20);
        let newton = Minimizer::new(Method::Newton);
        b.iter(|| newton.run(&f, x0.view()).unwrap());
    }
}
