use super::{descend, Direction};
use crate::objective::Objective;
use crate::options::{ConfigError, Method, Options};
use crate::result::OptimizationResult;
use ndarray::prelude::*;
use ndarray::NdFloat; // includes LinalgScalar and ScalarOperand

/// Steepest descent direction, $`d = -\nabla f(x)`$
pub fn steepest_descent_direction<S: NdFloat>(grad: ArrayView1<S>) -> Array1<S> {
    grad.mapv(|g| -g)
}

/// Gradient Descent with a backtracking line search
///
/// Also known as steepest descent.
///
/// Algorithm
/// ---------
/// ```math
/// \begin{aligned}
/// d_i &= -\nabla f(x_i) \\
/// \alpha_i &= \max\{\rho^k\alpha_0 : f(x_i + \rho^k\alpha_0 d_i) \leq f(x_i) + c_1 \rho^k\alpha_0 \nabla f(x_i)^T d_i\} \\
/// x_{i+1} &= x_i + \alpha_i d_i
/// \end{aligned}
/// ```
///
/// Parameters
/// ----------
/// - __objective:__ value and gradient of the function to minimize
/// - __x0:__        initial guess
/// - __options:__   tolerances, iteration budget and line search parameters
/// - __callback:__  User-defined function to be evaluated with two arguments (x,iter).
///                   It is evaluated at (x0,0) and then after each iteration.
///                   If it returns True, the function terminates early.
pub fn gradient_descent<S, F>(
    objective: &F,
    x0: ArrayView1<S>,
    options: &Options<S>,
    callback: impl FnMut(ArrayView1<S>, usize) -> bool,
) -> Result<OptimizationResult<S>, ConfigError>
where
    S: NdFloat,
    F: Objective<S> + ?Sized,
{
    descend(
        Method::GradientDescent,
        options,
        objective,
        x0,
        |eval, _iter| Direction::Descent(steepest_descent_direction(eval.gradient.view())),
        callback,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descent::nop;
    use crate::objective::Quadratic;
    use crate::result::{Criterion, StopReason};
    use approx::assert_abs_diff_eq;

    #[test]
    fn direction_is_negative_gradient() {
        let g = array![1., -2., 0.5];
        assert_eq!(steepest_descent_direction(g.view()), array![-1., 2., -0.5]);
    }

    #[test]
    fn gd_like_1d() {
        // f(x) = 50 (x - 5)^2
        let f = Quadratic::new(array![[100.]]).with_linear(array![500.]);
        let x0 = array![19.];
        let res = gradient_descent(&f, x0.view(), &Options::default(), nop).unwrap();
        assert!(res.converged());
        let expected = array![5.];
        assert_abs_diff_eq!(res.final_location(), expected.view(), epsilon = 1e-4);
    }

    #[test]
    fn gradient_descent_simple_regression() {
        #![allow(non_snake_case)]
        // least squares 0.5 |Ax - y|^2 with A = diag(10, 20), y = (50, 100)
        let A = array![[10., 0.], [0., 20.]];
        let y = array![50., 100.];
        let f = Quadratic::new(A.t().dot(&A)).with_linear(A.t().dot(&y));
        let x0 = array![19., 44.];

        let mut seen = 0;
        let res = gradient_descent(&f, x0.view(), &Options::default(), |x, iter| {
            assert_eq!(iter, seen);
            assert_eq!(x.len(), 2);
            seen += 1;
            false
        })
        .unwrap();
        assert!(res.converged());
        assert_eq!(seen, res.history().len());
        let expected = array![5., 5.];
        assert_abs_diff_eq!(res.final_location(), expected.view(), epsilon = 1e-4);
    }

    // bounded by NdFloat alone, so no LAPACK routine is reachable from here
    fn minimize_any_float<S: NdFloat>(f: &Quadratic<S>, x0: ArrayView1<S>) -> OptimizationResult<S> {
        gradient_descent(f, x0, &Options::default(), nop).unwrap()
    }

    #[test]
    fn gradient_descent_needs_no_lapack_bound() {
        let f = Quadratic::diagonal(array![2f32, 2.].view());
        let res = minimize_any_float(&f, array![1f32, -1.].view());
        assert!(res.converged());
        assert!(res.final_value() < 1e-6);
    }

    #[test]
    fn stops_on_zero_gradient_without_a_step() {
        let f = Quadratic::diagonal(array![1., 3.].view());
        let res = gradient_descent(&f, array![0., 0.].view(), &Options::default(), nop).unwrap();
        assert_eq!(
            res.stop_reason(),
            &StopReason::Converged(Criterion::GradientNorm)
        );
        assert_eq!(res.history().len(), 1);
        assert_eq!(res.evaluations(), 1);
    }
}
