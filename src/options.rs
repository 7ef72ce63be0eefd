//! Method selection and stopping rules

use std::fmt;
use std::str::FromStr;

use crate::linesearch::Backtracking;
use ndarray::NdFloat;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which search direction the minimizer follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Method {
    /// Steepest descent, $`d = -\nabla f(x)`$
    GradientDescent,
    /// Newton direction, $`\nabla^2 f(x) d = -\nabla f(x)`$, with a steepest
    /// descent fallback where the Hessian gives no descent direction
    Newton,
}

impl Method {
    /// Name accepted by [`FromStr`](#impl-FromStr)
    pub fn name(self) -> &'static str {
        match self {
            Method::GradientDescent => "gradient_descent",
            Method::Newton => "newton",
        }
    }

    /// Whether the objective must supply a Hessian
    pub fn needs_hessian(self) -> bool {
        match self {
            Method::GradientDescent => false,
            Method::Newton => true,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gradient_descent" => Ok(Method::GradientDescent),
            "newton" => Ok(Method::Newton),
            _ => Err(ConfigError::UnknownMethod(s.to_owned())),
        }
    }
}

/// Errors in the configuration of a run, reported before anything is evaluated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown method `{0}`, expected `gradient_descent` or `newton`")]
    UnknownMethod(String),

    #[error("starting point is empty")]
    EmptyStartingPoint,

    #[error("starting point has length {found}, the objective takes {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid option `{name}` = {value}: {reason}")]
    InvalidOption {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// Tolerances, iteration budget and line search parameters
///
/// A run stops as converged when, after a step from $`x`$ to $`x'`$,
/// ```math
/// |f(x') - f(x)| < \mathrm{obj\_tol} \quad \textbf{or} \quad \|x' - x\|_2 < \mathrm{param\_tol}
/// ```
/// Either test alone is enough. Before a step it also stops when
/// $`\|\nabla f(x)\|_2 \leq \mathrm{grad\_tol}`$, and Newton's method
/// additionally when half the Newton decrement $`\frac12\lambda^2 = -\frac12 g^T d`$
/// is below `obj_tol`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Options<S> {
    /// Tolerance on the change of the objective value over one step
    pub obj_tol: S,
    /// Tolerance on the length of one step
    pub param_tol: S,
    /// Tolerance on the gradient norm
    pub grad_tol: S,
    /// Maximum number of steps
    pub max_iter: usize,
    pub line_search: Backtracking<S>,
}

impl<S: NdFloat> Default for Options<S> {
    fn default() -> Self {
        Options {
            obj_tol: S::from(1e-8).unwrap(),
            param_tol: S::from(1e-8).unwrap(),
            grad_tol: S::from(1e-12).unwrap(),
            max_iter: 100,
            line_search: Backtracking::default(),
        }
    }
}

impl<S: NdFloat> Options<S> {
    #[must_use]
    pub fn with_obj_tol(self, obj_tol: S) -> Self {
        Self { obj_tol, ..self }
    }

    #[must_use]
    pub fn with_param_tol(self, param_tol: S) -> Self {
        Self { param_tol, ..self }
    }

    #[must_use]
    pub fn with_grad_tol(self, grad_tol: S) -> Self {
        Self { grad_tol, ..self }
    }

    #[must_use]
    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self { max_iter, ..self }
    }

    #[must_use]
    pub fn with_line_search(self, line_search: Backtracking<S>) -> Self {
        Self {
            line_search,
            ..self
        }
    }

    /// Check every tolerance and line search constant
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = S::zero();
        let one = S::one();
        let half = one / (one + one);
        let ls = &self.line_search;

        // written so that NaN fails every check
        check("obj_tol", self.obj_tol, self.obj_tol >= zero, "must be non-negative")?;
        check("param_tol", self.param_tol, self.param_tol >= zero, "must be non-negative")?;
        check("grad_tol", self.grad_tol, self.grad_tol >= zero, "must be non-negative")?;
        check("c1", ls.c1, ls.c1 > zero && ls.c1 < half, "must lie in (0, 0.5)")?;
        check("rho", ls.rho, ls.rho > zero && ls.rho < one, "must lie in (0, 1)")?;
        check("alpha_min", ls.alpha_min, ls.alpha_min > zero, "must be positive")?;
        check(
            "alpha0",
            ls.alpha0,
            ls.alpha0.is_finite() && ls.alpha0 >= ls.alpha_min,
            "must be finite and at least alpha_min",
        )?;
        Ok(())
    }
}

fn check<S: NdFloat>(
    name: &'static str,
    value: S,
    ok: bool,
    reason: &'static str,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidOption {
            name,
            value: value.to_f64().unwrap_or(std::f64::NAN),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_method_names() {
        assert_eq!("gradient_descent".parse::<Method>(), Ok(Method::GradientDescent));
        assert_eq!("newton".parse::<Method>(), Ok(Method::Newton));
        for method in &[Method::GradientDescent, Method::Newton] {
            assert_eq!(method.to_string().parse::<Method>(), Ok(*method));
        }
    }

    #[test]
    fn unknown_method_is_an_error() {
        let err = "Gradient Descent".parse::<Method>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownMethod("Gradient Descent".into()));
        assert!(err.to_string().contains("Gradient Descent"));
        assert!("".parse::<Method>().is_err());
        assert!("Newton".parse::<Method>().is_err());
    }

    #[test]
    fn only_newton_needs_hessian() {
        assert!(Method::Newton.needs_hessian());
        assert!(!Method::GradientDescent.needs_hessian());
    }

    #[test]
    fn defaults_are_valid() {
        let opts = Options::<f64>::default();
        assert_eq!(opts.validate(), Ok(()));
        assert_eq!(opts.max_iter, 100);
        assert_eq!(opts.line_search.c1, 1e-4);
        assert_eq!(opts.line_search.rho, 0.5);
        assert!(Options::<f32>::default().validate().is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let opts = Options::<f64>::default()
            .with_obj_tol(1e-3)
            .with_param_tol(1e-4)
            .with_grad_tol(0.)
            .with_max_iter(7)
            .with_line_search(Backtracking::default().with_rho(0.25));
        assert_eq!(opts.obj_tol, 1e-3);
        assert_eq!(opts.param_tol, 1e-4);
        assert_eq!(opts.grad_tol, 0.);
        assert_eq!(opts.max_iter, 7);
        assert_eq!(opts.line_search.rho, 0.25);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn rejects_bad_options() {
        let err = Options::<f64>::default().with_obj_tol(-1.).validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidOption {
                name: "obj_tol",
                value: -1.,
                reason: "must be non-negative",
            }
        );

        let nan = Options::<f64>::default().with_param_tol(std::f64::NAN).validate();
        assert!(matches!(
            nan,
            Err(ConfigError::InvalidOption {
                name: "param_tol",
                ..
            })
        ));

        let bad_ls = |ls: Backtracking<f64>| Options::default().with_line_search(ls).validate();
        assert!(bad_ls(Backtracking::default().with_c1(0.5)).is_err());
        assert!(bad_ls(Backtracking::default().with_c1(0.)).is_err());
        assert!(bad_ls(Backtracking::default().with_rho(1.)).is_err());
        assert!(bad_ls(Backtracking::default().with_alpha_min(0.)).is_err());
        assert!(bad_ls(Backtracking::default().with_alpha0(1e-12)).is_err());
        assert!(bad_ls(Backtracking::default().with_alpha0(std::f64::INFINITY)).is_err());
    }
}
