//! The `ndarray-descent` crate minimizes smooth, unconstrained functions of an
//! `ndarray` vector with line search methods.
//!
//! It includes:
//! - Gradient Descent
//! - Newton's Method, falling back to steepest descent where the Hessian
//!   does not give a descent direction
//!
//! Both share a backtracking (Armijo) line search, and every run records the
//! full path of iterates so that methods can be compared after the fact.
//!
//! ```no_run
//! use ndarray::array;
//! use ndarray_descent::{Minimizer, Method, Options, Quadratic};
//!
//! let f = Quadratic::diagonal(array![2., 200.].view());
//! let res = Minimizer::new(Method::Newton)
//!     .with_options(Options::default().with_max_iter(50))
//!     .run(&f, array![1., 1.].view())
//!     .unwrap();
//! println!("{} after {} iterations", res.stop_reason(), res.iterations());
//! ```
//!
//! Progress is reported through the `log` facade: one `info` line per run,
//! `debug` per iteration and `trace` per line search trial.

#![cfg_attr(all(rustc_nightly, test), feature(test))]
#[cfg(all(rustc_nightly, test))]
extern crate test;

pub mod descent;
pub mod linesearch;
pub mod objective;
pub mod options;
pub mod report;
pub mod result;

pub use descent::{gradient_descent, minimize, newton, nop, Minimizer};
pub use linesearch::{Backtracking, LineSearchError};
pub use objective::{Evaluation, Objective, Quadratic};
pub use options::{ConfigError, Method, Options};
pub use result::{Criterion, Failure, History, IterationRecord, OptimizationResult, StopReason};
