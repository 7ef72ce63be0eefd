//! Plain text summaries of optimization histories
//!
//! Contour and convergence plots are left to external tools, which can read a
//! [`History`] directly (or its JSON form with the `serde` feature). This module
//! is the text rendering of the same information.

use std::fmt::{self, Write};

use crate::result::{History, IterationRecord};
use ndarray::NdFloat;

/// Summary of one run, labelled with the method that produced it
#[derive(Debug, Clone, Copy)]
pub struct Summary<'a, S> {
    label: &'a str,
    history: &'a History<S>,
}

impl<'a, S: NdFloat> Summary<'a, S> {
    pub fn new(label: &'a str, history: &'a History<S>) -> Self {
        Summary { label, history }
    }

    /// Steps taken
    pub fn iterations(&self) -> usize {
        self.history.iterations()
    }

    pub fn initial(&self) -> Option<&'a IterationRecord<S>> {
        self.history.first()
    }

    pub fn last(&self) -> Option<&'a IterationRecord<S>> {
        self.history.last()
    }

    /// $`|f(x_0)| / |f(x_N)|`$, `None` when the final value is zero
    pub fn reduction(&self) -> Option<S> {
        let first = self.initial()?.objective_value.abs();
        let last = self.last()?.objective_value.abs();
        if last == S::zero() {
            None
        } else {
            Some(first / last)
        }
    }
}

impl<S: NdFloat> fmt::Display for Summary<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (first, last) = match (self.initial(), self.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return writeln!(f, "No history available for {}", self.label),
        };
        writeln!(f, "{} Summary:", self.label)?;
        writeln!(f, "{}", "=".repeat(40))?;
        writeln!(f, "Total iterations: {}", self.iterations())?;
        writeln!(f, "Initial location: {}", first.location)?;
        writeln!(f, "Final location: {}", last.location)?;
        writeln!(f, "Initial function value: {:.6e}", first.objective_value)?;
        writeln!(f, "Final function value: {:.6e}", last.objective_value)?;
        if let Some(reduction) = self.reduction() {
            writeln!(f, "Function value reduction: {:.2e}", reduction)?;
        }
        Ok(())
    }
}

fn path_line<S: NdFloat>(out: &mut String, tag: &str, record: &IterationRecord<S>) -> fmt::Result {
    writeln!(
        out,
        "  {:<6} {} -> f = {:.6e}",
        tag, record.location, record.objective_value
    )
}

/// Side by side text comparison of several runs
///
/// Start, end and (for longer runs) midpoint of every path, with the number
/// of steps taken.
pub fn comparison<S: NdFloat>(title: &str, runs: &[(&str, &History<S>)]) -> String {
    let mut out = String::new();
    write_comparison(&mut out, title, runs).expect("writing to a String cannot fail");
    out
}

fn write_comparison<S: NdFloat>(
    out: &mut String,
    title: &str,
    runs: &[(&str, &History<S>)],
) -> fmt::Result {
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "=".repeat(title.chars().count()))?;
    for (label, history) in runs {
        let (first, last) = match (history.first(), history.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => continue,
        };
        writeln!(out)?;
        writeln!(out, "{}:", label)?;
        path_line(out, "Start:", first)?;
        path_line(out, "End:", last)?;
        writeln!(out, "  Iterations: {}", history.iterations())?;
        if history.len() > 3 {
            path_line(out, "Mid:", &history[history.len() / 2])?;
        }
    }
    Ok(())
}
