//! Evaluation tracing: a trait-based hook into primitive-level events, zero
//! cost by default.
//!
//! The executor carries its tracer as a type parameter rather than a trait
//! object, so [`NoopTracer`]'s default (empty) method bodies are eliminated
//! entirely by monomorphization — an evaluator built with it pays nothing for
//! tracing it never does.

use crate::errors::PhylanxError;

/// Hook points into primitive evaluation. Every method defaults to doing
/// nothing; implementations only override the hooks they care about.
pub trait Tracer {
    /// Called immediately before a node is evaluated, with its display name.
    #[inline(always)]
    fn on_eval(&self, _name: &str) {}

    /// Called after a `store` primitive writes a new value into a variable.
    #[inline(always)]
    fn on_store(&self, _name: &str) {}

    /// Called when a primitive's evaluation fails, before the error
    /// propagates to its caller.
    #[inline(always)]
    fn on_error(&self, _err: &PhylanxError) {}
}

/// The production default: every hook is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Prints one line to stderr per primitive evaluated, store performed, or
/// error raised — useful for following a program's dataflow order
/// interactively.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl Tracer for StderrTracer {
    fn on_eval(&self, name: &str) {
        eprintln!("eval   {name}");
    }

    fn on_store(&self, name: &str) {
        eprintln!("store -> {name}");
    }

    fn on_error(&self, err: &PhylanxError) {
        eprintln!("error: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CodeRange;

    #[test]
    fn noop_tracer_accepts_every_hook_without_side_effects() {
        let tracer = NoopTracer;
        tracer.on_eval("x$0$0$col0@0");
        tracer.on_store("x$0$0$col0@0");
        tracer.on_error(&PhylanxError::domain("test", CodeRange::default(), "boom"));
    }
}
