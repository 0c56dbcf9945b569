//! Phylanx: a small array-computing runtime for the Lisp-like PhySL surface
//! language.
//!
//! A program is parsed into an [`ast::Expr`] tree by [`reader::parse`],
//! compiled into a [`primitive::Graph`] of primitive nodes by
//! [`compiler::Compiler`], and evaluated by an [`executor::Evaluator`], which
//! implements the scheduling-independent [`control::Eval`] trait that the
//! control-flow primitives are written against. [`compile_and_run`] strings
//! those three steps together for the common case.
#![expect(dead_code, reason = "compat shims keep some currently-unused APIs")]

mod arithmetic;
mod ast;
mod compiler;
pub mod config;
mod control;
mod environment;
pub mod errors;
pub mod executor;
mod matcher;
mod name;
mod node_data;
pub mod pattern;
mod primitive;
pub mod reader;
pub mod resource;
mod slicing;
pub mod tracer;
pub mod value;

pub use crate::ast::{Expr, InfixOp, Literal};
pub use crate::compiler::Compiler;
pub use crate::config::RunConfig;
pub use crate::errors::{ErrorKind, PhylanxError, PhylanxResult};
pub use crate::executor::Evaluator;
pub use crate::node_data::{MatrixData, Scalar, VectorData};
pub use crate::pattern::PatternRegistry;
pub use crate::primitive::{Graph, Node, NodeKind};
pub use crate::reader::{CodeRange, ParseError, parse};
pub use crate::resource::{ResourceError, ResourceTracker};
pub use crate::tracer::{NoopTracer, StderrTracer, Tracer};
pub use crate::value::{DictKey, PrimitiveId, Value};

/// Parses, compiles, and runs one PhySL source string under `config`, using `codename`
/// as the compile unit's display name (folded into every primitive's canonical name and
/// into diagnostics).
///
/// This is the entry point the CLI and the test suite both go through: a host embedding
/// Phylanx for more than a one-shot run instead holds onto a [`PatternRegistry`] and a
/// compiled [`Graph`] and drives an [`Evaluator`] directly.
pub fn compile_and_run(codename: &str, source: &str, config: RunConfig) -> PhylanxResult<Value> {
    let expr = reader::parse(source)?;
    let patterns = PatternRegistry::builtin();
    let graph = Compiler::new(codename, &patterns, 0).compile_program(&expr)?;
    Evaluator::new(&graph, config).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_and_run_executes_a_simple_expression() {
        let result = compile_and_run("test", "1 + 2", RunConfig::single_threaded()).unwrap();
        assert_eq!(result.as_f64(CodeRange::default()).unwrap(), 3.0);
    }

    #[test]
    fn compile_and_run_surfaces_a_parse_error() {
        let err = compile_and_run("test", "(", RunConfig::single_threaded()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseMatch);
    }
}
