//! Evaluates a compiled primitive [`crate::primitive::Graph`].
//!
//! [`Evaluator`] is the one concrete implementor of [`crate::control::Eval`]: control
//! flow, arithmetic, slicing, and function application all funnel through its `eval`,
//! dispatching on [`NodeKind`]. It is generic over a [`Tracer`] so a production run
//! (the default [`NoopTracer`]) pays nothing for hooks it never calls, and it carries a
//! [`ResourceTracker`] so every node evaluated and every nested `apply` is checked
//! against the ceilings of the [`RunConfig`] it was built with.
//!
//! Concurrency is opt-in per [`RunConfig::worker_count`]: `parallel_block` and other
//! uses of [`Eval::eval_concurrently`] fan out over a `crossbeam_utils` scoped thread
//! pool when more than one worker is configured, and fall back to in-order sequential
//! evaluation otherwise. A node's own `Variable`/`Lambda` storage is guarded by the
//! `parking_lot::RwLock` in [`crate::primitive::Node`], so a concurrent `store` racing
//! a reader is sound either way.

use std::sync::Arc;

use crossbeam_utils::thread;

use crate::arithmetic::{self, BinOp};
use crate::config::RunConfig;
use crate::control::{self, Eval, EvalResult};
use crate::errors::PhylanxError;
use crate::node_data::Scalar;
use crate::primitive::{Graph, Node, NodeKind};
use crate::reader::CodeRange;
use crate::resource::ResourceTracker;
use crate::slicing::{self, RawIndex};
use crate::tracer::{NoopTracer, Tracer};
use crate::value::{DictKey, PrimitiveId, Value};

/// Walks a compiled graph, dispatching every [`NodeKind`] against a [`RunConfig`].
pub struct Evaluator<'g, T: Tracer = NoopTracer> {
    graph: &'g Graph,
    config: RunConfig,
    resources: ResourceTracker,
    tracer: T,
}

impl<'g> Evaluator<'g, NoopTracer> {
    /// Builds an evaluator with tracing disabled — the production default.
    #[must_use]
    pub fn new(graph: &'g Graph, config: RunConfig) -> Self {
        Self::with_tracer(graph, config, NoopTracer)
    }
}

impl<'g, T: Tracer> Evaluator<'g, T> {
    #[must_use]
    pub fn with_tracer(graph: &'g Graph, config: RunConfig, tracer: T) -> Self {
        let resources = ResourceTracker::new(&config);
        Self {
            graph,
            config,
            resources,
            tracer,
        }
    }

    /// Evaluates the graph's root with no bound arguments — the entry point for
    /// running a compiled top-level program.
    pub fn run(&self) -> EvalResult
    where
        T: Sync,
    {
        self.eval(self.graph.root, &[])
    }

    #[must_use]
    pub fn nodes_evaluated(&self) -> usize {
        self.resources.nodes_evaluated()
    }

    /// Reads a `Variable`/`Lambda`-storage node's stored value. A stored handle onto a
    /// `Lambda` node is a function value and is returned as-is, without auto-invoking
    /// it; anything else is either a plain value (after a `store`) or a pointer to the
    /// expression `define` originally bound, evaluated transparently by forwarding the
    /// caller's own arguments.
    fn load_variable(&self, var_id: PrimitiveId, args: &[Value]) -> EvalResult
    where
        T: Sync,
    {
        let node = self.graph.get(var_id);
        let pos = CodeRange::new(0, node.name.col);
        let stored = node
            .load()
            .ok_or_else(|| PhylanxError::binding("executor", pos, format!("'{}' read before its first store", node.name.compose())))?;
        match stored {
            Value::Primitive(source_id) if self.graph.get(source_id).kind == NodeKind::Lambda => Ok(Value::Primitive(source_id)),
            Value::Primitive(source_id) => self.eval(source_id, args),
            other => Ok(other),
        }
    }

    fn eval_binop(&self, op: BinOp, node: &Node, args: &[Value], pos: CodeRange) -> EvalResult
    where
        T: Sync,
    {
        let lhs = self.eval(node.operands[0], args)?;
        let rhs = self.eval(node.operands[1], args)?;
        arithmetic::binary_op(op, &lhs, &rhs, pos)
    }

    fn eval_apply(&self, node: &Node, args: &[Value], pos: CodeRange) -> EvalResult
    where
        T: Sync,
    {
        let function = self.eval(node.operands[0], args)?;
        let mut call_args = Vec::with_capacity(node.operands.len() - 1);
        for &operand in &node.operands[1..] {
            call_args.push(self.eval(operand, args)?);
        }
        self.apply(&function, &call_args, pos)
    }

    fn eval_argmax(&self, node: &Node, args: &[Value], pos: CodeRange) -> EvalResult
    where
        T: Sync,
    {
        let value = self.eval(node.operands[0], args)?;
        let axis = match node.operands.get(1) {
            Some(&id) => Some(self.eval(id, args)?.as_f64(pos)? as i64),
            None => None,
        };
        arithmetic::argmax(&value, axis, pos)
    }

    fn eval_constant(&self, node: &Node, args: &[Value], pos: CodeRange) -> EvalResult
    where
        T: Sync,
    {
        let value = self.eval(node.operands[0], args)?.as_f64(pos)?;
        let size = self.eval(node.operands[1], args)?.as_f64(pos)? as i64;
        arithmetic::constant(value, size, pos)
    }

    fn eval_dict_ctor(&self, operands: &[PrimitiveId], args: &[Value], pos: CodeRange) -> EvalResult
    where
        T: Sync,
    {
        if operands.len() % 2 != 0 {
            return Err(PhylanxError::arity("dict", pos, "dict requires an even number of key/value operands"));
        }
        let mut map = indexmap::IndexMap::with_hasher(ahash::RandomState::default());
        let mut rest = operands.iter();
        while let (Some(&key_id), Some(&value_id)) = (rest.next(), rest.next()) {
            let key = self.eval(key_id, args)?.as_dict_key(pos)?;
            let value = self.eval(value_id, args)?;
            map.insert(key, value);
        }
        Ok(Value::Dict(Arc::new(map)))
    }

    fn eval_dict_keys(&self, dict_id: PrimitiveId, args: &[Value], pos: CodeRange) -> EvalResult
    where
        T: Sync,
    {
        let value = self.eval(dict_id, args)?;
        let Value::Dict(map) = value else {
            return Err(PhylanxError::type_mismatch("dict_keys", pos, format!("expected a dictionary, found {}", value.type_name())));
        };
        let keys = map
            .keys()
            .map(|key| match key {
                DictKey::Bool(b) => Value::Bool(*b),
                DictKey::Int(i) => Value::Scalar(Scalar::I64(*i)),
                DictKey::Str(s) => Value::Str(Arc::clone(s)),
            })
            .collect();
        Ok(Value::list(keys))
    }

    /// `slice(target, idx)` / `slice(target, row_idx, col_idx)`. A vector target takes
    /// one index; a matrix target takes one (selecting a full row) or two.
    fn eval_slice(&self, node: &Node, args: &[Value], pos: CodeRange) -> EvalResult
    where
        T: Sync,
    {
        let target = self.eval(node.operands[0], args)?.into_owned();
        match node.operands.len() {
            2 => {
                let index_value = self.eval(node.operands[1], args)?;
                let index = slicing::index_from_value(&index_value, pos)?;
                match target {
                    Value::Vector(v) => slicing::extract_vector(&v, &index, pos),
                    Value::Matrix(m) => slicing::extract_matrix(&m, &index, &RawIndex::Full, pos),
                    other => Err(PhylanxError::type_mismatch("slice", pos, format!("cannot slice a {}", other.type_name()))),
                }
            }
            3 => {
                let row_value = self.eval(node.operands[1], args)?;
                let col_value = self.eval(node.operands[2], args)?;
                let row_index = slicing::index_from_value(&row_value, pos)?;
                let col_index = slicing::index_from_value(&col_value, pos)?;
                match target {
                    Value::Matrix(m) => slicing::extract_matrix(&m, &row_index, &col_index, pos),
                    other => Err(PhylanxError::type_mismatch(
                        "slice",
                        pos,
                        format!("a two-index slice requires a matrix, found {}", other.type_name()),
                    )),
                }
            }
            _ => unreachable!("the compiler only ever emits a 2- or 3-operand slice"),
        }
    }

    /// `store(target, value)` / `store(slice(target, idx…), value)`. The target
    /// variable's storage is overwritten with the evaluated, concrete result — future
    /// reads return it directly rather than re-evaluating whatever expression `define`
    /// originally bound.
    fn eval_store(&self, node: &Node, args: &[Value], pos: CodeRange) -> EvalResult
    where
        T: Sync,
    {
        let new_value = self.eval(node.operands[0], args)?;
        let target = self.graph.get(node.aux);
        let updated = match node.operands.len() {
            1 => new_value,
            2 => {
                let current = self.load_variable(node.aux, args)?;
                let index_value = self.eval(node.operands[1], args)?;
                let index = slicing::index_from_value(&index_value, pos)?;
                slicing::assign_vector(current, &index, &new_value, pos)?
            }
            3 => {
                let current = self.load_variable(node.aux, args)?;
                let row_value = self.eval(node.operands[1], args)?;
                let col_value = self.eval(node.operands[2], args)?;
                let row_index = slicing::index_from_value(&row_value, pos)?;
                let col_index = slicing::index_from_value(&col_value, pos)?;
                slicing::assign_matrix(current, &row_index, &col_index, &new_value, pos)?
            }
            _ => unreachable!("the compiler only ever emits a 1-, 2-, or 3-operand store"),
        };
        target.store(updated.clone());
        self.tracer.on_store(&target.name.compose());
        Ok(updated)
    }

    fn dispatch(&self, id: PrimitiveId, node: &Node, args: &[Value], pos: CodeRange) -> EvalResult
    where
        T: Sync,
    {
        match node.kind {
            NodeKind::Literal => Ok(node.literal_value().cloned().unwrap_or(Value::Nil)),
            NodeKind::AccessArgument => args.get(node.aux as usize).cloned().ok_or_else(|| {
                PhylanxError::arity(
                    "executor",
                    pos,
                    format!("argument index {} out of range for {} bound argument(s)", node.aux, args.len()),
                )
            }),
            NodeKind::Variable => self.load_variable(id, args),
            NodeKind::AccessVariable | NodeKind::AccessFunction => self.load_variable(node.operands[0], args),
            NodeKind::Apply => self.eval_apply(node, args, pos),
            NodeKind::Lambda => Ok(Value::Primitive(id)),
            NodeKind::Block => control::block(self, &node.operands, args),
            NodeKind::ParallelBlock => control::parallel_block(self, &node.operands, args),
            NodeKind::If => control::if_then_else(self, node.operands[0], node.operands[1], node.operands.get(2).copied(), args, pos),
            NodeKind::While => control::while_loop(self, node.operands[0], node.operands[1], args, pos),
            NodeKind::For => control::for_loop(self, node.operands[0], node.operands[1], node.operands[2], node.operands[3], args, pos),
            NodeKind::ForEach => control::for_each(self, node.operands[0], node.operands[1], args, pos),
            NodeKind::FoldLeft => control::fold_left(self, node.operands[0], node.operands[1], node.operands[2], args, pos),
            NodeKind::ListCtor => Ok(Value::list(self.eval_concurrently(&node.operands, args)?)),
            NodeKind::DictCtor => self.eval_dict_ctor(&node.operands, args, pos),
            NodeKind::DictKeys => self.eval_dict_keys(node.operands[0], args, pos),
            NodeKind::Add => self.eval_binop(BinOp::Add, node, args, pos),
            NodeKind::Sub => self.eval_binop(BinOp::Sub, node, args, pos),
            NodeKind::Mul => self.eval_binop(BinOp::Mul, node, args, pos),
            NodeKind::Div => self.eval_binop(BinOp::Div, node, args, pos),
            NodeKind::Lt => self.eval_binop(BinOp::Lt, node, args, pos),
            NodeKind::Le => self.eval_binop(BinOp::Le, node, args, pos),
            NodeKind::Gt => self.eval_binop(BinOp::Gt, node, args, pos),
            NodeKind::Ge => self.eval_binop(BinOp::Ge, node, args, pos),
            NodeKind::Eq => self.eval_binop(BinOp::Eq, node, args, pos),
            NodeKind::Ne => self.eval_binop(BinOp::Ne, node, args, pos),
            NodeKind::Neg => arithmetic::negate(&self.eval(node.operands[0], args)?, pos),
            NodeKind::Dot => {
                let lhs = self.eval(node.operands[0], args)?;
                let rhs = self.eval(node.operands[1], args)?;
                arithmetic::dot(&lhs, &rhs, pos)
            }
            NodeKind::Inverse => arithmetic::inverse(&self.eval(node.operands[0], args)?, pos),
            NodeKind::Argmax => self.eval_argmax(node, args, pos),
            NodeKind::Exp => arithmetic::exp(&self.eval(node.operands[0], args)?, pos),
            NodeKind::Constant => self.eval_constant(node, args, pos),
            NodeKind::Slice => self.eval_slice(node, args, pos),
            NodeKind::Store => self.eval_store(node, args, pos),
        }
    }
}

impl<'g, T: Tracer + Sync> Eval for Evaluator<'g, T> {
    fn eval(&self, id: PrimitiveId, args: &[Value]) -> EvalResult {
        self.resources
            .record_node()
            .map_err(|err| PhylanxError::domain("resource", CodeRange::new(0, 0), err.to_string()))?;
        let node = self.graph.get(id);
        self.tracer.on_eval(&node.name.compose());
        let pos = CodeRange::new(0, node.name.col);
        let result = self.dispatch(id, node, args, pos);
        if let Err(ref err) = result {
            self.tracer.on_error(err);
        }
        result
    }

    fn eval_concurrently(&self, ids: &[PrimitiveId], args: &[Value]) -> Result<Vec<Value>, PhylanxError> {
        if self.config.worker_count <= 1 || ids.len() <= 1 {
            return ids.iter().map(|&id| self.eval(id, args)).collect();
        }
        thread::scope(|scope| {
            let handles: Vec<_> = ids.iter().map(|&id| scope.spawn(move |_| self.eval(id, args))).collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("evaluator worker thread panicked"))
                .collect()
        })
        .expect("scoped thread pool joins every spawned worker before returning")
    }

    fn apply(&self, function: &Value, args: &[Value], pos: CodeRange) -> EvalResult {
        let Value::Primitive(lambda_id) = function else {
            return Err(PhylanxError::type_mismatch("apply", pos, format!("expected a function value, found {}", function.type_name())));
        };
        let _guard = self
            .resources
            .enter_call()
            .map_err(|err| PhylanxError::domain("resource", pos, err.to_string()))?;
        let lambda = self.graph.get(*lambda_id);
        if lambda.kind != NodeKind::Lambda {
            return Err(PhylanxError::type_mismatch("apply", pos, "function value does not reference a lambda node"));
        }
        if lambda.aux as usize != args.len() {
            return Err(PhylanxError::arity(
                "apply",
                pos,
                format!("function expects {} argument(s), found {}", lambda.aux, args.len()),
            ));
        }
        self.eval(lambda.operands[0], args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::pattern::PatternRegistry;
    use crate::reader::parse;

    fn run(src: &str) -> Value {
        let patterns = PatternRegistry::builtin();
        let expr = parse(src).unwrap();
        let graph = Compiler::new("test", &patterns, 0).compile_program(&expr).unwrap();
        Evaluator::new(&graph, RunConfig::single_threaded()).run().unwrap()
    }

    fn run_err(src: &str) -> PhylanxError {
        let patterns = PatternRegistry::builtin();
        let expr = parse(src).unwrap();
        let graph = Compiler::new("test", &patterns, 0).compile_program(&expr).unwrap();
        Evaluator::new(&graph, RunConfig::single_threaded()).run().unwrap_err()
    }

    #[test]
    fn arithmetic_and_block_evaluate_in_order() {
        assert_eq!(run("block(define(x, 2), define(y, 3), x * y + 1)"), Value::scalar(7.0));
    }

    #[test]
    fn if_selects_branch_by_condition() {
        assert_eq!(run("if(1 < 2, 10, 20)"), Value::scalar(10.0));
        assert_eq!(run("if(1 > 2, 10, 20)"), Value::scalar(20.0));
    }

    #[test]
    fn while_loop_accumulates_through_store() {
        let result = run("block(define(i, 0), define(acc, 0), while(i < 5, block(store(acc, acc + i), store(i, i + 1))), acc)");
        assert_eq!(result, Value::scalar(10.0));
    }

    #[test]
    fn recursive_function_computes_factorial() {
        assert_eq!(run("block(define(f, n, if(n < 2, 1, n * f(n - 1))), f(5))"), Value::scalar(120.0));
    }

    #[test]
    fn lambda_value_applies_through_for_each() {
        let result = run("block(define(total, 0), for_each(lambda(x, store(total, total + x)), list(1, 2, 3)), total)");
        assert_eq!(result, Value::scalar(6.0));
    }

    #[test]
    fn fold_left_sums_a_list_with_a_lambda() {
        assert_eq!(run("fold_left(lambda(acc, x, acc + x), 0, list(1, 2, 3, 4))"), Value::scalar(10.0));
    }

    #[test]
    fn slice_store_mutates_a_vector_in_place() {
        let result = run("block(define(v, list(1, 2, 3)), store(v, list(9, 9, 9)), v)");
        assert_eq!(result, Value::list(vec![Value::scalar(9.0), Value::scalar(9.0), Value::scalar(9.0)]));
    }

    #[test]
    fn dict_keys_round_trips_construction_keys() {
        let result = run("dict_keys(dict(\"a\", 1, \"b\", 2))");
        assert_eq!(result, Value::list(vec![Value::string("a"), Value::string("b")]));
    }

    #[test]
    fn arity_mismatch_on_apply_is_reported() {
        let err = run_err("block(define(f, x, x + 1), f(1, 2))");
        assert_eq!(err.kind, crate::errors::ErrorKind::Arity);
    }

    #[test]
    fn node_count_ceiling_halts_evaluation() {
        let patterns = PatternRegistry::builtin();
        let expr = parse("block(define(i, 0), while(i < 1000000, store(i, i + 1)), i)").unwrap();
        let graph = Compiler::new("test", &patterns, 0).compile_program(&expr).unwrap();
        let config = RunConfig::single_threaded().with_max_nodes(Some(50));
        let err = Evaluator::new(&graph, config).run().unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Domain);
    }
}
