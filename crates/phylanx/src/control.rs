//! Control-flow primitive semantics: `block`, `parallel_block`, `if`, `while`, `for`,
//! `for_each`, `fold_left`.
//!
//! These functions describe *semantics*, not scheduling: they are generic over any
//! [`Eval`] so the executor can hand them either the direct-execution path or the
//! worker-pool path without duplicating the control-flow rules themselves. Loop bodies
//! are driven by a plain Rust loop rather than recursion, so a long-running `while`/`for`
//! does not grow the native call stack the way a chain of scheduled continuations would.

use crate::errors::{ErrorKind, PhylanxError};
use crate::reader::CodeRange;
use crate::value::{PrimitiveId, Value};

pub type EvalResult = Result<Value, PhylanxError>;

/// Anything able to evaluate a child primitive by id, given the arguments the caller
/// was itself invoked with. Implemented by the executor; control-flow code only ever
/// goes through this trait, never touching the graph directly.
pub trait Eval {
    fn eval(&self, id: PrimitiveId, args: &[Value]) -> EvalResult;
    fn eval_concurrently(&self, ids: &[PrimitiveId], args: &[Value]) -> Result<Vec<Value>, PhylanxError>;
    fn apply(&self, function: &Value, args: &[Value], pos: CodeRange) -> EvalResult;
}

/// `block(e1, …, en)`: evaluate operands in source order, return the last. An error on
/// any operand short-circuits the remaining ones.
pub fn block(eval: &impl Eval, operands: &[PrimitiveId], args: &[Value]) -> EvalResult {
    let mut last = Value::Nil;
    for &id in operands {
        last = eval.eval(id, args)?;
    }
    Ok(last)
}

/// `parallel_block(e1, …, en)`: evaluate operands with no defined ordering between them
/// (the executor may hand them to different worker threads), return the last operand's
/// value. Any operand failing propagates; which one "wins" when several fail is
/// unspecified.
pub fn parallel_block(eval: &impl Eval, operands: &[PrimitiveId], args: &[Value]) -> EvalResult {
    let mut results = eval.eval_concurrently(operands, args)?;
    Ok(results.pop().unwrap_or(Value::Nil))
}

/// `if(c, t, e?)`.
pub fn if_then_else(
    eval: &impl Eval,
    cond: PrimitiveId,
    then_branch: PrimitiveId,
    else_branch: Option<PrimitiveId>,
    args: &[Value],
    pos: CodeRange,
) -> EvalResult {
    let cond_value = eval.eval(cond, args)?.as_bool(pos)?;
    if cond_value {
        eval.eval(then_branch, args)
    } else if let Some(else_branch) = else_branch {
        eval.eval(else_branch, args)
    } else {
        Ok(Value::Nil)
    }
}

/// `while(c, body)`: returns the last body value, or nil if the body never ran.
pub fn while_loop(eval: &impl Eval, cond: PrimitiveId, body: PrimitiveId, args: &[Value], pos: CodeRange) -> EvalResult {
    let mut last = Value::Nil;
    while eval.eval(cond, args)?.as_bool(pos)? {
        last = eval.eval(body, args)?;
    }
    Ok(last)
}

/// `for(init, cond, reinit, body)`: `init` runs exactly once; `reinit` runs after every
/// body evaluation, before the next `cond` check.
pub fn for_loop(
    eval: &impl Eval,
    init: PrimitiveId,
    cond: PrimitiveId,
    reinit: PrimitiveId,
    body: PrimitiveId,
    args: &[Value],
    pos: CodeRange,
) -> EvalResult {
    eval.eval(init, args)?;
    let mut last = Value::Nil;
    while eval.eval(cond, args)?.as_bool(pos)? {
        last = eval.eval(body, args)?;
        eval.eval(reinit, args)?;
    }
    Ok(last)
}

/// `for_each(f, seq)`: applies `f` to every element of `seq` (a list or vector),
/// discarding results; always returns nil.
pub fn for_each(eval: &impl Eval, function: PrimitiveId, seq: PrimitiveId, args: &[Value], pos: CodeRange) -> EvalResult {
    let f = eval.eval(function, args)?;
    let sequence = eval.eval(seq, args)?;
    for element in sequence_elements(&sequence, pos)? {
        eval.apply(&f, &[element], pos)?;
    }
    Ok(Value::Nil)
}

/// `fold_left(f, z, seq)`: left fold with accumulator `z`. An empty sequence returns
/// `z` unchanged.
pub fn fold_left(eval: &impl Eval, function: PrimitiveId, init: PrimitiveId, seq: PrimitiveId, args: &[Value], pos: CodeRange) -> EvalResult {
    let f = eval.eval(function, args)?;
    let mut acc = eval.eval(init, args)?;
    let sequence = eval.eval(seq, args)?;
    for element in sequence_elements(&sequence, pos)? {
        acc = eval.apply(&f, &[acc, element], pos)?;
    }
    Ok(acc)
}

fn sequence_elements(value: &Value, pos: CodeRange) -> Result<Vec<Value>, PhylanxError> {
    match value {
        Value::List(items) => Ok(items.as_ref().clone()),
        Value::Vector(v) => Ok((0..v.len()).map(|i| Value::Scalar(v.get_scalar(i))).collect()),
        Value::VectorRef(v) => Ok((0..v.len()).map(|i| Value::scalar(v.get_f64(i))).collect()),
        other => Err(PhylanxError::new(
            ErrorKind::TypeMismatch,
            "control-flow",
            pos,
            format!("expected a list or vector to iterate, found {}", other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_data::VectorData;
    use std::cell::RefCell;

    struct FakeEval {
        values: Vec<Value>,
        log: RefCell<Vec<u32>>,
    }

    impl Eval for FakeEval {
        fn eval(&self, id: PrimitiveId, _args: &[Value]) -> EvalResult {
            self.log.borrow_mut().push(id);
            Ok(self.values[id as usize].clone())
        }

        fn eval_concurrently(&self, ids: &[PrimitiveId], args: &[Value]) -> Result<Vec<Value>, PhylanxError> {
            ids.iter().map(|&id| self.eval(id, args)).collect()
        }

        fn apply(&self, _function: &Value, args: &[Value], _pos: CodeRange) -> EvalResult {
            // Pretends `f` is `+`.
            let sum = args.iter().try_fold(0.0, |acc, v| Ok::<_, PhylanxError>(acc + v.as_f64(CodeRange::default())?))?;
            Ok(Value::scalar(sum))
        }
    }

    fn pos() -> CodeRange {
        CodeRange::default()
    }

    #[test]
    fn block_returns_last_value_in_order() {
        let eval = FakeEval {
            values: vec![Value::scalar(1.0), Value::scalar(2.0), Value::scalar(3.0)],
            log: RefCell::new(Vec::new()),
        };
        let result = block(&eval, &[0, 1, 2], &[]).unwrap();
        assert_eq!(result, Value::scalar(3.0));
        assert_eq!(*eval.log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn for_loop_runs_init_exactly_once_when_condition_starts_false() {
        let eval = FakeEval {
            values: vec![Value::Nil, Value::Bool(false)],
            log: RefCell::new(Vec::new()),
        };
        let result = for_loop(&eval, 0, 1, 0, 0, &[], pos()).unwrap();
        assert_eq!(result, Value::Nil);
        assert_eq!(*eval.log.borrow(), vec![0, 1]);
    }

    #[test]
    fn fold_left_on_empty_list_returns_init_unchanged() {
        let eval = FakeEval {
            values: vec![Value::Nil, Value::scalar(42.0), Value::list(vec![])],
            log: RefCell::new(Vec::new()),
        };
        let result = fold_left(&eval, 0, 1, 2, &[], pos()).unwrap();
        assert_eq!(result, Value::scalar(42.0));
    }

    #[test]
    fn for_each_applies_function_to_every_element_without_returning_them() {
        let eval = FakeEval {
            values: vec![Value::Nil, Value::List(std::sync::Arc::new(vec![Value::scalar(1.0), Value::scalar(2.0)]))],
            log: RefCell::new(Vec::new()),
        };
        let result = for_each(&eval, 0, 1, &[], pos()).unwrap();
        assert_eq!(result, Value::Nil);
        let _ = VectorData::from_f64_vec(vec![]);
    }
}
