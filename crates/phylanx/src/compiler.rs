//! Walks an AST and emits a [`crate::primitive::Graph`].
//!
//! Dispatch order for a given expression (see module-level docs on each helper for the
//! corresponding special form):
//! 1. A function call looks its callee up in the pattern registry; the first pattern
//!    that structurally matches wins. `define`, `lambda`, `slice`, and `store` are
//!    handled directly since they need more than their operands compiled generically;
//!    everything else goes through [`Compiler::handle_placeholders`].
//! 2. A literal emits a literal-value node.
//! 3. An identifier resolves `nil`/`true`/`false` or an environment binding.
//! 4. A quoted list emits a list constructor directly.
//! 5. Anything else (operator chains) is matched against every registered pattern
//!    regardless of name.
//! 6. Nothing matched: a position-tagged parse/match error.
//!
//! The matcher's bindings are used only to decide whether a pattern applies: every
//! built-in pattern binds its placeholders in the same order as the subject
//! expression's own operands, so the compiler re-derives operand order directly from
//! the expression rather than threading the bindings map through.

use std::collections::HashMap;

use crate::ast::{Expr, InfixOp, Literal};
use crate::environment::{BuilderKind, CompiledFunctionBuilder, Environment};
use crate::errors::PhylanxError;
use crate::matcher::{match_expr, Bindings};
use crate::name::NameParts;
use crate::node_data::Scalar;
use crate::pattern::{PatternRegistry, PrimitiveKind};
use crate::primitive::{Graph, GraphBuilder, Node, NodeKind};
use crate::reader::CodeRange;
use crate::value::{PrimitiveId, Value};

impl From<PrimitiveKind> for NodeKind {
    fn from(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Define => Self::Literal, // unreachable: handled specially
            PrimitiveKind::Lambda => Self::Lambda,
            PrimitiveKind::Slice => Self::Slice,
            PrimitiveKind::Block => Self::Block,
            PrimitiveKind::ParallelBlock => Self::ParallelBlock,
            PrimitiveKind::If => Self::If,
            PrimitiveKind::While => Self::While,
            PrimitiveKind::For => Self::For,
            PrimitiveKind::ForEach => Self::ForEach,
            PrimitiveKind::FoldLeft => Self::FoldLeft,
            PrimitiveKind::ListCtor => Self::ListCtor,
            PrimitiveKind::DictCtor => Self::DictCtor,
            PrimitiveKind::DictKeys => Self::DictKeys,
            PrimitiveKind::Add => Self::Add,
            PrimitiveKind::Sub => Self::Sub,
            PrimitiveKind::Mul => Self::Mul,
            PrimitiveKind::Div => Self::Div,
            PrimitiveKind::Lt => Self::Lt,
            PrimitiveKind::Le => Self::Le,
            PrimitiveKind::Gt => Self::Gt,
            PrimitiveKind::Ge => Self::Ge,
            PrimitiveKind::Eq => Self::Eq,
            PrimitiveKind::Ne => Self::Ne,
            PrimitiveKind::Neg => Self::Neg,
            PrimitiveKind::Dot => Self::Dot,
            PrimitiveKind::Inverse => Self::Inverse,
            PrimitiveKind::Argmax => Self::Argmax,
            PrimitiveKind::Exp => Self::Exp,
            PrimitiveKind::Store => Self::Store,
            PrimitiveKind::Constant => Self::Constant,
        }
    }
}

/// Per-compilation state: monotone per-kind sequence numbers and the invocation id
/// embedded in every name this compiler emits.
struct Snippets {
    sequence_numbers: HashMap<&'static str, u32>,
    compile_id: u32,
}

impl Snippets {
    fn new(compile_id: u32) -> Self {
        Self {
            sequence_numbers: HashMap::new(),
            compile_id,
        }
    }

    fn next_sequence(&mut self, primitive: &'static str) -> u32 {
        let counter = self.sequence_numbers.entry(primitive).or_insert(0);
        let value = *counter;
        *counter += 1;
        value
    }
}

/// Compiles one program's AST into a primitive graph against a fixed pattern registry.
pub struct Compiler<'p> {
    patterns: &'p PatternRegistry,
    builder: GraphBuilder,
    snippets: Snippets,
    codename: String,
}

impl<'p> Compiler<'p> {
    #[must_use]
    pub fn new(codename: impl Into<String>, patterns: &'p PatternRegistry, compile_id: u32) -> Self {
        Self {
            patterns,
            builder: GraphBuilder::default(),
            snippets: Snippets::new(compile_id),
            codename: codename.into(),
        }
    }

    /// Compiles a full program, returning the resulting graph with `expr`'s compiled
    /// node as the root.
    pub fn compile_program(mut self, expr: &Expr) -> Result<Graph, PhylanxError> {
        let builtin_names: Vec<String> = self.patterns.all().map(|e| e.name.to_owned()).collect();
        let mut env = Environment::with_builtins(builtin_names);
        let root = self.compile(expr, &mut env)?;
        Ok(self.builder.finish(root))
    }

    fn name(&mut self, primitive: &'static str, col: usize) -> NameParts {
        let seq = self.snippets.next_sequence(primitive);
        NameParts::new(primitive, seq, col, self.snippets.compile_id)
    }

    fn compile(&mut self, expr: &Expr, env: &mut Environment) -> Result<PrimitiveId, PhylanxError> {
        match expr {
            Expr::Literal(lit, pos) => Ok(self.compile_literal(lit, *pos)),
            Expr::Identifier(name, pos) => self.compile_identifier(name, *pos, env),
            Expr::List(items, pos) => self.compile_list_literal(items, *pos, env),
            Expr::Call { callee, args, position } => {
                let Expr::Identifier(name, _) = callee.as_ref() else {
                    return Err(PhylanxError::parse_match(&self.codename, *position, "call target must be a plain identifier"));
                };
                let patterns = self.patterns;
                for entry in patterns.lookup(name) {
                    for candidate in &entry.patterns {
                        let mut bindings = Bindings::default();
                        if match_expr(expr, &candidate.ast, &mut bindings) {
                            return self.dispatch_call(entry.kind, name, args, env, *position);
                        }
                    }
                }
                // Not a built-in: if `name` resolves to a user `define`d/`lambda` binding,
                // this is a function application rather than a pattern-dispatched primitive.
                if let Some(builder) = env.lookup(name) {
                    if matches!(builder.kind, BuilderKind::AccessFunction | BuilderKind::AccessVariable) {
                        return self.compile_apply(builder, args, env, *position);
                    }
                }
                Err(PhylanxError::parse_match(
                    &self.codename,
                    *position,
                    format!("'{name}' matched no registered pattern for {} argument(s)", args.len()),
                ))
            }
            Expr::Prefix { .. } | Expr::Infix { .. } => self.compile_operator_chain(expr, env),
        }
    }

    fn dispatch_call(
        &mut self,
        kind: PrimitiveKind,
        name: &str,
        args: &[Expr],
        env: &mut Environment,
        pos: CodeRange,
    ) -> Result<PrimitiveId, PhylanxError> {
        match kind {
            PrimitiveKind::Define => self.compile_define(args, env, pos),
            PrimitiveKind::Lambda => self.compile_lambda(args, env, pos),
            PrimitiveKind::Slice => self.compile_slice(args, env, pos),
            PrimitiveKind::Store => self.compile_store(args, env, pos),
            other => self.handle_placeholders(other, name, args, env, pos),
        }
    }

    fn compile_operator_chain(&mut self, expr: &Expr, env: &mut Environment) -> Result<PrimitiveId, PhylanxError> {
        let pos = expr.position();
        let patterns = self.patterns;
        for entry in patterns.all() {
            for candidate in &entry.patterns {
                let mut bindings = Bindings::default();
                if match_expr(expr, &candidate.ast, &mut bindings) {
                    let operands = self.compile_operator_operands(expr, env)?;
                    let node_kind: NodeKind = entry.kind.into();
                    let name = self.name(leak_primitive_name(entry.kind), pos.col);
                    return Ok(self.builder.push(Node::new(name, node_kind, operands)));
                }
            }
        }
        Err(PhylanxError::parse_match(&self.codename, pos, "expression matched no registered pattern"))
    }

    fn compile_operator_operands(&mut self, expr: &Expr, env: &mut Environment) -> Result<Vec<PrimitiveId>, PhylanxError> {
        match expr {
            Expr::Prefix { operand, .. } => Ok(vec![self.compile(operand, env)?]),
            Expr::Infix { first, rest, .. } => {
                let mut operands = vec![self.compile(first, env)?];
                for (_, rhs) in rest {
                    operands.push(self.compile(rhs, env)?);
                }
                Ok(operands)
            }
            _ => unreachable!("only called for prefix/infix expressions"),
        }
    }

    /// General case: every operand the matched pattern covers compiles into a child
    /// node, positionally, with the resulting kind-tagged node as the parent.
    fn handle_placeholders(
        &mut self,
        kind: PrimitiveKind,
        name: &str,
        args: &[Expr],
        env: &mut Environment,
        pos: CodeRange,
    ) -> Result<PrimitiveId, PhylanxError> {
        let mut operands = Vec::with_capacity(args.len());
        for arg in args {
            operands.push(self.compile(arg, env)?);
        }
        let node_kind: NodeKind = kind.into();
        let node_name = self.name(leak_name(name), pos.col);
        Ok(self.builder.push(Node::new(node_name, node_kind, operands)))
    }

    fn compile_literal(&mut self, lit: &Literal, pos: CodeRange) -> PrimitiveId {
        let value = match lit {
            Literal::Nil => Value::Nil,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Scalar(Scalar::I64(*i)),
            Literal::Float(f) => Value::scalar(*f),
            Literal::Str(s) => Value::string(s.as_str()),
        };
        let name = self.name("constant", pos.col);
        self.builder.push(Node::literal(name, value))
    }

    fn compile_list_literal(&mut self, items: &[Expr], pos: CodeRange, env: &mut Environment) -> Result<PrimitiveId, PhylanxError> {
        let mut operands = Vec::with_capacity(items.len());
        for item in items {
            operands.push(self.compile(item, env)?);
        }
        let name = self.name("list", pos.col);
        Ok(self.builder.push(Node::new(name, NodeKind::ListCtor, operands)))
    }

    fn compile_identifier(&mut self, name: &str, pos: CodeRange, env: &mut Environment) -> Result<PrimitiveId, PhylanxError> {
        match name {
            "nil" => Ok(self.compile_literal(&Literal::Nil, pos)),
            "true" => Ok(self.compile_literal(&Literal::Bool(true), pos)),
            "false" => Ok(self.compile_literal(&Literal::Bool(false), pos)),
            _ => {
                let builder = env
                    .lookup(name)
                    .ok_or_else(|| PhylanxError::binding(&self.codename, pos, format!("undefined identifier '{name}'")))?;
                match builder.kind {
                    BuilderKind::AccessVariable => {
                        let node_name = self.name("access-variable", pos.col);
                        Ok(self.builder.push(Node::new(node_name, NodeKind::AccessVariable, vec![builder.target])))
                    }
                    BuilderKind::AccessFunction => {
                        let node_name = self.name("access-function", pos.col);
                        Ok(self.builder.push(Node::new(node_name, NodeKind::AccessFunction, vec![builder.target])))
                    }
                    BuilderKind::AccessArgument => {
                        let node_name = self.name("access-argument", pos.col);
                        Ok(self
                            .builder
                            .push(Node::new(node_name, NodeKind::AccessArgument, Vec::new()).with_aux(builder.target)))
                    }
                    BuilderKind::Builtin | BuilderKind::Literal => Err(PhylanxError::binding(
                        &self.codename,
                        pos,
                        format!("'{name}' names a primitive and must be called, not used as a value"),
                    )),
                }
            }
        }
    }

    /// `define(name, body)` or `define(name, arg1, …, argn, body)`.
    fn compile_define(&mut self, args: &[Expr], env: &mut Environment, pos: CodeRange) -> Result<PrimitiveId, PhylanxError> {
        if args.len() < 2 {
            return Err(PhylanxError::arity(&self.codename, pos, "define requires a name and a body"));
        }
        let Expr::Identifier(name, _) = &args[0] else {
            return Err(PhylanxError::binding(&self.codename, pos, "define's first argument must be an identifier"));
        };
        let name = name.clone();

        let variable_name = self.name("variable", pos.col);
        let variable_id = self.builder.push(Node::new(variable_name, NodeKind::Variable, Vec::new()));

        // Bind before compiling the body so a self-recursive reference resolves to the
        // primitive id that is about to hold it.
        env.bind(name.clone(), CompiledFunctionBuilder::access_variable(variable_id));

        let (body_id, is_function) = if args.len() > 2 {
            let lambda_id = self.compile_lambda(&args[1..], env, pos)?;
            (lambda_id, true)
        } else {
            let body_id = self.compile(&args[1], env)?;
            let is_function = self.builder.node(body_id).kind == NodeKind::Lambda;
            (body_id, is_function)
        };

        self.builder.node(variable_id).store(Value::Primitive(body_id));

        if is_function {
            if let Some(builder) = env.lookup_local_mut(&name) {
                builder.promote_to_function();
            }
            let node_name = self.name("function-access", pos.col);
            Ok(self.builder.push(Node::new(node_name, NodeKind::AccessFunction, vec![variable_id])))
        } else {
            let node_name = self.name("variable-access", pos.col);
            Ok(self.builder.push(Node::new(node_name, NodeKind::AccessVariable, vec![variable_id])))
        }
    }

    /// `lambda(arg1, …, argn, body)`.
    fn compile_lambda(&mut self, args: &[Expr], env: &mut Environment, pos: CodeRange) -> Result<PrimitiveId, PhylanxError> {
        if args.is_empty() {
            return Err(PhylanxError::arity(&self.codename, pos, "lambda requires at least a body"));
        }
        let (params, body) = args.split_at(args.len() - 1);
        let body = &body[0];

        let mut param_names = Vec::with_capacity(params.len());
        for p in params {
            let Expr::Identifier(n, ppos) = p else {
                return Err(PhylanxError::binding(&self.codename, pos, "lambda parameters must be identifiers"));
            };
            let _ = ppos;
            param_names.push(n.clone());
        }

        env.push_frame();
        for (i, n) in param_names.iter().enumerate() {
            env.bind(n.clone(), CompiledFunctionBuilder::access_argument(i as u32));
        }
        let body_id = self.compile(body, env)?;
        env.pop_frame();

        let name = self.name("lambda", pos.col);
        Ok(self
            .builder
            .push(Node::new(name, NodeKind::Lambda, vec![body_id]).with_aux(param_names.len() as u32)))
    }

    /// `slice(target, idx)` / `slice(target, idx_row, idx_col)`. When `target` is a
    /// bare variable reference, the variable's own primitive id is carried as the first
    /// operand directly (skipping an intermediate access node) so the variable performs
    /// the slice at read time instead of materializing first.
    fn compile_slice(&mut self, args: &[Expr], env: &mut Environment, pos: CodeRange) -> Result<PrimitiveId, PhylanxError> {
        if args.len() != 2 && args.len() != 3 {
            return Err(PhylanxError::arity(&self.codename, pos, "slice takes a target and one or two indices"));
        }

        let target_id = if let Expr::Identifier(name, _) = &args[0] {
            match env.lookup(name) {
                Some(builder) if builder.kind == BuilderKind::AccessVariable => builder.target,
                _ => self.compile(&args[0], env)?,
            }
        } else {
            self.compile(&args[0], env)?
        };

        let mut operands = vec![target_id];
        for idx in &args[1..] {
            operands.push(self.compile(idx, env)?);
        }
        let name = self.name("slice", pos.col);
        Ok(self.builder.push(Node::new(name, NodeKind::Slice, operands)))
    }

    /// Compiles a call to a user `define`d/`lambda` binding: an access node for the
    /// function value, followed by each argument, wrapped in an `Apply` node.
    fn compile_apply(
        &mut self,
        builder: CompiledFunctionBuilder,
        args: &[Expr],
        env: &mut Environment,
        pos: CodeRange,
    ) -> Result<PrimitiveId, PhylanxError> {
        let access_kind = if builder.kind == BuilderKind::AccessFunction {
            NodeKind::AccessFunction
        } else {
            NodeKind::AccessVariable
        };
        let access_name = self.name("access-function", pos.col);
        let access_id = self.builder.push(Node::new(access_name, access_kind, vec![builder.target]));

        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(access_id);
        for arg in args {
            operands.push(self.compile(arg, env)?);
        }
        let name = self.name("apply", pos.col);
        Ok(self.builder.push(Node::new(name, NodeKind::Apply, operands)))
    }

    /// `store(target, value)`, where `target` is a variable reference or `slice(var, idx…)`.
    fn compile_store(&mut self, args: &[Expr], env: &mut Environment, pos: CodeRange) -> Result<PrimitiveId, PhylanxError> {
        if args.len() != 2 {
            return Err(PhylanxError::arity(&self.codename, pos, "store takes a target and a value"));
        }
        let value_id = self.compile(&args[1], env)?;

        let (target_var, index_ids) = match &args[0] {
            Expr::Identifier(name, ipos) => {
                let builder = env
                    .lookup(name)
                    .ok_or_else(|| PhylanxError::binding(&self.codename, *ipos, format!("undefined variable '{name}'")))?;
                (builder.target, Vec::new())
            }
            Expr::Call { callee, args: slice_args, .. } => {
                let Expr::Identifier(callee_name, _) = callee.as_ref() else {
                    return Err(PhylanxError::binding(&self.codename, pos, "store target must be a variable or a slice of one"));
                };
                if callee_name != "slice" || slice_args.is_empty() {
                    return Err(PhylanxError::binding(&self.codename, pos, "store target must be a variable or a slice of one"));
                }
                let Expr::Identifier(var_name, ipos) = &slice_args[0] else {
                    return Err(PhylanxError::binding(&self.codename, pos, "store's slice target must name a variable"));
                };
                let builder = env
                    .lookup(var_name)
                    .ok_or_else(|| PhylanxError::binding(&self.codename, *ipos, format!("undefined variable '{var_name}'")))?;
                let mut idx_ids = Vec::new();
                for idx in &slice_args[1..] {
                    idx_ids.push(self.compile(idx, env)?);
                }
                (builder.target, idx_ids)
            }
            _ => return Err(PhylanxError::binding(&self.codename, pos, "store target must be a variable or a slice of one")),
        };

        let mut operands = vec![value_id];
        operands.extend(index_ids);
        let name = self.name("store", pos.col);
        Ok(self.builder.push(Node::new(name, NodeKind::Store, operands).with_aux(target_var)))
    }
}

/// Pattern names and primitive-kind labels are all `&'static str` literals already;
/// this just widens the borrow from the registry entry to a `'static` one for reuse as
/// a node's primitive-kind tag, since `PatternEntry::name` already outlives the graph.
fn leak_name(name: &str) -> &'static str {
    match name {
        "define" => "define",
        "lambda" => "lambda",
        "slice" => "slice",
        "store" => "store",
        "block" => "block",
        "parallel_block" => "parallel_block",
        "if" => "if",
        "while" => "while",
        "for" => "for",
        "for_each" => "for_each",
        "fold_left" => "fold_left",
        "list" => "list",
        "dict" => "dict",
        "dict_keys" => "dict_keys",
        "access-function" => "access-function",
        "apply" => "apply",
        "dot" => "dot",
        "inverse" => "inverse",
        "argmax" => "argmax",
        "exp" => "exp",
        "constant" => "constant",
        _ => "primitive",
    }
}

fn leak_primitive_name(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Add => "add",
        PrimitiveKind::Sub => "sub",
        PrimitiveKind::Mul => "mul",
        PrimitiveKind::Div => "div",
        PrimitiveKind::Lt => "lt",
        PrimitiveKind::Le => "le",
        PrimitiveKind::Gt => "gt",
        PrimitiveKind::Ge => "ge",
        PrimitiveKind::Eq => "eq",
        PrimitiveKind::Ne => "ne",
        PrimitiveKind::Neg => "neg",
        _ => "operator",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse;

    fn compile_src(src: &str) -> Graph {
        let patterns = PatternRegistry::builtin();
        let expr = parse(src).unwrap();
        Compiler::new("test", &patterns, 0).compile_program(&expr).unwrap()
    }

    #[test]
    fn every_node_gets_a_unique_display_name() {
        let graph = compile_src("block(define(x, 1), define(y, 2), x + y)");
        assert!(graph.has_unique_names());
    }

    #[test]
    fn recursive_function_definition_compiles() {
        let graph = compile_src("block(define(f, n, if(n < 1, 1, n * f(n - 1))), f(5))");
        assert!(graph.len() > 1);
    }

    #[test]
    fn undefined_identifier_is_a_binding_error() {
        let patterns = PatternRegistry::builtin();
        let expr = parse("y").unwrap();
        let err = Compiler::new("test", &patterns, 0).compile_program(&expr).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Binding);
    }
}
