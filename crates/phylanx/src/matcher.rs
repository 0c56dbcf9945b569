//! Structural matcher between a subject expression and a pattern expression.
//!
//! A pattern placeholder is an identifier whose name starts with `_` (matches exactly one
//! subexpression) or `__` (matches zero or more trailing call arguments). Matching never
//! throws: failure is communicated by returning `false`, leaving `bindings` in a
//! possibly-partial state that the caller discards.

use std::collections::HashMap;

use crate::ast::{Expr, InfixOp};

/// Placeholder bindings collected by a successful match.
///
/// Single placeholders (`_k`) bind exactly one expression; variadic placeholders (`__k`)
/// accumulate every matched trailing argument in left-to-right insertion order.
#[derive(Debug, Clone, Default)]
pub struct Bindings<'e> {
    single: HashMap<String, &'e Expr>,
    variadic: HashMap<String, Vec<&'e Expr>>,
}

impl<'e> Bindings<'e> {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'e Expr> {
        self.single.get(key).copied()
    }

    #[must_use]
    pub fn get_variadic(&self, key: &str) -> &[&'e Expr] {
        self.variadic.get(key).map_or(&[], Vec::as_slice)
    }

    fn bind_single(&mut self, key: &str, expr: &'e Expr) {
        self.single.insert(key.to_owned(), expr);
    }

    fn bind_variadic(&mut self, key: &str, expr: &'e Expr) {
        self.variadic.entry(key.to_owned()).or_default().push(expr);
    }
}

fn placeholder_kind(name: &str) -> Option<PlaceholderKind> {
    if let Some(rest) = name.strip_prefix("__") {
        if !rest.is_empty() {
            return Some(PlaceholderKind::Variadic);
        }
    }
    if let Some(rest) = name.strip_prefix('_') {
        if !rest.is_empty() {
            return Some(PlaceholderKind::Single);
        }
    }
    None
}

enum PlaceholderKind {
    Single,
    Variadic,
}

/// Attempts to match `expr` against `pattern`, collecting placeholder bindings.
///
/// Returns `true` on a full structural match (and `bindings` holds every placeholder
/// capture); returns `false` on any mismatch.
pub fn match_expr<'e>(expr: &'e Expr, pattern: &Expr, bindings: &mut Bindings<'e>) -> bool {
    if let Expr::Identifier(name, _) = pattern {
        if let Some(PlaceholderKind::Single) = placeholder_kind(name) {
            bindings.bind_single(name, expr);
            return true;
        }
    }

    match (expr, pattern) {
        (Expr::Literal(a, _), Expr::Literal(b, _)) => a == b,
        (Expr::Identifier(a, _), Expr::Identifier(b, _)) => a == b,
        (
            Expr::Call { callee: ce, args: ca, .. },
            Expr::Call {
                callee: cp,
                args: pa,
                ..
            },
        ) => {
            let (Expr::Identifier(en, _), Expr::Identifier(pn, _)) = (ce.as_ref(), cp.as_ref()) else {
                return false;
            };
            if en != pn {
                return false;
            }
            match_arg_list(ca, pa, bindings)
        }
        (Expr::List(ea, _), Expr::List(pa, _)) => match_arg_list(ea, pa, bindings),
        (
            Expr::Prefix { op: eo, operand: ee, .. },
            Expr::Prefix {
                op: po, operand: pe, ..
            },
        ) => eo == po && match_expr(ee, pe, bindings),
        (
            Expr::Infix {
                first: ef, rest: er, ..
            },
            Expr::Infix {
                first: pf, rest: pr, ..
            },
        ) => {
            if er.len() != pr.len() || !match_expr(ef, pf, bindings) {
                return false;
            }
            er.iter()
                .zip(pr.iter())
                .all(|((eop, ee), (pop, pe)): (&(InfixOp, Expr), &(InfixOp, Expr))| {
                    eop == pop && match_expr(ee, pe, bindings)
                })
        }
        _ => false,
    }
}

/// Matches a call/list argument list, allowing the pattern's trailing argument to be a
/// variadic placeholder that consumes every remaining subject argument (including zero).
fn match_arg_list<'e>(exprs: &'e [Expr], pattern: &[Expr], bindings: &mut Bindings<'e>) -> bool {
    if let Some(Expr::Identifier(name, _)) = pattern.last() {
        if let Some(PlaceholderKind::Variadic) = placeholder_kind(name) {
            let fixed = &pattern[..pattern.len() - 1];
            if exprs.len() < fixed.len() {
                return false;
            }
            let (head, tail) = exprs.split_at(fixed.len());
            if !head.iter().zip(fixed).all(|(e, p)| match_expr(e, p, bindings)) {
                return false;
            }
            for e in tail {
                bindings.bind_variadic(name, e);
            }
            return true;
        }
    }

    if exprs.len() != pattern.len() {
        return false;
    }
    exprs.iter().zip(pattern).all(|(e, p)| match_expr(e, p, bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse;

    #[test]
    fn single_placeholder_binds_one_subexpression() {
        let expr = parse("add(1, 2)").unwrap();
        let pattern = parse("add(_1, _2)").unwrap();
        let mut bindings = Bindings::default();
        assert!(match_expr(&expr, &pattern, &mut bindings));
        assert_eq!(bindings.get("_1"), Some(&expr_arg(&expr, 0)));
        assert_eq!(bindings.get("_2"), Some(&expr_arg(&expr, 1)));
    }

    #[test]
    fn variadic_placeholder_binds_remaining_args_in_order() {
        let expr = parse("block(1, 2, 3, 4)").unwrap();
        let pattern = parse("block(__1)").unwrap();
        let mut bindings = Bindings::default();
        assert!(match_expr(&expr, &pattern, &mut bindings));
        assert_eq!(bindings.get_variadic("__1").len(), 4);
    }

    #[test]
    fn variadic_placeholder_matches_zero_arguments() {
        let expr = parse("block()").unwrap();
        let pattern = parse("block(__1)").unwrap();
        let mut bindings = Bindings::default();
        assert!(match_expr(&expr, &pattern, &mut bindings));
        assert!(bindings.get_variadic("__1").is_empty());
    }

    #[test]
    fn mismatched_call_name_fails_without_panicking() {
        let expr = parse("sub(1, 2)").unwrap();
        let pattern = parse("add(_1, _2)").unwrap();
        let mut bindings = Bindings::default();
        assert!(!match_expr(&expr, &pattern, &mut bindings));
    }

    fn expr_arg(expr: &Expr, idx: usize) -> Expr {
        match expr {
            Expr::Call { args, .. } => args[idx].clone(),
            _ => panic!("not a call"),
        }
    }
}
