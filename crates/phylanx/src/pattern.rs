//! The pattern registry: the extensible table the compiler dispatches through.
//!
//! Each entry maps a primitive name to one or more pattern strings (themselves parsed as
//! ASTs containing `_k`/`__k` placeholders), a docstring, and the [`PrimitiveKind`] the
//! compiler should emit on a match. The registry is process-wide and built once; per
//! [`crate::name`] order is significant on ties, so it is represented as an ordered
//! multimap (a `Vec` walked front-to-back) rather than a `HashMap`.

use crate::ast::Expr;
use crate::reader::parse;

/// The primitive kind a pattern match should instantiate.
///
/// This is the "factory" of the specification's pattern entry tuple: given a successful
/// match, the compiler looks at `PrimitiveKind` to decide which node to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Define,
    Lambda,
    Slice,
    Block,
    ParallelBlock,
    If,
    While,
    For,
    ForEach,
    FoldLeft,
    ListCtor,
    DictCtor,
    DictKeys,
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Neg,
    Dot,
    Inverse,
    Argmax,
    Exp,
    Store,
    Constant,
}

/// A single registered pattern string, already parsed into its pattern-AST.
pub struct CompiledPattern {
    pub text: &'static str,
    pub ast: Expr,
}

/// One row of the pattern table: a primitive name, its kind, docstring, and the parsed
/// pattern ASTs that recognize it in surface syntax.
pub struct PatternEntry {
    pub name: &'static str,
    pub kind: PrimitiveKind,
    pub doc: &'static str,
    pub patterns: Vec<CompiledPattern>,
}

/// The pattern registry: an ordered list of [`PatternEntry`] rows.
///
/// Lookup by name preserves registration order, so that when two patterns for the same
/// name both structurally match, the first-registered one wins — mirroring
/// `lower_bound(name)` iteration over an ordered multimap.
pub struct PatternRegistry {
    entries: Vec<PatternEntry>,
}

impl PatternRegistry {
    fn push(&mut self, name: &'static str, kind: PrimitiveKind, doc: &'static str, patterns: &[&'static str]) {
        let compiled = patterns
            .iter()
            .map(|text| CompiledPattern {
                text,
                ast: parse(text).unwrap_or_else(|err| panic!("built-in pattern {text:?} failed to parse: {err}")),
            })
            .collect();
        self.entries.push(PatternEntry {
            name,
            kind,
            doc,
            patterns: compiled,
        });
    }

    /// Every entry registered under `name`, in registration order.
    pub fn lookup(&self, name: &str) -> impl Iterator<Item = &PatternEntry> {
        self.entries.iter().filter(move |e| e.name == name)
    }

    /// Every entry, regardless of name, in registration order. Used when compiling an
    /// expression with no callee name to key on (operator infix chains, prefix negation).
    pub fn all(&self) -> impl Iterator<Item = &PatternEntry> {
        self.entries.iter()
    }

    /// Builds the built-in pattern table described by the specification's external
    /// interfaces section: control flow, binary/unary arithmetic, list/dict constructors,
    /// and the numeric primitives named in §1.
    #[must_use]
    pub fn builtin() -> Self {
        let mut reg = Self { entries: Vec::new() };

        reg.push("define", PrimitiveKind::Define, "Binds a name to a variable or function.", &[
            "define(_1, _2)",
            "define(_1, __2)",
        ]);
        reg.push("lambda", PrimitiveKind::Lambda, "Creates an anonymous function value.", &["lambda(__1)"]);
        reg.push("slice", PrimitiveKind::Slice, "Extracts or targets a sub-range of a value.", &[
            "slice(_1, _2)",
            "slice(_1, _2, _3)",
        ]);
        reg.push("store", PrimitiveKind::Store, "Assigns a value into a (possibly sliced) target.", &[
            "store(_1, _2)",
        ]);

        reg.push("block", PrimitiveKind::Block, "Evaluates operands in order, returning the last.", &[
            "block(__1)",
        ]);
        reg.push(
            "parallel_block",
            PrimitiveKind::ParallelBlock,
            "Evaluates operands concurrently, returning the last.",
            &["parallel_block(__1)"],
        );
        reg.push("if", PrimitiveKind::If, "Conditional evaluation.", &["if(_1, _2)", "if(_1, _2, _3)"]);
        reg.push("while", PrimitiveKind::While, "Repeats body while condition holds.", &["while(_1, _2)"]);
        reg.push("for", PrimitiveKind::For, "C-style counted loop.", &["for(_1, _2, _3, _4)"]);
        reg.push("for_each", PrimitiveKind::ForEach, "Applies a function to each element of a sequence.", &[
            "for_each(_1, _2)",
        ]);
        reg.push("fold_left", PrimitiveKind::FoldLeft, "Left fold with an accumulator.", &["fold_left(_1, _2, _3)"]);

        reg.push("list", PrimitiveKind::ListCtor, "Constructs a list value.", &["list(__1)"]);
        reg.push("dict", PrimitiveKind::DictCtor, "Constructs a dictionary value from key/value pairs.", &[
            "dict(__1)",
        ]);
        reg.push("dict_keys", PrimitiveKind::DictKeys, "Returns the list of keys of a dictionary.", &[
            "dict_keys(_1)",
        ]);

        reg.push("__add", PrimitiveKind::Add, "Element-wise addition.", &["_1 + _2"]);
        reg.push("__sub", PrimitiveKind::Sub, "Element-wise subtraction.", &["_1 - _2"]);
        reg.push("__mul", PrimitiveKind::Mul, "Element-wise multiplication.", &["_1 * _2"]);
        reg.push("__div", PrimitiveKind::Div, "Element-wise division.", &["_1 / _2"]);
        reg.push("__lt", PrimitiveKind::Lt, "Less-than comparison.", &["_1 < _2"]);
        reg.push("__le", PrimitiveKind::Le, "Less-or-equal comparison.", &["_1 <= _2"]);
        reg.push("__gt", PrimitiveKind::Gt, "Greater-than comparison.", &["_1 > _2"]);
        reg.push("__ge", PrimitiveKind::Ge, "Greater-or-equal comparison.", &["_1 >= _2"]);
        reg.push("__eq", PrimitiveKind::Eq, "Equality comparison.", &["_1 == _2"]);
        reg.push("__ne", PrimitiveKind::Ne, "Inequality comparison.", &["_1 != _2"]);

        reg.push("dot", PrimitiveKind::Dot, "Matrix/vector product (delegates to the array library).", &[
            "dot(_1, _2)",
        ]);
        reg.push("inverse", PrimitiveKind::Inverse, "Matrix inverse (delegates to the array library).", &[
            "inverse(_1)",
        ]);
        reg.push("argmax", PrimitiveKind::Argmax, "Index of the largest element along an axis.", &[
            "argmax(_1)",
            "argmax(_1, _2)",
        ]);
        reg.push("exp", PrimitiveKind::Exp, "Element-wise exponential.", &["exp(_1)"]);
        reg.push("__neg", PrimitiveKind::Neg, "Unary negation.", &["-_1"]);
        reg.push("constant", PrimitiveKind::Constant, "Creates an array filled with a constant value.", &[
            "constant(_1, _2)",
        ]);

        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_preserves_registration_order() {
        let reg = PatternRegistry::builtin();
        let names: Vec<_> = reg.lookup("define").map(|e| e.patterns[0].text).collect();
        assert_eq!(names, vec!["define(_1, _2)"]);
    }

    #[test]
    fn every_builtin_pattern_parses() {
        // Construction itself panics on a parse failure; this just forces it to run.
        let reg = PatternRegistry::builtin();
        assert!(reg.lookup("for").next().is_some());
    }
}
