//! Lexical scope used during compilation.
//!
//! An [`Environment`] is a stack of frames, each mapping a name to a
//! [`CompiledFunctionBuilder`]: a recipe the compiler uses to emit an access node
//! whenever that name is referenced. The top-level frame holds every builtin the
//! pattern registry knows about; nested frames (one per `define`/`lambda`) hold
//! user-defined bindings and argument slots.
//!
//! Recursion is resolved at this layer rather than by a raw back-pointer: a named
//! function's frame binds its own name to an `access-function` builder pointing at the
//! primitive id the compiler is about to populate via `store`, before the body is
//! compiled. By the time the body looks the name up, the binding already resolves to a
//! real (if not yet populated) primitive id, closing the cycle without unsafe aliasing.

use std::collections::HashMap;

use crate::value::PrimitiveId;

/// Where a name resolves, from the environment's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    /// A literal value baked into the builder itself; has no primitive id.
    Literal,
    /// A name provided by the pattern registry (control flow, arithmetic, …).
    Builtin,
    /// A user `define`d variable: reading it evaluates the bound primitive.
    AccessVariable,
    /// A user `define`d or `lambda`-bound function: reading it applies the bound lambda.
    AccessFunction,
    /// A bound argument of the enclosing function/lambda, indexed by position.
    AccessArgument,
}

/// How a name compiles into an access node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledFunctionBuilder {
    pub kind: BuilderKind,
    /// For `AccessVariable`/`AccessFunction`, the primitive id the name is bound to.
    /// For `AccessArgument`, the argument's position index. Unused for `Literal`/`Builtin`.
    pub target: u32,
    /// Whether this binding's evaluation may run off the caller's thread.
    pub locality: Locality,
}

/// Whether a primitive's evaluation is safe to hand to a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locality {
    #[default]
    Local,
    Remote,
}

impl CompiledFunctionBuilder {
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            kind: BuilderKind::Builtin,
            target: 0,
            locality: Locality::Local,
        }
    }

    #[must_use]
    pub fn literal() -> Self {
        Self {
            kind: BuilderKind::Literal,
            target: 0,
            locality: Locality::Local,
        }
    }

    #[must_use]
    pub fn access_variable(target: PrimitiveId) -> Self {
        Self {
            kind: BuilderKind::AccessVariable,
            target,
            locality: Locality::Local,
        }
    }

    #[must_use]
    pub fn access_function(target: PrimitiveId) -> Self {
        Self {
            kind: BuilderKind::AccessFunction,
            target,
            locality: Locality::Local,
        }
    }

    #[must_use]
    pub fn access_argument(index: u32) -> Self {
        Self {
            kind: BuilderKind::AccessArgument,
            target: index,
            locality: Locality::Local,
        }
    }

    /// Promotes an `AccessVariable` builder to `AccessFunction` in place, as required
    /// when a variable's body turns out to compile to a lambda.
    pub fn promote_to_function(&mut self) {
        if self.kind == BuilderKind::AccessVariable {
            self.kind = BuilderKind::AccessFunction;
        }
    }
}

/// One lexical scope: a name -> builder map, plus an optional parent.
#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<String, CompiledFunctionBuilder>,
}

/// A stack of lexical frames. The environment owns no primitive storage itself; it
/// only records how a name should be compiled. Frames are pushed for `define`/`lambda`
/// bodies and popped when compilation of that body finishes, so the environment never
/// outlives a single compiler invocation (each compile call builds its own top frame
/// over the shared, process-wide builtin frame).
#[derive(Debug)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Environment {
    /// Builds a fresh environment whose single frame holds the given builtin bindings.
    #[must_use]
    pub fn with_builtins(names: impl IntoIterator<Item = String>) -> Self {
        let mut frame = Frame::default();
        for name in names {
            frame.bindings.insert(name, CompiledFunctionBuilder::builtin());
        }
        Self { frames: vec![frame] }
    }

    /// Pushes a new, empty frame (entering a `define`/`lambda` body).
    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pops the innermost frame (leaving a `define`/`lambda` body).
    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Binds `name` to `builder` in the innermost frame, shadowing any outer binding.
    pub fn bind(&mut self, name: impl Into<String>, builder: CompiledFunctionBuilder) {
        self.frames
            .last_mut()
            .expect("environment always has at least one frame")
            .bindings
            .insert(name.into(), builder);
    }

    /// Looks a name up from the innermost frame outward.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<CompiledFunctionBuilder> {
        self.frames.iter().rev().find_map(|f| f.bindings.get(name).copied())
    }

    /// Looks a name up in the innermost frame only, and lets the caller mutate it in
    /// place — used to promote a just-bound variable to a function once its body is
    /// known to be a lambda.
    pub fn lookup_local_mut(&mut self, name: &str) -> Option<&mut CompiledFunctionBuilder> {
        self.frames.last_mut().and_then(|f| f.bindings.get_mut(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_frame_shadows_outer_binding() {
        let mut env = Environment::with_builtins(["add".to_owned()]);
        env.push_frame();
        env.bind("x", CompiledFunctionBuilder::access_argument(0));
        assert_eq!(env.lookup("x").unwrap().kind, BuilderKind::AccessArgument);
        assert_eq!(env.lookup("add").unwrap().kind, BuilderKind::Builtin);
        env.pop_frame();
        assert!(env.lookup("x").is_none());
    }

    #[test]
    fn promotion_only_affects_access_variable() {
        let mut env = Environment::with_builtins([]);
        env.bind("f", CompiledFunctionBuilder::access_variable(3));
        env.lookup_local_mut("f").unwrap().promote_to_function();
        assert_eq!(env.lookup("f").unwrap().kind, BuilderKind::AccessFunction);
    }
}
