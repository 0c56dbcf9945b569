//! The compiled primitive graph: an arena of nodes, each a primitive component.
//!
//! Primitives are never individually heap-allocated and linked by pointer; the whole
//! graph lives in one [`Graph`]'s `Vec<Node>`, and operands reference each other by
//! [`PrimitiveId`] (an index into that vector). This sidesteps the cyclic-ownership
//! problem a self-recursive `define` would otherwise create: a node can refer to an id
//! that is still being populated (see [`crate::environment`]) without any unsafe
//! aliasing or reference-counted self-pointer.
//!
//! A node's mutable storage (for `variable`/`function`/`lambda` primitives) is guarded
//! by a `parking_lot::RwLock`, since a `store` may run concurrently with readers under
//! `parallel_block`.

use parking_lot::RwLock;

use crate::environment::Locality;
use crate::name::NameParts;
use crate::value::{PrimitiveId, Value};

/// What kind of primitive a node is. Mirrors [`crate::pattern::PrimitiveKind`] for the
/// pattern-dispatched primitives, plus the handful of kinds the compiler emits directly
/// (literals, access nodes, and the three binding forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Literal,
    AccessArgument,
    AccessVariable,
    AccessFunction,
    /// Applies a resolved function value to freshly evaluated argument operands;
    /// emitted only for calls to a user `define`d/`lambda` binding, never for a
    /// pattern-dispatched builtin.
    Apply,
    Variable,
    Lambda,
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
    Constant,
    Slice,
    Store,
}

impl NodeKind {
    /// Whether this primitive is pure and cheap enough to run on the direct-execution
    /// fast path instead of being scheduled. Only the forms with runtime side effects
    /// or explicit worker fan-out are excluded.
    #[must_use]
    pub fn is_direct(self) -> bool {
        !matches!(self, Self::ParallelBlock | Self::Store | Self::For | Self::While | Self::ForEach)
    }
}

/// A single node in the primitive graph.
pub struct Node {
    /// Canonical, globally-unique display name.
    pub name: NameParts,
    pub kind: NodeKind,
    /// Child primitive ids, in the order the compiler emitted them.
    pub operands: Vec<PrimitiveId>,
    /// For `AccessArgument`: the argument index. For `Lambda`: the parameter count.
    pub aux: u32,
    /// Whether this node's evaluation may be handed to a worker thread.
    pub locality: Locality,
    /// Mutable storage for `Variable`/`Function`/`Lambda` primitives; `None` until the
    /// first `store`. Every other kind leaves this permanently `None` — the graph is
    /// otherwise read-only after compilation, matching the read-only-graph invariant.
    storage: RwLock<Option<Value>>,
    /// The literal value baked into a `Literal` node.
    literal: Option<Value>,
}

impl Node {
    #[must_use]
    pub fn new(name: NameParts, kind: NodeKind, operands: Vec<PrimitiveId>) -> Self {
        Self {
            name,
            kind,
            operands,
            aux: 0,
            locality: Locality::Local,
            storage: RwLock::new(None),
            literal: None,
        }
    }

    #[must_use]
    pub fn literal(name: NameParts, value: Value) -> Self {
        Self {
            literal: Some(value),
            ..Self::new(name, NodeKind::Literal, Vec::new())
        }
    }

    #[must_use]
    pub fn with_aux(mut self, aux: u32) -> Self {
        self.aux = aux;
        self
    }

    #[must_use]
    pub fn with_locality(mut self, locality: Locality) -> Self {
        self.locality = locality;
        self
    }

    #[must_use]
    pub fn literal_value(&self) -> Option<&Value> {
        self.literal.as_ref()
    }

    /// Atomically replaces this primitive's stored value. Used both by `define`'s
    /// initial population and by `store`'s runtime slice-assignment.
    pub fn store(&self, value: Value) {
        *self.storage.write() = Some(value);
    }

    /// Reads the currently stored value, cloning it out from under the lock.
    #[must_use]
    pub fn load(&self) -> Option<Value> {
        self.storage.read().clone()
    }
}

/// The compiled program: an arena of [`Node`]s plus the id of its entry point.
pub struct Graph {
    nodes: Vec<Node>,
    pub root: PrimitiveId,
}

impl Graph {
    #[must_use]
    pub fn new(nodes: Vec<Node>, root: PrimitiveId) -> Self {
        Self { nodes, root }
    }

    #[must_use]
    pub fn get(&self, id: PrimitiveId) -> &Node {
        &self.nodes[id as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every display name in the graph is unique; used by a testable-property check
    /// rather than enforced at insertion time (insertion order is compiler-controlled).
    #[must_use]
    pub fn has_unique_names(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.nodes.iter().all(|n| seen.insert(n.name.compose()))
    }
}

/// A graph under construction: nodes are appended and never removed, so ids handed out
/// during compilation remain valid for the rest of the build.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
}

impl GraphBuilder {
    #[must_use]
    pub fn push(&mut self, node: Node) -> PrimitiveId {
        let id = self.nodes.len() as PrimitiveId;
        self.nodes.push(node);
        id
    }

    #[must_use]
    pub fn finish(self, root: PrimitiveId) -> Graph {
        Graph::new(self.nodes, root)
    }

    #[must_use]
    pub fn node(&self, id: PrimitiveId) -> &Node {
        &self.nodes[id as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_value_round_trips_through_lock() {
        let node = Node::new(NameParts::new("variable", 0, 0, 0), NodeKind::Variable, Vec::new());
        assert!(node.load().is_none());
        node.store(Value::scalar(2.0));
        assert_eq!(node.load(), Some(Value::scalar(2.0)));
    }

    #[test]
    fn graph_detects_duplicate_names() {
        let mut builder = GraphBuilder::default();
        builder.push(Node::new(NameParts::new("variable", 0, 0, 0), NodeKind::Variable, Vec::new()));
        builder.push(Node::new(NameParts::new("variable", 0, 0, 0), NodeKind::Variable, Vec::new()));
        let graph = builder.finish(0);
        assert!(!graph.has_unique_names());
    }
}
