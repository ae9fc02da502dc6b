//! Depth-first traversal engine with enter/leave hooks.
//!
//! A single pre-order walk drives every registered visitor: `on_enter` in
//! registration order, recurse into children, then `on_leave` in the same
//! order. Visitors keep their own mutable state; `ScopeStack` gives them a
//! reset point at function-like boundaries so state never leaks across
//! unrelated methods.

use super::{NodeId, NodeKind, SyntaxTree};

/// Error raised by a visitor on a malformed or unexpected tree shape.
///
/// Aborts traversal of the current file only; the runner discards that
/// file's partial results and moves on.
#[derive(Debug, thiserror::Error)]
#[error("visitor error at {file}:{line}: {message}")]
pub struct VisitError {
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl VisitError {
    pub fn new(tree: &SyntaxTree, node: NodeId, message: impl Into<String>) -> Self {
        Self {
            file: tree.path().to_string(),
            line: tree.line(node),
            message: message.into(),
        }
    }
}

/// A tree visitor with enter/leave hooks.
///
/// `wants` is a node-kind filter: hooks are only invoked for kinds the
/// visitor asks for, but the walk still recurses through filtered nodes.
pub trait Visitor {
    fn wants(&self, _kind: NodeKind) -> bool {
        true
    }

    fn on_enter(&mut self, _tree: &SyntaxTree, _node: NodeId) -> Result<(), VisitError> {
        Ok(())
    }

    fn on_leave(&mut self, _tree: &SyntaxTree, _node: NodeId) -> Result<(), VisitError> {
        Ok(())
    }
}

/// Walk the whole tree depth-first, pre-order, driving all visitors.
///
/// Every node is visited exactly once; `on_leave` fires once per node in
/// reverse order relative to the matching `on_enter` calls of its subtree.
pub fn traverse(tree: &SyntaxTree, visitors: &mut [&mut dyn Visitor]) -> Result<(), VisitError> {
    walk(tree, tree.root(), visitors)
}

fn walk(
    tree: &SyntaxTree,
    node: NodeId,
    visitors: &mut [&mut dyn Visitor],
) -> Result<(), VisitError> {
    let kind = tree.kind(node);
    for visitor in visitors.iter_mut() {
        if visitor.wants(kind) {
            visitor.on_enter(tree, node)?;
        }
    }

    for &child in tree.children(node) {
        walk(tree, child, visitors)?;
    }

    for visitor in visitors.iter_mut() {
        if visitor.wants(kind) {
            visitor.on_leave(tree, node)?;
        }
    }
    Ok(())
}

/// Per-scope visitor state keyed by the node that opened the scope.
///
/// `enter` pushes fresh state when the node is a scope boundary; `leave`
/// pops it again. `current` is the innermost open scope, if any.
#[derive(Debug, Default)]
pub struct ScopeStack<T> {
    stack: Vec<(NodeId, T)>,
}

impl<T> ScopeStack<T> {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn enter(&mut self, node: NodeId, state: T) {
        self.stack.push((node, state));
    }

    /// Pop the scope if `node` opened it; returns the scope state.
    pub fn leave(&mut self, node: NodeId) -> Option<T> {
        if self.stack.last().map(|(id, _)| *id) == Some(node) {
            self.stack.pop().map(|(_, state)| state)
        } else {
            None
        }
    }

    pub fn current(&mut self) -> Option<&mut T> {
        self.stack.last_mut().map(|(_, state)| state)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Counts decision points (branches, loops, boolean operators) in a
/// subtree. Used with an explicit accumulator instead of captured
/// counters so reset points stay visible at the call site.
#[derive(Debug, Default)]
pub struct DecisionCounter {
    pub count: usize,
}

impl DecisionCounter {
    /// Accumulate decision points from one node.
    pub fn observe(&mut self, tree: &SyntaxTree, node: NodeId) {
        match tree.kind(node) {
            NodeKind::If | NodeKind::Loop | NodeKind::Case | NodeKind::Ternary => self.count += 1,
            NodeKind::BinaryOp => {
                if matches!(tree.text(node), Some("&&") | Some("||") | Some("and") | Some("or")) {
                    self.count += 1;
                }
            }
            _ => {}
        }
    }

    /// Count decision points in the subtree rooted at `node`.
    pub fn count_in(tree: &SyntaxTree, node: NodeId) -> usize {
        let mut counter = DecisionCounter::default();
        for id in tree.descendants(node) {
            counter.observe(tree, id);
        }
        counter.count
    }
}
