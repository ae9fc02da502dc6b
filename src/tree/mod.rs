//! Arena-based syntax tree shared by all rules.
//!
//! The tree-sitter parse tree is lowered into this representation once per
//! file (see `lower`). Nodes live in a flat arena indexed by `NodeId`, with
//! a parallel parent array built during lowering, so rules can walk both
//! down (children) and up (enclosing context) without reference cycles.

mod chain;
mod lower;
mod resolve;
mod visit;

pub use chain::{consumer_context, is_chain_head, walk_chain, CallChain, ChainLink, ChainRoot};
pub use lower::{parse_php, ParseError};
pub use resolve::{NameResolver, ResolvedName, Resolution};
pub use visit::{traverse, DecisionCounter, ScopeStack, VisitError, Visitor};

use std::fmt;

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed set of node kinds the rules pattern-match over.
///
/// Grammar constructs with no analysis value are lowered to `Other` so the
/// tree stays complete (spans, statement counts) without the enum growing
/// a variant per grammar production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    NamespaceDecl,
    UseDecl,
    UseAlias,
    ClassDecl,
    BaseClause,
    InterfaceDecl,
    TraitDecl,
    MethodDecl,
    FunctionDecl,
    Closure,
    ArrowFunction,
    PropertyDecl,
    ConstDecl,
    Block,
    If,
    Loop,
    Switch,
    Case,
    Try,
    Catch,
    Finally,
    Throw,
    Return,
    Echo,
    ExpressionStatement,
    Assignment,
    BinaryOp,
    UnaryOp,
    Ternary,
    MethodCall,
    StaticCall,
    FunctionCall,
    PropertyAccess,
    StaticPropertyAccess,
    Variable,
    NameRef,
    ArgumentList,
    Argument,
    ArrayLiteral,
    StringLiteral,
    IntLiteral,
    FloatLiteral,
    BoolLiteral,
    NullLiteral,
    Parenthesized,
    Other,
}

impl NodeKind {
    /// Kinds that open a function-like scope (visitor state reset points).
    pub fn is_scope_boundary(self) -> bool {
        matches!(
            self,
            NodeKind::MethodDecl
                | NodeKind::FunctionDecl
                | NodeKind::Closure
                | NodeKind::ArrowFunction
        )
    }

    /// Kinds that carry a call of some form.
    pub fn is_call(self) -> bool {
        matches!(
            self,
            NodeKind::MethodCall | NodeKind::StaticCall | NodeKind::FunctionCall
        )
    }
}

/// Source location span with byte offsets and 1-indexed line/column positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub(crate) fn from_ts(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A single node in the arena.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub span: Span,
    /// Identifier or literal payload: method name for calls, property name
    /// for accesses, variable name (without `$`), literal text, operator for
    /// binary expressions. `None` for purely structural nodes.
    pub text: Option<String>,
    children: Vec<NodeId>,
}

/// A lowered source file: node arena plus parent links.
#[derive(Debug)]
pub struct SyntaxTree {
    path: String,
    nodes: Vec<SyntaxNode>,
    parents: Vec<Option<NodeId>>,
    root: NodeId,
}

impl SyntaxTree {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> &Span {
        &self.nodes[id.index()].span
    }

    pub fn line(&self, id: NodeId) -> usize {
        self.nodes[id.index()].span.start_line
    }

    /// Identifier/literal payload of a node, if any.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.index()].text.as_deref()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents[id.index()]
    }

    /// First direct child of the given kind.
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| self.kind(c) == kind)
    }

    /// All node ids in pre-order.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// All node ids in the subtree rooted at `id`, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![id],
        }
    }
}

/// Pre-order iterator over (a subtree of) the arena.
pub struct Preorder<'t> {
    tree: &'t SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        // Push in reverse so children pop in source order.
        for &child in self.tree.children(id).iter().rev() {
            self.stack.push(child);
        }
        Some(id)
    }
}

/// Incremental arena construction used by the lowering pass.
pub(crate) struct TreeBuilder {
    path: String,
    nodes: Vec<SyntaxNode>,
    parents: Vec<Option<NodeId>>,
}

impl TreeBuilder {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            nodes: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub(crate) fn push(
        &mut self,
        parent: Option<NodeId>,
        kind: NodeKind,
        span: Span,
        text: Option<String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SyntaxNode {
            kind,
            span,
            text,
            children: Vec::new(),
        });
        self.parents.push(parent);
        if let Some(p) = parent {
            self.nodes[p.index()].children.push(id);
        }
        id
    }

    pub(crate) fn finish(self, root: NodeId) -> SyntaxTree {
        SyntaxTree {
            path: self.path,
            nodes: self.nodes,
            parents: self.parents,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(b: &mut TreeBuilder, parent: NodeId, kind: NodeKind) -> NodeId {
        b.push(Some(parent), kind, Span::default(), None)
    }

    #[test]
    fn test_parent_links() {
        let mut b = TreeBuilder::new("test.php");
        let root = b.push(None, NodeKind::Program, Span::default(), None);
        let class = leaf(&mut b, root, NodeKind::ClassDecl);
        let method = leaf(&mut b, class, NodeKind::MethodDecl);
        let tree = b.finish(root);

        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.parent(class), Some(root));
        assert_eq!(tree.parent(method), Some(class));
        assert_eq!(tree.children(root), &[class]);
    }

    #[test]
    fn test_preorder_visits_all_nodes_once() {
        let mut b = TreeBuilder::new("test.php");
        let root = b.push(None, NodeKind::Program, Span::default(), None);
        let a = leaf(&mut b, root, NodeKind::ClassDecl);
        let a1 = leaf(&mut b, a, NodeKind::MethodDecl);
        let a2 = leaf(&mut b, a, NodeKind::MethodDecl);
        let c = leaf(&mut b, root, NodeKind::FunctionDecl);
        let tree = b.finish(root);

        let order: Vec<NodeId> = tree.preorder().collect();
        assert_eq!(order, vec![root, a, a1, a2, c]);
    }

    #[test]
    fn test_child_of_kind() {
        let mut b = TreeBuilder::new("test.php");
        let root = b.push(None, NodeKind::Program, Span::default(), None);
        leaf(&mut b, root, NodeKind::NamespaceDecl);
        let class = leaf(&mut b, root, NodeKind::ClassDecl);
        let tree = b.finish(root);

        assert_eq!(tree.child_of_kind(root, NodeKind::ClassDecl), Some(class));
        assert_eq!(tree.child_of_kind(root, NodeKind::Catch), None);
    }
}
