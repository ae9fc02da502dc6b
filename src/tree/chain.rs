//! Walking method-call chains down to their root expression.
//!
//! `walk_chain` flattens `User::where(...)->get()->filter(...)` into an
//! ordered list of call links plus a `ChainRoot` describing the receiver
//! the chain hangs off. Static roots keep their class name and contribute
//! their method as the first link.

use super::{NodeId, NodeKind, Span, SyntaxTree};

/// One call in a chain, ordered root-first.
#[derive(Debug, Clone)]
pub struct ChainLink {
    pub method: String,
    pub span: Span,
    pub node: NodeId,
}

/// The terminal receiver a chain is rooted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainRoot {
    /// `Class::method(...)` — class name as written, unresolved.
    StaticCall { class: String, method: String },
    /// `$variable->...`
    Variable { name: String },
    /// `$this->prop->...` or `$obj->prop->...`
    Property { name: String },
    /// `helper(...)->...`
    FunctionCall { name: String },
    /// A literal in receiver position.
    Literal,
    /// Anything else (dynamic callee, nested expression).
    Other,
}

/// A flattened call chain, read-only after construction.
#[derive(Debug, Clone)]
pub struct CallChain {
    pub links: Vec<ChainLink>,
    pub root: ChainRoot,
    pub root_node: NodeId,
}

impl CallChain {
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|l| l.method.as_str())
    }

    /// Index of the first link whose method is in `names`.
    pub fn first_position(&self, names: &phf::Set<&'static str>) -> Option<usize> {
        self.links.iter().position(|l| names.contains(l.method.as_str()))
    }

    /// Index of the first link after `start` whose method is in `names`.
    pub fn position_after(&self, start: usize, names: &phf::Set<&'static str>) -> Option<usize> {
        self.links
            .iter()
            .enumerate()
            .skip(start + 1)
            .find(|(_, l)| names.contains(l.method.as_str()))
            .map(|(i, _)| i)
    }
}

/// True when `node` is the outermost call of its chain (not itself the
/// receiver of an enclosing member access or call).
pub fn is_chain_head(tree: &SyntaxTree, node: NodeId) -> bool {
    match tree.parent(node) {
        Some(parent) => {
            let pk = tree.kind(parent);
            if !matches!(pk, NodeKind::MethodCall | NodeKind::PropertyAccess) {
                return true;
            }
            tree.children(parent).first() != Some(&node)
        }
        None => true,
    }
}

/// Flatten the chain ending at `node` (an outermost `MethodCall` or a bare
/// `StaticCall`). Returns `None` for nodes that are not calls.
pub fn walk_chain(tree: &SyntaxTree, node: NodeId) -> Option<CallChain> {
    let mut links: Vec<ChainLink> = Vec::new();
    let mut current = node;

    loop {
        match tree.kind(current) {
            NodeKind::MethodCall => {
                if let Some(method) = tree.text(current) {
                    links.push(ChainLink {
                        method: method.to_string(),
                        span: tree.span(current).clone(),
                        node: current,
                    });
                }
                match tree.children(current).first() {
                    Some(&receiver) => current = receiver,
                    None => {
                        return Some(CallChain {
                            links: reversed(links),
                            root: ChainRoot::Other,
                            root_node: current,
                        })
                    }
                }
            }
            NodeKind::StaticCall => {
                let method = tree.text(current).unwrap_or("").to_string();
                let class = tree
                    .children(current)
                    .first()
                    .filter(|&&c| tree.kind(c) == NodeKind::NameRef)
                    .and_then(|&c| tree.text(c))
                    .unwrap_or("")
                    .to_string();
                links.push(ChainLink {
                    method: method.clone(),
                    span: tree.span(current).clone(),
                    node: current,
                });
                let root = if class.is_empty() {
                    ChainRoot::Other
                } else {
                    ChainRoot::StaticCall { class, method }
                };
                return Some(CallChain {
                    links: reversed(links),
                    root,
                    root_node: current,
                });
            }
            NodeKind::FunctionCall => {
                let root = match tree.text(current) {
                    Some(name) => ChainRoot::FunctionCall {
                        name: name.to_string(),
                    },
                    None => ChainRoot::Other,
                };
                return finish(links, root, current);
            }
            NodeKind::Variable => {
                let root = match tree.text(current) {
                    Some(name) => ChainRoot::Variable {
                        name: name.to_string(),
                    },
                    None => ChainRoot::Other,
                };
                return finish(links, root, current);
            }
            NodeKind::PropertyAccess | NodeKind::StaticPropertyAccess => {
                let root = match tree.text(current) {
                    Some(name) => ChainRoot::Property {
                        name: name.to_string(),
                    },
                    None => ChainRoot::Other,
                };
                return finish(links, root, current);
            }
            NodeKind::StringLiteral
            | NodeKind::IntLiteral
            | NodeKind::FloatLiteral
            | NodeKind::BoolLiteral
            | NodeKind::NullLiteral
            | NodeKind::ArrayLiteral => {
                return finish(links, ChainRoot::Literal, current);
            }
            _ => {
                if links.is_empty() {
                    return None;
                }
                return finish(links, ChainRoot::Other, current);
            }
        }
    }
}

fn finish(links: Vec<ChainLink>, root: ChainRoot, root_node: NodeId) -> Option<CallChain> {
    if links.is_empty() {
        return None;
    }
    Some(CallChain {
        links: reversed(links),
        root,
        root_node,
    })
}

fn reversed(mut links: Vec<ChainLink>) -> Vec<ChainLink> {
    links.reverse();
    links
}

/// Kinds the upward consumer walk passes through transparently.
fn is_pass_through(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::BinaryOp
            | NodeKind::ArrayLiteral
            | NodeKind::Parenthesized
            | NodeKind::Argument
            | NodeKind::ArgumentList
    )
}

/// Bounded upward walk to the node that consumes this expression's value:
/// arithmetic, concatenation, array literals and argument wrappers are
/// transparent; the first other ancestor stops the walk.
pub fn consumer_context(tree: &SyntaxTree, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        if is_pass_through(tree.kind(parent)) {
            current = parent;
        } else {
            return parent;
        }
    }
    current
}
