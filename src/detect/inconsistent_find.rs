//! Detection of ambiguous `find()` usage on models.
//!
//! `Model::find([1, 2, 3])` returns a collection while `Model::find(1)`
//! returns a single model; mixing the two in one scope makes return types
//! unpredictable. The array case is decided by the argument expression
//! kind, not the method name, and state is kept per call site (source
//! position) within the enclosing function scope only.

use std::collections::HashMap;

use crate::tree::{
    traverse, NodeId, NodeKind, Resolution, ScopeStack, SyntaxTree, VisitError, Visitor,
};

use super::aggregate::IssueAggregator;
use super::runner::{FileContext, Rule};
use super::types::{Issue, IssueCode, Severity};

pub struct InconsistentFindRule;

impl Rule for InconsistentFindRule {
    fn code(&self) -> IssueCode {
        IssueCode::InconsistentFind
    }

    fn is_enabled(&self, ctx: &FileContext) -> bool {
        ctx.config.rules.inconsistent_find.is_enabled()
    }

    fn check(&self, ctx: &FileContext, out: &mut IssueAggregator) -> Result<(), VisitError> {
        let mut visitor = FindVisitor {
            ctx,
            out,
            scopes: ScopeStack::new(),
        };
        traverse(ctx.tree, &mut [&mut visitor])
    }
}

/// One observed `find()` call site.
#[derive(Debug, Clone, Copy)]
struct FindSite {
    line: usize,
    is_array: bool,
}

#[derive(Debug, Default)]
struct FindScope {
    /// Call sites per model FQN, keyed by position of occurrence.
    sites: HashMap<String, Vec<FindSite>>,
}

struct FindVisitor<'a, 'b> {
    ctx: &'a FileContext<'a>,
    out: &'b mut IssueAggregator,
    scopes: ScopeStack<FindScope>,
}

impl Visitor for FindVisitor<'_, '_> {
    fn wants(&self, kind: NodeKind) -> bool {
        kind.is_scope_boundary() || matches!(kind, NodeKind::Program | NodeKind::StaticCall)
    }

    fn on_enter(&mut self, tree: &SyntaxTree, node: NodeId) -> Result<(), VisitError> {
        let kind = tree.kind(node);
        if kind == NodeKind::Program || kind.is_scope_boundary() {
            self.scopes.enter(node, FindScope::default());
            return Ok(());
        }

        // StaticCall from here on.
        if tree.text(node) != Some("find") {
            return Ok(());
        }
        let resolution = match tree.children(node).first() {
            Some(&scope) => self.ctx.resolver.resolve_node(tree, scope),
            None => return Ok(()),
        };
        if !self.ctx.classifier.orm_model(&resolution).fires() {
            return Ok(());
        }
        let fqn = match &resolution {
            Resolution::Resolved(name) => name.fqn.clone(),
            Resolution::Unresolvable => return Ok(()),
        };

        let is_array = first_argument_kind(tree, node) == Some(NodeKind::ArrayLiteral);
        let line = tree.line(node);

        if is_array {
            self.out.report(
                Issue::new(
                    IssueCode::InconsistentFind,
                    self.ctx.path,
                    line,
                    "find() called with an array literal returns a collection",
                    "use findMany() when fetching multiple keys",
                )
                .with_severity(Severity::Low)
                .with_metadata("model", fqn.as_str()),
            );
        }

        if let Some(scope) = self.scopes.current() {
            scope
                .sites
                .entry(fqn)
                .or_default()
                .push(FindSite { line, is_array });
        }
        Ok(())
    }

    fn on_leave(&mut self, tree: &SyntaxTree, node: NodeId) -> Result<(), VisitError> {
        let kind = tree.kind(node);
        if kind != NodeKind::Program && !kind.is_scope_boundary() {
            return Ok(());
        }
        let scope = match self.scopes.leave(node) {
            Some(scope) => scope,
            None => return Ok(()),
        };

        for (fqn, sites) in scope.sites {
            let has_array = sites.iter().any(|s| s.is_array);
            let has_scalar = sites.iter().any(|s| !s.is_array);
            if !(has_array && has_scalar) {
                continue;
            }
            let first_array = sites
                .iter()
                .find(|s| s.is_array)
                .map(|s| s.line)
                .unwrap_or(1);
            let short = fqn.rsplit('\\').next().unwrap_or(&fqn);
            // Medium displaces the Low array finding on the same line.
            self.out.report(
                Issue::new(
                    IssueCode::InconsistentFind,
                    self.ctx.path,
                    first_array,
                    format!(
                        "inconsistent find() usage on {}: scalar and array keys in one scope",
                        short
                    ),
                    "split into find() for single keys and findMany() for key lists",
                )
                .with_metadata("model", fqn.as_str()),
            );
        }
        Ok(())
    }
}

/// Kind of the first argument expression, if any.
fn first_argument_kind(tree: &SyntaxTree, call: NodeId) -> Option<NodeKind> {
    let args = tree.child_of_kind(call, NodeKind::ArgumentList)?;
    let first = tree.children(args).first()?;
    let inner = tree.children(*first).first()?;
    Some(tree.kind(*inner))
}
