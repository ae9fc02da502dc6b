//! Detection of business logic living inside route files.
//!
//! Route closures should delegate to controllers. Two detectors run in
//! priority order — query detection first, then the generic complexity
//! check — so a database query outranks a plain too-much-logic finding
//! when both land on the same line.

use crate::classify::Verdict;
use crate::tree::{
    is_chain_head, traverse, walk_chain, ChainRoot, DecisionCounter, NodeId, NodeKind,
    SyntaxTree, VisitError, Visitor,
};

use super::aggregate::IssueAggregator;
use super::runner::{FileContext, Rule};
use super::types::{Issue, IssueCode};

pub struct RouteLogicRule;

impl Rule for RouteLogicRule {
    fn code(&self) -> IssueCode {
        IssueCode::QueryInRoute
    }

    fn is_enabled(&self, ctx: &FileContext) -> bool {
        ctx.config.rules.route_logic.is_enabled() && ctx.config.is_route_file(ctx.path)
    }

    fn check(&self, ctx: &FileContext, out: &mut IssueAggregator) -> Result<(), VisitError> {
        let mut visitor = RouteVisitor { ctx, out };
        traverse(ctx.tree, &mut [&mut visitor])
    }
}

struct RouteVisitor<'a, 'b> {
    ctx: &'a FileContext<'a>,
    out: &'b mut IssueAggregator,
}

impl Visitor for RouteVisitor<'_, '_> {
    fn wants(&self, kind: NodeKind) -> bool {
        matches!(kind, NodeKind::StaticCall | NodeKind::MethodCall)
    }

    fn on_enter(&mut self, tree: &SyntaxTree, node: NodeId) -> Result<(), VisitError> {
        if !self.is_route_registration(tree, node) {
            return Ok(());
        }
        let closure = match handler_closure(tree, node) {
            Some(closure) => closure,
            None => return Ok(()),
        };

        // Priority order: queries first (High), then service calls and the
        // generic complexity check (Medium).
        self.flag_queries(tree, closure);
        self.flag_service_calls(tree, closure);
        self.flag_heavy_logic(tree, closure);
        Ok(())
    }
}

impl RouteVisitor<'_, '_> {
    /// `Route::get(...)`, or a registrar link on a Route-rooted chain
    /// (`Route::middleware(...)->get(...)`).
    fn is_route_registration(&self, tree: &SyntaxTree, node: NodeId) -> bool {
        let tables = self.ctx.classifier.tables();
        let method = match tree.text(node) {
            Some(method) => method,
            None => return false,
        };
        if !tables.route_registrars.contains(method) {
            return false;
        }
        let chain = match walk_chain(tree, node) {
            Some(chain) => chain,
            None => return false,
        };
        match &chain.root {
            ChainRoot::StaticCall { class, .. } => {
                let res = self.ctx.resolver.resolve(class);
                res.short() == Some("Route")
                    || res.fqn() == Some("Illuminate\\Support\\Facades\\Route")
            }
            _ => false,
        }
    }

    fn flag_queries(&mut self, tree: &SyntaxTree, closure: NodeId) {
        for id in tree.descendants(closure) {
            let verdict = match tree.kind(id) {
                NodeKind::MethodCall if is_chain_head(tree, id) => self.chain_verdict(tree, id),
                NodeKind::StaticCall if !is_receiver(tree, id) => self.chain_verdict(tree, id),
                _ => continue,
            };
            if !verdict.fires() {
                continue;
            }
            self.out.report(
                Issue::new(
                    IssueCode::QueryInRoute,
                    self.ctx.path,
                    tree.line(id),
                    "database query inside a route closure",
                    "move the query into a controller or action class",
                )
                .with_metadata("evidence", verdict.reason.as_str()),
            );
        }
    }

    fn chain_verdict(&self, tree: &SyntaxTree, node: NodeId) -> Verdict {
        match walk_chain(tree, node) {
            Some(chain) => self.ctx.classifier.query_chain(&chain, self.ctx.resolver),
            None => Verdict::none(),
        }
    }

    fn flag_service_calls(&mut self, tree: &SyntaxTree, closure: NodeId) {
        for id in tree.descendants(closure) {
            let is_head = match tree.kind(id) {
                NodeKind::MethodCall => is_chain_head(tree, id),
                NodeKind::StaticCall => !is_receiver(tree, id),
                _ => false,
            };
            if !is_head {
                continue;
            }
            let chain = match walk_chain(tree, id) {
                Some(chain) => chain,
                None => continue,
            };
            let verdict = self.ctx.classifier.business_logic(&chain, self.ctx.resolver);
            if !verdict.fires() {
                continue;
            }
            self.out.report(
                Issue::new(
                    IssueCode::LogicInRoute,
                    self.ctx.path,
                    tree.line(id),
                    "service-layer call inside a route closure",
                    "inject the service into a controller action instead",
                )
                .with_metadata("evidence", verdict.reason.as_str()),
            );
        }
    }

    fn flag_heavy_logic(&mut self, tree: &SyntaxTree, closure: NodeId) {
        let max = self.ctx.config.rules.route_logic.max_decision_points();
        let decisions = DecisionCounter::count_in(tree, closure);
        if decisions <= max {
            return;
        }
        self.out.report(
            Issue::new(
                IssueCode::LogicInRoute,
                self.ctx.path,
                tree.line(closure),
                format!(
                    "route closure has {} decision points (limit {})",
                    decisions, max
                ),
                "extract the branching into a controller method",
            )
            .with_metadata("decision_points", decisions.to_string()),
        );
    }
}

/// True when the node is the receiver of an enclosing member call.
fn is_receiver(tree: &SyntaxTree, node: NodeId) -> bool {
    match tree.parent(node) {
        Some(parent) => {
            matches!(
                tree.kind(parent),
                NodeKind::MethodCall | NodeKind::PropertyAccess
            ) && tree.children(parent).first() == Some(&node)
        }
        None => false,
    }
}

/// First closure/arrow function among the call's arguments.
fn handler_closure(tree: &SyntaxTree, call: NodeId) -> Option<NodeId> {
    let args = tree.child_of_kind(call, NodeKind::ArgumentList)?;
    tree.descendants(args)
        .find(|&id| matches!(tree.kind(id), NodeKind::Closure | NodeKind::ArrowFunction))
}
