//! Detection of hardcoded filesystem paths.
//!
//! Absolute paths baked into source break across environments. A literal
//! consumed by a filesystem call is Medium; a recognizable system path
//! anywhere else is Low. Literals passed to the Laravel path helpers are
//! excluded by the classifier's exclusion tier.

use lazy_static::lazy_static;
use regex::Regex;

use crate::tree::{consumer_context, traverse, NodeId, NodeKind, SyntaxTree, VisitError, Visitor};

use super::aggregate::IssueAggregator;
use super::runner::{FileContext, Rule};
use super::types::{Issue, IssueCode, Severity};

pub struct HardcodedPathRule;

impl Rule for HardcodedPathRule {
    fn code(&self) -> IssueCode {
        IssueCode::HardcodedPath
    }

    fn is_enabled(&self, ctx: &FileContext) -> bool {
        ctx.config.rules.hardcoded_path.is_enabled()
    }

    fn check(&self, ctx: &FileContext, out: &mut IssueAggregator) -> Result<(), VisitError> {
        let mut visitor = LiteralVisitor { ctx, out };
        traverse(ctx.tree, &mut [&mut visitor])
    }
}

lazy_static! {
    /// Leading `/segment` or a Windows drive prefix.
    static ref ABSOLUTE_PATH_RE: Regex =
        Regex::new(r"^(/[A-Za-z0-9_.-]+(/|$)|[A-Za-z]:[\\/])").unwrap();
}

/// Directory roots that only make sense on a concrete machine.
const SYSTEM_ROOTS: &[&str] = &[
    "/var/", "/tmp/", "/home/", "/usr/", "/etc/", "/opt/", "/srv/", "/mnt/", "/root/",
];

struct LiteralVisitor<'a, 'b> {
    ctx: &'a FileContext<'a>,
    out: &'b mut IssueAggregator,
}

impl Visitor for LiteralVisitor<'_, '_> {
    fn wants(&self, kind: NodeKind) -> bool {
        kind == NodeKind::StringLiteral
    }

    fn on_enter(&mut self, tree: &SyntaxTree, node: NodeId) -> Result<(), VisitError> {
        let text = match tree.text(node) {
            Some(text) => text,
            None => return Ok(()),
        };
        if !ABSOLUTE_PATH_RE.is_match(text) {
            return Ok(());
        }
        if self.ctx.config.rules.hardcoded_path.is_allowed(text) {
            return Ok(());
        }

        let consumer = consumer_context(tree, node);
        let verdict = self
            .ctx
            .classifier
            .filesystem_call(tree, consumer, self.ctx.resolver);
        if verdict.is_excluded() {
            // Argument of storage_path()/base_path()/config() and friends.
            return Ok(());
        }

        let is_system_path = text.starts_with("C:\\")
            || text.starts_with("C:/")
            || SYSTEM_ROOTS.iter().any(|root| text.starts_with(root));

        let issue = if verdict.fires() {
            Issue::new(
                IssueCode::HardcodedPath,
                self.ctx.path,
                tree.line(node),
                format!("hardcoded path {:?} passed to a filesystem call", text),
                "build the path with storage_path() or base_path(), or read it from config",
            )
            .with_metadata("path", text)
        } else if is_system_path {
            Issue::new(
                IssueCode::HardcodedPath,
                self.ctx.path,
                tree.line(node),
                format!("hardcoded absolute path {:?}", text),
                "read environment-specific paths from config instead of source",
            )
            .with_severity(Severity::Low)
            .with_metadata("path", text)
        } else {
            // Leading-slash strings that are not near a filesystem call
            // are usually URIs; stay conservative.
            return Ok(());
        };

        self.out.report(issue);
        Ok(())
    }
}
