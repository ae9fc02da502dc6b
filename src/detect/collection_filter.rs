//! Detection of query results filtered in PHP after fetching.
//!
//! `User::where(...)->get()->filter(...)` pulls every row into memory and
//! narrows it in PHP; the filter belongs in the query. Fires on a strong
//! query-source root (model class, DB facade) or on corroborated weak
//! evidence (a fetch-like link followed by a filter-like link on an
//! unresolvable receiver).

use crate::tree::{
    is_chain_head, traverse, walk_chain, ChainRoot, NodeId, NodeKind, SyntaxTree, VisitError,
    Visitor,
};

use super::aggregate::IssueAggregator;
use super::runner::{FileContext, Rule};
use super::types::{Issue, IssueCode};

pub struct CollectionFilterRule;

impl Rule for CollectionFilterRule {
    fn code(&self) -> IssueCode {
        IssueCode::CollectionFilterAfterQuery
    }

    fn is_enabled(&self, ctx: &FileContext) -> bool {
        ctx.config.rules.collection_filter.is_enabled()
    }

    fn check(&self, ctx: &FileContext, out: &mut IssueAggregator) -> Result<(), VisitError> {
        let mut visitor = ChainVisitor { ctx, out };
        traverse(ctx.tree, &mut [&mut visitor])
    }
}

struct ChainVisitor<'a, 'b> {
    ctx: &'a FileContext<'a>,
    out: &'b mut IssueAggregator,
}

impl Visitor for ChainVisitor<'_, '_> {
    fn wants(&self, kind: NodeKind) -> bool {
        kind == NodeKind::MethodCall
    }

    fn on_enter(&mut self, tree: &SyntaxTree, node: NodeId) -> Result<(), VisitError> {
        if !is_chain_head(tree, node) {
            return Ok(());
        }
        let chain = match walk_chain(tree, node) {
            Some(chain) => chain,
            None => return Ok(()),
        };

        let tables = self.ctx.classifier.tables();
        let fetch = match chain.first_position(tables.fetch_methods) {
            Some(pos) => pos,
            None => return Ok(()),
        };
        let filter = match chain.position_after(fetch, tables.collection_filter_methods) {
            Some(pos) => pos,
            None => return Ok(()),
        };

        let verdict = self.ctx.classifier.query_chain(&chain, self.ctx.resolver);
        if !verdict.fires() {
            return Ok(());
        }

        let fetch_method = chain.links[fetch].method.clone();
        let link = &chain.links[filter];
        let mut issue = Issue::new(
            IssueCode::CollectionFilterAfterQuery,
            self.ctx.path,
            link.span.start_line,
            format!(
                "query results are narrowed in PHP with '{}' after '{}' fetched them",
                link.method, fetch_method
            ),
            "apply the constraint in the query builder before fetching so the database does the work",
        )
        .with_metadata("method", link.method.as_str())
        .with_metadata("evidence", verdict.reason.as_str());

        if let ChainRoot::StaticCall { class, .. } = &chain.root {
            issue = issue.with_metadata("root", class.as_str());
        }

        self.out.report(issue);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::runner::test_support::check_source;
    use crate::detect::types::Severity;

    #[test]
    fn test_model_chain_fires_critical_on_filter_line() {
        let source = r#"<?php

use App\Models\User;

$active = User::where('active', true)
    ->get()
    ->filter(fn($u) => $u->verified);
"#;
        let issues = check_source(&CollectionFilterRule, "app/Demo.php", source);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Critical);
        assert_eq!(issues[0].line, 7);
        assert_eq!(issues[0].metadata.get("root").map(String::as_str), Some("User"));
    }

    #[test]
    fn test_arr_helper_is_excluded() {
        let source = "<?php\n$positive = Arr::where($items, fn($i) => $i > 0);\n";
        let issues = check_source(&CollectionFilterRule, "app/Demo.php", source);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_where_before_fetch_is_clean() {
        let source = "<?php\nuse App\\Models\\User;\n$users = User::where('active', true)->get();\n";
        let issues = check_source(&CollectionFilterRule, "app/Demo.php", source);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_weak_corroboration_on_variable_root() {
        let source = "<?php\n$fresh = $rows->get()->filter(fn($r) => $r->fresh);\n";
        let issues = check_source(&CollectionFilterRule, "app/Demo.php", source);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].metadata.get("evidence").map(String::as_str),
            Some("corroborated")
        );
    }

    #[test]
    fn test_single_weak_signal_is_conservative() {
        let source = "<?php\n$rows = $query->get();\n";
        let issues = check_source(&CollectionFilterRule, "app/Demo.php", source);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_collect_helper_chain_is_clean() {
        let source = "<?php\n$big = collect($nums)->filter(fn($n) => $n > 10)->all();\n";
        let issues = check_source(&CollectionFilterRule, "app/Demo.php", source);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_one_issue_per_line_for_competing_matches() {
        // Two qualifying chains on one line: the line is reported once.
        let source = "<?php\nuse App\\Models\\User;\n$a = User::all()->filter(fn($u) => $u->a); $b = User::all()->filter(fn($u) => $u->b);\n";
        let issues = check_source(&CollectionFilterRule, "app/Demo.php", source);
        assert_eq!(issues.len(), 1);
    }
}
