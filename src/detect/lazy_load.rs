//! Detection of relationships lazy loaded inside loops (N+1 queries).
//!
//! Iterating a fetched collection and touching a relationship property on
//! each model issues one query per iteration. Variable-to-model hints come
//! from simple assignment scanning per function scope; relationship names
//! come from the model registry (strong) or the pluralized-property
//! heuristic corroborated with the model-variable evidence (weak + weak).

use std::collections::HashMap;

use crate::classify::Verdict;
use crate::tree::{
    traverse, walk_chain, ChainRoot, NodeId, NodeKind, ScopeStack, SyntaxTree, VisitError,
    Visitor,
};

use super::aggregate::IssueAggregator;
use super::runner::{FileContext, Rule};
use super::types::{Issue, IssueCode};

pub struct LazyLoadRule;

impl Rule for LazyLoadRule {
    fn code(&self) -> IssueCode {
        IssueCode::LazyLoadInLoop
    }

    fn is_enabled(&self, ctx: &FileContext) -> bool {
        ctx.config.rules.lazy_load.is_enabled()
    }

    fn check(&self, ctx: &FileContext, out: &mut IssueAggregator) -> Result<(), VisitError> {
        let mut visitor = LoopVisitor {
            ctx,
            out,
            scopes: ScopeStack::new(),
            loop_depth: 0,
        };
        traverse(ctx.tree, &mut [&mut visitor])
    }
}

#[derive(Debug, Default)]
struct ModelVars {
    /// variable name -> model FQN it was assigned from.
    vars: HashMap<String, String>,
}

struct LoopVisitor<'a, 'b> {
    ctx: &'a FileContext<'a>,
    out: &'b mut IssueAggregator,
    scopes: ScopeStack<ModelVars>,
    loop_depth: usize,
}

impl Visitor for LoopVisitor<'_, '_> {
    fn wants(&self, kind: NodeKind) -> bool {
        kind.is_scope_boundary()
            || matches!(
                kind,
                NodeKind::Program
                    | NodeKind::Loop
                    | NodeKind::Assignment
                    | NodeKind::PropertyAccess
            )
    }

    fn on_enter(&mut self, tree: &SyntaxTree, node: NodeId) -> Result<(), VisitError> {
        let kind = tree.kind(node);
        if kind == NodeKind::Program || kind.is_scope_boundary() {
            self.scopes.enter(node, ModelVars::default());
            return Ok(());
        }
        match kind {
            NodeKind::Loop => {
                self.loop_depth += 1;
                self.bind_foreach_value(tree, node);
            }
            NodeKind::Assignment => self.track_assignment(tree, node),
            NodeKind::PropertyAccess if self.loop_depth > 0 => {
                self.check_property_access(tree, node)
            }
            _ => {}
        }
        Ok(())
    }

    fn on_leave(&mut self, tree: &SyntaxTree, node: NodeId) -> Result<(), VisitError> {
        let kind = tree.kind(node);
        if kind == NodeKind::Loop {
            self.loop_depth = self.loop_depth.saturating_sub(1);
        } else if kind == NodeKind::Program || kind.is_scope_boundary() {
            self.scopes.leave(node);
        }
        Ok(())
    }
}

impl LoopVisitor<'_, '_> {
    /// Record `$users = User::where(...)->get()` style assignments.
    fn track_assignment(&mut self, tree: &SyntaxTree, node: NodeId) {
        let children = tree.children(node);
        let (&left, &right) = match (children.first(), children.get(1)) {
            (Some(left), Some(right)) => (left, right),
            _ => return,
        };
        if tree.kind(left) != NodeKind::Variable {
            return;
        }
        let name = match tree.text(left) {
            Some(name) => name.to_string(),
            None => return,
        };
        if let Some(fqn) = self.model_source_of(tree, right) {
            if let Some(scope) = self.scopes.current() {
                scope.vars.insert(name, fqn);
            }
        }
    }

    /// FQN of the model class a chain expression fetches from, if any.
    fn model_source_of(&self, tree: &SyntaxTree, node: NodeId) -> Option<String> {
        if !matches!(tree.kind(node), NodeKind::MethodCall | NodeKind::StaticCall) {
            return None;
        }
        let chain = walk_chain(tree, node)?;
        if let ChainRoot::StaticCall { class, .. } = &chain.root {
            let res = self.ctx.resolver.resolve(class);
            if self.ctx.classifier.orm_model(&res).fires() {
                return res.fqn().map(|f| f.to_string());
            }
        }
        None
    }

    /// In `foreach ($users as $user)` bind `$user` to the collection's
    /// model when `$users` (or an inline chain) is a known model source.
    fn bind_foreach_value(&mut self, tree: &SyntaxTree, node: NodeId) {
        let children = tree.children(node).to_vec();
        let Some(&first) = children.first() else {
            return;
        };

        let fqn = match tree.kind(first) {
            NodeKind::Variable => tree.text(first).and_then(|name| {
                self.scopes
                    .current()
                    .and_then(|scope| scope.vars.get(name).cloned())
            }),
            NodeKind::MethodCall | NodeKind::StaticCall => self.model_source_of(tree, first),
            _ => None,
        };
        let Some(fqn) = fqn else {
            return;
        };

        // The value variable is the last one before the loop body.
        let value_var = children
            .iter()
            .skip(1)
            .take_while(|&&c| tree.kind(c) != NodeKind::Block)
            .filter(|&&c| tree.kind(c) == NodeKind::Variable)
            .last();
        if let Some(&var) = value_var {
            if let Some(name) = tree.text(var) {
                let name = name.to_string();
                if let Some(scope) = self.scopes.current() {
                    scope.vars.insert(name, fqn);
                }
            }
        }
    }

    fn check_property_access(&mut self, tree: &SyntaxTree, node: NodeId) {
        let receiver = match tree.children(node).first() {
            Some(&receiver) if tree.kind(receiver) == NodeKind::Variable => receiver,
            _ => return,
        };
        let var_name = match tree.text(receiver) {
            Some(name) => name,
            None => return,
        };
        let property = match tree.text(node) {
            Some(property) => property.to_string(),
            None => return,
        };

        let model_fqn = self
            .scopes
            .current()
            .and_then(|scope| scope.vars.get(var_name).cloned());

        let relationship = self
            .ctx
            .classifier
            .relationship_property(model_fqn.as_deref(), &property);
        let model_evidence = match &model_fqn {
            Some(_) => Verdict::weak(crate::classify::Reason::NamingConvention),
            None => Verdict::none(),
        };

        let verdict = Verdict::corroborate(relationship, model_evidence);
        if !verdict.fires() {
            return;
        }

        let mut issue = Issue::new(
            IssueCode::LazyLoadInLoop,
            self.ctx.path,
            tree.line(node),
            format!("relationship '{}' is lazy loaded inside a loop", property),
            format!("eager load it with ->with('{}') before iterating", property),
        )
        .with_metadata("property", property.as_str())
        .with_metadata("evidence", verdict.reason.as_str());
        if let Some(fqn) = model_fqn {
            issue = issue.with_metadata("model", fqn);
        }
        self.out.report(issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::runner::test_support::{check_source, check_source_with_registry};
    use crate::detect::types::Severity;
    use crate::registry::{ModelEntry, ModelRegistry};

    fn registry_with_user_posts() -> ModelRegistry {
        let mut registry = ModelRegistry::default();
        registry.insert(ModelEntry {
            class: "App\\Models\\User".to_string(),
            short: "User".to_string(),
            table: "users".to_string(),
            file: "app/Models/User.php".to_string(),
            relationships: vec!["posts".to_string(), "avatar".to_string()],
        });
        registry
    }

    const N_PLUS_ONE: &str = r#"<?php

use App\Models\User;

$users = User::where('active', true)->get();
foreach ($users as $user) {
    echo $user->posts;
}
"#;

    #[test]
    fn test_lazy_load_via_registry_is_strong() {
        let registry = registry_with_user_posts();
        let issues =
            check_source_with_registry(&LazyLoadRule, "app/Demo.php", N_PLUS_ONE, &registry);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(
            issues[0].metadata.get("evidence").map(String::as_str),
            Some("registry_hit")
        );
    }

    #[test]
    fn test_lazy_load_via_corroboration_without_registry() {
        // Without a registry, the plural property plus the model-variable
        // hint corroborate into a finding.
        let issues = check_source(&LazyLoadRule, "app/Demo.php", N_PLUS_ONE);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].metadata.get("evidence").map(String::as_str),
            Some("corroborated")
        );
    }

    #[test]
    fn test_singular_attribute_without_registry_is_clean() {
        let source = r#"<?php

use App\Models\User;

$users = User::all();
foreach ($users as $user) {
    echo $user->name;
}
"#;
        let issues = check_source(&LazyLoadRule, "app/Demo.php", source);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_singular_relationship_found_via_registry() {
        let source = r#"<?php

use App\Models\User;

foreach (User::all() as $user) {
    echo $user->avatar;
}
"#;
        let registry = registry_with_user_posts();
        let issues =
            check_source_with_registry(&LazyLoadRule, "app/Demo.php", source, &registry);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_unknown_variable_is_conservative() {
        // Plural property alone is a single weak signal: no finding.
        let source = "<?php\nforeach ($rows as $row) { echo $row->items; }\n";
        let issues = check_source(&LazyLoadRule, "app/Demo.php", source);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_access_outside_loop_is_clean() {
        let source = r#"<?php

use App\Models\User;

$user = User::find(1);
echo $user->posts;
"#;
        let issues = check_source(&LazyLoadRule, "app/Demo.php", source);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_reserved_property_is_excluded() {
        let source = r#"<?php

use App\Models\User;

$users = User::all();
foreach ($users as $user) {
    echo $user->attributes;
}
"#;
        let registry = registry_with_user_posts();
        let issues =
            check_source_with_registry(&LazyLoadRule, "app/Demo.php", source, &registry);
        assert!(issues.is_empty());
    }
}
