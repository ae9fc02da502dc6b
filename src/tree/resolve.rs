//! Import-aware resolution of class references to fully qualified names.
//!
//! A single pre-pass collects the file's namespace declaration and
//! `use`-statement aliases; `resolve` then maps short names through that
//! table. Dynamic references (variables in class position, `static`,
//! `self`, `parent`) are `Unresolvable` and are never guessed at.

use std::collections::HashMap;

use super::{NodeId, NodeKind, SyntaxTree};

/// A class reference after resolution.
///
/// Canonical form carries no leading separator; `fqn` is stable for the
/// lifetime of one file's traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub short: String,
    pub fqn: String,
    /// The `use` statement the name came through, if any.
    pub alias_source: Option<String>,
}

/// Outcome of resolving a class reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedName),
    Unresolvable,
}

impl Resolution {
    pub fn fqn(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(name) => Some(&name.fqn),
            Resolution::Unresolvable => None,
        }
    }

    pub fn short(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(name) => Some(&name.short),
            Resolution::Unresolvable => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Per-file name resolution context.
#[derive(Debug, Default)]
pub struct NameResolver {
    namespace: Option<String>,
    /// alias (or terminal segment) -> fully qualified import.
    aliases: HashMap<String, String>,
}

impl NameResolver {
    /// Collect namespace and use-statement context from a lowered tree.
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        let mut resolver = NameResolver::default();

        for id in tree.preorder() {
            match tree.kind(id) {
                NodeKind::NamespaceDecl => {
                    if resolver.namespace.is_none() {
                        resolver.namespace = tree.text(id).map(|t| t.to_string());
                    }
                }
                NodeKind::UseDecl => {
                    if let Some(imported) = tree.text(id) {
                        let imported = imported.trim_start_matches('\\').to_string();
                        let alias = tree
                            .child_of_kind(id, NodeKind::UseAlias)
                            .and_then(|a| tree.text(a))
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| last_segment(&imported).to_string());
                        resolver.aliases.insert(alias, imported);
                    }
                }
                _ => {}
            }
        }

        resolver
    }

    /// The file's namespace, if declared.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Qualify a name declared in this file (e.g. a class declaration).
    pub fn qualify(&self, short: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}\\{}", ns, short),
            None => short.to_string(),
        }
    }

    /// Resolve a raw class reference to a canonical fully qualified name.
    ///
    /// Already-qualified references pass through verbatim (modulo the
    /// leading separator), making resolution idempotent on them.
    pub fn resolve(&self, raw: &str) -> Resolution {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('$') {
            return Resolution::Unresolvable;
        }
        if matches!(raw, "static" | "self" | "parent") {
            return Resolution::Unresolvable;
        }

        if let Some(stripped) = raw.strip_prefix('\\') {
            return Resolution::Resolved(ResolvedName {
                short: last_segment(stripped).to_string(),
                fqn: stripped.to_string(),
                alias_source: None,
            });
        }

        let (head, rest) = match raw.split_once('\\') {
            Some((head, rest)) => (head, Some(rest)),
            None => (raw, None),
        };

        if let Some(target) = self.aliases.get(head) {
            let fqn = match rest {
                Some(rest) => format!("{}\\{}", target, rest),
                None => target.clone(),
            };
            return Resolution::Resolved(ResolvedName {
                short: last_segment(&fqn).to_string(),
                fqn,
                alias_source: Some(target.clone()),
            });
        }

        // A multi-segment reference with no matching alias is treated as
        // already qualified; resolving its own output must be a fixpoint.
        if rest.is_some() {
            return Resolution::Resolved(ResolvedName {
                short: last_segment(raw).to_string(),
                fqn: raw.to_string(),
                alias_source: None,
            });
        }

        Resolution::Resolved(ResolvedName {
            short: raw.to_string(),
            fqn: self.qualify(raw),
            alias_source: None,
        })
    }

    /// Resolve a class-position node (`NameRef` only; variables and
    /// expressions in class position are dynamic).
    pub fn resolve_node(&self, tree: &SyntaxTree, node: NodeId) -> Resolution {
        match tree.kind(node) {
            NodeKind::NameRef => match tree.text(node) {
                Some(text) => self.resolve(text),
                None => Resolution::Unresolvable,
            },
            _ => Resolution::Unresolvable,
        }
    }
}

fn last_segment(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}
