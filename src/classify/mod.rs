//! Heuristic classification of syntactic constructs.
//!
//! Every predicate follows the same tiered-evidence algorithm:
//!
//! 1. exclusion list -> `{no match, Strong}` (always wins)
//! 2. strong positive (namespace prefix, suffix, whitelisted API,
//!    registry hit) -> `{match, Strong}`
//! 3. weak heuristic (naming conventions, pluralized names) ->
//!    `{match, Weak}`
//! 4. default -> `{no match, None}` — uncertain constructs never fire.
//!
//! Rules combine verdicts through `Verdict::corroborate`: a finding needs
//! one Strong verdict, or two independent Weak verdicts backing the same
//! hypothesis. That corroboration rule is what keeps precision acceptable
//! without a real type system.

pub mod inflect;
mod tables;

pub use tables::{Tables, DEFAULT_TABLES};

use crate::registry::ModelRegistry;
use crate::tree::{
    CallChain, ChainRoot, NameResolver, NodeId, NodeKind, Resolution, SyntaxTree,
};

/// Evidence strength of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    None,
    Weak,
    Strong,
}

/// Why a verdict came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Excluded,
    NamespacePrefix,
    KnownSuffix,
    KnownApi,
    RegistryHit,
    NamingConvention,
    PluralName,
    LongChain,
    Corroborated,
    NoEvidence,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::Excluded => "excluded",
            Reason::NamespacePrefix => "namespace_prefix",
            Reason::KnownSuffix => "known_suffix",
            Reason::KnownApi => "known_api",
            Reason::RegistryHit => "registry_hit",
            Reason::NamingConvention => "naming_convention",
            Reason::PluralName => "plural_name",
            Reason::LongChain => "long_chain",
            Reason::Corroborated => "corroborated",
            Reason::NoEvidence => "no_evidence",
        }
    }
}

/// Immutable outcome of one classifier predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub matched: bool,
    pub confidence: Confidence,
    pub reason: Reason,
}

impl Verdict {
    pub fn strong(reason: Reason) -> Self {
        Self {
            matched: true,
            confidence: Confidence::Strong,
            reason,
        }
    }

    pub fn weak(reason: Reason) -> Self {
        Self {
            matched: true,
            confidence: Confidence::Weak,
            reason,
        }
    }

    /// A strong negative: the construct is known NOT to be the concept.
    pub fn excluded() -> Self {
        Self {
            matched: false,
            confidence: Confidence::Strong,
            reason: Reason::Excluded,
        }
    }

    pub fn none() -> Self {
        Self {
            matched: false,
            confidence: Confidence::None,
            reason: Reason::NoEvidence,
        }
    }

    /// True when this verdict alone justifies a finding.
    pub fn fires(&self) -> bool {
        self.matched && self.confidence == Confidence::Strong
    }

    pub fn is_excluded(&self) -> bool {
        !self.matched && self.confidence == Confidence::Strong
    }

    /// Combine two independent verdicts for the same hypothesis.
    ///
    /// Exclusions dominate, then strong matches; two weak matches
    /// corroborate into a firing verdict tagged `Corroborated`; a single
    /// weak match survives as-is so it can corroborate later.
    pub fn corroborate(a: Verdict, b: Verdict) -> Verdict {
        if a.is_excluded() {
            return a;
        }
        if b.is_excluded() {
            return b;
        }
        if a.fires() {
            return a;
        }
        if b.fires() {
            return b;
        }
        match (a.matched, b.matched) {
            (true, true) => Verdict::strong(Reason::Corroborated),
            (true, false) => a,
            (false, true) => b,
            (false, false) => Verdict::none(),
        }
    }
}

/// Predicate family over the static tables and an optional model registry.
///
/// Borrowed data only; a classifier never outlives one file's traversal.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    tables: &'a Tables,
    registry: Option<&'a ModelRegistry>,
}

impl<'a> Classifier<'a> {
    pub fn new(tables: &'a Tables) -> Self {
        Self {
            tables,
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: &'a ModelRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn tables(&self) -> &Tables {
        self.tables
    }

    /// Does this resolved class reference name an Eloquent model?
    pub fn orm_model(&self, res: &Resolution) -> Verdict {
        let name = match res {
            Resolution::Resolved(name) => name,
            Resolution::Unresolvable => return Verdict::none(),
        };

        if self.tables.excluded_classes.contains(name.short.as_str()) {
            return Verdict::excluded();
        }
        for prefix in self.tables.model_namespaces {
            if name.fqn.starts_with(prefix) {
                return Verdict::strong(Reason::NamespacePrefix);
            }
        }
        if let Some(registry) = self.registry {
            if registry.is_model(&name.fqn) {
                return Verdict::strong(Reason::RegistryHit);
            }
        }
        for suffix in self.tables.model_suffixes {
            if name.short.len() > suffix.len() && name.short.ends_with(suffix) {
                return Verdict::strong(Reason::KnownSuffix);
            }
        }
        // Bare unqualified PascalCase class with no import context.
        if name.alias_source.is_none() && name.fqn == name.short && is_pascal_case(&name.short) {
            return Verdict::weak(Reason::NamingConvention);
        }
        Verdict::none()
    }

    /// Does this resolved class reference name the database facade?
    pub fn database_facade(&self, res: &Resolution) -> Verdict {
        let name = match res {
            Resolution::Resolved(name) => name,
            Resolution::Unresolvable => return Verdict::none(),
        };
        if name.short == "DB"
            || self.tables.db_facades.contains(name.fqn.as_str())
            || name.fqn.starts_with("Illuminate\\Database")
        {
            return Verdict::strong(Reason::KnownApi);
        }
        Verdict::none()
    }

    /// Classify a chain's root as a query source.
    pub fn chain_root(&self, chain: &CallChain, resolver: &NameResolver) -> Verdict {
        match &chain.root {
            ChainRoot::StaticCall { class, .. } => {
                let res = resolver.resolve(class);
                let db = self.database_facade(&res);
                if db.fires() {
                    return db;
                }
                self.orm_model(&res)
            }
            ChainRoot::FunctionCall { name } => {
                if self.tables.excluded_functions.contains(name.as_str()) {
                    return Verdict::excluded();
                }
                Verdict::none()
            }
            ChainRoot::Literal => Verdict::excluded(),
            _ => Verdict::none(),
        }
    }

    /// Does this chain operate on a database query / its result set?
    ///
    /// Strong path: query-source root plus builder or fetch links. Weak
    /// path: a fetch-like link and a filter-like link after it corroborate
    /// even when the root is an unresolvable variable.
    pub fn query_chain(&self, chain: &CallChain, resolver: &NameResolver) -> Verdict {
        let root = self.chain_root(chain, resolver);
        if root.is_excluded() {
            return root;
        }

        let has_builder = chain
            .method_names()
            .any(|m| self.tables.builder_methods.contains(m));
        let fetch_pos = chain.first_position(self.tables.fetch_methods);

        if root.fires() && (has_builder || fetch_pos.is_some()) {
            return root;
        }

        let fetch_evidence = match fetch_pos {
            Some(_) => Verdict::weak(Reason::KnownApi),
            None => Verdict::none(),
        };
        let filter_evidence = fetch_pos
            .and_then(|pos| chain.position_after(pos, self.tables.collection_filter_methods))
            .map(|_| Verdict::weak(Reason::KnownApi))
            .unwrap_or_else(Verdict::none);

        // A query-source root with no query-shaped link is not a query
        // chain on its own; it only corroborates link evidence.
        let root_evidence = if root.matched {
            Verdict::weak(root.reason)
        } else {
            Verdict::none()
        };
        Verdict::corroborate(
            Verdict::corroborate(root_evidence, fetch_evidence),
            filter_evidence,
        )
    }

    /// Is this call node a filesystem operation?
    ///
    /// Exclusion tier: Laravel path helpers — their arguments are
    /// configuration, not hardcoded-path smells.
    pub fn filesystem_call(
        &self,
        tree: &SyntaxTree,
        node: NodeId,
        resolver: &NameResolver,
    ) -> Verdict {
        match tree.kind(node) {
            NodeKind::FunctionCall => {
                let name = match tree.text(node) {
                    Some(name) => name,
                    None => return Verdict::none(),
                };
                if self.tables.path_helpers.contains(name) {
                    return Verdict::excluded();
                }
                if self.tables.filesystem_functions.contains(name) {
                    return Verdict::strong(Reason::KnownApi);
                }
                Verdict::none()
            }
            NodeKind::StaticCall | NodeKind::MethodCall => {
                let chain = match crate::tree::walk_chain(tree, node) {
                    Some(chain) => chain,
                    None => return Verdict::none(),
                };
                if let ChainRoot::StaticCall { class, .. } = &chain.root {
                    let res = resolver.resolve(class);
                    let short = res.short().unwrap_or(class.as_str());
                    let fqn = res.fqn().unwrap_or(class.as_str());
                    if self.tables.filesystem_classes.contains(short)
                        || self.tables.filesystem_classes.contains(fqn)
                    {
                        return Verdict::strong(Reason::KnownApi);
                    }
                }
                Verdict::none()
            }
            _ => Verdict::none(),
        }
    }

    /// Is this property name a relationship access on a model?
    ///
    /// `model_fqn` supplies context when the receiver's model type is
    /// known; registry hits are strong, pluralized names are weak.
    pub fn relationship_property(&self, model_fqn: Option<&str>, name: &str) -> Verdict {
        if self.tables.reserved_properties.contains(name) {
            return Verdict::excluded();
        }
        if let (Some(registry), Some(fqn)) = (self.registry, model_fqn) {
            if registry.has_relationship(fqn, name) {
                return Verdict::strong(Reason::RegistryHit);
            }
        }
        let last_word = inflect::snake_case(name);
        let last_word = last_word.rsplit('_').next().unwrap_or(name);
        if inflect::is_plural(last_word) {
            return Verdict::weak(Reason::PluralName);
        }
        Verdict::none()
    }

    /// Does this chain look like a business-logic call (service layer,
    /// long computation chain)?
    pub fn business_logic(&self, chain: &CallChain, resolver: &NameResolver) -> Verdict {
        if let ChainRoot::StaticCall { class, .. } = &chain.root {
            let res = resolver.resolve(class);
            if let Some(short) = res.short() {
                if self.tables.excluded_classes.contains(short) {
                    return Verdict::excluded();
                }
                for suffix in self.tables.service_suffixes {
                    if short.len() > suffix.len() && short.ends_with(suffix) {
                        return Verdict::strong(Reason::KnownSuffix);
                    }
                }
            }
        }
        if chain.links.len() >= 3 {
            return Verdict::weak(Reason::LongChain);
        }
        Verdict::none()
    }
}

fn is_pascal_case(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    name.chars().any(|c| c.is_ascii_lowercase()) && !name.contains('_')
}
