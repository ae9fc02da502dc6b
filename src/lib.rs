//! Larasmell - Laravel code smell detector.
//!
//! Larasmell parses a PHP/Laravel codebase with tree-sitter and runs a set
//! of AST-based rules over it: query results filtered in PHP after
//! fetching, silently swallowed exceptions, business logic in route files,
//! hardcoded filesystem paths, ambiguous `find()` usage, and relationships
//! lazy loaded inside loops.
//!
//! # Architecture
//!
//! - `tree`: arena syntax tree, tree-sitter lowering, traversal engine,
//!   name resolution and call-chain walking
//! - `classify`: tiered-evidence predicates deciding what a construct is
//!   (model, query, filesystem op, relationship)
//! - `registry`: cross-file model registry built in a frozen pre-pass
//! - `detect`: the rules, issue aggregation, and the scan runner
//! - `config`: YAML scan configuration
//! - `score` / `report`: pass/fail scoring and output formatting
//!
//! # Adding a New Rule
//!
//! Implement `detect::Rule` with a visitor over the arena tree, compose
//! `classify` predicates for the semantic checks, and register the rule in
//! `detect::runner`. Findings need one Strong classifier verdict or two
//! corroborating Weak ones — uncertain constructs must stay silent.

pub mod classify;
pub mod cli;
pub mod config;
pub mod detect;
pub mod registry;
pub mod report;
pub mod score;
pub mod tree;

pub use classify::{Classifier, Confidence, Reason, Verdict, DEFAULT_TABLES};
pub use config::ScanConfig;
pub use detect::{Issue, IssueCode, Runner, ScanResult, Severity};
pub use registry::{ModelEntry, ModelRegistry};
pub use report::Report;
pub use score::SmellScore;
pub use tree::{parse_php, NameResolver, NodeId, NodeKind, SyntaxTree};
