//! Detection rules for Laravel code smells.

mod aggregate;
mod collection_filter;
mod empty_catch;
mod hardcoded_path;
mod inconsistent_find;
mod lazy_load;
mod route_logic;
mod runner;
mod suppress;
mod types;

pub use aggregate::{IssueAggregator, UnitFindings};
pub use collection_filter::CollectionFilterRule;
pub use empty_catch::EmptyCatchRule;
pub use hardcoded_path::HardcodedPathRule;
pub use inconsistent_find::InconsistentFindRule;
pub use lazy_load::LazyLoadRule;
pub use route_logic::RouteLogicRule;
pub use runner::{FileContext, Rule, Runner};
pub use suppress::{
    collect_suppressions, filter_suppressed, parse_suppressions, SuppressedIssue, Suppression,
    SuppressionType,
};
pub use types::{Issue, IssueCode, ScanResult, Severity};
