//! Core types for detection results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Severity levels for issues, ordered weakest to strongest so `max`
/// picks the worst one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Whether this severity contributes to the pass/fail score.
    pub fn counts_toward_score(self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Codes for the different smell rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    #[serde(rename = "collection_filter")]
    CollectionFilterAfterQuery,
    #[serde(rename = "empty_catch")]
    EmptyCatchBlock,
    #[serde(rename = "query_in_route")]
    QueryInRoute,
    #[serde(rename = "logic_in_route")]
    LogicInRoute,
    #[serde(rename = "hardcoded_path")]
    HardcodedPath,
    #[serde(rename = "inconsistent_find")]
    InconsistentFind,
    #[serde(rename = "lazy_load_in_loop")]
    LazyLoadInLoop,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::CollectionFilterAfterQuery => "collection_filter",
            IssueCode::EmptyCatchBlock => "empty_catch",
            IssueCode::QueryInRoute => "query_in_route",
            IssueCode::LogicInRoute => "logic_in_route",
            IssueCode::HardcodedPath => "hardcoded_path",
            IssueCode::InconsistentFind => "inconsistent_find",
            IssueCode::LazyLoadInLoop => "lazy_load_in_loop",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "collection_filter" => Some(IssueCode::CollectionFilterAfterQuery),
            "empty_catch" => Some(IssueCode::EmptyCatchBlock),
            "query_in_route" => Some(IssueCode::QueryInRoute),
            "logic_in_route" => Some(IssueCode::LogicInRoute),
            "hardcoded_path" => Some(IssueCode::HardcodedPath),
            "inconsistent_find" => Some(IssueCode::InconsistentFind),
            "lazy_load_in_loop" => Some(IssueCode::LazyLoadInLoop),
            _ => None,
        }
    }

    /// Default severity when a rule has nothing more specific to say.
    pub fn default_severity(&self) -> Severity {
        match self {
            IssueCode::CollectionFilterAfterQuery => Severity::Critical,
            IssueCode::EmptyCatchBlock => Severity::High,
            IssueCode::QueryInRoute => Severity::High,
            IssueCode::LogicInRoute => Severity::Medium,
            IssueCode::HardcodedPath => Severity::Medium,
            IssueCode::InconsistentFind => Severity::Medium,
            IssueCode::LazyLoadInLoop => Severity::High,
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single detected code smell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub severity: Severity,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Issue {
    pub fn new(
        code: IssueCode,
        file: impl Into<String>,
        line: usize,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            file: file.into(),
            line,
            severity: code.default_severity(),
            recommendation: recommendation.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Stable key for cross-run comparison (line numbers shift too easily).
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.code, self.file, self.message)
    }
}

/// Results of one scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    pub issues: Vec<Issue>,
    /// Issues suppressed by inline comments.
    #[serde(default)]
    pub suppressed: Vec<super::suppress::SuppressedIssue>,
    /// Number of files scanned.
    pub scanned: usize,
    /// Files skipped because they failed to parse or a visitor errored.
    #[serde(default)]
    pub skipped: Vec<String>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: ScanResult) {
        self.issues.extend(other.issues);
        self.suppressed.extend(other.suppressed);
        self.scanned += other.scanned;
        self.skipped.extend(other.skipped);
    }

    pub fn add_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn suppressed_count(&self) -> usize {
        self.suppressed.len()
    }

    pub fn has_critical(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == Severity::Critical)
    }

    /// Worst severity across all issues, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }
}
