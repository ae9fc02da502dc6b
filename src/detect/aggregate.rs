//! Issue aggregation: line-level dedup and per-unit severity roll-up.
//!
//! Each rule gets a fresh aggregator per file. Within one (file, rule)
//! run, at most one issue survives per line: the first claim holds the
//! line unless a later, strictly more severe finding displaces it. Rules
//! that run competing detectors must therefore consult them in documented
//! priority order (highest severity first) — the severity comparison here
//! is the tie-breaker, not the ordering mechanism.

use std::collections::HashMap;

use super::types::{Issue, IssueCode, Severity};

/// Per (file, rule-run) issue sink with line-based dedup.
#[derive(Debug)]
pub struct IssueAggregator {
    file: String,
    line_index: HashMap<usize, usize>,
    issues: Vec<Issue>,
}

impl IssueAggregator {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line_index: HashMap::new(),
            issues: Vec::new(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Whether a line has already produced a finding in this run.
    pub fn is_reported(&self, line: usize) -> bool {
        self.line_index.contains_key(&line)
    }

    /// Offer an issue; returns whether it was kept.
    ///
    /// A line already claimed keeps its existing issue unless the new one
    /// is strictly more severe, in which case it is replaced in place.
    pub fn report(&mut self, issue: Issue) -> bool {
        match self.line_index.get(&issue.line) {
            None => {
                self.line_index.insert(issue.line, self.issues.len());
                self.issues.push(issue);
                true
            }
            Some(&index) => {
                if issue.severity > self.issues[index].severity {
                    self.issues[index] = issue;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Consume the aggregator, yielding issues ordered by line.
    pub fn into_issues(mut self) -> Vec<Issue> {
        self.issues.sort_by_key(|i| i.line);
        self.issues
    }
}

/// Collects the problems of one syntactic unit (a catch block, a closure)
/// so they roll up into a single consolidated issue instead of one
/// finding per problem.
#[derive(Debug)]
pub struct UnitFindings {
    code: IssueCode,
    file: String,
    line: usize,
    problems: Vec<(Severity, String)>,
}

impl UnitFindings {
    pub fn new(code: IssueCode, file: impl Into<String>, line: usize) -> Self {
        Self {
            code,
            file: file.into(),
            line,
            problems: Vec::new(),
        }
    }

    pub fn push(&mut self, severity: Severity, reason: impl Into<String>) {
        self.problems.push((severity, reason.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Consolidate into one issue: the worst severity wins, the first
    /// problem at that severity becomes the message, and every
    /// contributing reason lands in `metadata["reasons"]`.
    pub fn into_issue(self, recommendation: &str) -> Option<Issue> {
        let max_severity = self.problems.iter().map(|(s, _)| *s).max()?;
        let message = self
            .problems
            .iter()
            .find(|(s, _)| *s == max_severity)
            .map(|(_, m)| m.clone())?;
        let reasons = self
            .problems
            .iter()
            .map(|(_, m)| m.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        Some(
            Issue::new(self.code, self.file, self.line, message, recommendation)
                .with_severity(max_severity)
                .with_metadata("reasons", reasons),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(line: usize, severity: Severity) -> Issue {
        Issue::new(
            IssueCode::QueryInRoute,
            "routes/web.php",
            line,
            "query in route",
            "move to a controller",
        )
        .with_severity(severity)
    }

    #[test]
    fn test_one_issue_per_line() {
        let mut agg = IssueAggregator::new("routes/web.php");
        assert!(agg.report(issue(10, Severity::High)));
        assert!(!agg.report(issue(10, Severity::High)));
        assert!(agg.report(issue(11, Severity::High)));
        assert_eq!(agg.into_issues().len(), 2);
    }

    #[test]
    fn test_higher_severity_wins_the_line() {
        let mut agg = IssueAggregator::new("routes/web.php");
        agg.report(issue(10, Severity::Medium));
        assert!(agg.report(issue(10, Severity::Critical)));
        let issues = agg.into_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_lower_severity_does_not_displace() {
        let mut agg = IssueAggregator::new("routes/web.php");
        agg.report(issue(10, Severity::High));
        assert!(!agg.report(issue(10, Severity::Low)));
        let issues = agg.into_issues();
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[test]
    fn test_issues_sorted_by_line() {
        let mut agg = IssueAggregator::new("routes/web.php");
        agg.report(issue(20, Severity::High));
        agg.report(issue(5, Severity::High));
        let lines: Vec<usize> = agg.into_issues().iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![5, 20]);
    }

    #[test]
    fn test_unit_rollup_consolidates_problems() {
        let mut unit = UnitFindings::new(IssueCode::EmptyCatchBlock, "app/Jobs/Sync.php", 42);
        unit.push(Severity::Medium, "catches generic Exception");
        unit.push(Severity::High, "catch block is empty");

        let issue = unit.into_issue("log or rethrow the exception").unwrap();
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.message, "catch block is empty");
        let reasons = issue.metadata.get("reasons").unwrap();
        assert!(reasons.contains("catches generic Exception"));
        assert!(reasons.contains("catch block is empty"));
    }

    #[test]
    fn test_empty_unit_yields_nothing() {
        let unit = UnitFindings::new(IssueCode::EmptyCatchBlock, "x.php", 1);
        assert!(unit.into_issue("n/a").is_none());
    }
}
