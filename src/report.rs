//! Output formatting for scan results.
//!
//! Two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::detect::{Issue, ScanResult, Severity};
use crate::score::SmellScore;

/// The caller-facing result contract: pass/fail, a one-line summary, and
/// the ordered issue list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub passed: bool,
    pub message: String,
    pub issues: Vec<Issue>,
}

impl Report {
    /// Assemble the final report from detection results and the score.
    pub fn build(result: &ScanResult, score: &SmellScore) -> Self {
        let message = if result.issues.is_empty() {
            format!("no code smells detected in {} files", result.scanned)
        } else {
            format!(
                "{} issue(s) found in {} files (score {}, grade {})",
                result.issues.len(),
                result.scanned,
                score.score,
                score.grade
            )
        };
        Self {
            passed: score.passed,
            message,
            issues: result.issues.clone(),
        }
    }
}

// =============================================================================
// JSON format
// =============================================================================

/// JSON report envelope.
#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    pub config: String,
    pub score: i32,
    pub grade: String,
    pub threshold: i32,
    pub passed: bool,
    pub message: String,
    pub files_scanned: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_skipped: Vec<String>,
    pub issues: Vec<JsonIssue>,
    pub suppressed_count: usize,
    pub breakdown: Vec<BreakdownEntry>,
}

/// One issue in JSON form.
#[derive(Serialize, Deserialize)]
pub struct JsonIssue {
    pub code: String,
    pub severity: String,
    pub file: String,
    pub line: usize,
    pub message: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Breakdown entry for score details.
#[derive(Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub code: String,
    pub points: i32,
}

fn issue_to_json(issue: &Issue) -> JsonIssue {
    JsonIssue {
        code: issue.code.as_str().to_string(),
        severity: issue.severity.to_string(),
        file: issue.file.clone(),
        line: issue.line,
        message: issue.message.clone(),
        recommendation: issue.recommendation.clone(),
        metadata: issue.metadata.clone(),
    }
}

/// Write results as JSON to stdout.
pub fn write_json(
    path: &str,
    config_path: &str,
    result: &ScanResult,
    score: &SmellScore,
) -> anyhow::Result<()> {
    let report = Report::build(result, score);

    let mut breakdown: Vec<BreakdownEntry> = score
        .breakdown
        .iter()
        .map(|(code, points)| BreakdownEntry {
            code: code.clone(),
            points: *points,
        })
        .collect();
    breakdown.sort_by(|a, b| a.code.cmp(&b.code));

    let envelope = JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        config: config_path.to_string(),
        score: score.score,
        grade: score.grade.clone(),
        threshold: score.threshold,
        passed: score.passed,
        message: report.message,
        files_scanned: result.scanned,
        files_skipped: result.skipped.clone(),
        issues: result.issues.iter().map(issue_to_json).collect(),
        suppressed_count: result.suppressed_count(),
        breakdown,
    };

    let json = serde_json::to_string_pretty(&envelope)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty format
// =============================================================================

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::High => "HIGH".red(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW".cyan(),
    }
}

/// Write human-readable results to stdout.
pub fn write_pretty(path: &str, result: &ScanResult, score: &SmellScore, show_suppressed: bool) {
    let report = Report::build(result, score);

    println!("{} {}", "larasmell".bold(), path.dimmed());
    println!();

    // Group issues by file, preserving the sorted order.
    let mut current_file = "";
    for issue in &result.issues {
        if issue.file != current_file {
            current_file = &issue.file;
            println!("{}", current_file.underline());
        }
        println!(
            "  {:>4}  {:<8}  {}  [{}]",
            issue.line,
            severity_label(issue.severity),
            issue.message,
            issue.code.as_str().dimmed()
        );
        if !issue.recommendation.is_empty() {
            println!("        {}  {}", "fix:".dimmed(), issue.recommendation.dimmed());
        }
    }

    if !result.issues.is_empty() {
        println!();
    }

    if show_suppressed && !result.suppressed.is_empty() {
        println!("{}", "suppressed:".dimmed());
        for s in &result.suppressed {
            println!(
                "  {:>4}  {}  ({})",
                s.issue.line,
                s.issue.message.dimmed(),
                s.suppression.reason.dimmed()
            );
        }
        println!();
    }

    if !result.skipped.is_empty() {
        println!(
            "{} {} file(s) skipped (parse failures)",
            "note:".yellow(),
            result.skipped.len()
        );
    }

    let status = if report.passed {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    };
    println!(
        "{}  score {}/{} (grade {})  {}",
        status, score.score, score.threshold, score.grade, report.message
    );
}
