//! Inline suppression of issues via comments.
//!
//! Supports suppression comments in the PHP comment styles:
//! - `// larasmell:ignore <rule> - <reason>`
//! - `// larasmell:ignore-next-line <rule> - <reason>`
//! - `// larasmell:ignore-file <rule> - <reason>`
//! - `#` and `/* ... */` variants of the same.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::types::Issue;

/// How a suppression applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionType {
    /// Applies to the same line
    Line,
    /// Applies to the next line
    NextLine,
    /// Applies to the entire file
    File,
}

/// An inline suppression directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suppression {
    /// Rule to suppress (e.g. "empty_catch") or "*" for all
    pub rule: String,
    /// Human-readable reason
    pub reason: String,
    /// File containing the suppression
    pub file: String,
    /// Line number (0 for file-level)
    pub line: usize,
    /// How the suppression applies
    pub suppression_type: SuppressionType,
}

/// An issue that was suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressedIssue {
    pub issue: Issue,
    pub suppression: Suppression,
}

lazy_static::lazy_static! {
    /// Patterns for matching suppression comments in PHP sources.
    static ref SUPPRESSION_PATTERNS: Vec<Regex> = vec![
        // Line comment style: // larasmell:...
        Regex::new(r"//\s*larasmell:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*))?").unwrap(),
        // Shell comment style: # larasmell:...
        Regex::new(r"#\s*larasmell:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*))?").unwrap(),
        // Block comment style: /* larasmell:... */
        Regex::new(r"/\*\s*larasmell:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*?))?\s*\*/").unwrap(),
    ];
}

/// Parse suppression directives from file content.
pub fn parse_suppressions(file_path: &str, content: &str) -> Vec<Suppression> {
    let mut suppressions = Vec::new();
    let mut in_header = true;

    for (line_num, line) in content.lines().enumerate() {
        let line_number = line_num + 1;
        let trimmed = line.trim();

        if in_header && !is_comment_or_empty(trimmed) {
            in_header = false;
        }

        for pattern in SUPPRESSION_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(line) {
                let directive = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                let rule = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                let reason = caps
                    .get(3)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();

                let suppression_type = match directive {
                    "ignore-file" => {
                        // File-level suppressions belong in the file header.
                        if !in_header && line_number > 10 {
                            continue;
                        }
                        SuppressionType::File
                    }
                    "ignore-next-line" => SuppressionType::NextLine,
                    _ => SuppressionType::Line,
                };

                suppressions.push(Suppression {
                    rule: rule.to_string(),
                    reason,
                    file: file_path.to_string(),
                    line: if suppression_type == SuppressionType::File {
                        0
                    } else {
                        line_number
                    },
                    suppression_type,
                });
                break;
            }
        }
    }

    suppressions
}

fn is_comment_or_empty(trimmed: &str) -> bool {
    trimmed.is_empty()
        || trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
        || trimmed.starts_with("<?php")
}

/// Collect suppressions from all files, keyed by path.
pub fn collect_suppressions<P: AsRef<Path>>(
    files: &[P],
) -> anyhow::Result<HashMap<PathBuf, Vec<Suppression>>> {
    let mut map = HashMap::new();

    for file in files {
        let path = file.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => continue,
        };
        let suppressions = parse_suppressions(&path.to_string_lossy(), &content);
        if !suppressions.is_empty() {
            map.insert(path.to_path_buf(), suppressions);
        }
    }

    Ok(map)
}

/// Does this suppression cover the given issue?
fn covers(suppression: &Suppression, issue: &Issue) -> bool {
    if suppression.rule != "*" && suppression.rule != issue.code.as_str() {
        return false;
    }
    // Match on file suffix so relative/absolute path mixes still line up.
    if !suppression.file.ends_with(&issue.file) && !issue.file.ends_with(&suppression.file) {
        return false;
    }
    match suppression.suppression_type {
        SuppressionType::File => true,
        SuppressionType::Line => suppression.line == issue.line,
        SuppressionType::NextLine => suppression.line + 1 == issue.line,
    }
}

/// Split issues into (active, suppressed) against the collected directives.
pub fn filter_suppressed(
    issues: Vec<Issue>,
    suppressions: &[Suppression],
) -> (Vec<Issue>, Vec<SuppressedIssue>) {
    let mut active = Vec::new();
    let mut suppressed = Vec::new();

    for issue in issues {
        match suppressions.iter().find(|s| covers(s, &issue)) {
            Some(suppression) => suppressed.push(SuppressedIssue {
                issue,
                suppression: suppression.clone(),
            }),
            None => active.push(issue),
        }
    }

    (active, suppressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::types::IssueCode;

    fn issue(file: &str, line: usize) -> Issue {
        Issue::new(
            IssueCode::EmptyCatchBlock,
            file,
            line,
            "catch block is empty",
            "log or rethrow",
        )
    }

    #[test]
    fn test_parse_next_line_suppression() {
        let content = "<?php\n// larasmell:ignore-next-line empty_catch - legacy import\ntry {} catch (Exception $e) {}\n";
        let suppressions = parse_suppressions("app/Legacy.php", content);
        assert_eq!(suppressions.len(), 1);
        assert_eq!(suppressions[0].rule, "empty_catch");
        assert_eq!(suppressions[0].suppression_type, SuppressionType::NextLine);
        assert_eq!(suppressions[0].line, 2);
        assert_eq!(suppressions[0].reason, "legacy import");
    }

    #[test]
    fn test_parse_file_level_suppression() {
        let content = "<?php\n// larasmell:ignore-file hardcoded_path - fixture paths\n";
        let suppressions = parse_suppressions("tests/Fixture.php", content);
        assert_eq!(suppressions.len(), 1);
        assert_eq!(suppressions[0].suppression_type, SuppressionType::File);
        assert_eq!(suppressions[0].line, 0);
    }

    #[test]
    fn test_hash_comment_style() {
        let content = "<?php\n# larasmell:ignore empty_catch - known\n";
        let suppressions = parse_suppressions("x.php", content);
        assert_eq!(suppressions.len(), 1);
        assert_eq!(suppressions[0].suppression_type, SuppressionType::Line);
    }

    #[test]
    fn test_filter_suppressed_next_line() {
        let suppressions = vec![Suppression {
            rule: "empty_catch".to_string(),
            reason: String::new(),
            file: "app/Legacy.php".to_string(),
            line: 2,
            suppression_type: SuppressionType::NextLine,
        }];

        let (active, suppressed) =
            filter_suppressed(vec![issue("app/Legacy.php", 3)], &suppressions);
        assert!(active.is_empty());
        assert_eq!(suppressed.len(), 1);

        // A different line stays active.
        let (active, suppressed) =
            filter_suppressed(vec![issue("app/Legacy.php", 9)], &suppressions);
        assert_eq!(active.len(), 1);
        assert!(suppressed.is_empty());
    }

    #[test]
    fn test_wildcard_rule_matches_everything() {
        let suppressions = vec![Suppression {
            rule: "*".to_string(),
            reason: String::new(),
            file: "app/Legacy.php".to_string(),
            line: 0,
            suppression_type: SuppressionType::File,
        }];

        let (active, suppressed) =
            filter_suppressed(vec![issue("app/Legacy.php", 3)], &suppressions);
        assert!(active.is_empty());
        assert_eq!(suppressed.len(), 1);
    }

    #[test]
    fn test_other_rule_does_not_match() {
        let suppressions = vec![Suppression {
            rule: "hardcoded_path".to_string(),
            reason: String::new(),
            file: "app/Legacy.php".to_string(),
            line: 0,
            suppression_type: SuppressionType::File,
        }];

        let (active, suppressed) =
            filter_suppressed(vec![issue("app/Legacy.php", 3)], &suppressions);
        assert_eq!(active.len(), 1);
        assert!(suppressed.is_empty());
    }
}
