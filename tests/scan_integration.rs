//! Integration tests for the full scan pipeline.
//!
//! These run the runner against the testdata fixtures: a small Laravel
//! layout with models, a controller full of smells, a clean service, route
//! files, and one intentionally broken file.

use std::collections::HashMap;
use std::path::PathBuf;

use larasmell::config::ScanConfig;
use larasmell::detect::{IssueCode, Runner, ScanResult, Severity};
use larasmell::score;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn collect_php_files(root: &PathBuf) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().map(|e| e == "php").unwrap_or(false))
        .collect();
    files.sort();
    files
}

fn run_scan() -> ScanResult {
    let testdata = testdata_path();
    let config = ScanConfig::parse_file(testdata.join("larasmell.yaml")).expect("config parses");
    let files = collect_php_files(&testdata);
    let runner = Runner::new(&testdata, config);
    runner.run(&files).expect("scan should succeed")
}

fn issues_with(result: &ScanResult, code: IssueCode) -> Vec<&larasmell::detect::Issue> {
    result.issues.iter().filter(|i| i.code == code).collect()
}

/// Line (1-indexed) of the first fixture line containing `needle`.
fn fixture_line(rel: &str, needle: &str) -> usize {
    let content = std::fs::read_to_string(testdata_path().join(rel)).unwrap();
    content
        .lines()
        .position(|l| l.contains(needle))
        .map(|i| i + 1)
        .unwrap_or_else(|| panic!("{} not found in {}", needle, rel))
}

#[test]
fn test_collection_filter_fires_once_on_the_filter_line() {
    let result = run_scan();
    let issues = issues_with(&result, IssueCode::CollectionFilterAfterQuery);
    assert_eq!(issues.len(), 1, "exactly one collection_filter issue");

    let issue = issues[0];
    assert_eq!(issue.severity, Severity::Critical);
    assert_eq!(issue.file, "app/Http/Controllers/ReportController.php");
    assert_eq!(
        issue.line,
        fixture_line("app/Http/Controllers/ReportController.php", "->filter(")
    );
}

#[test]
fn test_empty_catch_fires_only_in_smelly_controller() {
    let result = run_scan();
    let issues = issues_with(&result, IssueCode::EmptyCatchBlock);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::High);
    assert_eq!(issues[0].file, "app/Http/Controllers/ReportController.php");
    // The clean service logs and rethrows: no finding there.
}

#[test]
fn test_query_in_route_closure() {
    let result = run_scan();
    let issues = issues_with(&result, IssueCode::QueryInRoute);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].file, "routes/web.php");
    assert_eq!(issues[0].severity, Severity::High);
}

#[test]
fn test_hardcoded_path_in_filesystem_call() {
    let result = run_scan();
    let issues = issues_with(&result, IssueCode::HardcodedPath);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Medium);
    assert!(issues[0].message.contains("/var/www/shared/export.json"));
}

#[test]
fn test_inconsistent_find_consolidates_to_medium() {
    let result = run_scan();
    let issues = issues_with(&result, IssueCode::InconsistentFind);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Medium);
    assert!(issues[0].message.contains("inconsistent"));
}

#[test]
fn test_lazy_load_detected_via_model_registry() {
    let result = run_scan();
    let issues = issues_with(&result, IssueCode::LazyLoadInLoop);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::High);
    assert_eq!(
        issues[0].metadata.get("evidence").map(String::as_str),
        Some("registry_hit")
    );
}

#[test]
fn test_broken_file_is_skipped_not_fatal() {
    let result = run_scan();
    assert!(result.skipped.contains(&"app/Invalid.php".to_string()));
    // The run still completed and scanned everything else.
    assert!(result.scanned >= 5);
    assert!(result
        .issues
        .iter()
        .all(|i| i.file != "app/Invalid.php"));
}

#[test]
fn test_clean_files_produce_no_issues() {
    let result = run_scan();
    assert!(result
        .issues
        .iter()
        .all(|i| i.file != "app/Services/CleanService.php"));
    assert!(result
        .issues
        .iter()
        .all(|i| !i.file.starts_with("app/Models/")));
}

#[test]
fn test_at_most_one_issue_per_file_line_and_code() {
    let result = run_scan();
    let mut seen: HashMap<(String, usize, &str), usize> = HashMap::new();
    for issue in &result.issues {
        *seen
            .entry((issue.file.clone(), issue.line, issue.code.as_str()))
            .or_insert(0) += 1;
    }
    for ((file, line, code), count) in seen {
        assert_eq!(count, 1, "duplicate {} at {}:{}", code, file, line);
    }
}

#[test]
fn test_scoring_fails_the_smelly_fixture() {
    let result = run_scan();
    let smell = score::calculate(&result, score::DEFAULT_THRESHOLD);
    // Critical(20) + three High(10) = 50 counted points.
    assert_eq!(smell.score, 50);
    assert!(!smell.passed);
    assert_eq!(smell.grade, "C");
}

#[test]
fn test_issues_are_sorted_deterministically() {
    let result = run_scan();
    let mut sorted = result.issues.clone();
    sorted.sort_by(|a, b| {
        (&a.file, a.line, a.code.as_str()).cmp(&(&b.file, b.line, b.code.as_str()))
    });
    let got: Vec<_> = result
        .issues
        .iter()
        .map(|i| (i.file.clone(), i.line))
        .collect();
    let want: Vec<_> = sorted.iter().map(|i| (i.file.clone(), i.line)).collect();
    assert_eq!(got, want);
}
