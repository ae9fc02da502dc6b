//! Scan runner orchestrating the per-file pipeline.
//!
//! Lifecycle per run: config loaded -> files enumerated -> model registry
//! built and frozen -> per file (parse -> traverse rules -> collect) ->
//! aggregate -> result. Files are independent and checked in parallel;
//! per-file failures (parse errors, visitor errors) are contained: the
//! file is recorded as skipped, its partial results are discarded, and
//! the run always completes.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::classify::{Classifier, DEFAULT_TABLES};
use crate::config::ScanConfig;
use crate::registry::{self, ModelRegistry};
use crate::tree::{parse_php, NameResolver, SyntaxTree, VisitError};

use super::aggregate::IssueAggregator;
use super::collection_filter::CollectionFilterRule;
use super::empty_catch::EmptyCatchRule;
use super::hardcoded_path::HardcodedPathRule;
use super::inconsistent_find::InconsistentFindRule;
use super::lazy_load::LazyLoadRule;
use super::route_logic::RouteLogicRule;
use super::suppress::{collect_suppressions, filter_suppressed};
use super::types::{Issue, IssueCode, ScanResult};

/// Everything a rule needs while checking one file. Borrowed data only;
/// nothing here outlives the file's pipeline step.
pub struct FileContext<'a> {
    /// Path relative to the scan base.
    pub path: &'a str,
    pub tree: &'a SyntaxTree,
    pub resolver: &'a NameResolver,
    pub classifier: Classifier<'a>,
    pub config: &'a ScanConfig,
}

/// A smell rule: one visitor pass over a parsed file.
pub trait Rule: Send + Sync {
    /// Primary issue code this rule emits.
    fn code(&self) -> IssueCode;

    /// Whether the rule applies to this file under this config.
    fn is_enabled(&self, ctx: &FileContext) -> bool;

    /// Run the rule, reporting into the per-(file, rule) aggregator.
    fn check(&self, ctx: &FileContext, out: &mut IssueAggregator) -> Result<(), VisitError>;
}

/// All shipped rules, in execution order.
fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(CollectionFilterRule),
        Box::new(EmptyCatchRule),
        Box::new(RouteLogicRule),
        Box::new(HardcodedPathRule),
        Box::new(InconsistentFindRule),
        Box::new(LazyLoadRule),
    ]
}

enum FileOutcome {
    Checked(Vec<Issue>),
    Skipped { file: String, reason: String },
}

/// Executes all rules against a set of files.
pub struct Runner {
    base_dir: PathBuf,
    config: ScanConfig,
}

impl Runner {
    pub fn new<P: AsRef<Path>>(base_dir: P, config: ScanConfig) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            config,
        }
    }

    /// Run every enabled rule over the given files.
    pub fn run(&self, files: &[PathBuf]) -> anyhow::Result<ScanResult> {
        // Phase one: build the model registry to completion and freeze it
        // before any consumer traversal starts.
        let registry = registry::load_or_build(&self.base_dir, &self.config.model_paths());

        let suppression_map = collect_suppressions(files)?;
        let all_suppressions: Vec<_> = suppression_map.values().flatten().cloned().collect();

        // Phase two: the per-file pipeline is stateless between files.
        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .map(|path| self.check_file(path, &registry))
            .collect();

        let mut result = ScanResult::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Checked(issues) => {
                    result.scanned += 1;
                    result.issues.extend(issues);
                }
                FileOutcome::Skipped { file, reason } => {
                    eprintln!("Warning: skipping {}: {}", file, reason);
                    result.skipped.push(file);
                }
            }
        }

        // Deterministic ordering regardless of scheduling.
        result
            .issues
            .sort_by(|a, b| (&a.file, a.line, a.code.as_str()).cmp(&(&b.file, b.line, b.code.as_str())));
        result.skipped.sort();

        if !all_suppressions.is_empty() {
            let (active, suppressed) = filter_suppressed(result.issues, &all_suppressions);
            result.issues = active;
            result.suppressed = suppressed;
        }

        Ok(result)
    }

    /// Parse and check one file. Any failure skips the file, discarding
    /// partial results; nothing aborts the run.
    fn check_file(&self, path: &Path, registry: &ModelRegistry) -> FileOutcome {
        let rel = path
            .strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                return FileOutcome::Skipped {
                    file: rel,
                    reason: e.to_string(),
                }
            }
        };
        let tree = match parse_php(&rel, &source) {
            Ok(tree) => tree,
            Err(e) => {
                return FileOutcome::Skipped {
                    file: rel,
                    reason: e.to_string(),
                }
            }
        };

        let resolver = NameResolver::from_tree(&tree);
        let classifier = Classifier::new(&DEFAULT_TABLES).with_registry(registry);
        let ctx = FileContext {
            path: &rel,
            tree: &tree,
            resolver: &resolver,
            classifier,
            config: &self.config,
        };

        let mut issues = Vec::new();
        for rule in all_rules() {
            if !rule.is_enabled(&ctx) {
                continue;
            }
            // The dedup set is scoped per (file, rule run).
            let mut aggregator = IssueAggregator::new(&rel);
            if let Err(e) = rule.check(&ctx, &mut aggregator) {
                return FileOutcome::Skipped {
                    file: rel,
                    reason: e.to_string(),
                };
            }
            issues.extend(aggregator.into_issues());
        }

        FileOutcome::Checked(issues)
    }
}

/// Helpers for driving a single rule over inline PHP source in tests.
#[cfg(test)]
pub mod test_support {
    use super::*;

    pub fn check_source_full(
        rule: &dyn Rule,
        path: &str,
        source: &str,
        config: &ScanConfig,
        registry: Option<&ModelRegistry>,
    ) -> Vec<Issue> {
        let tree = parse_php(path, source).expect("fixture should parse");
        let resolver = NameResolver::from_tree(&tree);
        let mut classifier = Classifier::new(&DEFAULT_TABLES);
        if let Some(registry) = registry {
            classifier = classifier.with_registry(registry);
        }
        let ctx = FileContext {
            path,
            tree: &tree,
            resolver: &resolver,
            classifier,
            config,
        };
        if !rule.is_enabled(&ctx) {
            return Vec::new();
        }
        let mut aggregator = IssueAggregator::new(path);
        rule.check(&ctx, &mut aggregator).expect("rule should not error");
        aggregator.into_issues()
    }

    pub fn check_source(rule: &dyn Rule, path: &str, source: &str) -> Vec<Issue> {
        check_source_full(rule, path, source, &ScanConfig::default(), None)
    }

    pub fn check_source_with_config(
        rule: &dyn Rule,
        path: &str,
        source: &str,
        config: &ScanConfig,
    ) -> Vec<Issue> {
        check_source_full(rule, path, source, config, None)
    }

    pub fn check_source_with_registry(
        rule: &dyn Rule,
        path: &str,
        source: &str,
        registry: &ModelRegistry,
    ) -> Vec<Issue> {
        check_source_full(rule, path, source, &ScanConfig::default(), Some(registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::types::Severity;
    use tempfile::TempDir;

    fn write(temp: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = temp.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_runner_collects_across_rules() {
        let temp = TempDir::new().unwrap();
        let file = write(
            &temp,
            "app/Jobs/Import.php",
            r#"<?php

use App\Models\User;

function import($id) {
    try {
        $rows = User::where('active', true)->get()->filter(fn($u) => $u->ok);
    } catch (Exception $e) {}
}
"#,
        );

        let runner = Runner::new(temp.path(), ScanConfig::default());
        let result = runner.run(&[file]).unwrap();

        assert_eq!(result.scanned, 1);
        assert!(result.skipped.is_empty());
        let codes: Vec<&str> = result.issues.iter().map(|i| i.code.as_str()).collect();
        assert!(codes.contains(&"collection_filter"));
        assert!(codes.contains(&"empty_catch"));
    }

    #[test]
    fn test_parse_failure_skips_file_and_run_continues() {
        let temp = TempDir::new().unwrap();
        let broken = write(&temp, "app/Broken.php", "<?php class {{{");
        let fine = write(
            &temp,
            "app/Fine.php",
            "<?php\ntry { work(); } catch (Exception $e) {}\n",
        );

        let runner = Runner::new(temp.path(), ScanConfig::default());
        let result = runner.run(&[broken, fine]).unwrap();

        assert_eq!(result.scanned, 1);
        assert_eq!(result.skipped, vec!["app/Broken.php".to_string()]);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].file, "app/Fine.php");
    }

    #[test]
    fn test_registry_feeds_consumer_rules() {
        let temp = TempDir::new().unwrap();
        write(
            &temp,
            "app/Models/User.php",
            r#"<?php

namespace App\Models;

use Illuminate\Database\Eloquent\Model;

class User extends Model
{
    public function orders()
    {
        return $this->hasMany(Order::class);
    }
}
"#,
        );
        let consumer = write(
            &temp,
            "app/Console/Report.php",
            r#"<?php

use App\Models\User;

foreach (User::all() as $user) {
    echo $user->orders;
}
"#,
        );

        let runner = Runner::new(temp.path(), ScanConfig::default());
        let result = runner.run(&[consumer]).unwrap();

        let lazy: Vec<_> = result
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::LazyLoadInLoop)
            .collect();
        assert_eq!(lazy.len(), 1);
        assert_eq!(lazy[0].severity, Severity::High);
        assert_eq!(
            lazy[0].metadata.get("evidence").map(String::as_str),
            Some("registry_hit")
        );
    }

    #[test]
    fn test_inline_suppression_moves_issue_aside() {
        let temp = TempDir::new().unwrap();
        let file = write(
            &temp,
            "app/Legacy.php",
            "<?php\n// larasmell:ignore-next-line empty_catch - vendored import loop\ntry { work(); } catch (Exception $e) {}\n",
        );

        let runner = Runner::new(temp.path(), ScanConfig::default());
        let result = runner.run(&[file]).unwrap();

        assert!(result.issues.is_empty());
        assert_eq!(result.suppressed_count(), 1);
    }

    #[test]
    fn test_disabled_rule_is_not_run() {
        let temp = TempDir::new().unwrap();
        let file = write(
            &temp,
            "app/Legacy.php",
            "<?php\ntry { work(); } catch (Exception $e) {}\n",
        );

        let config: ScanConfig = serde_yaml::from_str(
            "rules:\n  empty_catch:\n    enabled: false\n",
        )
        .unwrap();
        let runner = Runner::new(temp.path(), config);
        let result = runner.run(&[file]).unwrap();
        assert!(result.issues.is_empty());
    }
}
