//! Detection of silently swallowed exceptions.
//!
//! A catch block that is empty, or that neither logs nor rethrows, hides
//! failures from operators. Multiple problems on one catch block roll up
//! into a single consolidated issue carrying the worst severity, with
//! every contributing reason recorded in metadata.

use crate::tree::{traverse, NodeId, NodeKind, Resolution, SyntaxTree, VisitError, Visitor};

use super::aggregate::{IssueAggregator, UnitFindings};
use super::runner::{FileContext, Rule};
use super::types::{IssueCode, Severity};

pub struct EmptyCatchRule;

impl Rule for EmptyCatchRule {
    fn code(&self) -> IssueCode {
        IssueCode::EmptyCatchBlock
    }

    fn is_enabled(&self, ctx: &FileContext) -> bool {
        ctx.config.rules.empty_catch.is_enabled()
    }

    fn check(&self, ctx: &FileContext, out: &mut IssueAggregator) -> Result<(), VisitError> {
        let mut visitor = CatchVisitor { ctx, out };
        traverse(ctx.tree, &mut [&mut visitor])
    }
}

struct CatchVisitor<'a, 'b> {
    ctx: &'a FileContext<'a>,
    out: &'b mut IssueAggregator,
}

impl Visitor for CatchVisitor<'_, '_> {
    fn wants(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Catch
    }

    fn on_enter(&mut self, tree: &SyntaxTree, node: NodeId) -> Result<(), VisitError> {
        let body = match tree.child_of_kind(node, NodeKind::Block) {
            Some(body) => body,
            None => return Err(VisitError::new(tree, node, "catch clause without a body")),
        };

        let caught = caught_types(self.ctx, tree, node, body);

        // Whitelisted exception types may be swallowed deliberately.
        let all_allowed = !caught.is_empty()
            && caught.iter().all(|(short, fqn)| {
                self.ctx.config.rules.empty_catch.is_allowed(short, fqn)
            });
        if all_allowed {
            return Ok(());
        }

        let mut unit = UnitFindings::new(IssueCode::EmptyCatchBlock, self.ctx.path, tree.line(node));

        if tree.children(body).is_empty() {
            unit.push(Severity::High, "catch block is empty");
        } else if !has_handling_sink(self.ctx, tree, body) {
            unit.push(
                Severity::High,
                "exception is swallowed without logging or rethrowing",
            );
        }

        let catches_generic = caught
            .iter()
            .any(|(short, _)| matches!(short.as_str(), "Exception" | "Throwable" | "Error"));
        if catches_generic && !unit.is_empty() {
            unit.push(Severity::Medium, "catches a generic exception type");
        }

        if let Some(issue) = unit.into_issue("log the exception or rethrow a domain-specific one") {
            self.out.report(issue);
        }
        Ok(())
    }
}

/// Resolve the exception types named by a catch clause, body excluded.
fn caught_types(
    ctx: &FileContext,
    tree: &SyntaxTree,
    catch: NodeId,
    body: NodeId,
) -> Vec<(String, String)> {
    let mut types = Vec::new();
    for &child in tree.children(catch) {
        if child == body {
            continue;
        }
        for id in tree.descendants(child) {
            if tree.kind(id) != NodeKind::NameRef {
                continue;
            }
            if let Some(raw) = tree.text(id) {
                match ctx.resolver.resolve(raw) {
                    Resolution::Resolved(name) => types.push((name.short, name.fqn)),
                    Resolution::Unresolvable => {}
                }
            }
        }
    }
    types
}

/// Does the catch body log, report, or rethrow?
fn has_handling_sink(ctx: &FileContext, tree: &SyntaxTree, body: NodeId) -> bool {
    let tables = ctx.classifier.tables();
    tree.descendants(body).any(|id| match tree.kind(id) {
        NodeKind::Throw => true,
        NodeKind::FunctionCall => tree
            .text(id)
            .map(|name| tables.logging_functions.contains(name))
            .unwrap_or(false),
        NodeKind::StaticCall => tree
            .children(id)
            .first()
            .filter(|&&scope| tree.kind(scope) == NodeKind::NameRef)
            .and_then(|&scope| tree.text(scope))
            .map(|raw| {
                let res = ctx.resolver.resolve(raw);
                let short = res.short().unwrap_or(raw);
                tables.logging_classes.contains(short)
            })
            .unwrap_or(false),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::detect::runner::test_support::{check_source, check_source_with_config};

    #[test]
    fn test_empty_catch_fires_single_high_issue() {
        let source = "<?php\ntry { sync(); } catch (Exception $e) {}\n";
        let issues = check_source(&EmptyCatchRule, "app/Jobs/Sync.php", source);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].code, IssueCode::EmptyCatchBlock);
        // The generic-type problem rides along in metadata, not as a
        // second finding.
        let reasons = issues[0].metadata.get("reasons").unwrap();
        assert!(reasons.contains("catch block is empty"));
        assert!(reasons.contains("generic exception type"));
    }

    #[test]
    fn test_logged_catch_is_clean() {
        let source = "<?php\ntry { sync(); } catch (Exception $e) { Log::error($e); }\n";
        let issues = check_source(&EmptyCatchRule, "app/Jobs/Sync.php", source);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_rethrow_is_clean() {
        let source =
            "<?php\ntry { sync(); } catch (Exception $e) { throw new SyncFailed($e); }\n";
        let issues = check_source(&EmptyCatchRule, "app/Jobs/Sync.php", source);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_report_helper_is_a_sink() {
        let source = "<?php\ntry { sync(); } catch (Exception $e) { report($e); }\n";
        let issues = check_source(&EmptyCatchRule, "app/Jobs/Sync.php", source);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_swallowed_with_side_work_still_fires() {
        let source = "<?php\ntry { sync(); } catch (Exception $e) { $count = 0; }\n";
        let issues = check_source(&EmptyCatchRule, "app/Jobs/Sync.php", source);
        assert_eq!(issues.len(), 1);
        let reasons = issues[0].metadata.get("reasons").unwrap();
        assert!(reasons.contains("without logging"));
    }

    #[test]
    fn test_whitelisted_exception_may_be_swallowed() {
        let yaml = r#"
rules:
  empty_catch:
    allowed_exceptions:
      - ModelNotFoundException
"#;
        let config: ScanConfig = serde_yaml::from_str(yaml).unwrap();
        let source = "<?php\ntry { lookup(); } catch (ModelNotFoundException $e) {}\n";
        let issues =
            check_source_with_config(&EmptyCatchRule, "app/Jobs/Sync.php", source, &config);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_specific_unlisted_exception_still_fires() {
        let source = "<?php\ntry { lookup(); } catch (PaymentDeclined $e) {}\n";
        let issues = check_source(&EmptyCatchRule, "app/Jobs/Sync.php", source);
        assert_eq!(issues.len(), 1);
        // Specific type: no generic-type reason attached.
        let reasons = issues[0].metadata.get("reasons").unwrap();
        assert!(!reasons.contains("generic"));
    }
}
