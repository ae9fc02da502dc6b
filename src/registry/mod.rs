//! Cross-file model registry.
//!
//! Before consumer rules run, the configured model directories are scanned
//! once to map each Eloquent model class to its table name and
//! relationship methods. The registry is built to completion and frozen
//! (read-only) before any rule traversal starts — a two-phase barrier, not
//! a streaming pipeline. A process-wide cache keyed by (base path, scanned
//! directories) avoids rescanning on repeated runs; entries are `Arc`s so
//! concurrent readers share the frozen data.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use walkdir::WalkDir;

use crate::classify::{inflect, DEFAULT_TABLES};
use crate::tree::{parse_php, NameResolver, NodeId, NodeKind, Resolution, SyntaxTree};

/// One discovered model class.
#[derive(Debug, Clone)]
pub struct ModelEntry {
    /// Fully qualified class name.
    pub class: String,
    /// Short class name.
    pub short: String,
    /// Table name: explicit `$table` property, or inferred by convention.
    pub table: String,
    /// File the class was found in (relative to the scan base).
    pub file: String,
    /// Relationship method names (`posts`, `author`, ...).
    pub relationships: Vec<String>,
}

/// Frozen map of model classes discovered in a pre-pass.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    by_class: HashMap<String, ModelEntry>,
}

impl ModelRegistry {
    pub fn is_model(&self, fqn: &str) -> bool {
        self.by_class.contains_key(fqn)
    }

    pub fn get(&self, fqn: &str) -> Option<&ModelEntry> {
        self.by_class.get(fqn)
    }

    pub fn table_for(&self, fqn: &str) -> Option<&str> {
        self.by_class.get(fqn).map(|e| e.table.as_str())
    }

    pub fn has_relationship(&self, fqn: &str, name: &str) -> bool {
        self.by_class
            .get(fqn)
            .map(|e| e.relationships.iter().any(|r| r == name))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.by_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }

    /// Insert an entry directly (tests and custom pre-passes).
    pub fn insert(&mut self, entry: ModelEntry) {
        self.by_class.insert(entry.class.clone(), entry);
    }

    /// Scan the given directories under `base` for model classes.
    ///
    /// Per-file failures (unreadable, unparseable) are logged and skipped;
    /// the scan itself never fails.
    pub fn scan(base: &Path, dirs: &[String]) -> ModelRegistry {
        let mut registry = ModelRegistry::default();

        for dir in dirs {
            let root = base.join(dir);
            if !root.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("php") {
                    continue;
                }
                let rel = path
                    .strip_prefix(base)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .to_string();

                let source = match fs::read_to_string(path) {
                    Ok(source) => source,
                    Err(e) => {
                        eprintln!("Warning: failed to read model file {}: {}", rel, e);
                        continue;
                    }
                };
                let tree = match parse_php(&rel, &source) {
                    Ok(tree) => tree,
                    Err(e) => {
                        eprintln!("Warning: skipping model file: {}", e);
                        continue;
                    }
                };
                collect_models(&tree, &rel, &mut registry);
            }
        }

        registry
    }
}

/// Base classes that mark a class as an Eloquent model.
fn is_model_base(short: &str, fqn: &str) -> bool {
    matches!(short, "Model" | "Authenticatable" | "Pivot")
        || fqn.starts_with("Illuminate\\Database\\Eloquent")
        || fqn.starts_with("Illuminate\\Foundation\\Auth")
}

fn collect_models(tree: &SyntaxTree, file: &str, registry: &mut ModelRegistry) {
    let resolver = NameResolver::from_tree(tree);

    for class in tree.preorder() {
        if tree.kind(class) != NodeKind::ClassDecl {
            continue;
        }
        let short = match tree.text(class) {
            Some(short) => short.to_string(),
            None => continue,
        };

        let extends_model = tree
            .child_of_kind(class, NodeKind::BaseClause)
            .map(|base| {
                tree.descendants(base)
                    .filter(|&id| tree.kind(id) == NodeKind::NameRef)
                    .filter_map(|id| tree.text(id))
                    .any(|raw| match resolver.resolve(raw) {
                        Resolution::Resolved(name) => is_model_base(&name.short, &name.fqn),
                        Resolution::Unresolvable => false,
                    })
            })
            .unwrap_or(false);
        if !extends_model {
            continue;
        }

        let table = explicit_table(tree, class).unwrap_or_else(|| inflect::table_name(&short));
        let relationships = relationship_methods(tree, class);

        registry.insert(ModelEntry {
            class: resolver.qualify(&short),
            short,
            table,
            file: file.to_string(),
            relationships,
        });
    }
}

/// Value of an explicit `protected $table = '...'` property, if present.
fn explicit_table(tree: &SyntaxTree, class: NodeId) -> Option<String> {
    tree.descendants(class)
        .filter(|&id| tree.kind(id) == NodeKind::PropertyDecl && tree.text(id) == Some("table"))
        .find_map(|id| {
            tree.descendants(id)
                .find(|&c| tree.kind(c) == NodeKind::StringLiteral)
                .and_then(|c| tree.text(c))
                .map(|t| t.to_string())
        })
}

/// Method names whose body calls a relationship builder on `$this`.
fn relationship_methods(tree: &SyntaxTree, class: NodeId) -> Vec<String> {
    let mut names = Vec::new();

    for method in tree.descendants(class) {
        if tree.kind(method) != NodeKind::MethodDecl {
            continue;
        }
        let name = match tree.text(method) {
            Some(name) => name,
            None => continue,
        };
        let defines_relationship = tree.descendants(method).any(|id| {
            tree.kind(id) == NodeKind::MethodCall
                && tree
                    .text(id)
                    .map(|m| DEFAULT_TABLES.relationship_methods.contains(m))
                    .unwrap_or(false)
                && tree
                    .children(id)
                    .first()
                    .map(|&c| tree.kind(c) == NodeKind::Variable && tree.text(c) == Some("this"))
                    .unwrap_or(false)
        });
        if defines_relationship {
            names.push(name.to_string());
        }
    }

    names
}

type CacheKey = (PathBuf, Vec<String>);

/// Process-wide registry cache: (base path, scanned dirs) -> frozen registry.
static REGISTRY_CACHE: Lazy<RwLock<HashMap<CacheKey, Arc<ModelRegistry>>>> =
    Lazy::new(Default::default);

/// Build the registry for `(base, dirs)`, reusing a cached scan when the
/// same key was built before in this process.
pub fn load_or_build(base: &Path, dirs: &[String]) -> Arc<ModelRegistry> {
    let mut dirs_key: Vec<String> = dirs.to_vec();
    dirs_key.sort();
    let key = (base.to_path_buf(), dirs_key);

    if let Ok(cache) = REGISTRY_CACHE.read() {
        if let Some(hit) = cache.get(&key) {
            return Arc::clone(hit);
        }
    }

    let registry = Arc::new(ModelRegistry::scan(base, dirs));
    if let Ok(mut cache) = REGISTRY_CACHE.write() {
        cache.insert(key, Arc::clone(&registry));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const USER_MODEL: &str = r#"<?php

namespace App\Models;

use Illuminate\Database\Eloquent\Model;

class User extends Model
{
    public function posts()
    {
        return $this->hasMany(Post::class);
    }

    public function fullName()
    {
        return $this->first_name . ' ' . $this->last_name;
    }
}
"#;

    const ORDER_MODEL: &str = r#"<?php

namespace App\Models;

use Illuminate\Database\Eloquent\Model;

class OrderItem extends Model
{
    protected $table = 'line_items';
}
"#;

    fn write_models(temp: &TempDir) {
        let models = temp.path().join("app/Models");
        std::fs::create_dir_all(&models).unwrap();
        std::fs::write(models.join("User.php"), USER_MODEL).unwrap();
        std::fs::write(models.join("OrderItem.php"), ORDER_MODEL).unwrap();
    }

    #[test]
    fn test_scan_discovers_models() {
        let temp = TempDir::new().unwrap();
        write_models(&temp);

        let registry = ModelRegistry::scan(temp.path(), &["app/Models".to_string()]);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_model("App\\Models\\User"));
        assert!(registry.is_model("App\\Models\\OrderItem"));
        assert!(!registry.is_model("App\\Models\\Missing"));
    }

    #[test]
    fn test_table_name_inference_and_override() {
        let temp = TempDir::new().unwrap();
        write_models(&temp);

        let registry = ModelRegistry::scan(temp.path(), &["app/Models".to_string()]);
        // Convention: snake_case + pluralized.
        assert_eq!(registry.table_for("App\\Models\\User"), Some("users"));
        // Explicit $table property wins over convention.
        assert_eq!(
            registry.table_for("App\\Models\\OrderItem"),
            Some("line_items")
        );
    }

    #[test]
    fn test_relationship_detection() {
        let temp = TempDir::new().unwrap();
        write_models(&temp);

        let registry = ModelRegistry::scan(temp.path(), &["app/Models".to_string()]);
        assert!(registry.has_relationship("App\\Models\\User", "posts"));
        // Plain computed accessors are not relationships.
        assert!(!registry.has_relationship("App\\Models\\User", "fullName"));
    }

    #[test]
    fn test_unparseable_model_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let models = temp.path().join("app/Models");
        std::fs::create_dir_all(&models).unwrap();
        std::fs::write(models.join("Broken.php"), "<?php class {{{").unwrap();
        std::fs::write(models.join("User.php"), USER_MODEL).unwrap();

        let registry = ModelRegistry::scan(temp.path(), &["app/Models".to_string()]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cache_returns_same_instance() {
        let temp = TempDir::new().unwrap();
        write_models(&temp);

        let dirs = vec!["app/Models".to_string()];
        let first = load_or_build(temp.path(), &dirs);
        let second = load_or_build(temp.path(), &dirs);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
    }
}
