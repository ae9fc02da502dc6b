//! Scan configuration schema.
//!
//! A config file defines which paths to scan, where the models live, and
//! per-rule tunables. Loaded once before a run and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level scan configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ScanConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    /// Glob patterns for paths to exclude (e.g. "vendor/**", "storage/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Directories scanned for Eloquent models (registry pre-pass).
    #[serde(default)]
    pub model_paths: Option<Vec<String>>,
    /// Directories whose files are route definitions.
    #[serde(default)]
    pub route_paths: Option<Vec<String>>,
    /// Maximum acceptable smell score before the run fails.
    #[serde(default)]
    pub threshold: Option<i32>,
    #[serde(default)]
    pub rules: RulesConfig,
}

impl ScanConfig {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ScanConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Directories scanned for models (defaults to Laravel's layout).
    pub fn model_paths(&self) -> Vec<String> {
        self.model_paths
            .clone()
            .unwrap_or_else(|| vec!["app/Models".to_string()])
    }

    /// Directories treated as route definitions.
    pub fn route_paths(&self) -> Vec<String> {
        self.route_paths
            .clone()
            .unwrap_or_else(|| vec!["routes".to_string()])
    }

    /// Whether a (base-relative) file lives in a route directory.
    pub fn is_route_file(&self, rel_path: &str) -> bool {
        let normalized = rel_path.replace('\\', "/");
        self.route_paths().iter().any(|dir| {
            let dir = dir.trim_end_matches('/');
            normalized.starts_with(&format!("{}/", dir))
        })
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();

        for pattern in &self.excluded_paths {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(&*path_str) {
                    return true;
                }
            }
        }
        false
    }
}

/// Per-rule configuration sections.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RulesConfig {
    #[serde(default)]
    pub collection_filter: RuleToggle,
    #[serde(default)]
    pub empty_catch: EmptyCatchConfig,
    #[serde(default)]
    pub route_logic: RouteLogicConfig,
    #[serde(default)]
    pub hardcoded_path: HardcodedPathConfig,
    #[serde(default)]
    pub inconsistent_find: RuleToggle,
    #[serde(default)]
    pub lazy_load: RuleToggle,
}

/// Plain on/off switch (default: on).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RuleToggle {
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl RuleToggle {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Configuration for the swallowed-exception rule.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EmptyCatchConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Exception types (short or fully qualified) that may be swallowed.
    #[serde(default)]
    pub allowed_exceptions: Vec<String>,
}

impl EmptyCatchConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn is_allowed(&self, short: &str, fqn: &str) -> bool {
        self.allowed_exceptions
            .iter()
            .any(|allowed| allowed == short || allowed == fqn)
    }
}

/// Configuration for the business-logic-in-routes rule.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteLogicConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Decision points tolerated in a route closure before flagging.
    #[serde(default)]
    pub max_decision_points: Option<usize>,
}

impl RouteLogicConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn max_decision_points(&self) -> usize {
        self.max_decision_points.unwrap_or(3)
    }
}

/// Configuration for the hardcoded-path rule.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HardcodedPathConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Path prefixes that are fine to hardcode (e.g. "/proc").
    #[serde(default)]
    pub allowed_prefixes: Vec<String>,
}

impl HardcodedPathConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn is_allowed(&self, path: &str) -> bool {
        self.allowed_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }
}

/// Validate a parsed config before running.
pub fn validate(config: &ScanConfig) -> anyhow::Result<()> {
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }
    if let Some(threshold) = config.threshold {
        if !(0..=100).contains(&threshold) {
            anyhow::bail!("threshold must be between 0 and 100, got {}", threshold);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.model_paths(), vec!["app/Models".to_string()]);
        assert_eq!(config.route_paths(), vec!["routes".to_string()]);
        assert!(config.rules.collection_filter.is_enabled());
        assert!(config.rules.empty_catch.is_enabled());
        assert_eq!(config.rules.route_logic.max_decision_points(), 3);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
version: "1"
name: my-app
excluded_paths:
  - "vendor/**"
model_paths:
  - app/Models
  - app/Domain/Models
threshold: 40
rules:
  empty_catch:
    allowed_exceptions:
      - ModelNotFoundException
  route_logic:
    max_decision_points: 5
  lazy_load:
    enabled: false
"#;
        let config: ScanConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model_paths().len(), 2);
        assert_eq!(config.threshold, Some(40));
        assert!(config
            .rules
            .empty_catch
            .is_allowed("ModelNotFoundException", "X\\ModelNotFoundException"));
        assert_eq!(config.rules.route_logic.max_decision_points(), 5);
        assert!(!config.rules.lazy_load.is_enabled());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_route_file_detection() {
        let config = ScanConfig::default();
        assert!(config.is_route_file("routes/web.php"));
        assert!(config.is_route_file("routes/api.php"));
        assert!(!config.is_route_file("app/Http/Controllers/UserController.php"));
    }

    #[test]
    fn test_excluded_paths() {
        let config = ScanConfig {
            excluded_paths: vec!["**/vendor/**".to_string()],
            ..Default::default()
        };
        assert!(config.is_path_excluded(Path::new("project/vendor/autoload.php")));
        assert!(!config.is_path_excluded(Path::new("project/app/User.php")));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = ScanConfig {
            threshold: Some(250),
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }
}
