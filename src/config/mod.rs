//! Configuration loading for is-my-code-great

mod schema;

pub use schema::{Config, ConfigOverride, ParameterBoundary, RuleSeverity};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::language::FrameworkHints;
use crate::{RuleId, Severity};

pub const CONFIG_FILENAME: &str = ".imcgrc.json";

/// Default `maxParameters`
pub const DEFAULT_MAX_PARAMETERS: usize = 4;

/// Find and load config file with extends resolution. Searches current directory then parents.
pub fn load_config(work_dir: &Path, custom_path: Option<&Path>) -> Result<Config> {
    let path = if let Some(p) = custom_path {
        let path = if p.is_absolute() {
            p.to_path_buf()
        } else {
            work_dir.join(p)
        };
        if path.exists() {
            Some(path)
        } else {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    } else {
        find_config_in_parents(work_dir)
    };

    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load_config_with_extends(&path, &mut HashSet::new())
        }
        None => Ok(Config::default()),
    }
}

/// Load a config file and resolve its extends chain
fn load_config_with_extends(config_path: &Path, visited: &mut HashSet<PathBuf>) -> Result<Config> {
    let canonical = config_path
        .canonicalize()
        .unwrap_or_else(|_| config_path.to_path_buf());
    if !visited.insert(canonical) {
        anyhow::bail!(
            "Circular extends detected in config: {}",
            config_path.display()
        );
    }

    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
    let mut config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in config: {}", config_path.display()))?;

    if let Some(extends) = config.extends.take() {
        let base_config = resolve_extends(config_path, &extends, visited)?;
        config.merge_from(base_config);
    }

    Ok(config)
}

/// Resolve an extends reference relative to the extending file
fn resolve_extends(
    config_path: &Path,
    extends: &str,
    visited: &mut HashSet<PathBuf>,
) -> Result<Config> {
    let config_dir = config_path.parent().unwrap_or(Path::new("."));
    let extends_path = Path::new(extends);
    let extends_path = if extends_path.is_absolute() {
        extends_path.to_path_buf()
    } else {
        config_dir.join(extends_path)
    };

    let extends_path = if extends_path.extension().is_none() {
        extends_path.with_extension("json")
    } else {
        extends_path
    };

    if !extends_path.exists() {
        anyhow::bail!(
            "Extended config not found: {} (referenced from {})",
            extends_path.display(),
            config_path.display()
        );
    }

    load_config_with_extends(&extends_path, visited)
}

/// Search for .imcgrc.json in directory and its parents
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}

/// Build a GlobSet from ignore patterns for path matching
pub fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile_glob(pattern)?);
    }
    builder.build().map_err(|source| ConfigError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

fn compile_glob(pattern: &str) -> Result<Glob, ConfigError> {
    Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
        pattern: pattern.to_string(),
        source,
    })
}

/// Check if a path should be ignored based on config glob patterns
pub fn is_ignored(path: &Path, ignore_set: &GlobSet) -> bool {
    ignore_set.is_match(path)
}

/// Parse a rule id, rejecting unknown ones
fn rule_id(id: &str) -> Result<RuleId, ConfigError> {
    RuleId::from_id(id).ok_or_else(|| ConfigError::UnknownRule { id: id.to_string() })
}

fn rule_map(
    rules: &HashMap<String, RuleSeverity>,
) -> Result<HashMap<RuleId, RuleSeverity>, ConfigError> {
    // Sorted so the first reported error does not depend on map order
    let mut entries: Vec<_> = rules.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(id, severity)| Ok((rule_id(id)?, *severity)))
        .collect()
}

#[derive(Debug, Clone)]
struct CompiledOverride {
    files: GlobSet,
    rules: HashMap<RuleId, RuleSeverity>,
}

/// Validated configuration consumed by the analysis engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_parameters: usize,
    pub parameter_boundary: ParameterBoundary,
    pub inline_function_arguments: bool,
    pub enabled_rules: HashSet<RuleId>,
    pub fail_on: Severity,
    pub hints: HashMap<String, FrameworkHints>,
    rules: HashMap<RuleId, RuleSeverity>,
    overrides: Vec<CompiledOverride>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_parameters: DEFAULT_MAX_PARAMETERS,
            parameter_boundary: ParameterBoundary::default(),
            inline_function_arguments: true,
            enabled_rules: RuleId::ALL.into_iter().collect(),
            fail_on: Severity::Warning,
            hints: HashMap::new(),
            rules: HashMap::new(),
            overrides: Vec::new(),
        }
    }
}

impl EngineSettings {
    /// Validate a loaded config. Fails on the first invalid value.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let max_parameters = config.max_parameters.unwrap_or(DEFAULT_MAX_PARAMETERS);
        if max_parameters == 0 {
            return Err(ConfigError::InvalidThreshold {
                value: max_parameters,
            });
        }

        let enabled_rules = match &config.enabled_rules {
            Some(ids) => ids.iter().map(|id| rule_id(id)).collect::<Result<_, _>>()?,
            None => RuleId::ALL.into_iter().collect(),
        };

        let rules = rule_map(&config.rules)?;

        let overrides = config
            .overrides
            .iter()
            .map(|o| {
                Ok(CompiledOverride {
                    files: build_ignore_set(&o.files)?,
                    rules: rule_map(&o.rules)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        build_ignore_set(&config.ignore)?;

        Ok(Self {
            max_parameters,
            parameter_boundary: config.parameter_boundary.unwrap_or_default(),
            inline_function_arguments: config.inline_function_arguments.unwrap_or(true),
            enabled_rules,
            fail_on: config.fail_on.unwrap_or(Severity::Warning),
            hints: config.test_framework_hints.clone(),
            rules,
            overrides,
        })
    }

    pub fn is_enabled(&self, rule: RuleId) -> bool {
        self.enabled_rules.contains(&rule)
    }

    /// Effective severity of a rule for one file; `None` when it is off there
    pub fn severity_for(&self, path: &Path, rule: RuleId) -> Option<Severity> {
        if !self.is_enabled(rule) {
            return None;
        }
        let mut severity = self
            .rules
            .get(&rule)
            .copied()
            .map_or(Some(rule.default_severity()), RuleSeverity::to_severity);
        // Later overrides win
        for o in self.overrides.iter().filter(|o| o.files.is_match(path)) {
            if let Some(s) = o.rules.get(&rule) {
                severity = s.to_severity();
            }
        }
        severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_missing_config_is_default() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert!(config.max_parameters.is_none());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_config_found_in_parent() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), CONFIG_FILENAME, r#"{ "maxParameters": 7 }"#);
        let nested = dir.path().join("tests").join("unit");
        fs::create_dir_all(&nested).unwrap();
        let config = load_config(&nested, None).unwrap();
        assert_eq!(config.max_parameters, Some(7));
    }

    #[test]
    fn test_missing_custom_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(dir.path(), Some(Path::new("nope.json"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_is_ignored_patterns() {
        let set = build_ignore_set(&["**/legacy/**".to_string(), "**/*.g.dart".to_string()])
            .unwrap();
        assert!(is_ignored(Path::new("foo/legacy/BarTests.cs"), &set));
        assert!(is_ignored(Path::new("lib/model.g.dart"), &set));
        assert!(!is_ignored(Path::new("test/model_test.dart"), &set));
    }

    #[test]
    fn test_invalid_glob() {
        let err = build_ignore_set(&["a/{b".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGlob { .. }));
    }

    #[test]
    fn test_config_extends() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base.json",
            r#"{
                "maxParameters": 6,
                "failOn": "error",
                "rules": { "setup-within-test": "error" },
                "ignore": ["**/legacy/**"]
            }"#,
        );
        write(
            dir.path(),
            CONFIG_FILENAME,
            r#"{
                "extends": "./base",
                "maxParameters": 3,
                "rules": { "too-many-arguments": "info" }
            }"#,
        );

        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.max_parameters, Some(3));
        assert_eq!(config.fail_on, Some(Severity::Error));
        assert_eq!(config.rules["setup-within-test"], RuleSeverity::Error);
        assert_eq!(config.rules["too-many-arguments"], RuleSeverity::Info);
        assert_eq!(config.ignore, vec!["**/legacy/**".to_string()]);
    }

    #[test]
    fn test_circular_extends() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", r#"{ "extends": "./b.json" }"#);
        write(dir.path(), "b.json", r#"{ "extends": "./a.json" }"#);
        let err = load_config(dir.path(), Some(Path::new("a.json"))).unwrap_err();
        assert!(err.to_string().contains("Circular extends"));
    }

    #[test]
    fn test_zero_threshold_is_rejected() {
        let config = Config {
            max_parameters: Some(0),
            ..Config::default()
        };
        let err = EngineSettings::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold { value: 0 }));
    }

    #[test]
    fn test_unknown_rule_is_rejected() {
        let config = Config {
            enabled_rules: Some(vec!["setup-within-test".into(), "weak-assertion".into()]),
            ..Config::default()
        };
        let err = EngineSettings::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRule { ref id } if id == "weak-assertion"));

        let mut config = Config::default();
        config.rules.insert("magic-number".into(), RuleSeverity::Off);
        assert!(EngineSettings::from_config(&config).is_err());
    }

    #[test]
    fn test_overrides_scope_severities() {
        let config: Config = serde_json::from_str(
            r#"{
                "rules": { "too-many-arguments": "error" },
                "overrides": [
                    { "files": ["**/legacy/**"], "rules": { "too-many-arguments": "off" } },
                    { "files": ["**/*Steps.cs"], "rules": { "setup-within-test": "info" } }
                ]
            }"#,
        )
        .unwrap();
        let settings = EngineSettings::from_config(&config).unwrap();

        let regular = Path::new("tests/OrderTests.cs");
        assert_eq!(
            settings.severity_for(regular, RuleId::TooManyArguments),
            Some(Severity::Error)
        );
        assert_eq!(
            settings.severity_for(regular, RuleId::SetupWithinTest),
            Some(Severity::Warning)
        );

        let legacy = Path::new("tests/legacy/OldTests.cs");
        assert_eq!(settings.severity_for(legacy, RuleId::TooManyArguments), None);

        let steps = Path::new("tests/CheckoutSteps.cs");
        assert_eq!(
            settings.severity_for(steps, RuleId::SetupWithinTest),
            Some(Severity::Info)
        );
    }

    #[test]
    fn test_disabled_rules_have_no_severity() {
        let config = Config {
            enabled_rules: Some(vec!["too-many-arguments".into()]),
            ..Config::default()
        };
        let settings = EngineSettings::from_config(&config).unwrap();
        let path = Path::new("a.ts");
        assert_eq!(settings.severity_for(path, RuleId::SetupWithinTest), None);
        assert_eq!(
            settings.severity_for(path, RuleId::TooManyArguments),
            Some(Severity::Warning)
        );
        assert_eq!(settings.severity_for(path, RuleId::LexicalError), None);
    }
}
