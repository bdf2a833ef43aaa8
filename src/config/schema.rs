//! Config schema and deserialization

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::language::FrameworkHints;
use crate::Severity;

/// Rule severity override (error, warning, info, off)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Error,
    Warning,
    Info,
    /// Disable the rule entirely
    Off,
}

impl RuleSeverity {
    /// Convert to crate::Severity if not Off
    pub fn to_severity(self) -> Option<Severity> {
        match self {
            RuleSeverity::Error => Some(Severity::Error),
            RuleSeverity::Warning => Some(Severity::Warning),
            RuleSeverity::Info => Some(Severity::Info),
            RuleSeverity::Off => None,
        }
    }
}

/// When a parameter count violates `maxParameters`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterBoundary {
    /// Flag when count > max (max itself passes)
    #[default]
    Exceeds,
    /// Flag when count >= max
    Reaches,
}

impl ParameterBoundary {
    pub fn violates(self, count: usize, max: usize) -> bool {
        match self {
            ParameterBoundary::Exceeds => count > max,
            ParameterBoundary::Reaches => count >= max,
        }
    }
}

/// Per-path override configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverride {
    /// Glob patterns this override applies to
    pub files: Vec<String>,

    /// Rule severities for matched files
    #[serde(default)]
    pub rules: HashMap<String, RuleSeverity>,
}

/// Root config structure for .imcgrc.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Extend another config file (path relative to this config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Parameter threshold for too-many-arguments. Default: 4
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parameters: Option<usize>,

    /// Whether `maxParameters` itself is a violation. Default: exceeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_boundary: Option<ParameterBoundary>,

    /// Check function literals passed directly as call arguments. Default: true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_function_arguments: Option<bool>,

    /// Rules to run. Default: all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_rules: Option<Vec<String>>,

    /// Per-rule severity overrides. Key is rule id in kebab-case.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub rules: HashMap<String, RuleSeverity>,

    /// Lowest severity that fails the run. Default: warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on: Option<Severity>,

    /// Glob patterns for files/directories to exclude from analysis
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,

    /// Per-language test and mock matcher overrides
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub test_framework_hints: HashMap<String, FrameworkHints>,

    /// Per-path rule severities (legacy folders, generated code ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ConfigOverride>,
}

impl Config {
    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(
        mut self,
        max_parameters: Option<usize>,
        enabled_rules: Option<Vec<String>>,
        fail_on: Option<Severity>,
    ) -> Self {
        if max_parameters.is_some() {
            self.max_parameters = max_parameters;
        }
        if enabled_rules.is_some() {
            self.enabled_rules = enabled_rules;
        }
        if fail_on.is_some() {
            self.fail_on = fail_on;
        }
        self
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: Config) {
        // Base values are overridden by this config's values
        if self.max_parameters.is_none() {
            self.max_parameters = base.max_parameters;
        }
        if self.parameter_boundary.is_none() {
            self.parameter_boundary = base.parameter_boundary;
        }
        if self.inline_function_arguments.is_none() {
            self.inline_function_arguments = base.inline_function_arguments;
        }
        if self.enabled_rules.is_none() {
            self.enabled_rules = base.enabled_rules;
        }
        if self.fail_on.is_none() {
            self.fail_on = base.fail_on;
        }

        for (rule, severity) in base.rules {
            self.rules.entry(rule).or_insert(severity);
        }

        let mut all_ignores = base.ignore;
        all_ignores.append(&mut self.ignore);
        self.ignore = all_ignores;

        // Hints are replaced per language, not merged list by list
        for (language, hints) in base.test_framework_hints {
            self.test_framework_hints.entry(language).or_insert(hints);
        }

        // Base overrides come first so this config's win
        let mut all_overrides = base.overrides;
        all_overrides.append(&mut self.overrides);
        self.overrides = all_overrides;
    }

    /// Config written by `init`
    pub fn starter(max_parameters: usize) -> Self {
        let mut rules = HashMap::new();
        rules.insert("setup-within-test".to_string(), RuleSeverity::Warning);
        rules.insert("too-many-arguments".to_string(), RuleSeverity::Warning);
        rules.insert("lexical-error".to_string(), RuleSeverity::Info);
        rules.insert("structural-parse-error".to_string(), RuleSeverity::Info);
        Config {
            max_parameters: Some(max_parameters),
            parameter_boundary: Some(ParameterBoundary::Exceeds),
            inline_function_arguments: Some(true),
            rules,
            fail_on: Some(Severity::Warning),
            ignore: vec![
                "**/node_modules/**".to_string(),
                "**/bin/**".to_string(),
                "**/obj/**".to_string(),
                "**/build/**".to_string(),
            ],
            ..Config::default()
        }
    }
}
