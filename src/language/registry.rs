//! Profile lookup by language and file extension

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;

use super::builtin;
use super::profile::{FrameworkHints, LanguageId, LanguageProfile};
use crate::error::ConfigError;

/// Immutable set of language profiles shared by every worker
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<LanguageProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileRegistry {
    /// Registry with the built-in profiles
    pub fn new() -> Self {
        Self {
            profiles: builtin::all(),
        }
    }

    /// Built-in profiles with per-language matcher overrides applied.
    /// Keys are language names (`csharp`, `ts`, ...).
    pub fn with_hints(hints: &HashMap<String, FrameworkHints>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        // Sorted so the first reported error does not depend on map order
        let mut keys: Vec<&String> = hints.keys().collect();
        keys.sort();
        for key in keys {
            let id = LanguageId::from_name(key)
                .ok_or_else(|| ConfigError::UnknownLanguage { name: key.clone() })?;
            let hint = &hints[key];
            for profile in registry.profiles.iter_mut().filter(|p| p.id == id) {
                apply_hints(profile, hint)?;
            }
        }
        Ok(registry)
    }

    pub fn get(&self, id: LanguageId) -> Option<&LanguageProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Profile whose extension list contains the path's extension (case-insensitive)
    pub fn for_path(&self, path: &Path) -> Option<&LanguageProfile> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.profiles
            .iter()
            .find(|p| p.extensions.iter().any(|e| *e == ext))
    }
}

fn apply_hints(profile: &mut LanguageProfile, hints: &FrameworkHints) -> Result<(), ConfigError> {
    let language = profile.id.as_str();
    let matchers = &mut profile.matchers;

    if let Some(list) = &hints.suite_attributes {
        matchers.suite_attributes = list.clone();
    }
    if let Some(list) = &hints.case_attributes {
        matchers.case_attributes = list.clone();
    }
    if let Some(list) = &hints.suite_calls {
        matchers.suite_calls = compile(language, list)?;
    }
    if let Some(list) = &hints.case_calls {
        matchers.case_calls = compile(language, list)?;
    }
    if let Some(list) = &hints.mock_methods {
        matchers.mock.configuration_methods = list.clone();
    }
    if let Some(list) = &hints.mock_receiver_methods {
        matchers.mock.receiver_gated_methods = list.clone();
    }
    if let Some(list) = &hints.mock_callees {
        matchers.mock.configuration_callees = compile(language, list)?;
    }
    if let Some(list) = &hints.mock_factories {
        matchers.mock.factories = compile(language, list)?;
    }
    Ok(())
}

fn compile(language: &str, patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                language: language.to_string(),
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup() {
        let registry = ProfileRegistry::new();
        let id = |p: &str| registry.for_path(Path::new(p)).map(|p| p.id);
        assert_eq!(id("Tests/FooTests.cs"), Some(LanguageId::CSharp));
        assert_eq!(id("foo.spec.ts"), Some(LanguageId::TypeScript));
        assert_eq!(id("Foo.test.TSX"), Some(LanguageId::TypeScript));
        assert_eq!(id("foo.test.mjs"), Some(LanguageId::JavaScript));
        assert_eq!(id("widget_test.dart"), Some(LanguageId::Dart));
        assert_eq!(id("FooTest.java"), Some(LanguageId::Java));
        assert_eq!(id("foo.py"), None);
        assert_eq!(id("Makefile"), None);
    }

    #[test]
    fn hints_replace_matchers() {
        let mut hints = HashMap::new();
        hints.insert(
            "ts".to_string(),
            FrameworkHints {
                case_calls: Some(vec![r"^scenario$".to_string()]),
                ..FrameworkHints::default()
            },
        );
        let registry = ProfileRegistry::with_hints(&hints).unwrap();
        let ts = registry.get(LanguageId::TypeScript).unwrap();
        assert!(ts.matchers.is_case_call("scenario"));
        assert!(!ts.matchers.is_case_call("it"));
        // Other languages keep their defaults
        let js = registry.get(LanguageId::JavaScript).unwrap();
        assert!(js.matchers.is_case_call("it"));
    }

    #[test]
    fn invalid_hint_pattern_is_a_config_error() {
        let mut hints = HashMap::new();
        hints.insert(
            "csharp".to_string(),
            FrameworkHints {
                mock_factories: Some(vec!["(unclosed".to_string()]),
                ..FrameworkHints::default()
            },
        );
        let err = ProfileRegistry::with_hints(&hints).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn unknown_hint_language_is_a_config_error() {
        let mut hints = HashMap::new();
        hints.insert("cobol".to_string(), FrameworkHints::default());
        let err = ProfileRegistry::with_hints(&hints).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLanguage { .. }));
    }
}
