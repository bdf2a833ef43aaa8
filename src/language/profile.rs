//! Language profile descriptors
//!
//! A profile is pure data: the lexer reads [`LexicalProfile`], the parser reads
//! [`SyntaxProfile`] and [`TestMatchers`], the rules read [`MockMatcher`].
//! Nothing in the core branches on [`LanguageId`] directly.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    CSharp,
    TypeScript,
    JavaScript,
    Dart,
    Java,
}

impl LanguageId {
    pub const ALL: [LanguageId; 5] = [
        LanguageId::CSharp,
        LanguageId::TypeScript,
        LanguageId::JavaScript,
        LanguageId::Dart,
        LanguageId::Java,
    ];

    /// Configuration key for this language
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageId::CSharp => "csharp",
            LanguageId::TypeScript => "typescript",
            LanguageId::JavaScript => "javascript",
            LanguageId::Dart => "dart",
            LanguageId::Java => "java",
        }
    }

    /// Parse a configuration key; accepts common short aliases
    pub fn from_name(name: &str) -> Option<LanguageId> {
        match name.to_ascii_lowercase().as_str() {
            "csharp" | "c#" | "cs" => Some(LanguageId::CSharp),
            "typescript" | "ts" => Some(LanguageId::TypeScript),
            "javascript" | "js" => Some(LanguageId::JavaScript),
            "dart" => Some(LanguageId::Dart),
            "java" => Some(LanguageId::Java),
            _ => None,
        }
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageId::CSharp => write!(f, "C#"),
            LanguageId::TypeScript => write!(f, "TypeScript"),
            LanguageId::JavaScript => write!(f, "JavaScript"),
            LanguageId::Dart => write!(f, "Dart"),
            LanguageId::Java => write!(f, "Java"),
        }
    }
}

/// Token-level syntax of a language
#[derive(Debug, Clone)]
pub struct LexicalProfile {
    pub line_comment: &'static str,
    pub block_comment: (&'static str, &'static str),
    /// Block comments nest (Dart)
    pub nested_block_comments: bool,
    /// Characters that open and close an ordinary string literal
    pub quotes: &'static [char],
    /// Multi-line template literal quote with `${}` interpolation (JS/TS backtick)
    pub template_quote: Option<char>,
    /// `@"..."` verbatim strings: multi-line, no escapes, `""` for a quote (C#)
    pub verbatim_prefix: Option<char>,
    /// `$"..."` interpolated strings with `{expr}` holes (C#)
    pub interpolation_prefix: Option<char>,
    /// `r'...'` raw strings without escapes (Dart)
    pub raw_prefix: Option<char>,
    /// Ordinary strings may interpolate with `${expr}` (Dart)
    pub dollar_brace_interpolation: bool,
    /// `'''`/`"""` multi-line strings
    pub triple_quotes: bool,
    /// `/pattern/flags` literals (JS/TS)
    pub regex_literals: bool,
    /// `#region`, `#if` ... lines are directives, lexed as comments (C#)
    pub preprocessor_lines: bool,
    /// Characters besides `[A-Za-z0-9_]` allowed in identifiers
    pub identifier_extra: &'static [char],
    /// Reserved words; lexed as keywords, never declaration names or callees
    pub keywords: &'static [&'static str],
    /// Lambda arrow token
    pub arrow: &'static str,
}

impl LexicalProfile {
    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(&word)
    }
}

/// How attributes/annotations are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeStyle {
    /// `[TestMethod]`, `[Test, Category("x")]`
    Brackets,
    /// `@Test`, `@isTest`, `@Component({...})`
    AtSign,
}

/// Order of name and type inside a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `int count`, `final String name`
    TypeThenName,
    /// `count: number`
    NameThenType,
}

/// What kind of constructs a block holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Class/namespace bodies: declarations, fields, attributes
    Member,
    /// Function bodies: statements and expressions
    Statement,
}

/// Declaration-level syntax of a language
#[derive(Debug, Clone)]
pub struct SyntaxProfile {
    pub attribute_style: AttributeStyle,
    /// Keywords introducing a class-like body
    pub type_keywords: &'static [&'static str],
    /// Keywords introducing a namespace/module body
    pub namespace_keywords: &'static [&'static str],
    /// Keywords whose parenthesized group is never a parameter list
    pub control_keywords: &'static [&'static str],
    /// Keyword introducing a function (`function` in JS/TS)
    pub function_keyword: Option<&'static str>,
    /// `(params) { ... }` without an arrow is a closure (Dart)
    pub block_closures: bool,
    pub param_style: ParamStyle,
    /// `{...}`/`[...]` inside a parameter list hold several parameters (Dart named/optional)
    pub grouped_named_params: bool,
    pub top_level: ScopeKind,
    /// Receiver keywords skipped when resolving a call's receiver
    pub self_keywords: &'static [&'static str],
}

impl SyntaxProfile {
    pub fn is_type_keyword(&self, word: &str) -> bool {
        self.type_keywords.contains(&word)
    }

    pub fn is_namespace_keyword(&self, word: &str) -> bool {
        self.namespace_keywords.contains(&word)
    }

    pub fn is_control_keyword(&self, word: &str) -> bool {
        self.control_keywords.contains(&word)
    }
}

/// Recognizes mock/stub configuration calls
#[derive(Debug, Clone, Default)]
pub struct MockMatcher {
    /// Methods that always configure a test double (`Setup`, `mockReturnValue`)
    pub configuration_methods: Vec<String>,
    /// Methods that configure only when called on a bound mock (`Returns`, `returns`)
    pub receiver_gated_methods: Vec<String>,
    /// Callee patterns that configure regardless of method name
    pub configuration_callees: Vec<Regex>,
    /// Callee patterns that create a test double (`new Mock`, `jest.fn`)
    pub factories: Vec<Regex>,
}

impl MockMatcher {
    /// True if a call configures stubbed behavior
    pub fn is_configuration(&self, callee: &str, method: &str, receiver_is_mock: bool) -> bool {
        if self.configuration_methods.iter().any(|m| m == method) {
            return true;
        }
        if receiver_is_mock && self.receiver_gated_methods.iter().any(|m| m == method) {
            return true;
        }
        self.configuration_callees.iter().any(|re| re.is_match(callee))
    }

    /// True if a call creates a mock object
    pub fn is_factory(&self, callee: &str) -> bool {
        self.factories.iter().any(|re| re.is_match(callee))
    }
}

/// Test discovery matchers
#[derive(Debug, Clone, Default)]
pub struct TestMatchers {
    pub suite_attributes: Vec<String>,
    pub case_attributes: Vec<String>,
    pub suite_calls: Vec<Regex>,
    pub case_calls: Vec<Regex>,
    pub mock: MockMatcher,
}

impl TestMatchers {
    pub fn is_suite_attribute(&self, name: &str) -> bool {
        let name = normalize_attribute(name);
        self.suite_attributes.iter().any(|a| a == name)
    }

    pub fn is_case_attribute(&self, name: &str) -> bool {
        let name = normalize_attribute(name);
        self.case_attributes.iter().any(|a| a == name)
    }

    pub fn is_suite_call(&self, callee: &str) -> bool {
        self.suite_calls.iter().any(|re| re.is_match(callee))
    }

    pub fn is_case_call(&self, callee: &str) -> bool {
        self.case_calls.iter().any(|re| re.is_match(callee))
    }
}

/// `Xunit.FactAttribute` and `Fact` name the same attribute
pub fn normalize_attribute(name: &str) -> &str {
    let short = name.rsplit('.').next().unwrap_or(name);
    match short.strip_suffix("Attribute") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => short,
    }
}

/// Per-language overrides of the test and mock matchers. Any list that is
/// present replaces the built-in list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FrameworkHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_attributes: Option<Vec<String>>,
    /// Regexes matched against the callee text (e.g. `^describe$`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_calls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_calls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_methods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_receiver_methods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_callees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_factories: Option<Vec<String>>,
}

/// A complete language description
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    pub id: LanguageId,
    pub extensions: &'static [&'static str],
    pub lexical: LexicalProfile,
    pub syntax: SyntaxProfile,
    pub matchers: TestMatchers,
    /// Remediation hint for mock configuration found inside a test
    pub setup_hint: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_names_are_normalized() {
        assert_eq!(normalize_attribute("Fact"), "Fact");
        assert_eq!(normalize_attribute("FactAttribute"), "Fact");
        assert_eq!(normalize_attribute("Xunit.Fact"), "Fact");
        assert_eq!(normalize_attribute("NUnit.Framework.TestAttribute"), "Test");
        assert_eq!(normalize_attribute("Attribute"), "Attribute");
    }

    #[test]
    fn language_aliases() {
        assert_eq!(LanguageId::from_name("C#"), Some(LanguageId::CSharp));
        assert_eq!(LanguageId::from_name("ts"), Some(LanguageId::TypeScript));
        assert_eq!(LanguageId::from_name("kotlin"), None);
    }

    #[test]
    fn gated_methods_need_a_bound_mock() {
        let matcher = MockMatcher {
            configuration_methods: vec!["Setup".into()],
            receiver_gated_methods: vec!["Returns".into()],
            ..MockMatcher::default()
        };
        assert!(matcher.is_configuration("_mock.Setup", "Setup", false));
        assert!(!matcher.is_configuration("calc.Add(...).Returns", "Returns", false));
        assert!(matcher.is_configuration("calc.Add(...).Returns", "Returns", true));
    }
}
