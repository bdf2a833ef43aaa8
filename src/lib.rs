//! Is My Code Great: test smell analyzer
//!
//! This library inspects automated-test source files (C#, TypeScript/JavaScript,
//! Dart, Java) without executing them. Source text is tokenized, turned into a
//! shallow declaration tree and evaluated by independent smell rules that emit
//! location-addressed findings.

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod language;
pub mod lexer;
pub mod parser;
pub mod reporter;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use aggregate::{CancellationToken, FindingAggregator, Report, Warning, WarningKind};
pub use analyzer::{AnalysisEngine, FileReport};
pub use config::{Config, EngineSettings};
pub use error::{ConfigError, SourceError};
pub use language::{LanguageId, LanguageProfile, ProfileRegistry};

/// Severity levels for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Numeric rank; higher is more severe
    pub fn rank(self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Warning => 1,
            Severity::Error => 2,
        }
    }

    /// True if `self` is as severe as `other` or more
    pub fn is_at_least(self, other: Severity) -> bool {
        self.rank() >= other.rank()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Rule identifiers. Parse diagnostics are reported as rules of their own so
/// they can be disabled and re-leveled like any smell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    /// Mock/stub configuration performed inside a test case body
    SetupWithinTest,
    /// Method or function declares more parameters than allowed
    TooManyArguments,
    /// Unterminated literal or comment
    LexicalError,
    /// Token sequence the structural parser had to skip
    StructuralParseError,
}

impl RuleId {
    pub const ALL: [RuleId; 4] = [
        RuleId::SetupWithinTest,
        RuleId::TooManyArguments,
        RuleId::LexicalError,
        RuleId::StructuralParseError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::SetupWithinTest => "setup-within-test",
            RuleId::TooManyArguments => "too-many-arguments",
            RuleId::LexicalError => "lexical-error",
            RuleId::StructuralParseError => "structural-parse-error",
        }
    }

    /// Look up a rule by its kebab-case identifier
    pub fn from_id(id: &str) -> Option<RuleId> {
        RuleId::ALL.iter().copied().find(|r| r.as_str() == id)
    }

    pub fn default_severity(self) -> Severity {
        match self {
            RuleId::SetupWithinTest | RuleId::TooManyArguments => Severity::Warning,
            RuleId::LexicalError | RuleId::StructuralParseError => Severity::Info,
        }
    }

    /// One-line description used by SARIF and `--verbose` output
    pub fn description(self) -> &'static str {
        match self {
            RuleId::SetupWithinTest => {
                "Mock configuration inside a test body instead of a shared setup phase"
            }
            RuleId::TooManyArguments => "Method or function declares too many parameters",
            RuleId::LexicalError => "Source contains an unterminated literal or comment",
            RuleId::StructuralParseError => "Part of the file could not be parsed structurally",
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location in a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// End line (optional)
    pub end_line: Option<usize>,
    /// End column (optional)
    pub end_column: Option<usize>,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            end_line: None,
            end_column: None,
        }
    }

    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }
}

/// A single reported smell instance. Identity is (rule, file, position).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Rule that produced this finding
    pub rule: RuleId,
    /// Severity after configuration overrides
    pub severity: Severity,
    /// File the finding belongs to
    pub file: PathBuf,
    /// Location in the file
    pub location: Location,
    /// Human-readable message
    pub message: String,
    /// Remediation hint (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Finding {
    /// New finding at the rule's default severity
    pub fn new(
        rule: RuleId,
        file: impl Into<PathBuf>,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            severity: rule.default_severity(),
            file: file.into(),
            location,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Identity key used for ordering and de-duplication
    pub fn identity(&self) -> (&Path, usize, usize, RuleId) {
        (
            self.file.as_path(),
            self.location.line,
            self.location.column,
            self.rule,
        )
    }

    /// Flatten into the `{rule, severity, file, line, column, message}` record
    pub fn to_record(&self) -> FindingRecord {
        FindingRecord {
            rule: self.rule.as_str().to_string(),
            severity: self.severity,
            file: self.file.display().to_string(),
            line: self.location.line,
            column: self.location.column,
            message: self.message.clone(),
        }
    }
}

/// Flat, line-delimited serialization form of a finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingRecord {
    pub rule: String,
    pub severity: Severity,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// A loaded source file: path, raw text and the language profile it is parsed with.
/// Immutable once constructed; the text is shared so workers can clone cheaply.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: Arc<str>,
    language: LanguageId,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<Arc<str>>, language: LanguageId) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            language,
        }
    }

    /// Read a file from disk, inferring its language from the extension
    pub fn load(path: &Path, registry: &ProfileRegistry) -> Result<Self, SourceError> {
        let profile = registry
            .for_path(path)
            .ok_or_else(|| SourceError::UnsupportedLanguage {
                path: path.to_path_buf(),
            })?;
        let text = std::fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, text, profile.id))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }
}

/// Public API: analyze one in-memory source with default settings.
/// Used by the LSP server and other programmatic consumers.
pub fn analyze_source(path: &Path, text: &str) -> Result<FileReport, SourceError> {
    let engine = AnalysisEngine::with_defaults();
    let profile = engine
        .registry()
        .for_path(path)
        .ok_or_else(|| SourceError::UnsupportedLanguage {
            path: path.to_path_buf(),
        })?;
    let file = SourceFile::new(path, text, profile.id);
    Ok(engine.analyze_file(&file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error.is_at_least(Severity::Warning));
        assert!(Severity::Warning.is_at_least(Severity::Warning));
        assert!(!Severity::Info.is_at_least(Severity::Warning));
    }

    #[test]
    fn rule_ids_round_trip_through_strings() {
        for rule in RuleId::ALL {
            assert_eq!(RuleId::from_id(rule.as_str()), Some(rule));
        }
        assert_eq!(RuleId::from_id("weak-assertion"), None);
    }

    #[test]
    fn finding_record_is_flat() {
        let finding = Finding::new(
            RuleId::TooManyArguments,
            "a.cs",
            Location::new(3, 9),
            "too many",
        )
        .with_suggestion("group them");
        let json = serde_json::to_value(finding.to_record()).unwrap();
        assert_eq!(json["rule"], "too-many-arguments");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["line"], 3);
        assert_eq!(json["column"], 9);
        assert!(json.get("suggestion").is_none());
    }

    #[test]
    fn analyze_source_rejects_unknown_extension() {
        let err = analyze_source(Path::new("notes.txt"), "hello").unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedLanguage { .. }));
    }
}
