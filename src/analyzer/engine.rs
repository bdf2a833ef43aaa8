//! Analysis engine - orchestrates lexing, parsing and the rules

use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::aggregate::{
    merge_findings, CancellationToken, FindingAggregator, Report, Warning, WarningKind,
};
use crate::config::{Config, EngineSettings};
use crate::error::{ConfigError, SourceError};
use crate::language::{LanguageId, LanguageProfile, ProfileRegistry};
use crate::lexer::Lexed;
use crate::parser::{parse_source, IgnoreDirectives, SyntaxTree};
use crate::{Finding, Location, RuleId, SourceFile};

use super::rules::{RuleContext, SetupWithinTestRule, SmellRule, TooManyArgumentsRule};

/// Findings of one file, already re-leveled, filtered and sorted
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: PathBuf,
    pub language: LanguageId,
    pub findings: Vec<Finding>,
    /// Findings dropped by `imcg-ignore` directives
    pub suppressed: usize,
}

/// Main analysis engine. Immutable after construction and shared by all workers.
pub struct AnalysisEngine {
    settings: EngineSettings,
    registry: ProfileRegistry,
    rules: Vec<Box<dyn SmellRule>>,
}

impl std::fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("settings", &self.settings)
            .field("rules", &self.rules.iter().map(|r| r.id()).collect::<Vec<_>>())
            .finish()
    }
}

impl AnalysisEngine {
    /// Create an engine from validated settings
    pub fn new(settings: EngineSettings) -> Result<Self, ConfigError> {
        let registry = ProfileRegistry::with_hints(&settings.hints)?;
        let rules: Vec<Box<dyn SmellRule>> = vec![
            Box::new(SetupWithinTestRule::new()),
            Box::new(
                TooManyArgumentsRule::new(settings.max_parameters)
                    .with_boundary(settings.parameter_boundary)
                    .with_inline_function_arguments(settings.inline_function_arguments),
            ),
        ];
        Ok(Self {
            settings,
            registry,
            rules,
        })
    }

    /// Validate a loaded config and build an engine from it
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(EngineSettings::from_config(config)?)
    }

    /// Engine with built-in profiles and default settings
    pub fn with_defaults() -> Self {
        Self {
            settings: EngineSettings::default(),
            registry: ProfileRegistry::new(),
            rules: vec![
                Box::new(SetupWithinTestRule::new()),
                Box::new(TooManyArgumentsRule::default()),
            ],
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Lex, parse and run every enabled rule over one file
    pub fn analyze_file(&self, file: &SourceFile) -> FileReport {
        let path = file.path();
        let Some(profile) = self.registry.get(file.language()) else {
            warn!(path = %path.display(), language = %file.language(), "no profile registered");
            return FileReport {
                path: path.to_path_buf(),
                language: file.language(),
                findings: Vec::new(),
                suppressed: 0,
            };
        };

        let (lexed, tree) = parse_source(file.text(), profile);
        debug!(
            path = %path.display(),
            tokens = lexed.tokens.len(),
            declarations = tree.declarations.len(),
            "parsed file"
        );

        let mut findings = diagnostics(path, &lexed, &tree);
        let ctx = RuleContext {
            path,
            profile,
            tree: &tree,
        };
        for rule in &self.rules {
            if self.settings.is_enabled(rule.id()) {
                findings.extend(rule.check(&ctx));
            }
        }

        // Per-file severities; rules that are off here drop out
        let findings: Vec<Finding> = findings
            .into_iter()
            .filter_map(|mut finding| {
                finding.severity = self.settings.severity_for(path, finding.rule)?;
                Some(finding)
            })
            .collect();

        let directives = IgnoreDirectives::from_tokens(&lexed.tokens);
        let before = findings.len();
        let findings: Vec<Finding> = if directives.is_empty() {
            findings
        } else {
            findings
                .into_iter()
                .filter(|f| !directives.is_ignored(f.location.line, f.rule))
                .collect()
        };
        let suppressed = before - findings.len();

        debug!(
            path = %path.display(),
            findings = findings.len(),
            suppressed,
            "analyzed file"
        );
        FileReport {
            path: path.to_path_buf(),
            language: profile.id,
            findings: merge_findings(findings),
            suppressed,
        }
    }

    /// Analyze in-memory sources in parallel, one aggregator slot per file
    pub fn analyze_sources(&self, files: &[SourceFile], cancel: &CancellationToken) -> Report {
        let outcomes: Vec<Option<FileReport>> = files
            .par_iter()
            .map(|file| (!cancel.is_cancelled()).then(|| self.analyze_file(file)))
            .collect();

        let mut aggregator = FindingAggregator::new(files.len());
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(report) => aggregator.fill(index, report),
                None => aggregator.mark_cancelled(),
            }
        }
        aggregator.finish(self.settings.fail_on)
    }

    /// Read and analyze files in parallel. Unsupported or unreadable files
    /// become warnings; they never abort the run.
    pub fn analyze_paths(&self, paths: &[PathBuf], cancel: &CancellationToken) -> Report {
        let outcomes: Vec<Outcome> = paths
            .par_iter()
            .map(|path| {
                if cancel.is_cancelled() {
                    return Outcome::Cancelled;
                }
                match SourceFile::load(path, &self.registry) {
                    Ok(file) => Outcome::Analyzed(self.analyze_file(&file)),
                    Err(err) => Outcome::Skipped(skip_warning(err)),
                }
            })
            .collect();

        let mut aggregator = FindingAggregator::new(paths.len());
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Outcome::Analyzed(report) => aggregator.fill(index, report),
                Outcome::Skipped(warning) => aggregator.warn(warning),
                Outcome::Cancelled => aggregator.mark_cancelled(),
            }
        }
        let report = aggregator.finish(self.settings.fail_on);
        debug!(
            files = report.files_analyzed,
            findings = report.findings.len(),
            warnings = report.warnings.len(),
            cancelled = report.cancelled,
            "run complete"
        );
        report
    }

    /// Profile for a path, if the extension is supported
    pub fn profile_for(&self, path: &Path) -> Option<&LanguageProfile> {
        self.registry.for_path(path)
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

enum Outcome {
    Analyzed(FileReport),
    Skipped(Warning),
    Cancelled,
}

fn skip_warning(err: SourceError) -> Warning {
    warn!("{}", err);
    match err {
        SourceError::UnsupportedLanguage { ref path } => Warning {
            kind: WarningKind::UnsupportedLanguage,
            file: path.clone(),
            message: err.to_string(),
        },
        SourceError::Read { ref path, .. } => Warning {
            kind: WarningKind::Unreadable,
            file: path.clone(),
            message: err.to_string(),
        },
    }
}

/// Lexical and structural problems as informational findings
fn diagnostics(path: &Path, lexed: &Lexed, tree: &SyntaxTree) -> Vec<Finding> {
    let lexical = lexed.errors.iter().map(|e| {
        let start = e.span.start;
        Finding::new(
            RuleId::LexicalError,
            path,
            Location::new(start.line, start.column),
            e.kind.describe(),
        )
        .with_suggestion("Only the part of the file before this point was analyzed reliably")
    });
    let structural = tree.errors.iter().map(|e| {
        warn!(
            path = %path.display(),
            line = e.position.line,
            "recovered from parse error: {}",
            e.message
        );
        Finding::new(
            RuleId::StructuralParseError,
            path,
            Location::new(e.position.line, e.position.column),
            e.message.clone(),
        )
    });
    lexical.chain(structural).collect()
}
