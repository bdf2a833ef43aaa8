//! Finding aggregation across files
//!
//! Workers never share a findings list: each file fills its own slot and the
//! aggregator merges the slots once every file is done.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::analyzer::FileReport;
use crate::{Finding, Severity};

/// Run-wide cancellation flag, checked between files
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// No language profile matches the file extension
    UnsupportedLanguage,
    /// The file could not be read
    Unreadable,
}

/// A file that was skipped, reported next to the findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub kind: WarningKind,
    pub file: PathBuf,
    pub message: String,
}

/// Sort by (file, line, column, rule) and drop exact duplicates
pub fn merge_findings(mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.sort_by(|a, b| a.identity().cmp(&b.identity()));
    findings.dedup_by(|a, b| a.identity() == b.identity());
    findings
}

/// Per-file result slots merged into one [`Report`]
#[derive(Debug)]
pub struct FindingAggregator {
    slots: Vec<Option<FileReport>>,
    warnings: Vec<Warning>,
    cancelled: bool,
}

impl FindingAggregator {
    /// One empty slot per input file
    pub fn new(files: usize) -> Self {
        Self {
            slots: (0..files).map(|_| None).collect(),
            warnings: Vec::new(),
            cancelled: false,
        }
    }

    /// Store the completed result of file `index`
    pub fn fill(&mut self, index: usize, report: FileReport) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(report);
        }
    }

    pub fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn finish(self, fail_on: Severity) -> Report {
        let files: Vec<FileReport> = self.slots.into_iter().flatten().collect();
        let suppressed = files.iter().map(|f| f.suppressed).sum();
        let files_analyzed = files.len();
        let findings = merge_findings(files.into_iter().flat_map(|f| f.findings).collect());
        let mut warnings = self.warnings;
        warnings.sort_by(|a, b| a.file.cmp(&b.file));

        Report {
            findings,
            warnings,
            files_analyzed,
            suppressed,
            cancelled: self.cancelled,
            fail_on,
        }
    }
}

/// Final ordered result of a run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub findings: Vec<Finding>,
    pub warnings: Vec<Warning>,
    pub files_analyzed: usize,
    /// Findings dropped by `imcg-ignore` directives
    pub suppressed: usize,
    pub cancelled: bool,
    pub fail_on: Severity,
}

impl Report {
    /// True if any finding is at or above the failure severity
    pub fn has_failures(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.severity.is_at_least(self.fail_on))
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LanguageId, Location, RuleId};

    fn finding(file: &str, line: usize, column: usize, rule: RuleId) -> Finding {
        Finding::new(rule, file, Location::new(line, column), "msg")
    }

    fn file_report(path: &str, findings: Vec<Finding>) -> FileReport {
        FileReport {
            path: PathBuf::from(path),
            language: LanguageId::CSharp,
            findings,
            suppressed: 0,
        }
    }

    #[test]
    fn merge_sorts_and_dedupes() {
        let merged = merge_findings(vec![
            finding("b.cs", 1, 1, RuleId::SetupWithinTest),
            finding("a.cs", 9, 1, RuleId::TooManyArguments),
            finding("a.cs", 2, 5, RuleId::TooManyArguments),
            finding("a.cs", 2, 5, RuleId::SetupWithinTest),
            finding("a.cs", 2, 5, RuleId::TooManyArguments),
        ]);
        let keys: Vec<_> = merged
            .iter()
            .map(|f| (f.file.to_string_lossy().into_owned(), f.location.line, f.rule))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("a.cs".to_string(), 2, RuleId::SetupWithinTest),
                ("a.cs".to_string(), 2, RuleId::TooManyArguments),
                ("a.cs".to_string(), 9, RuleId::TooManyArguments),
                ("b.cs".to_string(), 1, RuleId::SetupWithinTest),
            ]
        );
    }

    #[test]
    fn slots_merge_in_file_order_regardless_of_fill_order() {
        let mut aggregator = FindingAggregator::new(3);
        aggregator.fill(2, file_report("c.cs", vec![finding("c.cs", 1, 1, RuleId::TooManyArguments)]));
        aggregator.fill(0, file_report("a.cs", vec![finding("a.cs", 4, 1, RuleId::TooManyArguments)]));
        let report = aggregator.finish(Severity::Warning);
        assert_eq!(report.files_analyzed, 2);
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[0].file, PathBuf::from("a.cs"));
        assert!(!report.cancelled);
    }

    #[test]
    fn failure_threshold() {
        let mut aggregator = FindingAggregator::new(1);
        let mut info = finding("a.cs", 1, 1, RuleId::StructuralParseError);
        info.severity = Severity::Info;
        aggregator.fill(0, file_report("a.cs", vec![info]));
        let report = aggregator.finish(Severity::Warning);
        assert!(!report.has_failures());
        assert_eq!(report.count(Severity::Info), 1);

        let report = Report {
            fail_on: Severity::Info,
            ..report
        };
        assert!(report.has_failures());
    }

    #[test]
    fn cancellation_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
