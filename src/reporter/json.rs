//! JSON reporters for machine-readable output

use crate::{Report, Severity};
use serde::Serialize;

/// Reporter for a single JSON document
#[derive(Debug, Default)]
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Findings, warnings and a summary as one object
    pub fn report(&self, report: &Report) -> String {
        let output = JsonOutput {
            findings: report,
            summary: JsonSummary {
                files_analyzed: report.files_analyzed,
                total_findings: report.findings.len(),
                errors: report.count(Severity::Error),
                warnings: report.count(Severity::Warning),
                infos: report.count(Severity::Info),
                suppressed: report.suppressed,
                failed: report.has_failures(),
            },
        };

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        }
    }

    /// One flat `{rule, severity, file, line, column, message}` record per line
    pub fn report_lines(&self, report: &Report) -> String {
        report
            .findings
            .iter()
            .filter_map(|f| serde_json::to_string(&f.to_record()).ok())
            .map(|line| line + "\n")
            .collect()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    #[serde(flatten)]
    findings: &'a Report,
    summary: JsonSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSummary {
    files_analyzed: usize,
    total_findings: usize,
    errors: usize,
    warnings: usize,
    infos: usize,
    suppressed: usize,
    failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::FindingAggregator;
    use crate::analyzer::FileReport;
    use crate::{Finding, FindingRecord, LanguageId, Location, RuleId};
    use std::path::PathBuf;

    fn make_report() -> Report {
        let mut aggregator = FindingAggregator::new(1);
        aggregator.fill(
            0,
            FileReport {
                path: PathBuf::from("cart.test.ts"),
                language: LanguageId::TypeScript,
                findings: vec![
                    Finding::new(
                        RuleId::TooManyArguments,
                        "cart.test.ts",
                        Location::new(2, 10),
                        "'build' declares 5 parameters (max 4)",
                    ),
                    Finding::new(
                        RuleId::SetupWithinTest,
                        "cart.test.ts",
                        Location::new(8, 5),
                        "Mock configuration 'api.mockReturnValue' inside test 'adds'",
                    ),
                ],
                suppressed: 0,
            },
        );
        aggregator.finish(Severity::Warning)
    }

    #[test]
    fn test_json_report_has_summary() {
        let json: serde_json::Value =
            serde_json::from_str(&JsonReporter::new().pretty().report(&make_report())).unwrap();
        assert_eq!(json["summary"]["filesAnalyzed"], 1);
        assert_eq!(json["summary"]["totalFindings"], 2);
        assert_eq!(json["summary"]["warnings"], 2);
        assert_eq!(json["summary"]["failed"], true);
        assert_eq!(json["findings"][0]["rule"], "too-many-arguments");
        assert_eq!(json["findings"][0]["location"]["line"], 2);
        assert_eq!(json["failOn"], "warning");
    }

    #[test]
    fn test_json_lines_are_flat_records() {
        let output = JsonReporter::new().report_lines(&make_report());
        let records: Vec<FindingRecord> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].rule, "setup-within-test");
        assert_eq!(records[1].line, 8);
        assert_eq!(records[1].column, 5);
        assert_eq!(records[1].file, "cart.test.ts");
    }
}
