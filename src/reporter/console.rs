//! Console reporter with colored output

use crate::{Finding, Report, Severity};
use colored::{ColoredString, Colorize};
use std::fmt::Write;
use std::path::Path;

/// Info findings are listed without --verbose up to this many findings per file
const QUIET_INFO_LIMIT: usize = 5;

/// Reporter for terminal output
#[derive(Debug)]
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Print a full report to stdout
    pub fn report(&self, report: &Report) {
        print!("{}", self.render(report));
    }

    /// One `file:line:col: severity [rule] message` line per finding
    pub fn report_quiet(&self, report: &Report) {
        print!("{}", self.render_quiet(report));
    }

    pub fn render(&self, report: &Report) -> String {
        let mut out = String::new();

        let mut start = 0;
        while start < report.findings.len() {
            let file = &report.findings[start].file;
            let len = report.findings[start..]
                .iter()
                .take_while(|f| &f.file == file)
                .count();
            self.render_file(&mut out, file, &report.findings[start..start + len]);
            start += len;
        }

        if !report.warnings.is_empty() {
            let _ = writeln!(out);
            for warning in &report.warnings {
                let _ = writeln!(
                    out,
                    "{} skipped {}: {}",
                    self.paint("⚠".yellow()),
                    warning.file.display(),
                    warning.message
                );
            }
        }

        self.render_summary(&mut out, report);
        out
    }

    pub fn render_quiet(&self, report: &Report) -> String {
        let mut out = String::new();
        for f in &report.findings {
            let _ = writeln!(
                out,
                "{}:{}:{}: {} [{}] {}",
                f.file.display(),
                f.location.line,
                f.location.column,
                self.severity_label(f.severity),
                f.rule,
                f.message
            );
        }
        out
    }

    fn render_file(&self, out: &mut String, file: &Path, findings: &[Finding]) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.paint(file.display().to_string().bold()));

        let show_info = self.verbose || findings.len() <= QUIET_INFO_LIMIT;
        let mut hidden = 0;
        // Most severe first, source order within a severity
        for severity in [Severity::Error, Severity::Warning, Severity::Info] {
            for finding in findings.iter().filter(|f| f.severity == severity) {
                if severity == Severity::Info && !show_info {
                    hidden += 1;
                    continue;
                }
                self.render_finding(out, finding);
            }
        }
        if hidden > 0 {
            let _ = writeln!(
                out,
                "   {} {} additional notes (use --verbose to show)",
                self.paint("ℹ".blue()),
                hidden
            );
        }
    }

    fn render_finding(&self, out: &mut String, finding: &Finding) {
        let icon = match finding.severity {
            Severity::Error => "✗".red(),
            Severity::Warning => "⚠".yellow(),
            Severity::Info => "ℹ".blue(),
        };
        let location = format!("L{}:{}", finding.location.line, finding.location.column);
        let _ = writeln!(
            out,
            "   {} {} [{}] {}",
            self.paint(icon),
            self.paint(location.dimmed()),
            self.paint(finding.rule.as_str().dimmed()),
            finding.message
        );

        if self.verbose {
            if let Some(ref suggestion) = finding.suggestion {
                let _ = writeln!(
                    out,
                    "       {} {}",
                    self.paint("→".dimmed()),
                    self.paint(suggestion.italic())
                );
            }
        }
    }

    fn render_summary(&self, out: &mut String, report: &Report) {
        let _ = writeln!(out);
        if report.findings.is_empty() {
            let _ = writeln!(
                out,
                "{} No test smells found in {} file(s)",
                self.paint("✓".green().bold()),
                report.files_analyzed
            );
        } else {
            let _ = writeln!(
                out,
                "{} {} finding(s) in {} file(s): {} error(s), {} warning(s), {} info",
                self.paint("Summary:".bold()),
                report.findings.len(),
                report.files_analyzed,
                report.count(Severity::Error),
                report.count(Severity::Warning),
                report.count(Severity::Info)
            );
        }
        if report.suppressed > 0 {
            let _ = writeln!(
                out,
                "   {} suppressed by imcg-ignore directives",
                report.suppressed
            );
        }
        if report.cancelled {
            let _ = writeln!(
                out,
                "   {}",
                self.paint("Run cancelled; results are partial".yellow())
            );
        }
    }

    fn severity_label(&self, severity: Severity) -> String {
        let label = severity.to_string();
        match severity {
            Severity::Error => self.paint(label.red()),
            Severity::Warning => self.paint(label.yellow()),
            Severity::Info => self.paint(label.blue()),
        }
    }

    fn paint(&self, text: ColoredString) -> String {
        if self.use_colors {
            text.to_string()
        } else {
            text.clear().to_string()
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}
