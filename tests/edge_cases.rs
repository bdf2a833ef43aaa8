//! Edge case tests: degenerate inputs must not panic.

use imcg::{analyze_source, AnalysisEngine, CancellationToken, RuleId, Severity};
use proptest::prelude::*;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn analyze(name: &str, text: &str) -> imcg::FileReport {
    analyze_source(Path::new(name), text).unwrap_or_else(|e| panic!("{}: {}", name, e))
}

#[test]
fn empty_file_no_findings() {
    for name in ["a.cs", "a.test.ts", "a.test.js", "a_test.dart", "ATest.java"] {
        assert!(analyze(name, "").findings.is_empty(), "{}", name);
    }
}

#[test]
fn only_comments_no_findings() {
    let report = analyze("a.test.ts", "// nothing here\n/* or here */\n");
    assert!(report.findings.is_empty());
}

#[test]
fn unterminated_comment_is_one_lexical_error() {
    let report = analyze("A.cs", "public class A {}\n/* never closed\n");
    let lexical: Vec<_> = report
        .findings
        .iter()
        .filter(|f| f.rule == RuleId::LexicalError)
        .collect();
    assert_eq!(lexical.len(), 1);
    assert_eq!(lexical[0].location.line, 2);
    assert_eq!(lexical[0].severity, Severity::Info);
}

#[test]
fn stray_closer_does_not_abort() {
    let text = "}\nfunction wide(a, b, c, d, e) {}\n";
    let report = analyze("util.js", text);
    assert!(report
        .findings
        .iter()
        .any(|f| f.rule == RuleId::TooManyArguments && f.location.line == 2));
}

#[test]
fn utf8_identifiers_and_strings() {
    let text = "it('naïve café ☕', () => {\n  const ñ = '日本語';\n  expect(ñ).toBe('日本語');\n});\n";
    assert!(analyze("unicode.test.ts", text).findings.is_empty());
}

#[test]
fn file_with_bom_parses() {
    let text = "\u{feff}function wide(a, b, c, d, e) {}\n";
    let report = analyze("bom.js", text);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].location.line, 1);
}

#[test]
fn deeply_nested_suites() {
    let mut text = String::new();
    for i in 0..50 {
        text.push_str(&format!("describe('level {i}', () => {{\n"));
    }
    text.push_str("it('deep', () => { api.get.mockResolvedValue(1); });\n");
    for _ in 0..50 {
        text.push_str("});\n");
    }
    let report = analyze("deep.test.ts", &text);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].rule, RuleId::SetupWithinTest);
    assert_eq!(report.findings[0].location.line, 51);
}

#[test]
fn large_file_completes() {
    let mut text = String::from("describe('many', () => {\n");
    for i in 0..2000 {
        text.push_str(&format!("  it('case {i}', () => {{ expect({i}).toBe({i}); }});\n"));
    }
    text.push_str("});\n");
    assert!(analyze("many.test.ts", &text).findings.is_empty());
}

#[test]
fn non_utf8_file_is_a_warning_not_a_crash() {
    let mut file = NamedTempFile::with_suffix(".cs").unwrap();
    file.write_all(&[0xff, 0xfe, 0x00, 0x41]).unwrap();
    file.flush().unwrap();
    let report = AnalysisEngine::with_defaults()
        .analyze_paths(&[file.path().to_path_buf()], &CancellationToken::new());
    assert_eq!(report.files_analyzed, 0);
    assert_eq!(report.warnings.len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arbitrary_text_never_panics(text in "\\PC{0,400}") {
        for name in ["a.cs", "a.test.ts", "a_test.dart", "ATest.java"] {
            let _ = analyze(name, &text);
        }
    }

    #[test]
    fn analysis_is_deterministic(text in "[a-z(){}\\[\\];,.'\"=> \n]{0,300}") {
        let first = analyze("a.test.ts", &text);
        let second = analyze("a.test.ts", &text);
        prop_assert_eq!(first.findings, second.findings);
    }

    #[test]
    fn truncation_never_panics(cut in 0usize..400) {
        let source = include_str!("../test-repos/fixtures/csharp/TooManyArgumentsTest.cs");
        let mut end = cut.min(source.len());
        while !source.is_char_boundary(end) {
            end -= 1;
        }
        let report = analyze("Truncated.cs", &source[..end]);
        prop_assert!(report.findings.iter().all(|f| f.location.line >= 1));
    }
}
