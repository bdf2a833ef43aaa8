//! Built-in language profiles

use regex::Regex;
use tracing::warn;

use super::profile::{
    AttributeStyle, LanguageId, LanguageProfile, LexicalProfile, MockMatcher, ParamStyle,
    ScopeKind, SyntaxProfile, TestMatchers,
};

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "await", "base", "bool", "break", "byte", "case", "catch", "char",
    "checked", "class", "const", "continue", "decimal", "default", "delegate", "do", "double",
    "else", "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while", "record", "nameof", "async",
];

const TS_KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "let", "yield", "await",
    "interface", "implements", "private", "protected", "public", "static", "readonly",
    "declare", "namespace", "abstract", "async",
];

const JS_KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true",
    "try", "typeof", "var", "void", "while", "with", "let", "yield", "await", "static",
    "async",
];

const DART_KEYWORDS: &[&str] = &[
    "abstract", "as", "assert", "await", "break", "case", "catch", "class", "const",
    "continue", "default", "do", "else", "enum", "extends", "extension", "external", "factory",
    "false", "final", "finally", "for", "if", "implements", "import", "in", "is", "library",
    "mixin", "new", "null", "part", "rethrow", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "var", "void", "while", "with", "late", "required", "export",
    "async",
];

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
    "const", "continue", "default", "do", "double", "else", "enum", "extends", "final",
    "finally", "float", "for", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "null", "package", "private", "protected", "public", "return",
    "short", "static", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "false", "try", "void", "volatile", "while",
];

const CSHARP_EXTENSIONS: &[&str] = &["cs"];
const TS_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];
const JS_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];
const DART_EXTENSIONS: &[&str] = &["dart"];
const JAVA_EXTENSIONS: &[&str] = &["java"];

/// Compile a static pattern list. An entry that fails to compile is logged
/// and dropped rather than aborting.
pub(crate) fn compile_static(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = %p, error = %e, "dropping built-in pattern");
                None
            }
        })
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub(crate) const JS_SUITE_CALLS: &[&str] = &[
    r"^(describe|context|suite|fdescribe|xdescribe|test\.describe)(\.(only|skip|serial|parallel|each\(\.\.\.\)))*$",
];

pub(crate) const JS_CASE_CALLS: &[&str] = &[
    r"^(it|test|specify|fit|xit|xtest|xspecify)(\.(only|skip|todo|concurrent|failing|fixme|slow|each\(\.\.\.\)))*$",
];

pub(crate) const JS_MOCK_FACTORIES: &[&str] = &[
    r"^(jest|vi)\.(fn|spyOn)$",
    r"^sinon\.(stub|spy|mock|fake|createStubInstance)$",
    r"^(mock|mockDeep|createMock)$",
];

pub(crate) const CSHARP_MOCK_FACTORIES: &[&str] = &[
    r"^new Mock$",
    r"^Mock\.Of$",
    r"^Substitute\.(For|ForPartsOf)$",
    r"^A\.Fake$",
    r"^new Fake$",
];

pub(crate) const DART_MOCK_FACTORIES: &[&str] = &[r"^(new )?Mock[A-Z]\w*$"];

pub(crate) const JAVA_MOCK_FACTORIES: &[&str] = &[r"^(Mockito\.)?(mock|spy)$"];

pub(crate) fn csharp() -> LanguageProfile {
    LanguageProfile {
        id: LanguageId::CSharp,
        extensions: CSHARP_EXTENSIONS,
        lexical: LexicalProfile {
            line_comment: "//",
            block_comment: ("/*", "*/"),
            nested_block_comments: false,
            quotes: &['"', '\''],
            template_quote: None,
            verbatim_prefix: Some('@'),
            interpolation_prefix: Some('$'),
            raw_prefix: None,
            dollar_brace_interpolation: false,
            triple_quotes: true,
            regex_literals: false,
            preprocessor_lines: true,
            identifier_extra: &[],
            keywords: CSHARP_KEYWORDS,
            arrow: "=>",
        },
        syntax: SyntaxProfile {
            attribute_style: AttributeStyle::Brackets,
            type_keywords: &["class", "struct", "interface", "record", "enum"],
            namespace_keywords: &["namespace"],
            control_keywords: &[
                "if", "for", "foreach", "while", "switch", "catch", "using", "lock", "fixed",
                "typeof", "sizeof", "nameof", "default", "checked", "unchecked", "when",
            ],
            function_keyword: None,
            block_closures: false,
            param_style: ParamStyle::TypeThenName,
            grouped_named_params: false,
            top_level: ScopeKind::Member,
            self_keywords: &["this", "base"],
        },
        matchers: TestMatchers {
            suite_attributes: strings(&["TestClass", "TestFixture", "TestFixtureSource", "Collection"]),
            case_attributes: strings(&[
                "Fact",
                "Theory",
                "SkippableFact",
                "SkippableTheory",
                "Test",
                "TestCase",
                "TestCaseSource",
                "TestMethod",
                "DataTestMethod",
            ]),
            suite_calls: Vec::new(),
            case_calls: Vec::new(),
            mock: MockMatcher {
                configuration_methods: strings(&[
                    "Setup",
                    "SetupGet",
                    "SetupSet",
                    "SetupSequence",
                    "SetupProperty",
                    "SetupAllProperties",
                ]),
                receiver_gated_methods: strings(&[
                    "Returns",
                    "ReturnsForAnyArgs",
                    "ReturnsNull",
                    "Throws",
                    "ThrowsAsync",
                    "When",
                    "Configure",
                ]),
                configuration_callees: compile_static(&[r"^A\.CallTo$"]),
                factories: compile_static(CSHARP_MOCK_FACTORIES),
            },
        },
        setup_hint: "Move mock configuration into the test class constructor or a [SetUp]/[TestInitialize] method",
    }
}

fn js_matchers() -> TestMatchers {
    TestMatchers {
        suite_attributes: Vec::new(),
        case_attributes: Vec::new(),
        suite_calls: compile_static(JS_SUITE_CALLS),
        case_calls: compile_static(JS_CASE_CALLS),
        mock: MockMatcher {
            configuration_methods: strings(&[
                "mockReturnValue",
                "mockReturnValueOnce",
                "mockResolvedValue",
                "mockResolvedValueOnce",
                "mockRejectedValue",
                "mockRejectedValueOnce",
                "mockImplementation",
                "mockImplementationOnce",
                "mockReturnThis",
                "calledWith",
            ]),
            receiver_gated_methods: strings(&[
                "returns",
                "resolves",
                "rejects",
                "throws",
                "callsFake",
                "withArgs",
                "onCall",
                "onFirstCall",
                "returnsArg",
                "yields",
            ]),
            configuration_callees: Vec::new(),
            factories: compile_static(JS_MOCK_FACTORIES),
        },
    }
}

const JS_SETUP_HINT: &str = "Move mock configuration into beforeEach() or a shared test factory";

pub(crate) fn typescript() -> LanguageProfile {
    LanguageProfile {
        id: LanguageId::TypeScript,
        extensions: TS_EXTENSIONS,
        lexical: LexicalProfile {
            line_comment: "//",
            block_comment: ("/*", "*/"),
            nested_block_comments: false,
            quotes: &['"', '\''],
            template_quote: Some('`'),
            verbatim_prefix: None,
            interpolation_prefix: None,
            raw_prefix: None,
            dollar_brace_interpolation: false,
            triple_quotes: false,
            regex_literals: true,
            preprocessor_lines: false,
            identifier_extra: &['$'],
            keywords: TS_KEYWORDS,
            arrow: "=>",
        },
        syntax: SyntaxProfile {
            attribute_style: AttributeStyle::AtSign,
            type_keywords: &["class", "interface", "enum"],
            namespace_keywords: &["namespace", "module"],
            control_keywords: &["if", "for", "while", "switch", "catch", "with", "typeof"],
            function_keyword: Some("function"),
            block_closures: false,
            param_style: ParamStyle::NameThenType,
            grouped_named_params: false,
            top_level: ScopeKind::Statement,
            self_keywords: &["this", "super"],
        },
        matchers: js_matchers(),
        setup_hint: JS_SETUP_HINT,
    }
}

pub(crate) fn javascript() -> LanguageProfile {
    LanguageProfile {
        id: LanguageId::JavaScript,
        extensions: JS_EXTENSIONS,
        lexical: LexicalProfile {
            keywords: JS_KEYWORDS,
            ..typescript().lexical
        },
        syntax: SyntaxProfile {
            type_keywords: &["class"],
            namespace_keywords: &[],
            ..typescript().syntax
        },
        matchers: js_matchers(),
        setup_hint: JS_SETUP_HINT,
    }
}

pub(crate) fn dart() -> LanguageProfile {
    LanguageProfile {
        id: LanguageId::Dart,
        extensions: DART_EXTENSIONS,
        lexical: LexicalProfile {
            line_comment: "//",
            block_comment: ("/*", "*/"),
            nested_block_comments: true,
            quotes: &['"', '\''],
            template_quote: None,
            verbatim_prefix: None,
            interpolation_prefix: None,
            raw_prefix: Some('r'),
            dollar_brace_interpolation: true,
            triple_quotes: true,
            regex_literals: false,
            preprocessor_lines: false,
            identifier_extra: &['$'],
            keywords: DART_KEYWORDS,
            arrow: "=>",
        },
        syntax: SyntaxProfile {
            attribute_style: AttributeStyle::AtSign,
            type_keywords: &["class", "mixin", "extension", "enum"],
            namespace_keywords: &[],
            control_keywords: &["if", "for", "while", "switch", "catch", "assert", "on"],
            function_keyword: None,
            block_closures: true,
            param_style: ParamStyle::TypeThenName,
            grouped_named_params: true,
            top_level: ScopeKind::Member,
            self_keywords: &["this", "super"],
        },
        matchers: TestMatchers {
            suite_attributes: strings(&["reflectiveTest"]),
            case_attributes: strings(&["isTest"]),
            suite_calls: compile_static(&[r"^group$"]),
            case_calls: compile_static(&[r"^(test|testWidgets|blocTest|testGoldens)$"]),
            mock: MockMatcher {
                configuration_methods: strings(&[
                    "when",
                    "thenReturn",
                    "thenAnswer",
                    "thenThrow",
                    "whenListen",
                ]),
                receiver_gated_methods: Vec::new(),
                configuration_callees: Vec::new(),
                factories: compile_static(DART_MOCK_FACTORIES),
            },
        },
        setup_hint: "Move mock configuration into setUp()",
    }
}

pub(crate) fn java() -> LanguageProfile {
    LanguageProfile {
        id: LanguageId::Java,
        extensions: JAVA_EXTENSIONS,
        lexical: LexicalProfile {
            line_comment: "//",
            block_comment: ("/*", "*/"),
            nested_block_comments: false,
            quotes: &['"', '\''],
            template_quote: None,
            verbatim_prefix: None,
            interpolation_prefix: None,
            raw_prefix: None,
            dollar_brace_interpolation: false,
            triple_quotes: true,
            regex_literals: false,
            preprocessor_lines: false,
            identifier_extra: &['$'],
            keywords: JAVA_KEYWORDS,
            arrow: "->",
        },
        syntax: SyntaxProfile {
            attribute_style: AttributeStyle::AtSign,
            type_keywords: &["class", "interface", "enum", "record"],
            namespace_keywords: &[],
            control_keywords: &["if", "for", "while", "switch", "catch", "synchronized"],
            function_keyword: None,
            block_closures: false,
            param_style: ParamStyle::TypeThenName,
            grouped_named_params: false,
            top_level: ScopeKind::Member,
            self_keywords: &["this", "super"],
        },
        matchers: TestMatchers {
            suite_attributes: strings(&["RunWith", "ExtendWith", "Nested", "TestInstance"]),
            case_attributes: strings(&[
                "Test",
                "ParameterizedTest",
                "RepeatedTest",
                "TestFactory",
                "TestTemplate",
            ]),
            suite_calls: Vec::new(),
            case_calls: Vec::new(),
            mock: MockMatcher {
                configuration_methods: strings(&[
                    "when",
                    "doReturn",
                    "doThrow",
                    "doAnswer",
                    "doNothing",
                    "given",
                ]),
                receiver_gated_methods: Vec::new(),
                configuration_callees: Vec::new(),
                factories: compile_static(JAVA_MOCK_FACTORIES),
            },
        },
        setup_hint: "Move mock configuration into a @BeforeEach (JUnit 5) or @Before (JUnit 4) method",
    }
}

/// All built-in profiles, in registry order
pub(crate) fn all() -> Vec<LanguageProfile> {
    vec![csharp(), typescript(), javascript(), dart(), java()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_pattern_is_dropped_not_fatal() {
        let compiled = compile_static(&["(unclosed", r"^it$"]);
        assert_eq!(compiled.len(), 1);
        assert!(compiled[0].is_match("it"));
    }

    #[test]
    fn every_builtin_pattern_compiles() {
        for patterns in [
            JS_SUITE_CALLS,
            JS_CASE_CALLS,
            JS_MOCK_FACTORIES,
            CSHARP_MOCK_FACTORIES,
            DART_MOCK_FACTORIES,
            JAVA_MOCK_FACTORIES,
        ] {
            assert_eq!(compile_static(patterns).len(), patterns.len());
        }
    }

    #[test]
    fn javascript_registration_calls() {
        let m = javascript().matchers;
        assert!(m.is_suite_call("describe"));
        assert!(m.is_suite_call("describe.only"));
        assert!(m.is_suite_call("describe.each(...)"));
        assert!(m.is_case_call("it"));
        assert!(m.is_case_call("test.skip"));
        assert!(m.is_case_call("it.each(...)"));
        assert!(!m.is_case_call("item"));
        assert!(!m.is_case_call("expect"));
    }

    #[test]
    fn csharp_mock_factories() {
        let m = csharp().matchers.mock;
        assert!(m.is_factory("new Mock"));
        assert!(m.is_factory("Substitute.For"));
        assert!(m.is_factory("A.Fake"));
        assert!(!m.is_factory("new MockRepository"));
        assert!(m.is_configuration("A.CallTo", "CallTo", false));
    }

    #[test]
    fn dart_mocks_follow_naming_convention() {
        let m = dart().matchers.mock;
        assert!(m.is_factory("MockUserRepository"));
        assert!(!m.is_factory("Mockingbird"));
        assert!(!m.is_factory("UserRepository"));
    }

    #[test]
    fn javascript_shares_typescript_lexing() {
        let js = javascript();
        assert_eq!(js.lexical.template_quote, Some('`'));
        assert!(js.lexical.regex_literals);
        assert!(!js.lexical.is_keyword("interface"));
    }
}
