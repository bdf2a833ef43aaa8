//! Tokenizer
//!
//! Converts source text into an ordered token stream driven by a
//! [`LexicalProfile`]. The lexer never fails: unterminated literals and
//! comments run to the end of the line or file and come back as
//! [`TokenKind::Error`] tokens plus an entry in [`Lexed::errors`]. Every byte
//! of the input is either whitespace or part of exactly one token.

mod token;

pub use token::{LexError, LexErrorKind, Position, Span, Token, TokenKind};

use crate::language::LexicalProfile;

/// Multi-character punctuators, longest first. `>>` and `<<` are deliberately
/// absent so nested generic argument lists close one `>` at a time.
const MULTI_PUNCT: &[&str] = &[
    "...", "===", "!==", "??=", "=>", "->", "==", "!=", "<=", ">=", "&&", "||", "??", "?.",
    "::", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
];

const SINGLE_PUNCT: &str = "!#%&*+,-./:;<=>?@^|~()[]{}";

/// Keywords after which a `/` starts a regex literal
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "instanceof", "new", "delete", "void",
    "throw", "yield", "await",
];

/// Interpolations nested deeper than this are scanned as plain string text
const MAX_INTERPOLATION_DEPTH: usize = 32;

/// Lexer output
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// Tokenize `text` with the given profile
pub fn tokenize(text: &str, profile: &LexicalProfile) -> Lexed {
    Lexer::new(text, profile).tokenize()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interpolation {
    None,
    /// `${expr}` (template literals, Dart strings)
    DollarBrace,
    /// `{expr}` with `{{` as an escaped brace (C# `$"..."`)
    Brace,
}

#[derive(Debug, Clone, Copy)]
struct StringStyle {
    quote: u8,
    /// Number of quote characters that close the literal
    quote_len: usize,
    escapes: bool,
    multiline: bool,
    /// `""` inside the literal is an escaped quote (C# verbatim)
    doubled_quote: bool,
    interpolation: Interpolation,
}

impl StringStyle {
    fn plain(quote: u8) -> Self {
        Self {
            quote,
            quote_len: 1,
            escapes: true,
            multiline: false,
            doubled_quote: false,
            interpolation: Interpolation::None,
        }
    }
}

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    profile: &'a LexicalProfile,
    pos: usize,
    line: usize,
    column: usize,
    /// Only whitespace seen since the last newline
    at_line_start: bool,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, profile: &'a LexicalProfile) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            profile,
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Lexed {
        while let Some(c) = self.peek_char() {
            // A leading byte order mark is layout, not a token
            if c.is_whitespace() || (c == '\u{feff}' && self.pos == 0) {
                if c == '\n' {
                    self.at_line_start = true;
                }
                self.advance_to(self.pos + c.len_utf8());
                continue;
            }
            self.lex_token(c);
            self.at_line_start = false;
        }
        Lexed {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn lex_token(&mut self, c: char) {
        let start = self.pos;
        let rest = &self.src[start..];

        // Shebang and preprocessor directives
        if (start == 0 && rest.starts_with("#!"))
            || (c == '#' && self.profile.preprocessor_lines && self.at_line_start)
        {
            let end = self.line_end(start);
            self.emit(TokenKind::Comment, end);
            return;
        }

        if rest.starts_with(self.profile.line_comment) {
            let end = self.line_end(start);
            self.emit(TokenKind::Comment, end);
            return;
        }

        let (open, _) = self.profile.block_comment;
        if rest.starts_with(open) {
            self.lex_block_comment();
            return;
        }

        if self.try_lex_string(c) {
            return;
        }

        if c == '/' && self.profile.regex_literals && self.regex_allowed() {
            if let Some(end) = self.scan_regex(start + 1) {
                self.emit(TokenKind::String, end);
                return;
            }
        }

        if c.is_ascii_digit()
            || (c == '.' && self.bytes.get(start + 1).is_some_and(|b| b.is_ascii_digit()))
        {
            let end = self.scan_number(start);
            self.emit(TokenKind::Number, end);
            return;
        }

        if self.is_identifier_start(c) {
            let end = self.scan_identifier(start);
            let kind = if self.profile.is_keyword(&self.src[start..end]) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            self.emit(kind, end);
            return;
        }

        // C# verbatim identifier: @class
        if Some(c) == self.profile.verbatim_prefix {
            if let Some(next) = self.src[start + 1..].chars().next() {
                if self.is_identifier_start(next) {
                    let end = self.scan_identifier(start + 1);
                    self.emit(TokenKind::Identifier, end);
                    return;
                }
            }
        }

        if let Some(p) = MULTI_PUNCT.iter().find(|p| rest.starts_with(**p)) {
            self.emit(TokenKind::Punct, start + p.len());
            return;
        }

        if SINGLE_PUNCT.contains(c) {
            self.emit(TokenKind::Punct, start + 1);
            return;
        }

        self.emit_error(LexErrorKind::UnexpectedCharacter, start + c.len_utf8());
    }

    fn lex_block_comment(&mut self) {
        let (open, close) = self.profile.block_comment;
        let mut depth = 1usize;
        let mut i = self.pos + open.len();
        while i < self.bytes.len() {
            let rest = &self.bytes[i..];
            if rest.starts_with(close.as_bytes()) {
                depth -= 1;
                i += close.len();
                if depth == 0 {
                    self.emit(TokenKind::Comment, i);
                    return;
                }
            } else if self.profile.nested_block_comments && rest.starts_with(open.as_bytes()) {
                depth += 1;
                i += open.len();
            } else {
                i += 1;
            }
        }
        self.emit_error(LexErrorKind::UnterminatedComment, self.bytes.len());
    }

    /// Recognize every string form the profile allows. Returns false if `c`
    /// does not start a string here.
    fn try_lex_string(&mut self, c: char) -> bool {
        let start = self.pos;
        let p = self.profile;

        if Some(c) == p.template_quote {
            let style = StringStyle {
                quote: c as u8,
                quote_len: 1,
                escapes: true,
                multiline: true,
                doubled_quote: false,
                interpolation: Interpolation::DollarBrace,
            };
            let (end, ok) = self.scan_string(start + 1, style, 0);
            self.finish_string(end, ok, LexErrorKind::UnterminatedTemplate);
            return true;
        }

        // Collect C#-style prefixes: @"..", $"..", $@"..", @$"..
        let mut i = start;
        let mut verbatim = false;
        let mut interpolated = false;
        let mut raw = false;
        loop {
            let b = self.bytes.get(i).copied().map(char::from);
            if b.is_some() && b == p.verbatim_prefix && !verbatim {
                verbatim = true;
            } else if b.is_some() && b == p.interpolation_prefix && !interpolated {
                interpolated = true;
            } else if b.is_some() && b == p.raw_prefix && !raw && i == start {
                raw = true;
            } else {
                break;
            }
            i += 1;
        }

        let Some(q) = self.bytes.get(i).copied() else {
            return false;
        };
        if !q.is_ascii() || !p.quotes.contains(&char::from(q)) {
            return false;
        }
        // A lone prefix character followed by something else is not a string
        if raw && (verbatim || interpolated) {
            return false;
        }

        let run = self.bytes[i..].iter().take_while(|b| **b == q).count();
        if p.triple_quotes && run >= 3 {
            let style = StringStyle {
                quote: q,
                quote_len: run,
                escapes: !raw && !verbatim && p.verbatim_prefix.is_none(),
                multiline: true,
                doubled_quote: false,
                interpolation: self.interpolation_for(interpolated, raw),
            };
            let (end, ok) = self.scan_string(i + run, style, 0);
            self.finish_string(end, ok, LexErrorKind::UnterminatedString);
            return true;
        }

        let style = StringStyle {
            quote: q,
            quote_len: 1,
            escapes: !raw && !verbatim,
            multiline: verbatim,
            doubled_quote: verbatim,
            interpolation: self.interpolation_for(interpolated, raw),
        };
        let (end, ok) = self.scan_string(i + 1, style, 0);
        self.finish_string(end, ok, LexErrorKind::UnterminatedString);
        true
    }

    fn interpolation_for(&self, interpolated: bool, raw: bool) -> Interpolation {
        if interpolated {
            Interpolation::Brace
        } else if self.profile.dollar_brace_interpolation && !raw {
            Interpolation::DollarBrace
        } else {
            Interpolation::None
        }
    }

    fn finish_string(&mut self, end: usize, terminated: bool, error: LexErrorKind) {
        if terminated {
            self.emit(TokenKind::String, end);
        } else {
            self.emit_error(error, end);
        }
    }

    /// Scan a string body starting after the opening quote(s). Returns the
    /// end offset and whether the closing quote was found. Single-line
    /// literals stop before the newline.
    fn scan_string(&self, mut i: usize, style: StringStyle, depth: usize) -> (usize, bool) {
        let len = self.bytes.len();
        while i < len {
            let b = self.bytes[i];
            if b == b'\n' && !style.multiline {
                return (i, false);
            }
            if style.escapes && b == b'\\' {
                i = (i + 2).min(len);
                continue;
            }
            if b == style.quote {
                if style.quote_len == 1 {
                    if style.doubled_quote && self.bytes.get(i + 1) == Some(&style.quote) {
                        i += 2;
                        continue;
                    }
                    return (i + 1, true);
                }
                let run = self.bytes[i..].iter().take_while(|c| **c == style.quote).count();
                if run >= style.quote_len {
                    return (i + run, true);
                }
                i += run;
                continue;
            }
            if depth < MAX_INTERPOLATION_DEPTH {
                match style.interpolation {
                    Interpolation::DollarBrace
                        if b == b'$' && self.bytes.get(i + 1) == Some(&b'{') =>
                    {
                        i = self.scan_interpolation(i + 2, depth + 1);
                        continue;
                    }
                    Interpolation::Brace if b == b'{' => {
                        if self.bytes.get(i + 1) == Some(&b'{') {
                            i += 2;
                        } else {
                            i = self.scan_interpolation(i + 1, depth + 1);
                        }
                        continue;
                    }
                    _ => {}
                }
            }
            i += 1;
        }
        (len, false)
    }

    /// Skip an interpolation hole up to and including its closing brace,
    /// stepping over nested strings.
    fn scan_interpolation(&self, mut i: usize, depth: usize) -> usize {
        let len = self.bytes.len();
        let mut braces = 1usize;
        while i < len {
            let b = self.bytes[i];
            match b {
                b'{' => braces += 1,
                b'}' => {
                    braces -= 1;
                    if braces == 0 {
                        return i + 1;
                    }
                }
                _ if Some(char::from(b)) == self.profile.template_quote => {
                    let style = StringStyle {
                        multiline: true,
                        interpolation: Interpolation::DollarBrace,
                        ..StringStyle::plain(b)
                    };
                    i = self.scan_string(i + 1, style, depth).0;
                    continue;
                }
                _ if b.is_ascii() && self.profile.quotes.contains(&char::from(b)) => {
                    let style = StringStyle {
                        interpolation: if self.profile.dollar_brace_interpolation {
                            Interpolation::DollarBrace
                        } else {
                            Interpolation::None
                        },
                        ..StringStyle::plain(b)
                    };
                    i = self.scan_string(i + 1, style, depth).0;
                    continue;
                }
                _ => {}
            }
            i += 1;
        }
        len
    }

    /// A `/` starts a regex where an operand is expected
    fn regex_allowed(&self) -> bool {
        let Some(prev) = self.tokens.iter().rev().find(|t| !t.is_trivia()) else {
            return true;
        };
        match prev.kind {
            TokenKind::Punct => !matches!(prev.text.as_str(), ")" | "]" | "}" | "++" | "--"),
            TokenKind::Keyword => REGEX_PREFIX_KEYWORDS.contains(&prev.text.as_str()),
            _ => false,
        }
    }

    /// Scan `/body/flags` starting after the opening slash. None if the
    /// literal does not close on this line.
    fn scan_regex(&self, mut i: usize) -> Option<usize> {
        let len = self.bytes.len();
        if matches!(self.bytes.get(i), Some(b'/') | Some(b'*')) {
            return None;
        }
        let mut in_class = false;
        while i < len {
            match self.bytes[i] {
                b'\n' => return None,
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'[' => in_class = true,
                b']' => in_class = false,
                b'/' if !in_class => {
                    i += 1;
                    while i < len && self.bytes[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    return Some(i);
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    fn scan_number(&self, start: usize) -> usize {
        let len = self.bytes.len();
        let hex = self.bytes[start..].starts_with(b"0x") || self.bytes[start..].starts_with(b"0X");
        let mut i = start;
        while i < len {
            let b = self.bytes[i];
            let next_is_digit = self.bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            if b.is_ascii_alphanumeric() || b == b'_' {
                i += 1;
            } else if b == b'.' && next_is_digit {
                i += 1;
            } else if (b == b'+' || b == b'-')
                && !hex
                && i > start
                && matches!(self.bytes[i - 1], b'e' | b'E')
                && next_is_digit
            {
                i += 1;
            } else {
                break;
            }
        }
        i
    }

    fn is_identifier_start(&self, c: char) -> bool {
        c.is_alphabetic() || c == '_' || self.profile.identifier_extra.contains(&c)
    }

    fn scan_identifier(&self, start: usize) -> usize {
        let mut end = start;
        for c in self.src[start..].chars() {
            if c.is_alphanumeric() || c == '_' || self.profile.identifier_extra.contains(&c) {
                end += c.len_utf8();
            } else {
                break;
            }
        }
        end
    }

    fn line_end(&self, from: usize) -> usize {
        self.bytes[from..]
            .iter()
            .position(|b| *b == b'\n')
            .map_or(self.bytes.len(), |n| from + n)
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.pos,
        }
    }

    /// Move to `end`, keeping line and column current
    fn advance_to(&mut self, end: usize) {
        for c in self.src[self.pos..end].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = end;
    }

    fn emit(&mut self, kind: TokenKind, end: usize) {
        let start = self.position();
        let text = self.src[self.pos..end].to_string();
        self.advance_to(end);
        self.tokens.push(Token {
            kind,
            text,
            span: Span::new(start, self.position()),
        });
    }

    fn emit_error(&mut self, kind: LexErrorKind, end: usize) {
        self.emit(TokenKind::Error(kind), end);
        if let Some(token) = self.tokens.last() {
            self.errors.push(LexError {
                kind,
                span: token.span,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{LanguageId, ProfileRegistry};
    use proptest::prelude::*;

    fn lex(lang: LanguageId, src: &str) -> Lexed {
        let registry = ProfileRegistry::new();
        let profile = registry.get(lang).unwrap();
        tokenize(src, &profile.lexical)
    }

    fn texts(lexed: &Lexed) -> Vec<&str> {
        lexed.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// Tokens plus whitespace gaps reproduce the input
    fn assert_covers(src: &str, lexed: &Lexed) {
        let mut cursor = 0;
        for token in &lexed.tokens {
            assert!(token.span.start.offset >= cursor, "overlapping token {:?}", token);
            assert!(
                src[cursor..token.span.start.offset].chars().all(char::is_whitespace),
                "gap before {:?} is not whitespace",
                token
            );
            assert_eq!(&src[token.span.start.offset..token.span.end.offset], token.text);
            cursor = token.span.end.offset;
        }
        assert!(src[cursor..].chars().all(char::is_whitespace));
    }

    #[test]
    fn csharp_method_tokens() {
        let src = "public void Foo(int a, string b) { _mock.Setup(m => m.Bar()); }";
        let lexed = lex(LanguageId::CSharp, src);
        assert!(lexed.errors.is_empty());
        assert_eq!(
            texts(&lexed),
            vec![
                "public", "void", "Foo", "(", "int", "a", ",", "string", "b", ")", "{", "_mock",
                ".", "Setup", "(", "m", "=>", "m", ".", "Bar", "(", ")", ")", ";", "}"
            ]
        );
        assert_eq!(lexed.tokens[0].kind, TokenKind::Keyword);
        assert_eq!(lexed.tokens[2].kind, TokenKind::Identifier);
        assert_covers(src, &lexed);
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let src = "a\n  bc\n\td";
        let lexed = lex(LanguageId::CSharp, src);
        let pos: Vec<(usize, usize)> = lexed
            .tokens
            .iter()
            .map(|t| (t.start().line, t.start().column))
            .collect();
        assert_eq!(pos, vec![(1, 1), (2, 3), (3, 2)]);
        assert_eq!(lexed.tokens[1].end().column, 5);
    }

    #[test]
    fn comments_are_tokens() {
        let src = "// imcg-ignore\nfoo(); /* block\n comment */ bar();";
        let lexed = lex(LanguageId::TypeScript, src);
        let comments: Vec<&str> = lexed
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Comment)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(comments, vec!["// imcg-ignore", "/* block\n comment */"]);
        assert_covers(src, &lexed);
    }

    #[test]
    fn unterminated_block_comment_runs_to_eof() {
        let src = "foo(); /* never closed\nbar();";
        let lexed = lex(LanguageId::CSharp, src);
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].kind, LexErrorKind::UnterminatedComment);
        let last = lexed.tokens.last().unwrap();
        assert_eq!(last.kind, TokenKind::Error(LexErrorKind::UnterminatedComment));
        assert_eq!(last.end().offset, src.len());
    }

    #[test]
    fn unterminated_string_stops_at_newline() {
        let src = "var s = \"oops\nFoo();";
        let lexed = lex(LanguageId::CSharp, src);
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].kind, LexErrorKind::UnterminatedString);
        assert_eq!(lexed.errors[0].span.start.line, 1);
        // Lexing resumes on the next line
        assert!(lexed.tokens.iter().any(|t| t.text == "Foo"));
    }

    #[test]
    fn csharp_verbatim_and_interpolated_strings() {
        let src = r#"var a = @"C:\path ""quoted"""; var b = $"x {(c ? "y" : "z")} {{w}}"; Done();"#;
        let lexed = lex(LanguageId::CSharp, src);
        assert!(lexed.errors.is_empty(), "{:?}", lexed.errors);
        let strings: Vec<&str> = lexed
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::String)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(strings.len(), 2);
        assert!(strings[0].starts_with("@\""));
        assert!(strings[1].starts_with("$\""));
        assert!(lexed.tokens.iter().any(|t| t.text == "Done"));
    }

    #[test]
    fn csharp_preprocessor_lines_are_comments() {
        let src = "#region Tests\n[Fact]\npublic void A() {}\n#endregion";
        let lexed = lex(LanguageId::CSharp, src);
        assert_eq!(lexed.tokens[0].kind, TokenKind::Comment);
        assert_eq!(lexed.tokens[0].text, "#region Tests");
        assert!(lexed.tokens[1].is_punct("["));
    }

    #[test]
    fn template_literals_nest() {
        let src = "const s = `a ${fn(`inner ${x}`)} b`; next();";
        let lexed = lex(LanguageId::TypeScript, src);
        assert!(lexed.errors.is_empty());
        let template = lexed.tokens.iter().find(|t| t.text.starts_with('`')).unwrap();
        assert_eq!(template.text, "`a ${fn(`inner ${x}`)} b`");
        assert!(lexed.tokens.iter().any(|t| t.text == "next"));
    }

    #[test]
    fn unterminated_template_is_reported() {
        let lexed = lex(LanguageId::TypeScript, "const s = `abc\n def");
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].kind, LexErrorKind::UnterminatedTemplate);
    }

    #[test]
    fn regex_literal_versus_division() {
        let lexed = lex(LanguageId::JavaScript, "const r = /a[/]b/gi; const d = x / y / z;");
        assert!(lexed
            .tokens
            .iter()
            .any(|t| t.kind == TokenKind::String && t.text == "/a[/]b/gi"));
        let slashes = lexed.tokens.iter().filter(|t| t.is_punct("/")).count();
        assert_eq!(slashes, 2);
    }

    #[test]
    fn dart_strings_and_nested_comments() {
        let src = "final a = r'\\d+'; final b = '''multi\nline'''; /* a /* b */ c */ final c = 'x ${y ? \"q\" : 'r'}';";
        let lexed = lex(LanguageId::Dart, src);
        assert!(lexed.errors.is_empty(), "{:?}", lexed.errors);
        let comments = lexed.tokens.iter().filter(|t| t.kind == TokenKind::Comment).count();
        assert_eq!(comments, 1);
        let strings = lexed.tokens.iter().filter(|t| t.kind == TokenKind::String).count();
        assert_eq!(strings, 3);
        assert_covers(src, &lexed);
    }

    #[test]
    fn generic_closers_are_not_merged() {
        let lexed = lex(LanguageId::CSharp, "Dictionary<string, List<int>> x;");
        assert_eq!(lexed.tokens.iter().filter(|t| t.is_punct(">")).count(), 2);
    }

    #[test]
    fn multi_char_punctuators() {
        let lexed = lex(LanguageId::TypeScript, "a?.b ?? c === d => e");
        let puncts: Vec<&str> = lexed
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Punct)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(puncts, vec!["?.", "??", "===", "=>"]);
    }

    #[test]
    fn java_arrow_and_numbers() {
        let lexed = lex(LanguageId::Java, "x -> 1.5e-3 + 0xFF + 10_000L");
        let t = texts(&lexed);
        assert_eq!(t, vec!["x", "->", "1.5e-3", "+", "0xFF", "+", "10_000L"]);
    }

    #[test]
    fn unexpected_characters_are_recovered() {
        let lexed = lex(LanguageId::CSharp, "a § b");
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].kind, LexErrorKind::UnexpectedCharacter);
        assert_eq!(lexed.tokens.len(), 3);
    }

    #[test]
    fn leading_byte_order_mark_is_skipped() {
        let lexed = lex(LanguageId::CSharp, "\u{feff}class A {}");
        assert!(lexed.errors.is_empty());
        assert_eq!(texts(&lexed), vec!["class", "A", "{", "}"]);
    }

    proptest! {
        #[test]
        fn lexing_covers_arbitrary_input(src in "\\PC{0,200}") {
            for lang in LanguageId::ALL {
                let lexed = lex(lang, &src);
                assert_covers(&src, &lexed);
            }
        }

        #[test]
        fn lexing_covers_code_like_input(src in "[a-z(){}\\[\\];,.\"'`/*@$#=> \n\\\\]{0,120}") {
            for lang in LanguageId::ALL {
                let lexed = lex(lang, &src);
                assert_covers(&src, &lexed);
            }
        }
    }
}
