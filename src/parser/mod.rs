//! Lightweight structural parser
//!
//! Builds a shallow declaration tree from the token stream: suites, test
//! cases, methods, function literals and the calls inside their bodies. There
//! is no expression AST. The walker scans tokens linearly, recognizes a small
//! set of shapes described by the [`LanguageProfile`], and steps over anything
//! else. Delimiters are matched up front so every construct knows where it
//! ends even when the file is truncated.

mod delimiters;
mod ignore_directives;
mod params;
mod tree;

pub use delimiters::{match_delimiters, Delimiters};
pub use ignore_directives::{IgnoreDirectives, LineIgnoreSet};
pub use params::parse_parameters;
pub use tree::{
    CallSite, DeclId, Declaration, DeclarationKind, MockBinding, Parameter, ParseError,
    SyntaxTree,
};

use tracing::debug;

use crate::language::{AttributeStyle, LanguageProfile, ParamStyle, ScopeKind};
use crate::lexer::{self, Lexed, Position, Span, Token, TokenKind};

/// Constructs nested deeper than this are not descended into
pub const MAX_DEPTH: usize = 256;

/// Longest signature tail (return type, constraints, initializers) accepted
const MAX_TAIL: usize = 64;

/// Keywords that cannot precede a declaration name
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "await", "new", "throw", "yield", "typeof", "in", "case", "delete", "else", "is",
    "as", "instanceof",
];

/// Parse an already tokenized file
pub fn parse(lexed: &Lexed, profile: &LanguageProfile) -> SyntaxTree {
    let tokens: Vec<&Token> = lexed.tokens.iter().filter(|t| !t.is_trivia()).collect();
    let delimiters = match_delimiters(&tokens);
    let mut parser = Parser {
        tokens: &tokens,
        delimiters: &delimiters,
        profile,
        decls: Vec::new(),
        roots: Vec::new(),
        calls: Vec::new(),
        bindings: Vec::new(),
        errors: Vec::new(),
        depth_reported: false,
    };
    let top = Ctx {
        parent: None,
        owner: None,
        scope: profile.syntax.top_level,
        args: None,
        depth: 0,
    };
    parser.walk(0, tokens.len(), top);

    let mut errors = delimiters.errors.clone();
    errors.append(&mut parser.errors);
    errors.sort_by_key(|e| e.position.offset);

    debug!(
        declarations = parser.decls.len(),
        errors = errors.len(),
        "parsed structure"
    );
    SyntaxTree {
        declarations: parser.decls,
        roots: parser.roots,
        calls: parser.calls,
        bindings: parser.bindings,
        errors,
    }
}

/// Tokenize and parse in one step
pub fn parse_source(text: &str, profile: &LanguageProfile) -> (Lexed, SyntaxTree) {
    let lexed = lexer::tokenize(text, &profile.lexical);
    let tree = parse(&lexed, profile);
    (lexed, tree)
}

#[derive(Debug, Clone, Copy)]
struct Ctx {
    /// Declaration new declarations attach to
    parent: Option<DeclId>,
    /// Declaration whose body owns the calls found here
    owner: Option<DeclId>,
    scope: ScopeKind,
    /// Opening paren when walking a call's argument list
    args: Option<usize>,
    depth: usize,
}

impl Ctx {
    fn body_of(self, decl: DeclId) -> Ctx {
        Ctx {
            parent: Some(decl),
            owner: Some(decl),
            scope: ScopeKind::Statement,
            args: None,
            depth: self.depth + 1,
        }
    }
}

#[derive(Debug, Clone)]
struct Attribute {
    name: String,
    position: Position,
}

#[derive(Debug, Clone, Copy)]
enum Tail {
    /// Block body opening at the index
    Block(usize),
    /// Arrow at the index
    Arrow(usize),
    /// Bodiless signature ending at the index
    Semicolon(usize),
}

#[derive(Debug, Clone, Copy)]
enum Body {
    Block { open: usize, close: usize, stop: usize },
    Expr { start: usize, end: usize },
    None,
}

#[derive(Debug, Clone, Copy)]
enum LiteralParams {
    Group { open: usize, close: usize },
    Single(usize),
}

#[derive(Debug, Clone, Copy)]
struct Literal {
    start: usize,
    params: LiteralParams,
    tail: Tail,
}

#[derive(Debug, Clone)]
struct Segment {
    text: String,
    is_call: bool,
}

#[derive(Debug, Clone)]
struct Chain {
    /// Token index of the first token of the chain (`new` included)
    start: usize,
    /// Token index of the final segment's name
    name: usize,
    segments: Vec<Segment>,
    constructor: bool,
}

struct Parser<'t, 'a> {
    tokens: &'t [&'a Token],
    delimiters: &'t Delimiters,
    profile: &'t LanguageProfile,
    decls: Vec<Declaration>,
    roots: Vec<DeclId>,
    calls: Vec<CallSite>,
    bindings: Vec<MockBinding>,
    errors: Vec<ParseError>,
    depth_reported: bool,
}

impl<'t, 'a> Parser<'t, 'a> {
    // ---- token helpers ----

    fn tok(&self, i: usize) -> &'a Token {
        self.tokens[i]
    }

    fn get(&self, i: usize) -> Option<&'a Token> {
        self.tokens.get(i).copied()
    }

    fn prev(&self, i: usize) -> Option<&'a Token> {
        i.checked_sub(1).and_then(|p| self.get(p))
    }

    /// Closer of the group opened at `i`, or the end of input if unclosed
    fn close_of(&self, i: usize) -> usize {
        self.delimiters.partner[i].unwrap_or(self.tokens.len())
    }

    fn is_opener(tok: &Token) -> bool {
        tok.kind == TokenKind::Punct && matches!(tok.text.as_str(), "(" | "[" | "{")
    }

    fn is_closer(tok: &Token) -> bool {
        tok.kind == TokenKind::Punct && matches!(tok.text.as_str(), ")" | "]" | "}")
    }

    /// Exclusive end of a group closing at `close` inside a range ending at
    /// `end`; an unclosed group stops at the range end
    fn stop(&self, close: usize, end: usize) -> usize {
        if close < end {
            close + 1
        } else {
            end
        }
    }

    /// Position just past the token before `excl`
    fn end_position(&self, excl: usize) -> Position {
        let excl = excl.min(self.tokens.len());
        match excl.checked_sub(1) {
            Some(last) => self.tok(last).end(),
            None => Position::START,
        }
    }

    fn span(&self, start: usize, excl_end: usize) -> Span {
        let start_pos = self
            .get(start)
            .map_or_else(|| self.end_position(start), |t| t.start());
        Span::new(start_pos, self.end_position(excl_end.max(start + 1)))
    }

    fn is_arrow(&self, i: usize) -> bool {
        self.get(i)
            .is_some_and(|t| t.is_punct(self.profile.lexical.arrow))
    }

    fn is_self_keyword(&self, tok: &Token) -> bool {
        tok.kind == TokenKind::Keyword && self.profile.syntax.self_keywords.contains(&tok.text.as_str())
    }

    // ---- arena ----

    fn push_decl(&mut self, mut decl: Declaration, parent: Option<DeclId>, link: bool) -> DeclId {
        let id = DeclId(self.decls.len());
        decl.id = id;
        decl.parent = parent;
        self.decls.push(decl);
        if link {
            self.link(id);
        }
        id
    }

    fn link(&mut self, id: DeclId) {
        match self.decls[id.0].parent {
            Some(parent) => self.decls[parent.0].children.push(id),
            None => self.roots.push(id),
        }
    }

    fn record_call(&mut self, owner: Option<DeclId>, call: CallSite) {
        match owner {
            Some(owner) => self.decls[owner.0].calls.push(call),
            None => self.calls.push(call),
        }
    }

    // ---- walker ----

    fn walk(&mut self, start: usize, end: usize, ctx: Ctx) {
        if ctx.depth > MAX_DEPTH {
            if !self.depth_reported {
                self.depth_reported = true;
                let position = self.end_position(start + 1);
                self.errors.push(ParseError {
                    message: format!("nesting deeper than {MAX_DEPTH} levels was not analyzed"),
                    position,
                });
            }
            return;
        }

        let mut pending: Vec<Attribute> = Vec::new();
        let mut i = start;
        while i < end {
            let tok = self.tok(i);
            if tok.is_punct(";") || tok.is_punct("}") {
                self.flush_attributes(&mut pending);
                i += 1;
                continue;
            }

            let step = self
                .try_attribute(i, start, end, ctx, &mut pending)
                .or_else(|| self.try_type_declaration(i, end, ctx, &mut pending))
                .or_else(|| self.try_namespace(i, end, ctx, &mut pending))
                .or_else(|| self.try_named_declaration(i, start, end, ctx, &mut pending))
                .or_else(|| self.try_function_literal(i, end, ctx))
                .or_else(|| self.try_call(i, start, end, ctx));
            if let Some(next) = step {
                i = next.max(i + 1);
                continue;
            }

            if tok.is_punct("{") {
                self.flush_attributes(&mut pending);
                if ctx.scope == ScopeKind::Member {
                    // Accessor bodies, initializer blocks and the like
                    let close = self.close_of(i).min(end);
                    let inner = Ctx {
                        scope: ScopeKind::Statement,
                        args: None,
                        depth: ctx.depth + 1,
                        ..ctx
                    };
                    self.walk(i + 1, close, inner);
                    i = close + 1;
                    continue;
                }
            }
            i += 1;
        }
        self.flush_attributes(&mut pending);
    }

    /// Attributes not consumed by a declaration. A test attribute that does
    /// not lead to a method is reported.
    fn flush_attributes(&mut self, pending: &mut Vec<Attribute>) {
        for attr in pending.drain(..) {
            if self.profile.matchers.is_case_attribute(&attr.name) {
                let written = match self.profile.syntax.attribute_style {
                    AttributeStyle::Brackets => format!("[{}]", attr.name),
                    AttributeStyle::AtSign => format!("@{}", attr.name),
                };
                debug!(attribute = %written, line = attr.position.line, "dangling test attribute");
                self.errors.push(ParseError {
                    message: format!("test attribute {written} is not followed by a method declaration"),
                    position: attr.position,
                });
            }
        }
    }

    // ---- attributes ----

    fn try_attribute(
        &mut self,
        i: usize,
        start: usize,
        end: usize,
        ctx: Ctx,
        pending: &mut Vec<Attribute>,
    ) -> Option<usize> {
        let tok = self.tok(i);
        match self.profile.syntax.attribute_style {
            AttributeStyle::Brackets => {
                if !tok.is_punct("[") || ctx.scope != ScopeKind::Member {
                    return None;
                }
                let at_statement_start = i == start
                    || self.prev(i).is_some_and(|p| {
                        p.is_punct(";") || p.is_punct("{") || p.is_punct("}") || p.is_punct("]")
                    });
                if !at_statement_start {
                    return None;
                }
                let close = self.close_of(i).min(end);
                self.bracket_attribute_names(i + 1, close, pending);
                Some(close + 1)
            }
            AttributeStyle::AtSign => {
                if !tok.is_punct("@") || !self.get(i + 1).is_some_and(|t| t.is_identifier()) {
                    return None;
                }
                let position = tok.start();
                let mut j = i + 1;
                let mut name = self.tok(j).text.clone();
                while j + 2 < end
                    && self.tok(j + 1).is_punct(".")
                    && self.tok(j + 2).is_identifier()
                {
                    name.push('.');
                    name.push_str(&self.tok(j + 2).text);
                    j += 2;
                }
                let mut next = j + 1;
                if next < end && self.tok(next).is_punct("(") {
                    next = self.close_of(next).min(end) + 1;
                }
                pending.push(Attribute { name, position });
                Some(next)
            }
        }
    }

    /// `[Test, Category("x")]`, `[assembly: Foo]`, `[Xunit.Fact]`
    fn bracket_attribute_names(&self, start: usize, end: usize, pending: &mut Vec<Attribute>) {
        let mut seg_start = start;
        let mut k = start;
        while k <= end {
            if k == end || self.tok(k).is_punct(",") {
                let mut s = seg_start;
                if s + 1 < k && self.tok(s + 1).is_punct(":") {
                    s += 2;
                }
                if s < k && self.tok(s).is_identifier() {
                    let mut name = self.tok(s).text.clone();
                    let mut j = s;
                    while j + 2 < k && self.tok(j + 1).is_punct(".") && self.tok(j + 2).is_identifier()
                    {
                        name.push('.');
                        name.push_str(&self.tok(j + 2).text);
                        j += 2;
                    }
                    pending.push(Attribute {
                        name,
                        position: self.tok(s).start(),
                    });
                }
                seg_start = k + 1;
                k += 1;
                continue;
            }
            if Self::is_opener(self.tok(k)) {
                k = self.close_of(k).min(end);
                if k == end {
                    continue;
                }
            }
            k += 1;
        }
    }

    // ---- types and namespaces ----

    /// Scan a class/namespace header for its body. `Ok(open)` for a block,
    /// `Err(Some(semicolon))` for a bodiless form, `Err(None)` otherwise.
    fn scan_header(&self, from: usize, end: usize) -> Result<usize, Option<usize>> {
        let mut k = from;
        while k < end {
            let t = self.tok(k);
            if t.is_punct("{") {
                return Ok(k);
            }
            if t.is_punct(";") {
                return Err(Some(k));
            }
            if t.is_punct("}") || t.is_punct("=") || Self::is_closer(t) {
                return Err(None);
            }
            if Self::is_opener(t) {
                k = self.close_of(k) + 1;
                continue;
            }
            k += 1;
        }
        Err(None)
    }

    fn try_type_declaration(
        &mut self,
        i: usize,
        end: usize,
        ctx: Ctx,
        pending: &mut Vec<Attribute>,
    ) -> Option<usize> {
        let tok = self.tok(i);
        if !matches!(tok.kind, TokenKind::Keyword | TokenKind::Identifier)
            || !self.profile.syntax.is_type_keyword(&tok.text)
        {
            return None;
        }
        if let Some(prev) = self.prev(i) {
            if [".", "?.", "::", ":", ",", "("].iter().any(|p| prev.is_punct(p)) {
                return None;
            }
        }
        let next = self.get(i + 1)?;
        if !(next.is_identifier() || next.is_punct("{") || next.kind == TokenKind::Keyword) {
            return None;
        }

        let open = match self.scan_header(i + 1, end) {
            Ok(open) => open,
            // `record Point(int X, int Y);`
            Err(Some(semicolon)) if next.is_identifier() => {
                self.flush_attributes(pending);
                return Some(semicolon + 1);
            }
            Err(_) => return None,
        };
        let close = self.close_of(open).min(end);

        let (name, name_position) = if next.is_identifier() {
            (next.text.clone(), next.start())
        } else {
            (String::new(), tok.start())
        };
        let attributes: Vec<Attribute> = std::mem::take(pending);
        let span_start = attributes.first().map_or(tok.start(), |a| a.position);
        let mut decl = Declaration::new(
            DeclarationKind::Scope,
            name,
            name_position,
            Span::new(span_start, self.end_position(self.stop(close, end))),
        );
        decl.body = Some(self.span(open, self.stop(close, end)));
        decl.attributes = attributes.iter().map(|a| a.name.clone()).collect();
        let id = self.push_decl(decl, ctx.parent, true);

        let inner = Ctx {
            scope: ScopeKind::Member,
            ..ctx.body_of(id)
        };
        self.walk(open + 1, close, inner);

        let matchers = &self.profile.matchers;
        let decl = &self.decls[id.0];
        let is_suite = decl.attributes.iter().any(|a| matchers.is_suite_attribute(a))
            || decl
                .children
                .iter()
                .any(|c| self.decls[c.0].kind == DeclarationKind::TestCase);
        if is_suite {
            self.decls[id.0].kind = DeclarationKind::TestSuite;
        }
        Some(close + 1)
    }

    fn try_namespace(
        &mut self,
        i: usize,
        end: usize,
        ctx: Ctx,
        pending: &mut Vec<Attribute>,
    ) -> Option<usize> {
        let tok = self.tok(i);
        if !matches!(tok.kind, TokenKind::Keyword | TokenKind::Identifier)
            || !self.profile.syntax.is_namespace_keyword(&tok.text)
        {
            return None;
        }
        if self.prev(i).is_some_and(|p| p.is_punct(".")) {
            return None;
        }
        let next = self.get(i + 1)?;
        if !(next.is_identifier() || next.is_string()) {
            return None;
        }
        let open = match self.scan_header(i + 1, end) {
            Ok(open) => open,
            // File-scoped namespace
            Err(Some(semicolon)) => return Some(semicolon + 1),
            Err(None) => return None,
        };
        self.flush_attributes(pending);
        let close = self.close_of(open).min(end);

        let name: String = self.tokens[i + 1..open]
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        let mut decl = Declaration::new(
            DeclarationKind::Scope,
            name,
            next.start(),
            Span::new(tok.start(), self.end_position(self.stop(close, end))),
        );
        decl.body = Some(self.span(open, self.stop(close, end)));
        let id = self.push_decl(decl, ctx.parent, true);

        let inner = Ctx {
            scope: self.profile.syntax.top_level,
            ..ctx.body_of(id)
        };
        self.walk(open + 1, close, inner);
        Some(close + 1)
    }

    // ---- named methods ----

    /// Whether a token may directly precede a declaration name
    fn can_precede_name(&self, i: usize) -> bool {
        let Some(prev) = self.prev(i) else {
            return true;
        };
        match prev.kind {
            TokenKind::Identifier => true,
            TokenKind::Keyword => !EXPRESSION_KEYWORDS.contains(&prev.text.as_str()),
            TokenKind::Punct => match prev.text.as_str() {
                ";" | "{" | "}" | "]" | ")" | ">" | "?" | "*" => true,
                // Object literal members
                "," => self.delimiters.enclosing[i]
                    .is_some_and(|open| self.tok(open).is_punct("{")),
                _ => false,
            },
            _ => false,
        }
    }

    fn try_named_declaration(
        &mut self,
        i: usize,
        start: usize,
        end: usize,
        ctx: Ctx,
        pending: &mut Vec<Attribute>,
    ) -> Option<usize> {
        let tok = self.tok(i);
        if !tok.is_identifier() || self.profile.syntax.is_control_keyword(&tok.text) {
            return None;
        }
        if !self.can_precede_name(i) {
            return None;
        }

        let mut open = i + 1;
        if self.get(open)?.is_punct("<") {
            open = self.skip_generics(open, end)?;
        }
        if open >= end || !self.tok(open).is_punct("(") {
            return None;
        }
        let close = self.close_of(open);
        if close >= end {
            return None;
        }
        let tail = self.scan_tail(close + 1, end)?;

        if let Tail::Semicolon(_) = tail {
            if ctx.scope != ScopeKind::Member || !self.is_signature_statement(i, start) {
                return None;
            }
        }

        let attributes: Vec<Attribute> = std::mem::take(pending);
        let is_case = attributes
            .iter()
            .any(|a| self.profile.matchers.is_case_attribute(&a.name));
        let kind = if is_case {
            DeclarationKind::TestCase
        } else {
            DeclarationKind::Method
        };

        let (body, next) = self.body_for(tail, end);
        let span_start = attributes.first().map_or(tok.start(), |a| a.position);
        let span_end = match body {
            Body::Block { stop, .. } => self.end_position(stop),
            Body::Expr { end, .. } => self.end_position(end),
            Body::None => self.end_position(next),
        };
        let mut decl = Declaration::new(
            kind,
            tok.text.trim_start_matches('@'),
            tok.start(),
            Span::new(span_start, span_end),
        );
        decl.params = Some(self.parameters(open, close));
        decl.attributes = attributes.into_iter().map(|a| a.name).collect();
        decl.body = self.body_span(body);
        let id = self.push_decl(decl, ctx.parent, true);
        self.walk_body(body, ctx.body_of(id));
        Some(next)
    }

    /// A bodiless `Type Name(params);` in member scope: no assignment since
    /// the start of the statement and a type-like token before the name
    fn is_signature_statement(&self, name: usize, floor: usize) -> bool {
        let type_like = self.prev(name).is_some_and(|p| match p.kind {
            TokenKind::Identifier => true,
            TokenKind::Keyword => !EXPRESSION_KEYWORDS.contains(&p.text.as_str()),
            TokenKind::Punct => matches!(p.text.as_str(), ">" | "]" | "?"),
            _ => false,
        });
        if !type_like {
            return false;
        }
        let mut k = name;
        while k > floor {
            k -= 1;
            let t = self.tok(k);
            if t.is_punct(";") || t.is_punct("{") || t.is_punct("}") {
                break;
            }
            if t.is_punct("=") {
                return false;
            }
            if Self::is_closer(t) {
                if let Some(open) = self.delimiters.partner[k] {
                    k = open.max(floor);
                }
            }
        }
        true
    }

    /// Index after the `>` matching the `<` at `lt`
    fn skip_generics(&self, lt: usize, end: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut k = lt;
        while k < end && k < lt + MAX_TAIL {
            let t = self.tok(k);
            match t.kind {
                TokenKind::Punct => match t.text.as_str() {
                    "<" => depth += 1,
                    ">" => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(k + 1);
                        }
                    }
                    "," | "." | "?" | "[" | "]" | "(" | ")" | ":" => {}
                    _ => return None,
                },
                TokenKind::Identifier | TokenKind::Keyword => {}
                _ => return None,
            }
            k += 1;
        }
        None
    }

    /// Index of the `<` matching the `>` at `gt`, scanning backwards
    fn generic_open(&self, gt: usize, min: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut k = gt;
        loop {
            let t = self.tok(k);
            match t.kind {
                TokenKind::Punct => match t.text.as_str() {
                    ">" => depth += 1,
                    "<" => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(k);
                        }
                    }
                    "," | "." | "?" | "[" | "]" | "(" | ")" => {}
                    _ => return None,
                },
                TokenKind::Identifier | TokenKind::Keyword => {}
                _ => return None,
            }
            if k <= min || gt - k > MAX_TAIL {
                return None;
            }
            k -= 1;
        }
    }

    /// Signature tail after a parameter list: return type annotation,
    /// `async`, `throws`, `where` constraints, `: base(...)` initializers
    fn scan_tail(&self, from: usize, end: usize) -> Option<Tail> {
        let syntax = &self.profile.syntax;
        let words_allowed = syntax.param_style == ParamStyle::TypeThenName;
        let mut after_colon = false;
        let mut after_throws = false;
        // Next token starts a type: `{` there is an object type, not the body
        let mut type_expected = false;
        let mut angle = 0usize;
        let mut k = from;
        let limit = end.min(from + MAX_TAIL);
        while k < limit {
            let t = self.tok(k);
            if self.is_arrow(k) {
                return Some(Tail::Arrow(k));
            }
            let at_type_start = type_expected;
            type_expected = false;
            match t.kind {
                TokenKind::Punct => match t.text.as_str() {
                    "{" if angle == 0 && !at_type_start => return Some(Tail::Block(k)),
                    ";" => return Some(Tail::Semicolon(k)),
                    ":" => {
                        after_colon = true;
                        type_expected = true;
                    }
                    "<" => {
                        angle += 1;
                        type_expected = true;
                    }
                    ">" => angle = angle.saturating_sub(1),
                    "(" | "[" | "{" if after_colon => {
                        k = self.close_of(k) + 1;
                        continue;
                    }
                    "," if after_colon || after_throws || angle > 0 => {
                        type_expected = after_colon || angle > 0;
                    }
                    "." if after_colon || after_throws => {}
                    "|" | "&" if after_colon => type_expected = true,
                    "?" | "=" if after_colon => {}
                    "*" => {}
                    _ => return None,
                },
                TokenKind::Identifier | TokenKind::Keyword => {
                    let word = t.text.as_str();
                    let structural = syntax.is_type_keyword(word)
                        || syntax.is_namespace_keyword(word)
                        || syntax.function_keyword == Some(word);
                    if after_colon || after_throws {
                        // `where T : class` keeps going
                    } else if words_allowed && !structural {
                        if word == "throws" {
                            after_throws = true;
                        }
                    } else {
                        return None;
                    }
                }
                TokenKind::String | TokenKind::Number if after_colon => {}
                _ => return None,
            }
            k += 1;
        }
        None
    }

    fn parameters(&self, open: usize, close: usize) -> Vec<Parameter> {
        let inner = &self.tokens[(open + 1).min(close)..close];
        parse_parameters(inner, &self.profile.syntax)
    }

    /// Resolve a tail into a body and the index after it
    fn body_for(&self, tail: Tail, end: usize) -> (Body, usize) {
        match tail {
            Tail::Block(open) => {
                let close = self.close_of(open).min(end);
                let stop = self.stop(close, end);
                (Body::Block { open, close, stop }, stop)
            }
            Tail::Arrow(arrow) => {
                let start = arrow + 1;
                if start < end && self.tok(start).is_punct("{") {
                    let close = self.close_of(start).min(end);
                    let stop = self.stop(close, end);
                    return (Body::Block { open: start, close, stop }, stop);
                }
                let expr_end = self.expression_end(start, end);
                if expr_end > start {
                    (Body::Expr { start, end: expr_end }, expr_end)
                } else {
                    (Body::None, start)
                }
            }
            Tail::Semicolon(semi) => (Body::None, semi + 1),
        }
    }

    fn body_span(&self, body: Body) -> Option<Span> {
        match body {
            Body::Block { open, stop, .. } => Some(self.span(open, stop)),
            Body::Expr { start, end } => Some(self.span(start, end)),
            Body::None => None,
        }
    }

    fn walk_body(&mut self, body: Body, ctx: Ctx) {
        match body {
            Body::Block { open, close, .. } => self.walk(open + 1, close, ctx),
            Body::Expr { start, end } => self.walk(start, end, ctx),
            Body::None => {}
        }
    }

    /// End of an arrow expression body: the first `,` `;` or unmatched closer
    fn expression_end(&self, from: usize, end: usize) -> usize {
        let mut k = from;
        while k < end {
            let t = self.tok(k);
            if Self::is_opener(t) {
                k = (self.close_of(k) + 1).min(end);
                continue;
            }
            if Self::is_closer(t) || t.is_punct(",") || t.is_punct(";") {
                break;
            }
            k += 1;
        }
        k
    }

    // ---- function literals ----

    fn literal_at(&self, i: usize, end: usize, scope: ScopeKind) -> Option<Literal> {
        let tok = self.tok(i);
        let syntax = &self.profile.syntax;

        if tok.text == "async" && matches!(tok.kind, TokenKind::Keyword | TokenKind::Identifier) {
            if i + 1 >= end {
                return None;
            }
            let mut literal = self.literal_at(i + 1, end, scope)?;
            literal.start = i;
            return Some(literal);
        }

        if tok.kind == TokenKind::Keyword && syntax.function_keyword == Some(tok.text.as_str()) {
            let mut open = i + 1;
            if self.get(open)?.is_punct("*") {
                open += 1;
            }
            if open >= end || !self.tok(open).is_punct("(") {
                return None;
            }
            let close = self.close_of(open);
            if close >= end {
                return None;
            }
            return match self.scan_tail(close + 1, end)? {
                tail @ Tail::Block(_) => Some(Literal {
                    start: i,
                    params: LiteralParams::Group { open, close },
                    tail,
                }),
                _ => None,
            };
        }

        if tok.is_punct("(") {
            // `foo(...)`, `if (...)`, `x[0](...)` are not literals
            let blocked = self.prev(i).is_some_and(|prev| match prev.kind {
                TokenKind::Identifier => true,
                TokenKind::Keyword => {
                    syntax.is_control_keyword(&prev.text)
                        || syntax.function_keyword == Some(prev.text.as_str())
                        || self.is_self_keyword(prev)
                }
                TokenKind::Punct => matches!(prev.text.as_str(), ")" | "]" | ">"),
                _ => false,
            });
            if blocked {
                return None;
            }
            let close = self.close_of(i);
            if close >= end {
                return None;
            }
            let tail = self.scan_tail(close + 1, end)?;
            return match tail {
                Tail::Arrow(_) => Some(Literal {
                    start: i,
                    params: LiteralParams::Group { open: i, close },
                    tail,
                }),
                Tail::Block(_) if syntax.block_closures => Some(Literal {
                    start: i,
                    params: LiteralParams::Group { open: i, close },
                    tail,
                }),
                _ => None,
            };
        }

        if tok.is_identifier() && scope == ScopeKind::Statement && self.is_arrow(i + 1) && i + 1 < end
        {
            if self.prev(i).is_some_and(|p| p.is_punct(".")) {
                return None;
            }
            return Some(Literal {
                start: i,
                params: LiteralParams::Single(i),
                tail: Tail::Arrow(i + 1),
            });
        }
        None
    }

    /// Name bound to the expression starting at `start`: `name = expr`,
    /// `name: Type = expr` or `name: expr`
    fn binding_name(&self, start: usize) -> Option<(String, Position)> {
        let op = self.prev(start)?;
        let before = start.checked_sub(2).map(|k| self.tok(k));
        if op.is_punct("=") {
            if self.profile.syntax.param_style == ParamStyle::NameThenType {
                let mut k = start - 1;
                let mut steps = 0;
                while k > 0 && steps < 16 {
                    k -= 1;
                    steps += 1;
                    let t = self.tok(k);
                    if t.is_punct(":") {
                        return self
                            .prev(k)
                            .filter(|n| n.is_identifier())
                            .map(|n| (n.text.clone(), n.start()));
                    }
                    let type_like = t.is_identifier()
                        || [".", "<", ">", ",", "[", "]", "?", "|"]
                            .iter()
                            .any(|p| t.is_punct(p));
                    if !type_like {
                        break;
                    }
                }
            }
            return before
                .filter(|n| n.is_identifier())
                .map(|n| (n.text.clone(), n.start()));
        }
        if op.is_punct(":") {
            let ternary = start
                .checked_sub(3)
                .is_some_and(|k| self.tok(k).is_punct("?"));
            if !ternary {
                return before
                    .filter(|n| n.is_identifier())
                    .map(|n| (n.text.clone(), n.start()));
            }
        }
        None
    }

    fn try_function_literal(&mut self, i: usize, end: usize, ctx: Ctx) -> Option<usize> {
        let literal = self.literal_at(i, end, ctx.scope)?;
        Some(self.build_literal(literal, end, ctx))
    }

    fn build_literal(&mut self, literal: Literal, end: usize, ctx: Ctx) -> usize {
        let (body, next) = self.body_for(literal.tail, end);
        let start_tok = self.tok(literal.start);
        let binding = self.binding_name(literal.start);
        let inline = ctx.args.is_some() && self.delimiters.enclosing[literal.start] == ctx.args;

        let params = match literal.params {
            LiteralParams::Group { open, close } => self.parameters(open, close),
            LiteralParams::Single(k) => vec![Parameter {
                name: self.tok(k).text.clone(),
                position: self.tok(k).start(),
            }],
        };
        let (name, name_position) = binding.unwrap_or((String::new(), start_tok.start()));
        let span_end = match body {
            Body::Block { stop, .. } => self.end_position(stop),
            _ => self.end_position(next),
        };
        let mut decl = Declaration::new(
            DeclarationKind::Method,
            name,
            name_position,
            Span::new(start_tok.start(), span_end),
        );
        decl.params = Some(params);
        decl.body = self.body_span(body);
        decl.is_function_literal = true;
        decl.inline_argument = inline;
        let id = self.push_decl(decl, ctx.parent, true);
        self.walk_body(body, ctx.body_of(id));
        next
    }

    // ---- calls ----

    /// Walk backwards from the callee's last token to the start of its chain.
    /// No token of the chain may lie before `min`.
    fn callee_chain(&self, last: usize, min: usize) -> Option<Chain> {
        let mut segments = Vec::new();
        let mut name_idx = None;
        let mut k = last;
        let start = loop {
            let t = self.tok(k);
            let seg_start = if t.is_punct(")") {
                let open = self.delimiters.partner[k]?;
                let name = self.call_name_before(open, min)?;
                segments.push(Segment {
                    text: format!("{}(...)", self.tok(name).text),
                    is_call: true,
                });
                name_idx.get_or_insert(name);
                name
            } else if t.is_identifier() || self.is_self_keyword(t) {
                segments.push(Segment {
                    text: t.text.clone(),
                    is_call: false,
                });
                name_idx.get_or_insert(k);
                k
            } else {
                return None;
            };

            // Continue through `.` / `?.` when the segment before it is in range
            match seg_start.checked_sub(2) {
                Some(before) if before >= min => {
                    let dot = self.tok(seg_start - 1);
                    if dot.is_punct(".") || dot.is_punct("?.") {
                        k = before;
                    } else {
                        break seg_start;
                    }
                }
                _ => break seg_start,
            }
        };
        segments.reverse();

        let constructor = start > min && self.tok(start - 1).is_keyword("new");
        Some(Chain {
            start: if constructor { start - 1 } else { start },
            name: name_idx?,
            segments,
            constructor,
        })
    }

    /// Name token of the call whose argument list opens at `open`
    fn call_name_before(&self, open: usize, min: usize) -> Option<usize> {
        let before = open.checked_sub(1).filter(|b| *b >= min)?;
        let t = self.tok(before);
        if t.is_identifier() || self.is_self_keyword(t) {
            if self.profile.syntax.is_control_keyword(&t.text) {
                return None;
            }
            return Some(before);
        }
        if t.is_punct(">") {
            let lt = self.generic_open(before, min)?;
            let name = lt.checked_sub(1).filter(|n| *n >= min)?;
            if self.tok(name).is_identifier() {
                return Some(name);
            }
        }
        None
    }

    /// Depth-zero arguments; a trailing comma adds none
    fn argument_count(&self, open: usize, close: usize) -> usize {
        let mut count = 0;
        let mut in_argument = false;
        let mut k = open + 1;
        while k < close {
            let t = self.tok(k);
            if t.is_punct(",") {
                if in_argument {
                    count += 1;
                }
                in_argument = false;
                k += 1;
                continue;
            }
            in_argument = true;
            if Self::is_opener(t) {
                k = self.close_of(k) + 1;
                continue;
            }
            k += 1;
        }
        if in_argument {
            count += 1;
        }
        count
    }

    fn try_call(&mut self, i: usize, start: usize, end: usize, ctx: Ctx) -> Option<usize> {
        if !self.tok(i).is_punct("(") || i <= start {
            return None;
        }
        let last = i - 1;
        let prev = self.tok(last);
        let chain = if prev.is_punct(")") {
            self.callee_chain(last, start)?
        } else {
            let name = self.call_name_before(i, start)?;
            self.callee_chain(name, start)?
        };

        let close = self.close_of(i).min(end);
        let mut callee = chain
            .segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(".");
        if chain.constructor {
            callee = format!("new {callee}");
        }
        let method = chain
            .segments
            .last()
            .map(|s| s.text.clone())
            .unwrap_or_default();
        let name_position = self.tok(chain.name).start();
        let call = CallSite {
            callee: callee.clone(),
            method,
            receiver: self.receiver(&chain),
            argument_count: self.argument_count(i, close),
            chain: chain.start,
            position: name_position,
        };
        self.record_call(ctx.owner, call);

        if self.profile.matchers.mock.is_factory(&callee) {
            if let Some((name, position)) = self.binding_name(chain.start) {
                let scope = if self.declares_local(position) {
                    ctx.owner
                } else {
                    None
                };
                self.bindings.push(MockBinding {
                    name,
                    factory: callee.clone(),
                    position,
                    scope,
                });
            }
        }

        let matchers = &self.profile.matchers;
        let registration = if matchers.is_suite_call(&callee) {
            Some(DeclarationKind::TestSuite)
        } else if matchers.is_case_call(&callee) {
            Some(DeclarationKind::TestCase)
        } else {
            None
        };
        if let Some(kind) = registration {
            if let Some(next) = self.try_registration(i, close, end, &chain, &callee, kind, ctx) {
                return Some(next);
            }
        }

        // Arguments may hold function literals; keep the wrapper only if they do
        let placeholder = Declaration::new(
            DeclarationKind::CallExpression,
            callee,
            name_position,
            Span::new(
                self.tok(chain.start).start(),
                self.end_position(self.stop(close, end)),
            ),
        );
        let id = self.push_decl(placeholder, ctx.parent, false);
        let args_ctx = Ctx {
            parent: Some(id),
            owner: ctx.owner,
            scope: ScopeKind::Statement,
            args: Some(i),
            depth: ctx.depth + 1,
        };
        self.walk(i + 1, close, args_ctx);
        if self.decls[id.0].children.is_empty() && self.decls.len() == id.0 + 1 {
            self.decls.pop();
        } else {
            self.link(id);
        }
        Some(close + 1)
    }

    /// The bound name at `name` is introduced right there (`var x =`,
    /// `const x: T =`, `Calculator x =`) rather than assigned
    fn declares_local(&self, name: Position) -> bool {
        let idx = self.tokens.partition_point(|t| t.start().offset < name.offset);
        match self.prev(idx) {
            Some(t) => match t.kind {
                TokenKind::Identifier => true,
                TokenKind::Keyword => !matches!(t.text.as_str(), "return" | "yield" | "await"),
                TokenKind::Punct => matches!(t.text.as_str(), ">" | "]" | "?"),
                _ => false,
            },
            None => false,
        }
    }

    /// Root identifier of a member chain; `this.x.Foo()` has receiver `x`,
    /// a bare `Foo()` or a chain rooted in a call has none
    fn receiver(&self, chain: &Chain) -> Option<String> {
        let self_keywords = self.profile.syntax.self_keywords;
        let rest = match chain.segments.first() {
            Some(first) if !first.is_call && self_keywords.contains(&first.text.as_str()) => {
                &chain.segments[1..]
            }
            _ => &chain.segments[..],
        };
        if rest.len() < 2 || rest[0].is_call {
            return None;
        }
        Some(rest[0].text.clone())
    }

    /// `describe('name', () => {...})`, `test('name', () async {...})`
    fn try_registration(
        &mut self,
        open: usize,
        close: usize,
        end: usize,
        chain: &Chain,
        callee: &str,
        kind: DeclarationKind,
        ctx: Ctx,
    ) -> Option<usize> {
        let mut literal = None;
        let mut first_string = None;
        let mut k = open + 1;
        while k < close {
            let t = self.tok(k);
            if first_string.is_none() && t.is_string() {
                first_string = Some(k);
            }
            if let Some(found) = self.literal_at(k, close, ScopeKind::Statement) {
                literal = Some(found);
                break;
            }
            k = if Self::is_opener(t) {
                self.close_of(k) + 1
            } else {
                k + 1
            };
        }
        let literal = literal?;

        let name = first_string
            .map(|s| unquote(&self.tok(s).text))
            .unwrap_or_else(|| callee.to_string());
        let (body, literal_end) = self.body_for(literal.tail, close);
        let params = match literal.params {
            LiteralParams::Group { open, close } => self.parameters(open, close),
            LiteralParams::Single(k) => vec![Parameter {
                name: self.tok(k).text.clone(),
                position: self.tok(k).start(),
            }],
        };
        let mut decl = Declaration::new(
            kind,
            name,
            self.tok(chain.start).start(),
            Span::new(
                self.tok(chain.start).start(),
                self.end_position(self.stop(close, end)),
            ),
        );
        decl.params = Some(params);
        decl.body = self.body_span(body);
        // The callback is still a literal written in the call's argument list
        decl.inline_argument = true;
        let id = self.push_decl(decl, ctx.parent, true);

        // Remaining arguments belong to the registration call itself
        let args_ctx = Ctx {
            parent: Some(id),
            owner: ctx.owner,
            scope: ScopeKind::Statement,
            args: Some(open),
            depth: ctx.depth + 1,
        };
        self.walk(open + 1, literal.start, args_ctx);
        self.walk_body(body, ctx.body_of(id));
        self.walk(literal_end, close, args_ctx);
        Some(close + 1)
    }
}

/// Text of a string literal without prefixes and quotes
fn unquote(text: &str) -> String {
    let trimmed = text.trim_start_matches(['@', '$', 'r']);
    trimmed
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}
