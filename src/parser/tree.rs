//! Structural tree produced by the parser
//!
//! Declarations live in an arena in pre-order, which is also source order of
//! their start positions. `children` are owned ids, `parent` is a plain
//! back-reference for lookups.

use serde::Serialize;

use crate::lexer::{Position, Span};

/// Index of a declaration in [`SyntaxTree::declarations`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeclarationKind {
    /// Class, fixture or suite registration call (`describe`, `group`)
    TestSuite,
    /// Attributed test method or case registration call (`it`, `test`)
    TestCase,
    /// Named method/function or function literal
    Method,
    /// A call whose arguments hold function literals
    CallExpression,
    /// Namespace, interface or ordinary class
    Scope,
}

impl DeclarationKind {
    /// Declarations that carry a parameter list
    pub fn is_callable(self) -> bool {
        matches!(self, DeclarationKind::Method | DeclarationKind::TestCase)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub position: Position,
}

/// A call expression found inside a body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    /// Member chain as written, intermediate calls rendered `(...)`,
    /// generic arguments dropped: `_mock.Setup(...).Returns`, `new Mock`
    pub callee: String,
    /// Last segment of the callee
    pub method: String,
    /// Root identifier of the chain, `this`/`base`/`super` skipped
    pub receiver: Option<String>,
    pub argument_count: usize,
    /// Shared by every call of one fluent chain
    pub chain: usize,
    /// Position of the method name
    pub position: Position,
}

/// An identifier assigned the result of a mock factory call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockBinding {
    pub name: String,
    pub factory: String,
    pub position: Position,
    /// Body declaring the variable; `None` for fields and assignments to
    /// names declared elsewhere, which are visible file-wide
    pub scope: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub id: DeclId,
    pub kind: DeclarationKind,
    /// Empty for anonymous function literals
    pub name: String,
    pub name_position: Position,
    /// `None` when the declaration has no parameter list (classes, scopes)
    pub params: Option<Vec<Parameter>>,
    pub span: Span,
    pub body: Option<Span>,
    pub parent: Option<DeclId>,
    pub children: Vec<DeclId>,
    /// Calls owned directly by this declaration's body, in source order
    pub calls: Vec<CallSite>,
    pub attributes: Vec<String>,
    pub is_function_literal: bool,
    /// Function literal written directly in a call's argument list
    pub inline_argument: bool,
}

impl Declaration {
    pub(crate) fn new(
        kind: DeclarationKind,
        name: impl Into<String>,
        name_position: Position,
        span: Span,
    ) -> Self {
        Self {
            id: DeclId(0),
            kind,
            name: name.into(),
            name_position,
            params: None,
            span,
            body: None,
            parent: None,
            children: Vec::new(),
            calls: Vec::new(),
            attributes: Vec::new(),
            is_function_literal: false,
            inline_argument: false,
        }
    }

    pub fn param_count(&self) -> Option<usize> {
        self.params.as_ref().map(Vec::len)
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

/// Structural problem the parser recovered from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyntaxTree {
    pub declarations: Vec<Declaration>,
    pub roots: Vec<DeclId>,
    /// Calls outside any declaration (top-level script code)
    pub calls: Vec<CallSite>,
    pub bindings: Vec<MockBinding>,
    pub errors: Vec<ParseError>,
}

impl SyntaxTree {
    pub fn get(&self, id: DeclId) -> &Declaration {
        &self.declarations[id.0]
    }

    /// All declarations in source order
    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn children(&self, id: DeclId) -> impl Iterator<Item = &Declaration> {
        self.get(id).children.iter().map(|c| self.get(*c))
    }

    pub fn parent(&self, id: DeclId) -> Option<&Declaration> {
        self.get(id).parent.map(|p| self.get(p))
    }

    pub fn of_kind(&self, kind: DeclarationKind) -> impl Iterator<Item = &Declaration> {
        self.iter().filter(move |d| d.kind == kind)
    }

    /// True if `name` is bound to a mock where code owned by `at` can see
    /// it: a file-wide binding, or a local of `at` or one of its ancestors
    pub fn is_mock(&self, name: &str, at: Option<DeclId>) -> bool {
        self.bindings.iter().any(|b| {
            b.name == name
                && match b.scope {
                    None => true,
                    Some(scope) => self.encloses(scope, at),
                }
        })
    }

    fn encloses(&self, scope: DeclId, mut at: Option<DeclId>) -> bool {
        while let Some(id) = at {
            if id == scope {
                return true;
            }
            at = self.get(id).parent;
        }
        false
    }
}
