//! Language Profile Registry
//!
//! Per-language descriptors consumed by the lexer, the parser and the rules.

mod builtin;
mod profile;
mod registry;

pub use profile::{
    normalize_attribute, AttributeStyle, FrameworkHints, LanguageId, LanguageProfile,
    LexicalProfile, MockMatcher, ParamStyle, ScopeKind, SyntaxProfile, TestMatchers,
};
pub use registry::ProfileRegistry;
