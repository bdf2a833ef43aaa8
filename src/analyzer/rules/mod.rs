//! Smell rules
//!
//! Each rule is a pure function of one file's syntax tree. Rules never see
//! each other's output and hold no mutable state, so a file's rules can run
//! in any order.

pub mod setup_within_test;
pub mod too_many_arguments;

pub use setup_within_test::SetupWithinTestRule;
pub use too_many_arguments::TooManyArgumentsRule;

use std::path::Path;

use crate::language::LanguageProfile;
use crate::parser::SyntaxTree;
use crate::{Finding, RuleId};

/// What a rule sees of one file
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub path: &'a Path,
    pub profile: &'a LanguageProfile,
    pub tree: &'a SyntaxTree,
}

/// Trait for smell rules
pub trait SmellRule: Send + Sync {
    fn id(&self) -> RuleId;

    /// Findings in declaration source order, at the rule's default severity
    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::language::{LanguageId, ProfileRegistry};
    use crate::parser::parse_source;

    /// Parse `source` as `lang` and run one rule over it
    pub fn run(rule: &dyn SmellRule, lang: LanguageId, source: &str) -> Vec<Finding> {
        let registry = ProfileRegistry::new();
        let profile = registry.get(lang).unwrap();
        let (_, tree) = parse_source(source, profile);
        let ctx = RuleContext {
            path: Path::new("fixture"),
            profile,
            tree: &tree,
        };
        rule.check(&ctx)
    }
}
