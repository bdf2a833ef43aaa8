//! Too many arguments - methods and functions with long parameter lists

use super::{RuleContext, SmellRule};
use crate::config::{ParameterBoundary, DEFAULT_MAX_PARAMETERS};
use crate::parser::Declaration;
use crate::{Finding, Location, RuleId};

/// Rule for detecting declarations whose parameter count violates the
/// configured maximum. Applies to test and non-test methods alike, to
/// bodiless signatures and to function literals.
#[derive(Debug, Clone)]
pub struct TooManyArgumentsRule {
    max_parameters: usize,
    boundary: ParameterBoundary,
    /// Check literals passed directly as call arguments
    inline_function_arguments: bool,
}

impl Default for TooManyArgumentsRule {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PARAMETERS)
    }
}

impl TooManyArgumentsRule {
    pub fn new(max_parameters: usize) -> Self {
        Self {
            max_parameters,
            boundary: ParameterBoundary::default(),
            inline_function_arguments: true,
        }
    }

    pub fn with_boundary(mut self, boundary: ParameterBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_inline_function_arguments(mut self, enabled: bool) -> Self {
        self.inline_function_arguments = enabled;
        self
    }

    fn message(&self, decl: &Declaration, count: usize) -> String {
        let limit = match self.boundary {
            ParameterBoundary::Exceeds => format!("max {}", self.max_parameters),
            ParameterBoundary::Reaches => format!("must stay below {}", self.max_parameters),
        };
        if decl.name.is_empty() {
            format!("Function literal declares {count} parameters ({limit})")
        } else if decl.is_function_literal {
            format!(
                "Function literal '{}' declares {count} parameters ({limit})",
                decl.name
            )
        } else {
            format!("'{}' declares {count} parameters ({limit})", decl.name)
        }
    }
}

impl SmellRule for TooManyArgumentsRule {
    fn id(&self) -> RuleId {
        RuleId::TooManyArguments
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();

        for decl in ctx.tree.iter().filter(|d| d.kind.is_callable()) {
            // Declarations recovered without a parameter list are skipped
            let Some(count) = decl.param_count() else {
                continue;
            };
            if decl.inline_argument && !self.inline_function_arguments {
                continue;
            }
            if !self.boundary.violates(count, self.max_parameters) {
                continue;
            }

            let pos = decl.name_position;
            let width = decl.name.chars().count().max(1);
            findings.push(
                Finding::new(
                    RuleId::TooManyArguments,
                    ctx.path,
                    Location::new(pos.line, pos.column).with_end(pos.line, pos.column + width),
                    self.message(decl, count),
                )
                .with_suggestion(
                    "Group related parameters into a parameter object or builder",
                ),
            );
        }

        findings
    }
}
