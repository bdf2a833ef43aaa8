//! `imcg-*` suppression directives read from comment tokens
//!
//! Only comments are inspected, so a directive spelled inside a string
//! literal has no effect.

use std::collections::{HashMap, HashSet};

use crate::lexer::{Token, TokenKind};
use crate::RuleId;

const NEXT_LINE: &str = "imcg-ignore-next-line";
const SAME_LINE: &str = "imcg-ignore";
const DISABLE: &str = "imcg-disable";
const ENABLE: &str = "imcg-enable";

/// Which rules a directive suppresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineIgnoreSet {
    All,
    Rules(HashSet<RuleId>),
}

impl LineIgnoreSet {
    fn from_rules(rules: HashSet<RuleId>) -> Self {
        if rules.is_empty() {
            LineIgnoreSet::All
        } else {
            LineIgnoreSet::Rules(rules)
        }
    }

    pub fn covers(&self, rule: RuleId) -> bool {
        match self {
            LineIgnoreSet::All => true,
            LineIgnoreSet::Rules(rules) => rules.contains(&rule),
        }
    }

    fn merge(&mut self, other: LineIgnoreSet) {
        match (self, other) {
            (LineIgnoreSet::All, _) => {}
            (this, LineIgnoreSet::All) => *this = LineIgnoreSet::All,
            (LineIgnoreSet::Rules(a), LineIgnoreSet::Rules(b)) => a.extend(b),
        }
    }
}

/// Suppressions of one file
#[derive(Debug, Clone, Default)]
pub struct IgnoreDirectives {
    /// 1-indexed line to suppressed rules
    line_rules: HashMap<usize, LineIgnoreSet>,
    /// Inclusive line ranges
    disabled_ranges: Vec<(usize, usize, LineIgnoreSet)>,
}

impl IgnoreDirectives {
    pub fn is_empty(&self) -> bool {
        self.line_rules.is_empty() && self.disabled_ranges.is_empty()
    }

    pub fn is_ignored(&self, line: usize, rule: RuleId) -> bool {
        if self.line_rules.get(&line).is_some_and(|set| set.covers(rule)) {
            return true;
        }
        self.disabled_ranges
            .iter()
            .any(|(start, end, set)| (*start..=*end).contains(&line) && set.covers(rule))
    }

    /// Collect directives from the comment tokens of a file
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let mut directives = IgnoreDirectives::default();
        let mut open: Option<(usize, LineIgnoreSet)> = None;
        let mut last_line = 1;

        for tok in tokens {
            last_line = last_line.max(tok.span.end.line);
            if tok.kind != TokenKind::Comment {
                continue;
            }
            let body = comment_body(&tok.text);
            let Some((keyword, rest)) = split_directive(body) else {
                continue;
            };
            let rules = LineIgnoreSet::from_rules(parse_rule_list(rest));
            match keyword {
                NEXT_LINE => directives.add_line(tok.span.end.line + 1, rules),
                SAME_LINE => directives.add_line(tok.span.start.line, rules),
                DISABLE => {
                    if open.is_none() {
                        open = Some((tok.span.start.line, rules));
                    }
                }
                ENABLE => {
                    if let Some((start, set)) = open.take() {
                        directives
                            .disabled_ranges
                            .push((start, tok.span.end.line, set));
                    }
                }
                _ => {}
            }
        }

        // Without a matching enable the range runs to the end of the file
        if let Some((start, set)) = open {
            directives.disabled_ranges.push((start, last_line, set));
        }
        directives
    }

    fn add_line(&mut self, line: usize, rules: LineIgnoreSet) {
        match self.line_rules.get_mut(&line) {
            Some(existing) => existing.merge(rules),
            None => {
                self.line_rules.insert(line, rules);
            }
        }
    }
}

/// Comment text without its delimiters
fn comment_body(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("///")
        .or_else(|| text.strip_prefix("//"))
        .or_else(|| text.strip_prefix("/*"))
        .or_else(|| text.strip_prefix('#'))
        .unwrap_or(text);
    let text = text.strip_suffix("*/").unwrap_or(text);
    text.trim().trim_start_matches('*').trim()
}

/// Directive keyword and the text after it
fn split_directive(body: &str) -> Option<(&str, &str)> {
    let keyword = body.split_whitespace().next()?;
    let keyword = keyword.trim_end_matches(':');
    match keyword {
        NEXT_LINE | SAME_LINE | DISABLE | ENABLE => {
            let rest = body[body.find(keyword)? + keyword.len()..].trim_start_matches(':');
            Some((keyword, rest))
        }
        _ => None,
    }
}

/// Rule ids separated by whitespace or commas; text after `--` is a reason
fn parse_rule_list(text: &str) -> HashSet<RuleId> {
    let text = text.split("--").next().unwrap_or("");
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter_map(RuleId::from_id)
        .collect()
}
