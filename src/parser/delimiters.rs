//! Bracket matching over `()`, `[]` and `{}`

use crate::lexer::{Token, TokenKind};

use super::tree::ParseError;

/// Matching result, indexed like the token slice it was built from
#[derive(Debug, Clone, Default)]
pub struct Delimiters {
    /// For openers: index of the closer, `None` if open at end of file.
    /// For closers: index of the opener, `None` for a stray closer.
    pub partner: Vec<Option<usize>>,
    /// Innermost opener enclosing each token
    pub enclosing: Vec<Option<usize>>,
    pub errors: Vec<ParseError>,
}

fn closer_for(open: &str) -> Option<&'static str> {
    match open {
        "(" => Some(")"),
        "[" => Some("]"),
        "{" => Some("}"),
        _ => None,
    }
}

fn is_closer(text: &str) -> bool {
    matches!(text, ")" | "]" | "}")
}

pub fn match_delimiters(tokens: &[&Token]) -> Delimiters {
    let n = tokens.len();
    let mut partner = vec![None; n];
    let mut enclosing = vec![None; n];
    let mut errors = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Punct {
            enclosing[i] = stack.last().copied();
            continue;
        }
        let text = tok.text.as_str();
        if closer_for(text).is_some() {
            enclosing[i] = stack.last().copied();
            stack.push(i);
        } else if is_closer(text) {
            let found = stack
                .iter()
                .rposition(|open| closer_for(&tokens[*open].text) == Some(text));
            match found {
                Some(pos) => {
                    if pos + 1 < stack.len() {
                        let innermost = stack[stack.len() - 1];
                        errors.push(ParseError {
                            message: format!(
                                "'{}' closed by '{}' on line {}",
                                tokens[innermost].text,
                                text,
                                tok.start().line
                            ),
                            position: tokens[innermost].start(),
                        });
                    }
                    let opener = stack[pos];
                    // Intervening openers end where their enclosing group ends
                    for open in stack.drain(pos..) {
                        partner[open] = Some(i);
                    }
                    partner[i] = Some(opener);
                    enclosing[i] = stack.last().copied();
                }
                None => {
                    errors.push(ParseError {
                        message: format!("unmatched '{}'", text),
                        position: tok.start(),
                    });
                    enclosing[i] = stack.last().copied();
                }
            }
        } else {
            enclosing[i] = stack.last().copied();
        }
    }

    // Everything still open is one truncated region
    if let Some(innermost) = stack.last() {
        let tok = tokens[*innermost];
        errors.push(ParseError {
            message: format!(
                "'{}' opened on line {} is never closed; the rest of the file may be incomplete",
                tok.text,
                tok.start().line
            ),
            position: tok.start(),
        });
    }

    Delimiters {
        partner,
        enclosing,
        errors,
    }
}
