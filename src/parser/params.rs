//! Parameter list extraction
//!
//! Only names and arity matter: types, modifiers, annotations and default
//! values are dropped.

use crate::language::{ParamStyle, SyntaxProfile};
use crate::lexer::{Token, TokenKind};

use super::tree::Parameter;

/// Split the tokens between a parameter list's parentheses into parameters
pub fn parse_parameters(tokens: &[&Token], syntax: &SyntaxProfile) -> Vec<Parameter> {
    let mut params = Vec::new();
    for segment in split_top_level(tokens) {
        if segment.is_empty() {
            continue;
        }
        let first = segment[0];
        if syntax.grouped_named_params && (first.is_punct("{") || first.is_punct("[")) {
            let inner = inner_group(segment);
            params.extend(parse_parameters(inner, syntax));
            continue;
        }
        let segment = strip_annotations(
            strip_default(segment),
            syntax.param_style == ParamStyle::TypeThenName,
        );
        if segment.is_empty() {
            continue;
        }
        params.push(Parameter {
            name: parameter_name(segment, syntax.param_style),
            position: segment[0].start(),
        });
    }
    params
}

/// Group nesting change for a token: `(`, `[`, `{`, `<` open; their closers close
fn depth_delta(tok: &Token) -> isize {
    if tok.kind != TokenKind::Punct {
        return 0;
    }
    match tok.text.as_str() {
        "(" | "[" | "{" | "<" => 1,
        ")" | "]" | "}" | ">" => -1,
        _ => 0,
    }
}

fn split_top_level<'t, 'a>(tokens: &'t [&'a Token]) -> Vec<&'t [&'a Token]> {
    let mut segments = Vec::new();
    let mut depth = 0isize;
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        if depth == 0 && tok.is_punct(",") {
            segments.push(&tokens[start..i]);
            start = i + 1;
            continue;
        }
        depth = (depth + depth_delta(tok)).max(0);
    }
    segments.push(&tokens[start..]);
    segments
}

/// Tokens inside a segment's leading group, without the delimiters
fn inner_group<'t, 'a>(segment: &'t [&'a Token]) -> &'t [&'a Token] {
    let mut depth = 0isize;
    for (i, tok) in segment.iter().enumerate() {
        depth += depth_delta(tok);
        if depth == 0 {
            return &segment[1..i];
        }
    }
    &segment[1..]
}

/// Cut `= default` at nesting depth zero
fn strip_default<'t, 'a>(segment: &'t [&'a Token]) -> &'t [&'a Token] {
    let mut depth = 0isize;
    for (i, tok) in segment.iter().enumerate() {
        if depth == 0 && tok.is_punct("=") {
            return &segment[..i];
        }
        depth = (depth + depth_delta(tok)).max(0);
    }
    segment
}

/// Drop leading `@Annotation(...)` prefixes, and `[Attribute]` prefixes when
/// brackets cannot start a destructuring pattern
fn strip_annotations<'t, 'a>(
    mut segment: &'t [&'a Token],
    bracket_attributes: bool,
) -> &'t [&'a Token] {
    loop {
        match segment.first() {
            Some(t) if t.is_punct("@") => {
                let mut i = 1;
                while i < segment.len()
                    && (segment[i].is_identifier()
                        || segment[i].kind == TokenKind::Keyword
                        || segment[i].is_punct("."))
                {
                    i += 1;
                    // A name ends where two names would be adjacent
                    if i < segment.len()
                        && !segment[i].is_punct(".")
                        && !segment[i - 1].is_punct(".")
                    {
                        break;
                    }
                }
                if i < segment.len() && segment[i].is_punct("(") {
                    i += skip_group(&segment[i..]);
                }
                segment = &segment[i.min(segment.len())..];
            }
            Some(t) if bracket_attributes && t.is_punct("[") && segment.len() > 1 => {
                let len = skip_group(segment);
                segment = &segment[len.min(segment.len())..];
            }
            _ => return segment,
        }
    }
}

/// Length of the group starting at `segment[0]`, delimiters included
fn skip_group(segment: &[&Token]) -> usize {
    let mut depth = 0isize;
    for (i, tok) in segment.iter().enumerate() {
        depth += depth_delta(tok);
        if depth <= 0 {
            return i + 1;
        }
    }
    segment.len()
}

fn is_name(tok: &Token) -> bool {
    tok.is_identifier() || tok.is_keyword("this")
}

fn parameter_name(segment: &[&Token], style: ParamStyle) -> String {
    let head = match style {
        // `name?: Type`: everything before the first top-level colon
        ParamStyle::NameThenType => {
            let mut depth = 0isize;
            let mut end = segment.len();
            for (i, tok) in segment.iter().enumerate() {
                if depth == 0 && tok.is_punct(":") {
                    end = i;
                    break;
                }
                depth = (depth + depth_delta(tok)).max(0);
            }
            &segment[..end]
        }
        ParamStyle::TypeThenName => segment,
    };

    // Destructuring pattern keeps its text
    if let Some(first) = head.first() {
        if first.is_punct("{") || first.is_punct("[") {
            return head.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");
        }
    }

    let mut depth = 0isize;
    let mut name = None;
    for tok in head {
        if depth == 0 && is_name(tok) {
            name = Some(tok.text.as_str());
        }
        depth = (depth + depth_delta(tok)).max(0);
    }
    match name {
        Some(name) => name.trim_start_matches('@').to_string(),
        None => head
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{LanguageId, ProfileRegistry};
    use crate::lexer::tokenize;

    fn names(lang: LanguageId, list: &str) -> Vec<String> {
        let registry = ProfileRegistry::new();
        let profile = registry.get(lang).unwrap();
        let tokens = tokenize(list, &profile.lexical).tokens;
        let refs: Vec<&Token> = tokens.iter().collect();
        parse_parameters(&refs, &profile.syntax)
            .into_iter()
            .map(|p| p.name)
            .collect()
    }

    #[test]
    fn csharp_types_and_defaults() {
        assert_eq!(
            names(
                LanguageId::CSharp,
                "int a, Dictionary<string, int> map, params string[] rest, bool flag = false, [FromBody] Order order"
            ),
            vec!["a", "map", "rest", "flag", "order"]
        );
    }

    #[test]
    fn typescript_annotations() {
        assert_eq!(
            names(
                LanguageId::TypeScript,
                "a: number, b?: Map<string, number>, { x, y }: Point, ...rest: string[], c = 5, private readonly d: D"
            ),
            vec!["a", "b", "{ x , y }", "rest", "c", "d"]
        );
    }

    #[test]
    fn dart_named_and_optional_groups() {
        assert_eq!(
            names(
                LanguageId::Dart,
                "int a, {required String b, int c = 0}, [bool? d]"
            ),
            vec!["a", "b", "c", "d"]
        );
    }

    #[test]
    fn dart_function_typed_parameter() {
        assert_eq!(
            names(LanguageId::Dart, "void Function(int, int) callback, this.value"),
            vec!["callback", "value"]
        );
    }

    #[test]
    fn java_annotations_and_varargs() {
        assert_eq!(
            names(
                LanguageId::Java,
                "@Mock Repository repo, final String... names, @Qualifier(\"x\") Service s"
            ),
            vec!["repo", "names", "s"]
        );
    }

    #[test]
    fn untyped_lambda_parameters_and_trailing_comma() {
        assert_eq!(names(LanguageId::CSharp, "a, b,"), vec!["a", "b"]);
        assert!(names(LanguageId::CSharp, "").is_empty());
    }
}
