use nom::{
    character::complete::multispace1,
    combinator::map,
    error::{context, ErrorKind, VerboseError, VerboseErrorKind},
};

use super::token::{ParserResult, Token};

fn failure<'a, T>(input: &'a str, message: &'static str) -> ParserResult<'a, T> {
    Err(nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(message))],
    }))
}

fn starts_tag(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('<')
        && matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '/' || c == '!')
}

/// Scans a `{...}` group, honouring nested braces and quoted strings, and
/// returns the contents without the outer braces.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_braced(input: &str) -> ParserResult<&str> {
    if !input.starts_with('{') {
        return Err(nom::Err::Error(VerboseError {
            errors: vec![(input, VerboseErrorKind::Nom(ErrorKind::Char))],
        }));
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[index + 1..], &input[1..index]));
                }
            }
            _ => {}
        }
    }
    failure(input, "unterminated expression")
}

/// `{expr}` child.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_expression(input: &str) -> ParserResult<Token> {
    context(
        "expression",
        map(parse_braced, |inner: &str| {
            Token::Expression(inner.trim().to_string())
        }),
    )(input)
}

/// Literal text up to the next tag or expression. A `<` that cannot start a
/// tag is kept as text.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_text(input: &str) -> ParserResult<Token> {
    let end = input
        .char_indices()
        .find(|(index, c)| *c == '{' || starts_tag(&input[*index..]))
        .map(|(index, _)| index)
        .unwrap_or(input.len());
    if end == 0 {
        return Err(nom::Err::Error(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context("text"))],
        }));
    }
    Ok((&input[end..], Token::Text(input[..end].to_string())))
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_leading_whitespace(input: &str) -> ParserResult<Token> {
    map(multispace1, |ws: &str| Token::Text(ws.to_string()))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_braced_nested() {
        let (rest, inner) = parse_braced("{{a: {b: 1}}} tail").unwrap();
        assert_eq!(inner, "{a: {b: 1}}");
        assert_eq!(rest, " tail");
    }

    #[test]
    fn test_braced_ignores_quoted_braces() {
        let (rest, inner) = parse_braced(r#"{"}" + '{'}x"#).unwrap();
        assert_eq!(inner, r#""}" + '{'"#);
        assert_eq!(rest, "x");
    }

    #[test]
    fn test_unterminated_braced_is_failure() {
        assert!(matches!(
            parse_braced("{inputs.name"),
            Err(nom::Err::Failure(_))
        ));
    }

    #[test]
    fn test_text_stops_at_tag_and_expression() {
        let (rest, token) = parse_text("a < b and {x}").unwrap();
        assert_eq!(token, Token::Text("a < b and ".to_string()));
        assert_eq!(rest, "{x}");

        let (rest, token) = parse_text("hello</Task>").unwrap();
        assert_eq!(token, Token::Text("hello".to_string()));
        assert_eq!(rest, "</Task>");
    }

    #[test]
    fn test_text_requires_content() {
        assert!(parse_text("<Task>").is_err());
    }
}
