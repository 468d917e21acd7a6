//! # Expression Parsing
//!
//! Interprets the contents of a `{...}` group, either in attribute position
//! (`items={inputs.files}`) or as a child (`Hello {inputs.who}`).
//!
//! Resolution order:
//!
//! 1. Nested markup (`{<Ask.Text name="x" />}`)
//! 2. Literals: strings (`"`, `'`, `` ` ``), numbers, booleans, arrays, objects
//! 3. Dotted paths, which become [`Expression::FieldRef`]
//! 4. Anything else is handed to the formula parser
//!
//! Nothing is evaluated here; expressions are kept for the render pass.

use indexmap::IndexMap;
use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, not, opt, peek, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

use super::core::{Location, ParseError, ParseResult};
use crate::ast::{AttributeValue, Element, Expression, FieldPath, Node};
use crate::eval::formula::Formula;

type LiteralResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Parses markup embedded in an expression. Supplied by the tree builder so
/// nested elements go through the same pipeline as the document itself.
pub type FragmentParser<'a> = &'a dyn Fn(&str, &Location) -> ParseResult<Element>;

#[tracing::instrument(level = "debug", skip(fragment))]
pub fn parse_attribute_expression(
    source: &str,
    location: &Location,
    fragment: FragmentParser,
) -> ParseResult<AttributeValue> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err(invalid(source, "empty expression", location));
    }
    if trimmed.starts_with('<') {
        return fragment(trimmed, location).map(|element| AttributeValue::Element(Box::new(element)));
    }
    if let Ok((_, value)) = all_consuming(delimited(multispace0, parse_value, multispace0))(trimmed) {
        return Ok(value);
    }
    Formula::parse(trimmed)
        .map(|formula| AttributeValue::Expression(Expression::Formula(formula)))
        .map_err(|e| invalid(source, &e.to_string(), location))
}

/// Child expressions: string literals become text, nested markup becomes an
/// element, everything else stays an expression.
pub fn parse_child_expression(
    source: &str,
    location: &Location,
    fragment: FragmentParser,
) -> ParseResult<Node> {
    let value = parse_attribute_expression(source, location, fragment)?;
    Ok(match value {
        AttributeValue::Element(element) => Node::Element(*element),
        AttributeValue::Expression(expression) => Node::Expression(expression),
        AttributeValue::String(text) => Node::Text(text),
        other => match other.literal_value() {
            Some(value) => Node::Text(value.to_string()),
            None => {
                return Err(invalid(
                    source,
                    "collections containing expressions cannot be used as content",
                    location,
                ))
            }
        },
    })
}

fn invalid(source: &str, message: &str, location: &Location) -> ParseError {
    ParseError::InvalidExpression {
        expression: source.trim().to_string(),
        message: message.to_string(),
        location: location.clone(),
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> LiteralResult<'a, O>
where
    F: FnMut(&'a str) -> LiteralResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn parse_value(input: &str) -> LiteralResult<AttributeValue> {
    context(
        "value",
        alt((
            parse_string,
            parse_number,
            parse_bool,
            parse_array,
            parse_object,
            parse_path,
        )),
    )(input)
}

fn parse_string(input: &str) -> LiteralResult<AttributeValue> {
    map(quoted_string, AttributeValue::String)(input)
}

/// Quoted string with `\` escapes; the quote may be `"`, `'` or `` ` ``.
fn quoted_string(input: &str) -> LiteralResult<String> {
    let Some(quote) = input.chars().next().filter(|c| matches!(c, '"' | '\'' | '`')) else {
        return Err(nom::Err::Error(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context("string"))],
        }));
    };
    let mut out = String::new();
    let mut chars = input.char_indices().skip(1);
    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            c if c == quote => return Ok((&input[index + c.len_utf8()..], out)),
            c => out.push(c),
        }
    }
    Err(nom::Err::Error(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context("unterminated string"))],
    }))
}

fn parse_number(input: &str) -> LiteralResult<AttributeValue> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        |digits: &str| digits.parse::<f64>().map(AttributeValue::Number),
    )(input)
}

fn identifier(input: &str) -> LiteralResult<&str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))(input)
}

fn parse_bool(input: &str) -> LiteralResult<AttributeValue> {
    terminated(
        alt((
            value(AttributeValue::Bool(true), tag_no_case("true")),
            value(AttributeValue::Bool(false), tag_no_case("false")),
        )),
        not(peek(take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.'))),
    )(input)
}

fn parse_array(input: &str) -> LiteralResult<AttributeValue> {
    map(
        delimited(
            char('['),
            terminated(
                separated_list0(char(','), ws(parse_value)),
                opt(ws(char(','))),
            ),
            preceded(multispace0, char(']')),
        ),
        AttributeValue::Array,
    )(input)
}

fn object_key(input: &str) -> LiteralResult<String> {
    alt((quoted_string, map(identifier, str::to_string)))(input)
}

fn parse_object(input: &str) -> LiteralResult<AttributeValue> {
    map(
        delimited(
            char('{'),
            terminated(
                separated_list0(
                    char(','),
                    ws(separated_pair(object_key, ws(char(':')), parse_value)),
                ),
                opt(ws(char(','))),
            ),
            preceded(multispace0, char('}')),
        ),
        |entries: Vec<(String, AttributeValue)>| {
            AttributeValue::Object(entries.into_iter().collect::<IndexMap<_, _>>())
        },
    )(input)
}

fn parse_path(input: &str) -> LiteralResult<AttributeValue> {
    map(separated_list1(char('.'), identifier), |segments| {
        AttributeValue::Expression(Expression::FieldRef(FieldPath::new(segments)))
    })(input)
}
