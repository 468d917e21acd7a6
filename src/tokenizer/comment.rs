use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{multispace0, not_line_ending},
    combinator::{cut, map},
    error::context,
    sequence::{delimited, preceded, terminated},
};

use super::token::{CommentType, ParserResult, Token};

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_line_comment(input: &str) -> ParserResult<Token> {
    context(
        "line comment",
        map(
            preceded(tag("//"), not_line_ending),
            |parse_comment: &str| Token::Comment {
                content: parse_comment.trim().to_string(),
                comment_type: CommentType::Line,
            },
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_block_comment(input: &str) -> ParserResult<Token> {
    context(
        "block comment",
        map(
            preceded(tag("/*"), cut(terminated(take_until("*/"), tag("*/")))),
            |content: &str| Token::Comment {
                content: content.to_string(),
                comment_type: CommentType::Block,
            },
        ),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_markup_comment(input: &str) -> ParserResult<Token> {
    context(
        "markup comment",
        map(
            preceded(tag("<!--"), cut(terminated(take_until("-->"), tag("-->")))),
            |content: &str| Token::Comment {
                content: content.trim().to_string(),
                comment_type: CommentType::Markup,
            },
        ),
    )(input)
}

/// `{/* ... */}` inside element content.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_expression_comment(input: &str) -> ParserResult<Token> {
    context(
        "expression comment",
        map(
            delimited(
                terminated(tag("{"), multispace0),
                delimited(tag("/*"), take_until("*/"), tag("*/")),
                preceded(multispace0, tag("}")),
            ),
            |content: &str| Token::Comment {
                content: content.trim().to_string(),
                comment_type: CommentType::Expression,
            },
        ),
    )(input)
}

/// Comments accepted anywhere in the document.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_comment(input: &str) -> ParserResult<Token> {
    context(
        "comment",
        alt((parse_markup_comment, parse_expression_comment)),
    )(input)
}

/// Comments accepted only ahead of the root element.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_leading_comment(input: &str) -> ParserResult<Token> {
    context(
        "leading comment",
        alt((parse_block_comment, parse_line_comment, parse_comment)),
    )(input)
}
