use nom::{branch::alt, error::VerboseError, IResult};
use thiserror::Error;

use super::{
    comment::{parse_comment, parse_leading_comment},
    tag::{parse_close_tag, parse_open_tag},
    text::{parse_expression, parse_leading_whitespace, parse_text},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    OpenTag {
        name: String,
        attributes: Vec<RawAttribute>,
        self_closing: bool,
    },
    CloseTag(String),
    Text(String),
    /// Contents of a `{...}` child, braces stripped.
    Expression(String),
    Comment {
        content: String,
        comment_type: CommentType,
    },
}

impl Token {
    pub fn is_comment(&self) -> bool {
        matches!(self, Token::Comment { .. })
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, Token::OpenTag { .. } | Token::CloseTag(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentType {
    Line,       // //
    Block,      // /* */
    Markup,     // <!-- -->
    Expression, // {/* */}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawAttribute {
    pub name: String,
    pub value: RawAttributeValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawAttributeValue {
    /// `name="text"` or `name='text'`
    Quoted(String),
    /// `name={expr}`, braces stripped
    Expression(String),
    /// bare `name`, shorthand for `true`
    Flag,
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    current_position: usize,
    current_line: usize,
    current_column: usize,
    seen_tag: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            current_position: 0,
            current_line: 1,   // 1-based
            current_column: 1, // 1-based
            seen_tag: false,
        }
    }

    #[tracing::instrument(level = "debug", skip(self, input))]
    pub fn tokenize(&mut self, input: &str) -> TokenizerResult<Vec<TokenSpan>> {
        let mut tokens = Vec::new();
        let mut remaining = input;

        while !remaining.is_empty() {
            let start_position = self.current_position;
            let start_line = self.current_line;
            let start_column = self.current_column;

            // `//` and `/* */` comments are only recognised ahead of the root tag
            let result = if self.seen_tag {
                Self::parse_markup(remaining)
            } else {
                alt((
                    parse_leading_whitespace,
                    parse_leading_comment,
                    Self::parse_markup,
                ))(remaining)
            };

            match result {
                Ok((new_remaining, token)) => {
                    let consumed = &remaining[..(remaining.len() - new_remaining.len())];
                    self.update_position(consumed);
                    self.seen_tag |= token.is_tag();

                    tokens.push(TokenSpan {
                        token,
                        start: start_position,
                        end: self.current_position,
                        line: start_line,
                        column: start_column,
                    });

                    remaining = new_remaining;
                }
                Err(e) => {
                    let found = remaining.chars().take(20).collect::<String>();
                    let span = Span {
                        start: self.current_position,
                        end: self.current_position + 1,
                        line: self.current_line,
                        column: self.current_column,
                    };
                    let error = match e {
                        nom::Err::Incomplete(e) => TokenizerError::ParseError {
                            message: format!("Incomplete input, {:?}", e),
                            found,
                            span,
                        },
                        nom::Err::Error(e) | nom::Err::Failure(e) => TokenizerError::ParseError {
                            message: nom::error::convert_error(remaining, e).to_string(),
                            found,
                            span,
                        },
                    };
                    tracing::error!("{}", error);
                    return Err(error);
                }
            }
        }

        Ok(tokens)
    }

    fn parse_markup(input: &str) -> ParserResult<Token> {
        alt((
            parse_comment,
            parse_close_tag,
            parse_open_tag,
            parse_expression,
            parse_text,
        ))(input)
    }

    fn update_position(&mut self, text: &str) {
        for c in text.chars() {
            self.current_position += c.len_utf8();
            if c == '\n' {
                self.current_line += 1;
                self.current_column = 1;
            } else {
                self.current_column += 1;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenSpan {
    pub token: Token,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line: {}, column: {}, start: {}, end: {}",
            self.line, self.column, self.start, self.end
        )
    }
}

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

pub type TokenizerResult<T> = Result<T, TokenizerError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenizerError {
    #[error("Parse error: {message} at position {span}")]
    ParseError {
        message: String,
        found: String,
        span: Span,
    },
}

impl TokenizerError {
    pub fn span(&self) -> &Span {
        match self {
            TokenizerError::ParseError { span, .. } => span,
        }
    }
}
