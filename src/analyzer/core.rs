//! # Core Analyzer Definitions
//!
//! Error and location types shared by the tree builder and the expression
//! parser.

use std::fmt;

use thiserror::Error;

use crate::ast::Position;
use crate::tokenizer::token::{TokenSpan, TokenizerError};

/// Source location attached to every parse error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub source_name: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new<S: Into<String>>(source_name: S, line: usize, column: usize) -> Self {
        Self {
            source_name: source_name.into(),
            line,
            column,
        }
    }

    pub fn of_span(source_name: &str, span: &TokenSpan) -> Self {
        Self::new(source_name, span.line, span.column)
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source_name, self.line, self.column)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Syntax error at {location}: {message}")]
    Syntax { message: String, location: Location },
    #[error("Mismatched closing tag at {location}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        expected: String,
        found: String,
        location: Location,
    },
    #[error("Unclosed tag <{tag}> opened at {location}")]
    UnclosedTag { tag: String, location: Location },
    #[error("Unexpected closing tag </{tag}> at {location}")]
    UnexpectedCloseTag { tag: String, location: Location },
    #[error("Multiple root elements: <{tag}> at {location}")]
    MultipleRoots { tag: String, location: Location },
    #[error("No root element in {source_name}")]
    EmptyDocument { source_name: String },
    #[error("Text outside the root element at {location}")]
    TextOutsideRoot { location: Location },
    #[error("Unknown namespace `{namespace}` in <{tag}> at {location}")]
    UnknownNamespace {
        namespace: String,
        tag: String,
        location: Location,
    },
    #[error("`{member}` is not a member of `{namespace}` at {location}")]
    UnknownNamespaceMember {
        namespace: String,
        member: String,
        location: Location,
    },
    #[error("Duplicate attribute `{name}` at {location}")]
    DuplicateAttribute { name: String, location: Location },
    #[error("Invalid expression `{expression}` at {location}: {message}")]
    InvalidExpression {
        expression: String,
        message: String,
        location: Location,
    },
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
}

impl ParseError {
    pub fn from_tokenizer(error: TokenizerError, source_name: &str) -> Self {
        let span = error.span().clone();
        let message = match error {
            TokenizerError::ParseError { message, found, .. } => {
                format!("{} (found `{}`)", message.trim_end(), found)
            }
        };
        ParseError::Syntax {
            message,
            location: Location::new(source_name, span.line, span.column),
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            ParseError::Syntax { location, .. }
            | ParseError::MismatchedTag { location, .. }
            | ParseError::UnclosedTag { location, .. }
            | ParseError::UnexpectedCloseTag { location, .. }
            | ParseError::MultipleRoots { location, .. }
            | ParseError::TextOutsideRoot { location }
            | ParseError::UnknownNamespace { location, .. }
            | ParseError::UnknownNamespaceMember { location, .. }
            | ParseError::DuplicateAttribute { location, .. }
            | ParseError::InvalidExpression { location, .. } => Some(location),
            ParseError::EmptyDocument { .. } | ParseError::Io { .. } => None,
        }
    }
}
