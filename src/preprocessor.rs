//! # Preprocessor
//!
//! Sits between the tokenizer and the analyzer:
//!
//! ```text
//! Markup → Tokenizer → Preprocessor → Analyzer → Element
//! ```
//!
//! * **Comment Removal**: every comment token is dropped
//! * **Text Merging**: text split by a removed comment becomes one run again,
//!   so `a<!-- x -->b` reads as `ab`
//!
//! Whitespace handling is left to the analyzer, which knows whether a run of
//! text sits at the start or end of an element.

use crate::tokenizer::token::{Token, TokenSpan};

/// A trait for preprocessing different types of input
pub trait Preprocessor<T, U = T> {
    fn process(&self, input: T) -> U;
}

#[derive(Debug, Default)]
pub struct TokenPreprocessor {}

impl TokenPreprocessor {
    pub fn new() -> Self {
        Self {}
    }
}

impl Preprocessor<Vec<TokenSpan>> for TokenPreprocessor {
    #[tracing::instrument(level = "debug", skip(self, input))]
    fn process(&self, input: Vec<TokenSpan>) -> Vec<TokenSpan> {
        let mut output: Vec<TokenSpan> = Vec::with_capacity(input.len());
        for span in input.into_iter().filter(|span| !span.token.is_comment()) {
            if let (Some(last), Token::Text(text)) = (output.last_mut(), &span.token) {
                if let Token::Text(previous) = &mut last.token {
                    previous.push_str(text);
                    last.end = span.end;
                    continue;
                }
            }
            output.push(span);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::token::Tokenizer;

    #[test]
    fn test_comments_removed_and_text_merged() {
        let spans = Tokenizer::new()
            .tokenize("// header\n<Task>a<!-- gone -->b{/* gone */}c</Task>")
            .unwrap();
        let tokens: Vec<Token> = TokenPreprocessor::new()
            .process(spans)
            .into_iter()
            .map(|span| span.token)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Text("\n".to_string()),
                Token::OpenTag {
                    name: "Task".to_string(),
                    attributes: vec![],
                    self_closing: false,
                },
                Token::Text("abc".to_string()),
                Token::CloseTag("Task".to_string()),
            ]
        );
    }
}
