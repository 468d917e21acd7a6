//! # Tokenizer Component
//!
//! Lexical analysis of prompt markup. Raw text becomes a stream of
//! [`TokenSpan`](token::TokenSpan) values carrying line/column information for
//! error reporting.
//!
//! ## Token Kinds
//!
//! * Open tags with their raw attributes (`<Ask.Text name="who" required>`)
//! * Close tags (`</Task>`)
//! * Literal text
//! * Child expressions (`{inputs.who}`)
//! * Comments: `<!-- -->` and `{/* */}` anywhere, `//` and `/* */` only before
//!   the root element
//!
//! ## Component Structure
//!
//! * [`token`]: token types and the [`Tokenizer`](token::Tokenizer) driver
//! * [`tag`]: open/close tags and attributes
//! * [`text`]: text runs and balanced `{...}` groups
//! * [`comment`]: comment forms
//!
//! ## Usage Example
//!
//! ```rust
//! use promptmark::tokenizer::token::{Token, Tokenizer};
//!
//! let mut tokenizer = Tokenizer::new();
//! let tokens = tokenizer.tokenize("<Task>Hello {inputs.who}</Task>").unwrap();
//! assert_eq!(tokens[2].token, Token::Expression("inputs.who".to_string()));
//! ```

pub mod comment;
pub mod tag;
pub mod text;
pub mod token;
