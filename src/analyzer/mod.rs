//! # Analyzer
//!
//! Turns the preprocessed token stream into an [`Element`](crate::ast::Element)
//! tree.
//!
//! ## Core Components
//!
//! * [`core`]: [`ParseError`] and [`Location`]
//! * [`tree`]: stack-based [`TreeBuilder`] and text normalisation
//! * [`expression`]: `{...}` interpretation (literals, paths, formulas, nested markup)
//! * [`tags`]: the namespaced tag table (`Ask.*`, `Example.*`)
//!
//! ## Position in the Pipeline
//!
//! ```text
//! Markup → Tokenizer → Preprocessor → Analyzer → Element
//! ```
//!
//! The analyzer never evaluates anything. Field references and formulas are
//! stored as [`Expression`](crate::ast::Expression) values and resolved by the
//! renderer once input values are known.

pub mod core;
pub mod expression;
pub mod tags;
pub mod tree;

pub use self::core::{Location, ParseError, ParseResult};
pub use self::tree::TreeBuilder;
