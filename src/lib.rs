//! # promptmark: declarative prompt markup
//!
//! promptmark turns a tag-based markup document into prompt text for a
//! specific LLM provider. A document declares the inputs it needs next to the
//! text that uses them, so one file is both the form and the prompt.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Source → Tokenizer → Preprocessor → Analyzer → Element tree
//!                                                   │
//!                              ┌────────────────────┴───────────────┐
//!                              ▼                                    ▼
//!                     Discovery (inputs)                  Render (text + actions)
//!                              │                                    ▲
//!                              └──► InputIterator ── InputValues ───┘
//! ```
//!
//! ### Stage 1: Tokenization
//!
//! The [`tokenizer`] module splits markup into tags, text runs, comments and
//! `{...}` expressions using nom combinators.
//!
//! ### Stage 2: Preprocessing
//!
//! The [`preprocessor`] drops comments and merges adjacent text tokens.
//!
//! ### Stage 3: Analysis
//!
//! The [`analyzer`] builds the [`Element`] tree, checks tag nesting, decodes
//! entities, dedents text, and parses attribute expressions and formulas.
//! [`parser::parse`] runs stages 1 to 3.
//!
//! ### Stage 4: Discovery
//!
//! [`renderer::discover`] walks the tree with every input unknown and
//! returns the ordered, deduplicated [`InputRequirement`] list.
//!
//! ### Stage 5: Rendering
//!
//! [`renderer::render`] evaluates attributes, guards and loops against the
//! collected [`InputValues`], lets each [`components::Component`] produce its
//! fragment, and wraps it in the delimiter style of the target provider
//! ([`provider`]). `PostExecution` regions become [`PostAction`]s instead of
//! text.
//!
//! ## Collecting Inputs
//!
//! The [`input`] module validates values against requirements and drives
//! collection through an [`InputIterator`], either interactively through an
//! [`input::InputPrompter`] or in one batch from pre-supplied values.
//!
//! ## Configuration
//!
//! [`config::PromptConfig`] is read from JSON and yields render and iterator
//! options.

pub mod analyzer;
pub mod ast;
pub mod components;
pub mod config;
pub mod error;
pub mod eval;
pub mod input;
pub mod parser;
pub mod preprocessor;
pub mod presets;
pub mod provider;
pub mod renderer;
pub mod tokenizer;
pub mod value;

// Re-exports
pub use ast::*;
pub use error::*;
pub use input::{
    create_input_iterator, InputIterator, InputRequirement, InputType, IteratorOptions,
    MissingDefaultPolicy,
};
pub use parser::{parse, parse_file};
pub use provider::ProviderId;
pub use renderer::{
    discover, render, render_for_providers, Diagnostic, PostAction, RenderOptions, RenderResult,
    Renderer,
};
pub use value::{InputValues, Value};
