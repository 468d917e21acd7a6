//! # Evaluation
//!
//! * [`formula`]: the small formula language used by `If` guards and
//!   computed attributes
//! * [`scope`]: how field references resolve in discovery and render passes

pub mod formula;
pub mod scope;

pub use formula::{evaluate, EvaluationError, EvaluationResult, FieldLookup, Formula};
pub use scope::{Scope, ScopeError, ScopeMode, ScopeResult};
