//! Input requirements, their validation, and the iterator that collects them.

pub mod iterator;
pub mod prompter;
pub mod requirement;
pub mod validation;

pub use iterator::{
    create_input_iterator, Environment, InputIterator, IteratorError, IteratorOptions,
    IteratorResult, IteratorState, MissingDefaultPolicy, SubmitOutcome, MAX_RETRIES,
};
pub use prompter::{InputPrompter, PromptAnswer, PrompterError};
pub use requirement::{
    Choice, Constraints, DefaultValue, InputOrigin, InputRequirement, InputType,
};
pub use validation::{validate, ValidationError, ValidationResult};
