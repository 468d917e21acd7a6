//! The seam between the input iterator and whoever answers its questions.

use async_trait::async_trait;
use thiserror::Error;

use super::requirement::InputRequirement;
use super::validation::ValidationError;
use crate::value::Value;

/// Answer to one prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptAnswer {
    Value(Value),
    /// Step back to the previous input.
    Back,
    /// Abandon the whole collection.
    Cancel,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrompterError {
    #[error("Prompt I/O failed: {0}")]
    Io(String),
    #[error("Prompting is not available: {0}")]
    Unavailable(String),
}

/// Asks a person (or anything standing in for one) for a single input.
///
/// `suggested` is the value a blank answer should fall back to, and `errors`
/// holds the validation failures of the previous attempt at this input.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InputPrompter: Send + Sync {
    async fn ask(
        &self,
        requirement: &InputRequirement,
        suggested: Option<Value>,
        errors: &[ValidationError],
    ) -> Result<PromptAnswer, PrompterError>;
}
