use thiserror::Error;

use crate::analyzer::ParseError;
use crate::config::ConfigError;
use crate::eval::formula::EvaluationError;
use crate::input::IteratorError;
use crate::renderer::{DiscoveryError, RenderError};
use crate::tokenizer::token::TokenizerError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Input error: {0}")]
    Iterator(#[from] IteratorError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
