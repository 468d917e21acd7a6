use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;

use crate::input::iterator::{Environment, IteratorOptions, MissingDefaultPolicy};
use crate::renderer::RenderOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open config file {path}: {message}")]
    Io { path: String, message: String },
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything a caller can configure about a render session.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PromptConfig {
    #[serde(default)]
    pub env: RenderEnv,

    #[serde(default)]
    pub inputs: InputConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

/// Target model and output policy of a render.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RenderEnv {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LlmConfig {
    /// Provider name or alias; inferred from `model` when absent.
    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub trim: bool,

    /// Indentation of xml envelope bodies, in spaces.
    #[serde(default)]
    pub indent: Option<usize>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            trim: default_true(),
            indent: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    #[serde(default = "default_environment")]
    pub environment: Environment,

    #[serde(default = "default_missing_policy")]
    pub on_missing_default: MissingDefaultPolicy,

    #[serde(default = "default_true")]
    pub validate_on_submit: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            on_missing_default: default_missing_policy(),
            validate_on_submit: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    #[serde(default)]
    pub strict_tags: bool,

    #[serde(default)]
    pub partial: bool,
}

fn default_true() -> bool {
    true
}

fn default_environment() -> Environment {
    Environment::Interactive
}

fn default_missing_policy() -> MissingDefaultPolicy {
    MissingDefaultPolicy::Error
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ConfigResult<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| ConfigError::Parse(e.to_string()))
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ConfigResult<T> {
    serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
}

impl PromptConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        from_file(path)
    }

    /// Render options for this configuration; inputs are supplied separately.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions::new()
            .with_env(self.env.clone())
            .partial(self.render.partial)
            .strict_tags(self.render.strict_tags)
    }

    pub fn iterator_options(&self) -> IteratorOptions {
        IteratorOptions {
            environment: self.inputs.environment,
            validate_on_submit: self.inputs.validate_on_submit,
            ..IteratorOptions::default()
        }
    }
}
