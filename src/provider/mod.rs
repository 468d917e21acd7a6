//! # Provider Adaptation
//!
//! Each supported LLM vendor gets one fixed [`ProviderAdaptation`] record that
//! components consult for phrasing (role prefix, normative markers, list
//! bullets) and the default delimiter style. Records are read-only and shared
//! by every render.
//!
//! A provider is named directly (`anthropic`, or an alias such as `claude`),
//! or inferred from a model name (`gpt-4o` → `openai`). Anything unrecognised
//! falls back to [`ProviderId::Unspecified`].

pub mod adaptation;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use adaptation::{adaptation, DelimiterStyle, ListStyle, ProviderAdaptation};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum ProviderId {
    #[strum(to_string = "anthropic", serialize = "claude")]
    Anthropic,
    #[strum(to_string = "openai", serialize = "gpt", serialize = "chatgpt")]
    OpenAI,
    #[strum(to_string = "google", serialize = "gemini")]
    Google,
    #[strum(to_string = "meta", serialize = "llama")]
    Meta,
    #[strum(to_string = "mistral")]
    Mistral,
    #[strum(to_string = "deepseek")]
    DeepSeek,
    #[strum(to_string = "xai", serialize = "grok")]
    XAi,
    #[strum(to_string = "cohere")]
    Cohere,
    #[default]
    #[strum(to_string = "unspecified")]
    Unspecified,
}

/// Outcome of resolving a provider from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResolution {
    pub id: ProviderId,
    /// The configured name when it was not recognised.
    pub unknown: Option<String>,
}

impl ProviderId {
    /// Infers the vendor from a model name such as `claude-3-5-sonnet`.
    pub fn from_model(model: &str) -> Option<Self> {
        let model = model.trim().to_ascii_lowercase();
        let starts = |prefixes: &[&str]| prefixes.iter().any(|p| model.starts_with(p));
        if starts(&["claude"]) {
            Some(ProviderId::Anthropic)
        } else if starts(&["gpt", "chatgpt", "o1", "o3", "o4", "text-davinci"]) {
            Some(ProviderId::OpenAI)
        } else if starts(&["gemini", "gemma", "palm"]) {
            Some(ProviderId::Google)
        } else if starts(&["llama", "meta-llama", "codellama"]) {
            Some(ProviderId::Meta)
        } else if starts(&["mistral", "mixtral", "codestral", "ministral", "pixtral"]) {
            Some(ProviderId::Mistral)
        } else if starts(&["deepseek"]) {
            Some(ProviderId::DeepSeek)
        } else if starts(&["grok"]) {
            Some(ProviderId::XAi)
        } else if starts(&["command", "c4ai"]) {
            Some(ProviderId::Cohere)
        } else {
            None
        }
    }

    /// Resolves the provider from an explicit name and/or a model name. An
    /// explicit name wins; a model is consulted only when no name is given.
    pub fn resolve(provider: Option<&str>, model: Option<&str>) -> ProviderResolution {
        match provider.map(str::trim).filter(|p| !p.is_empty()) {
            Some(name) => match ProviderId::from_str(name) {
                Ok(id) => ProviderResolution { id, unknown: None },
                Err(_) => ProviderResolution {
                    id: ProviderId::Unspecified,
                    unknown: Some(name.to_string()),
                },
            },
            None => ProviderResolution {
                id: model
                    .and_then(ProviderId::from_model)
                    .unwrap_or(ProviderId::Unspecified),
                unknown: None,
            },
        }
    }

    pub fn adaptation(&self) -> &'static ProviderAdaptation {
        adaptation(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_names_and_aliases() {
        assert_eq!(ProviderId::from_str("claude").unwrap(), ProviderId::Anthropic);
        assert_eq!(ProviderId::from_str("OpenAI").unwrap(), ProviderId::OpenAI);
        assert_eq!(ProviderId::from_str("grok").unwrap(), ProviderId::XAi);
        assert_eq!(ProviderId::Anthropic.to_string(), "anthropic");
        assert_eq!(ProviderId::XAi.to_string(), "xai");
    }

    #[test]
    fn test_model_inference() {
        assert_eq!(
            ProviderId::from_model("claude-3-5-sonnet-latest"),
            Some(ProviderId::Anthropic)
        );
        assert_eq!(ProviderId::from_model("gpt-4o"), Some(ProviderId::OpenAI));
        assert_eq!(ProviderId::from_model("gemini-2.0-flash"), Some(ProviderId::Google));
        assert_eq!(ProviderId::from_model("mixtral-8x7b"), Some(ProviderId::Mistral));
        assert_eq!(ProviderId::from_model("my-model"), None);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(
            ProviderId::resolve(Some("acme"), Some("gpt-4o")),
            ProviderResolution {
                id: ProviderId::Unspecified,
                unknown: Some("acme".to_string())
            }
        );
        assert_eq!(
            ProviderId::resolve(None, Some("gpt-4o")).id,
            ProviderId::OpenAI
        );
        assert_eq!(ProviderId::resolve(None, None).id, ProviderId::Unspecified);
    }

    #[test]
    fn test_every_provider_has_adaptation() {
        for id in ProviderId::iter() {
            assert_eq!(id.adaptation().id, id);
        }
    }
}
