use serde::{Deserialize, Serialize};

use super::ProviderId;

/// How structural components wrap their content.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DelimiterStyle {
    /// `<role>...</role>`
    Xml,
    /// `## Role`
    Markdown,
    /// content only
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Dash,
    Asterisk,
}

impl ListStyle {
    pub fn bullet(&self) -> &'static str {
        match self {
            ListStyle::Dash => "- ",
            ListStyle::Asterisk => "* ",
        }
    }
}

/// Per-provider phrasing preferences.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAdaptation {
    pub id: ProviderId,
    /// Opening of a role statement, e.g. `You are`.
    pub role_prefix: &'static str,
    pub delimiter: DelimiterStyle,
    /// `MUST:` rather than `Must:`.
    pub uppercase_markers: bool,
    pub list_style: ListStyle,
    /// Lead-in for the output format section.
    pub format_prefix: &'static str,
    pub prohibit_heading: &'static str,
    pub require_heading: &'static str,
}

impl ProviderAdaptation {
    /// Normative marker for a constraint level as this provider writes it.
    pub fn marker(&self, marker: &str) -> String {
        if self.uppercase_markers {
            marker.to_uppercase()
        } else {
            let lower = marker.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }

    pub fn bullet_list<I, S>(&self, items: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        items
            .into_iter()
            .map(|item| format!("{}{}", self.list_style.bullet(), item.as_ref()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

const fn record(
    id: ProviderId,
    delimiter: DelimiterStyle,
    uppercase_markers: bool,
    list_style: ListStyle,
    format_prefix: &'static str,
) -> ProviderAdaptation {
    ProviderAdaptation {
        id,
        role_prefix: "You are",
        delimiter,
        uppercase_markers,
        list_style,
        format_prefix,
        prohibit_heading: "Never:",
        require_heading: "Always:",
    }
}

static ANTHROPIC: ProviderAdaptation = record(
    ProviderId::Anthropic,
    DelimiterStyle::Xml,
    true,
    ListStyle::Dash,
    "Format your response as follows:",
);
static OPENAI: ProviderAdaptation = record(
    ProviderId::OpenAI,
    DelimiterStyle::Markdown,
    true,
    ListStyle::Dash,
    "Output format:",
);
static GOOGLE: ProviderAdaptation = record(
    ProviderId::Google,
    DelimiterStyle::Markdown,
    false,
    ListStyle::Asterisk,
    "Output format:",
);
static META: ProviderAdaptation = record(
    ProviderId::Meta,
    DelimiterStyle::Markdown,
    true,
    ListStyle::Dash,
    "Respond using this format:",
);
static MISTRAL: ProviderAdaptation = record(
    ProviderId::Mistral,
    DelimiterStyle::Markdown,
    true,
    ListStyle::Dash,
    "Output format:",
);
static DEEPSEEK: ProviderAdaptation = record(
    ProviderId::DeepSeek,
    DelimiterStyle::Markdown,
    true,
    ListStyle::Dash,
    "Output format:",
);
static XAI: ProviderAdaptation = record(
    ProviderId::XAi,
    DelimiterStyle::Markdown,
    false,
    ListStyle::Dash,
    "Output format:",
);
static COHERE: ProviderAdaptation = record(
    ProviderId::Cohere,
    DelimiterStyle::Markdown,
    false,
    ListStyle::Dash,
    "Respond in this format:",
);
static UNSPECIFIED: ProviderAdaptation = record(
    ProviderId::Unspecified,
    DelimiterStyle::Xml,
    true,
    ListStyle::Dash,
    "Output format:",
);

pub fn adaptation(id: ProviderId) -> &'static ProviderAdaptation {
    match id {
        ProviderId::Anthropic => &ANTHROPIC,
        ProviderId::OpenAI => &OPENAI,
        ProviderId::Google => &GOOGLE,
        ProviderId::Meta => &META,
        ProviderId::Mistral => &MISTRAL,
        ProviderId::DeepSeek => &DEEPSEEK,
        ProviderId::XAi => &XAI,
        ProviderId::Cohere => &COHERE,
        ProviderId::Unspecified => &UNSPECIFIED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        let anthropic = adaptation(ProviderId::Anthropic);
        assert_eq!(anthropic.marker("must not"), "MUST NOT");
        let google = adaptation(ProviderId::Google);
        assert_eq!(google.marker("MUST NOT"), "Must not");
    }

    #[test]
    fn test_default_delimiters() {
        assert_eq!(adaptation(ProviderId::Anthropic).delimiter, DelimiterStyle::Xml);
        assert_eq!(adaptation(ProviderId::OpenAI).delimiter, DelimiterStyle::Markdown);
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(
            adaptation(ProviderId::Google).bullet_list(["a", "b"]),
            "* a\n* b"
        );
    }
}
