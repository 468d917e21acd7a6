//! Structural components: each wraps its body in the delimiter envelope.

use std::{str::FromStr, sync::Arc};

use indexmap::IndexMap;

use super::{context::label_of, paragraphs, Component, Envelope, Props};
use crate::presets::{self, ConstraintLevel};
use crate::renderer::diagnostics::{DiagnosticCode, Diagnostics};
use crate::value::Value;

pub(crate) fn components() -> Vec<Arc<dyn Component>> {
    vec![
        Arc::new(Prompt),
        Arc::new(Role),
        Arc::new(Task),
        Arc::new(Constraint),
        Arc::new(Format),
        Arc::new(Audience),
        Arc::new(Tone),
        Arc::new(Section),
        Arc::new(Plain::new("Context", "context", "Context")),
    ]
}

/// Joins with commas and a final `and`.
pub(crate) fn natural_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

fn article(noun: &str) -> &'static str {
    match noun.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

/// Root element. Its attributes are metadata; only `bare` and `delimiter`
/// affect rendering.
pub struct Prompt;

impl Component for Prompt {
    fn tag(&self) -> &'static str {
        "Prompt"
    }
}

/// Children in an envelope, nothing else.
pub struct Plain {
    tag: &'static str,
    label: &'static str,
    title: &'static str,
}

impl Plain {
    pub fn new(tag: &'static str, label: &'static str, title: &'static str) -> Self {
        Self { tag, label, title }
    }
}

impl Component for Plain {
    fn tag(&self) -> &'static str {
        self.tag
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new(self.label, self.title))
    }
}

pub struct Role;

impl Component for Role {
    fn tag(&self) -> &'static str {
        "Role"
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("role", "Role"))
    }

    fn render(&self, props: &Props<'_>, diagnostics: &mut Diagnostics) -> String {
        let preset = props.string("preset").and_then(|name| {
            let preset = presets::role(&name);
            if preset.is_none() {
                diagnostics.warn_at(
                    props.element,
                    DiagnosticCode::UnknownPreset,
                    format!("Unknown role preset `{}`", name),
                );
            }
            preset
        });

        let title = props
            .string("title")
            .or_else(|| preset.map(|p| p.title.to_string()));
        let domain = props
            .string("domain")
            .or_else(|| preset.and_then(|p| p.domain).map(str::to_string));
        let style = props
            .string("style")
            .or_else(|| preset.and_then(|p| p.style).map(str::to_string));
        let expertise = match props.list("expertise") {
            explicit if !explicit.is_empty() => explicit,
            _ => preset
                .map(|p| p.expertise.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
        };
        let traits = match props.list("traits") {
            explicit if !explicit.is_empty() => explicit,
            _ => preset
                .map(|p| p.traits.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
        };

        let mut lines = Vec::new();
        if let Some(title) = title {
            let mut intro = format!(
                "{} {} {}",
                props.context.adaptation.role_prefix,
                article(&title),
                title
            );
            if let Some(experience) = props.string("experience") {
                intro.push_str(&format!(" with {} of experience", experience));
            }
            if let Some(domain) = domain {
                intro.push_str(&format!(" in {}", domain));
            }
            intro.push('.');
            lines.push(intro);
        }
        if !expertise.is_empty() {
            lines.push(format!("Your expertise includes {}.", natural_list(&expertise)));
        }
        if !traits.is_empty() {
            lines.push(format!("You are {}.", natural_list(&traits)));
        }
        if let Some(style) = style {
            lines.push(format!("Communicate in a {} style.", style));
        }
        paragraphs([lines.join("\n"), props.content()])
    }
}

pub struct Task;

impl Component for Task {
    fn tag(&self) -> &'static str {
        "Task"
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("task", "Task"))
    }

    fn render(&self, props: &Props<'_>, diagnostics: &mut Diagnostics) -> String {
        let preset = props.string("preset").and_then(|name| {
            let preset = presets::task(&name);
            if preset.is_none() {
                diagnostics.warn_at(
                    props.element,
                    DiagnosticCode::UnknownPreset,
                    format!("Unknown task preset `{}`", name),
                );
            }
            preset
        });
        let description = props
            .string("description")
            .or_else(|| preset.map(|p| p.description.to_string()));
        paragraphs([description.unwrap_or_default(), props.content()])
    }
}

/// A single normative statement: `MUST: ...`.
pub struct Constraint;

impl Constraint {
    /// `MUST NOT: text` in the provider's casing, or the bare text without a level.
    pub fn statement(props: &Props<'_>, level: Option<ConstraintLevel>, text: &str) -> String {
        match level {
            Some(level) => format!(
                "{}: {}",
                props.context.adaptation.marker(level.marker()),
                text
            ),
            None => text.to_string(),
        }
    }
}

impl Component for Constraint {
    fn tag(&self) -> &'static str {
        "Constraint"
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("constraint", "Constraint"))
    }

    fn render(&self, props: &Props<'_>, diagnostics: &mut Diagnostics) -> String {
        let preset = props.string("preset").and_then(|name| {
            let preset = presets::constraint(&name);
            if preset.is_none() {
                diagnostics.warn_at(
                    props.element,
                    DiagnosticCode::UnknownPreset,
                    format!("Unknown constraint preset `{}`", name),
                );
            }
            preset
        });
        let level = match props.string("level") {
            Some(level) => match ConstraintLevel::from_str(&level) {
                Ok(level) => Some(level),
                Err(_) => {
                    diagnostics.warn_at(
                        props.element,
                        DiagnosticCode::UnknownLevel,
                        format!("Unknown constraint level `{}`", level),
                    );
                    None
                }
            },
            None => preset.map(|p| p.level),
        };
        let content = props.content();
        let text = if content.is_empty() {
            preset.map(|p| p.text.to_string()).unwrap_or_default()
        } else {
            content
        };
        if text.is_empty() {
            return String::new();
        }
        Self::statement(props, level, &text)
    }
}

/// Expected shape of the answer.
pub struct Format;

impl Component for Format {
    fn tag(&self) -> &'static str {
        "Format"
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("format", "Output Format"))
    }

    fn render(&self, props: &Props<'_>, _diagnostics: &mut Diagnostics) -> String {
        let kind = props.string("type");
        let lead = kind
            .as_ref()
            .map(|kind| format!("{} {}", props.context.adaptation.format_prefix, kind));
        let schema = props.value("schema").map(|schema| {
            let body = match schema {
                Value::String(s) => s.trim().to_string(),
                other => super::content::pretty_json(other),
            };
            format!("```json\n{}\n```", body)
        });
        let strict = props.flag("strict").then(|| match &kind {
            Some(kind) => format!(
                "Respond only with the {} output and no additional commentary.",
                kind
            ),
            None => "Respond only in this format and add no additional commentary.".to_string(),
        });
        paragraphs([
            lead.unwrap_or_default(),
            schema.unwrap_or_default(),
            props.content(),
            strict.unwrap_or_default(),
        ])
    }
}

pub struct Audience;

impl Component for Audience {
    fn tag(&self) -> &'static str {
        "Audience"
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("audience", "Audience"))
    }

    fn render(&self, props: &Props<'_>, _diagnostics: &mut Diagnostics) -> String {
        let mut lines = Vec::new();
        if let Some(description) = props.string("description") {
            lines.push(format!("The audience is {}.", description));
        }
        if let Some(level) = props.string("level") {
            lines.push(format!("Assume {} familiarity with the subject.", level));
        }
        paragraphs([lines.join("\n"), props.content()])
    }
}

pub struct Tone;

impl Component for Tone {
    fn tag(&self) -> &'static str {
        "Tone"
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("tone", "Tone"))
    }

    fn render(&self, props: &Props<'_>, _diagnostics: &mut Diagnostics) -> String {
        let style = props
            .string("style")
            .or_else(|| props.string("type"))
            .map(|style| format!("Use a {} tone.", style));
        paragraphs([style.unwrap_or_default(), props.content()])
    }
}

/// Generic section titled by its `title` attribute.
pub struct Section;

impl Component for Section {
    fn tag(&self) -> &'static str {
        "Section"
    }

    fn envelope(&self, attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        let title = attributes
            .get("title")
            .filter(|title| !title.is_empty())
            .map(|title| title.to_string().trim().to_string())
            .unwrap_or_else(|| "Section".to_string());
        let label = attributes
            .get("name")
            .filter(|name| !name.is_empty())
            .map(|name| label_of(&name.to_string()))
            .unwrap_or_else(|| label_of(&title));
        Some(Envelope::new(label, title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_list() {
        let items = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(natural_list(&items(&[])), "");
        assert_eq!(natural_list(&items(&["a"])), "a");
        assert_eq!(natural_list(&items(&["a", "b"])), "a and b");
        assert_eq!(natural_list(&items(&["a", "b", "c"])), "a, b, and c");
    }

    #[test]
    fn test_article() {
        assert_eq!(article("engineer"), "an");
        assert_eq!(article("software engineer"), "a");
    }

    #[test]
    fn test_section_envelope() {
        let mut attributes = IndexMap::new();
        attributes.insert("title".to_string(), Value::string("Background Notes"));
        assert_eq!(
            Section.envelope(&attributes),
            Some(Envelope::new("background_notes", "Background Notes"))
        );
        assert_eq!(
            Section.envelope(&IndexMap::new()),
            Some(Envelope::new("section", "Section"))
        );
    }
}
