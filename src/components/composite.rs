//! Composite components aggregate typed item children. Defaults (from presets
//! or list attributes) are replaced by explicit items unless `extend` is set,
//! in which case the items are appended.

use std::sync::Arc;

use indexmap::IndexMap;

use super::structural::{Constraint, Plain};
use super::{paragraphs, Component, Envelope, Props};
use crate::presets;
use crate::provider::DelimiterStyle;
use crate::renderer::diagnostics::{DiagnosticCode, Diagnostics};
use crate::value::Value;

pub(crate) fn components() -> Vec<Arc<dyn Component>> {
    vec![
        Arc::new(Constraints),
        Arc::new(Steps),
        Arc::new(Plain::new("Step", "step", "Step")),
        Arc::new(Guardrails),
        Arc::new(Examples),
        Arc::new(Example),
        Arc::new(Plain::new("Example.Input", "input", "Input")),
        Arc::new(Plain::new("Example.Output", "output", "Output")),
        Arc::new(SuccessCriteria),
        Arc::new(Plain::new("Criterion", "criterion", "Criterion")),
    ]
}

fn merge(defaults: Vec<String>, explicit: Vec<String>, extend: bool) -> Vec<String> {
    if explicit.is_empty() {
        defaults
    } else if extend {
        defaults.into_iter().chain(explicit).collect()
    } else {
        explicit
    }
}

pub struct Constraints;

impl Component for Constraints {
    fn tag(&self) -> &'static str {
        "Constraints"
    }

    fn item_tags(&self) -> &'static [&'static str] {
        &["Constraint"]
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("constraints", "Constraints"))
    }

    fn render(&self, props: &Props<'_>, diagnostics: &mut Diagnostics) -> String {
        let mut defaults = Vec::new();
        for name in props.list("presets") {
            match presets::constraint(&name) {
                Some(preset) => {
                    defaults.push(Constraint::statement(props, Some(preset.level), preset.text))
                }
                None => diagnostics.warn_at(
                    props.element,
                    DiagnosticCode::UnknownPreset,
                    format!("Unknown constraint preset `{}`", name),
                ),
            }
        }
        let items = merge(
            defaults,
            props.items(self.item_tags()),
            props.flag("extend"),
        );
        paragraphs([
            props.context.adaptation.bullet_list(items),
            props.content_without(self.item_tags()),
        ])
    }
}

pub struct Steps;

impl Component for Steps {
    fn tag(&self) -> &'static str {
        "Steps"
    }

    fn item_tags(&self) -> &'static [&'static str] {
        &["Step"]
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("steps", "Steps"))
    }

    fn render(&self, props: &Props<'_>, diagnostics: &mut Diagnostics) -> String {
        let mut defaults = props.list("items");
        if let Some(name) = props.string("preset") {
            match presets::steps(&name) {
                Some(steps) => defaults.extend(steps.iter().map(|s| s.to_string())),
                None => diagnostics.warn_at(
                    props.element,
                    DiagnosticCode::UnknownPreset,
                    format!("Unknown steps preset `{}`", name),
                ),
            }
        }
        let steps = merge(
            defaults,
            props.items(self.item_tags()),
            props.flag("extend"),
        );
        let list = if props.string("style").as_deref() == Some("bullets") {
            props.context.adaptation.bullet_list(steps)
        } else {
            steps
                .iter()
                .enumerate()
                .map(|(i, step)| format!("{}. {}", i + 1, step))
                .collect::<Vec<_>>()
                .join("\n")
        };
        paragraphs([props.content_without(self.item_tags()), list])
    }
}

/// `Never:` / `Always:` lists.
pub struct Guardrails;

impl Component for Guardrails {
    fn tag(&self) -> &'static str {
        "Guardrails"
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("guardrails", "Guardrails"))
    }

    fn render(&self, props: &Props<'_>, diagnostics: &mut Diagnostics) -> String {
        let preset = props.string("preset").and_then(|name| {
            let preset = presets::guardrail(&name);
            if preset.is_none() {
                diagnostics.warn_at(
                    props.element,
                    DiagnosticCode::UnknownPreset,
                    format!("Unknown guardrail preset `{}`", name),
                );
            }
            preset
        });
        let extend = props.flag("extend");
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let prohibit = merge(
            preset.map(|p| owned(p.prohibit)).unwrap_or_default(),
            props.list("prohibit"),
            extend,
        );
        let require = merge(
            preset.map(|p| owned(p.require)).unwrap_or_default(),
            props.list("require"),
            extend,
        );
        let adaptation = props.context.adaptation;
        let section = |heading: &str, items: Vec<String>| {
            if items.is_empty() {
                String::new()
            } else {
                format!("{}\n{}", heading, adaptation.bullet_list(items))
            }
        };
        paragraphs([
            section(adaptation.prohibit_heading, prohibit),
            section(adaptation.require_heading, require),
            props.content(),
        ])
    }
}

pub struct Examples;

impl Examples {
    fn defaults(props: &Props<'_>) -> Vec<String> {
        match props.value("examples") {
            Some(Value::List(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Map(_) => example_text(
                        &item.property("input").to_string(),
                        &item.property("output").to_string(),
                        "",
                    ),
                    other => other.to_string(),
                })
                .filter(|text| !text.trim().is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Component for Examples {
    fn tag(&self) -> &'static str {
        "Examples"
    }

    fn item_tags(&self) -> &'static [&'static str] {
        &["Example"]
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("examples", "Examples"))
    }

    fn render(&self, props: &Props<'_>, _diagnostics: &mut Diagnostics) -> String {
        let examples = merge(
            Self::defaults(props),
            props.items(self.item_tags()),
            props.flag("extend"),
        );
        let xml = props.context.delimiter == DelimiterStyle::Xml && !props.context.bare;
        let rendered = examples.iter().enumerate().map(|(i, example)| {
            if xml {
                format!("<example>\n{}\n</example>", example)
            } else {
                format!("Example {}:\n{}", i + 1, example)
            }
        });
        paragraphs(
            std::iter::once(props.content_without(self.item_tags())).chain(rendered),
        )
    }
}

fn example_text(input: &str, output: &str, rest: &str) -> String {
    let mut lines = Vec::new();
    if !input.trim().is_empty() {
        lines.push(format!("Input: {}", input.trim()));
    }
    if !output.trim().is_empty() {
        lines.push(format!("Output: {}", output.trim()));
    }
    paragraphs([lines.join("\n"), rest.to_string()])
}

/// One input/output pair, from attributes or `Example.Input`/`Example.Output`.
pub struct Example;

impl Component for Example {
    fn tag(&self) -> &'static str {
        "Example"
    }

    fn item_tags(&self) -> &'static [&'static str] {
        &["Example.Input", "Example.Output"]
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("example", "Example"))
    }

    fn render(&self, props: &Props<'_>, _diagnostics: &mut Diagnostics) -> String {
        let input = props
            .string("input")
            .unwrap_or_else(|| props.items(&["Example.Input"]).join("\n"));
        let output = props
            .string("output")
            .unwrap_or_else(|| props.items(&["Example.Output"]).join("\n"));
        example_text(&input, &output, &props.content_without(self.item_tags()))
    }
}

pub struct SuccessCriteria;

impl Component for SuccessCriteria {
    fn tag(&self) -> &'static str {
        "SuccessCriteria"
    }

    fn item_tags(&self) -> &'static [&'static str] {
        &["Criterion"]
    }

    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        Some(Envelope::new("success_criteria", "Success Criteria"))
    }

    fn render(&self, props: &Props<'_>, _diagnostics: &mut Diagnostics) -> String {
        let criteria = merge(
            props.list("items"),
            props.items(self.item_tags()),
            props.flag("extend"),
        );
        paragraphs([
            props.content_without(self.item_tags()),
            props.context.adaptation.bullet_list(criteria),
        ])
    }
}
