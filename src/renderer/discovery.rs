//! Discovery pass: collects the inputs a tree needs without evaluating it.
//!
//! Every element is visited, including both sides of every guard, loop
//! bodies and elements held in attributes. Each `Ask.*` element yields an
//! [`InputRequirement`]; requirements are deduplicated by name in document
//! order. A declaration inside `<Inputs>` replaces an inline one in place.

use async_recursion::async_recursion;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::cancel::CancelSignal;
use super::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::analyzer::tags::{is_input_tag, ASK_NAMESPACE};
use crate::ast::{AttributeValue, Element, Expression, Node, Position};
use crate::components::control::INPUTS_TAG;
use crate::input::requirement::{
    Choice, Constraints, DefaultValue, InputOrigin, InputRequirement, InputType,
};
use crate::value::Value;

fn at(position: &Option<Position>) -> String {
    position
        .map(|position| format!(" at {}", position))
        .unwrap_or_default()
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    #[error("<{tag}>{} needs a static `name` attribute", at(.position))]
    MissingName {
        tag: String,
        position: Option<Position>,
    },
    #[error("<{tag}>{}: `name` must be a literal string, not an expression", at(.position))]
    DynamicName {
        tag: String,
        position: Option<Position>,
    },
    #[error("Defaults form a cycle: {}", .cycle.join(" -> "))]
    CyclicReference { cycle: Vec<String> },
    #[error("Input `{name}` has an invalid constraint: {message}")]
    InvalidConstraint { name: String, message: String },
    #[error("Discovery cancelled")]
    Cancelled,
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Ordered, deduplicated requirements plus the warnings raised finding them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Discovery {
    pub requirements: Vec<InputRequirement>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Discovery {
    pub fn requirement(&self, name: &str) -> Option<&InputRequirement> {
        self.requirements.iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.requirements.iter().map(|r| r.name.as_str()).collect()
    }
}

pub(crate) struct DiscoveryPass<'a> {
    cancel: Option<&'a CancelSignal>,
    requirements: Vec<InputRequirement>,
    diagnostics: Diagnostics,
}

impl<'a> DiscoveryPass<'a> {
    pub(crate) fn new(cancel: Option<&'a CancelSignal>) -> Self {
        Self {
            cancel,
            requirements: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub(crate) async fn run(mut self, root: &Element) -> DiscoveryResult<Discovery> {
        self.visit(root, false, 0).await?;
        check_references(&self.requirements, &mut self.diagnostics)?;
        debug!(count = self.requirements.len(), "discovered inputs");
        Ok(Discovery {
            requirements: self.requirements,
            diagnostics: self.diagnostics.into_vec(),
        })
    }

    fn check_cancel(&self) -> DiscoveryResult<()> {
        match self.cancel {
            Some(signal) if signal.is_cancelled() => Err(DiscoveryError::Cancelled),
            _ => Ok(()),
        }
    }

    #[async_recursion]
    async fn visit(
        &mut self,
        element: &Element,
        declared: bool,
        depth: usize,
    ) -> DiscoveryResult<()> {
        self.check_cancel()?;
        // only an `<Inputs>` block directly under the root declares inputs
        let declared = declared || (depth == 1 && element.tag() == INPUTS_TAG);
        if is_input_tag(element.tag()) {
            let origin = if declared {
                InputOrigin::Declared
            } else {
                InputOrigin::Inline
            };
            if let Some(requirement) = requirement_of(element, origin, &mut self.diagnostics)? {
                self.add(requirement, element);
            }
        }
        for value in element.attributes().values() {
            self.visit_attribute(value, declared, depth + 1).await?;
        }
        for child in element.child_elements() {
            self.visit(child, declared, depth + 1).await?;
        }
        Ok(())
    }

    #[async_recursion]
    async fn visit_attribute(
        &mut self,
        value: &AttributeValue,
        declared: bool,
        depth: usize,
    ) -> DiscoveryResult<()> {
        match value {
            AttributeValue::Element(element) => self.visit(element, declared, depth).await,
            AttributeValue::Array(items) => {
                for item in items {
                    self.visit_attribute(item, declared, depth).await?;
                }
                Ok(())
            }
            AttributeValue::Object(map) => {
                for item in map.values() {
                    self.visit_attribute(item, declared, depth).await?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn add(&mut self, requirement: InputRequirement, element: &Element) {
        let Some(index) = self
            .requirements
            .iter()
            .position(|existing| existing.name == requirement.name)
        else {
            self.requirements.push(requirement);
            return;
        };
        let existing = &self.requirements[index];
        if requirement.origin == InputOrigin::Declared && existing.origin == InputOrigin::Inline {
            self.requirements[index] = requirement;
        } else if existing.conflicts_with(&requirement) {
            self.diagnostics.warn_at(
                element,
                DiagnosticCode::DuplicateInput,
                format!(
                    "Input `{}` is declared again with different settings; the first declaration is used",
                    requirement.name
                ),
            );
        }
    }
}

/// Literal boolean attribute.
fn literal_flag(element: &Element, name: &str) -> Option<bool> {
    match element.attribute(name)? {
        AttributeValue::Bool(b) => Some(*b),
        AttributeValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn literal_number(element: &Element, name: &str) -> Option<f64> {
    element
        .attribute(name)?
        .literal_value()
        .and_then(|value| value.as_number())
}

fn requirement_of(
    element: &Element,
    origin: InputOrigin,
    diagnostics: &mut Diagnostics,
) -> DiscoveryResult<Option<InputRequirement>> {
    let Some(input_type) = element
        .namespace()
        .filter(|(namespace, _)| *namespace == ASK_NAMESPACE)
        .and_then(|(_, member)| InputType::from_ask_member(member))
    else {
        return Ok(None);
    };
    let name = match element.attribute("name") {
        Some(AttributeValue::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(AttributeValue::String(_)) | None => {
            return Err(DiscoveryError::MissingName {
                tag: element.tag().to_string(),
                position: element.position(),
            })
        }
        Some(_) => {
            return Err(DiscoveryError::DynamicName {
                tag: element.tag().to_string(),
                position: element.position(),
            })
        }
    };

    let mut requirement = InputRequirement::new(name, input_type);
    requirement.origin = origin;
    if let Some(label) = element.literal_str("label").filter(|l| !l.trim().is_empty()) {
        requirement.label = label.trim().to_string();
    }
    requirement.description = element.literal_str("description").map(str::to_string);
    requirement.required = literal_flag(element, "required").unwrap_or(true);
    requirement.silent = literal_flag(element, "silent").unwrap_or(false);
    requirement.default = default_of(element, diagnostics);
    requirement.constraints = constraints_of(element, &requirement.name)?;

    if matches!(input_type, InputType::Select | InputType::MultiSelect)
        && requirement.constraints.choices.is_empty()
    {
        diagnostics.warn_at(
            element,
            DiagnosticCode::MissingAttribute,
            format!("Input `{}` has no options to choose from", requirement.name),
        );
    }
    Ok(Some(requirement))
}

fn default_of(element: &Element, diagnostics: &mut Diagnostics) -> Option<DefaultValue> {
    let attribute = element.attribute("default")?;
    if let AttributeValue::Expression(Expression::FieldRef(path)) = attribute {
        if let (Some(name), []) = (path.input_name(), path.input_properties()) {
            return Some(DefaultValue::Reference(name.to_string()));
        }
    }
    match attribute.literal_value() {
        Some(value) => Some(DefaultValue::Literal(value)),
        None => {
            diagnostics.warn_at(
                element,
                DiagnosticCode::InvalidAttribute,
                "`default` must be a literal or an `inputs.*` reference",
            );
            None
        }
    }
}

fn choice_of(value: &Value) -> Option<Choice> {
    match value {
        Value::Map(_) => {
            let value_text = value.property("value").to_string();
            if value_text.is_empty() {
                return None;
            }
            let label = value.property("label").to_string();
            Some(Choice::new(
                value_text.clone(),
                if label.is_empty() { value_text } else { label },
            ))
        }
        Value::Unset | Value::Placeholder(_) => None,
        other => {
            let text = other.to_string();
            (!text.is_empty()).then(|| Choice::new(text.clone(), text))
        }
    }
}

fn option_choice(option: &Element) -> Option<Choice> {
    let value = option
        .attribute("value")
        .and_then(AttributeValue::literal_value)
        .map(|value| value.to_string())?;
    let text: String = option
        .children()
        .iter()
        .filter_map(|child| match child {
            Node::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    let label = option
        .literal_str("label")
        .map(str::to_string)
        .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
        .unwrap_or_else(|| value.clone());
    Some(Choice::new(value, label))
}

fn constraints_of(element: &Element, name: &str) -> DiscoveryResult<Constraints> {
    let mut constraints = Constraints::default();
    if let Some(pattern) = element.literal_str("pattern") {
        Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            DiscoveryError::InvalidConstraint {
                name: name.to_string(),
                message: e.to_string(),
            }
        })?;
        constraints.pattern = Some(pattern.to_string());
    }
    constraints.min = literal_number(element, "min");
    constraints.max = literal_number(element, "max");
    if let (Some(min), Some(max)) = (constraints.min, constraints.max) {
        if min > max {
            return Err(DiscoveryError::InvalidConstraint {
                name: name.to_string(),
                message: format!("min {} is greater than max {}", min, max),
            });
        }
    }

    let listed = element
        .attribute("options")
        .or_else(|| element.attribute("choices"))
        .and_then(AttributeValue::literal_value);
    match listed {
        Some(Value::List(items)) => constraints
            .choices
            .extend(items.iter().filter_map(choice_of)),
        Some(Value::String(s)) => constraints.choices.extend(
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Choice::new(s, s)),
        ),
        _ => {}
    }
    let option_tag = format!("{}.Option", ASK_NAMESPACE);
    constraints.choices.extend(
        element
            .child_elements()
            .filter(|child| child.tag() == option_tag)
            .filter_map(option_choice),
    );

    constraints.extensions = match element
        .attribute("extensions")
        .and_then(AttributeValue::literal_value)
    {
        Some(Value::List(items)) => items.iter().map(|item| item.to_string()).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    Ok(constraints)
}

/// Rejects cycles among default references and warns about references to
/// inputs that do not exist.
fn check_references(
    requirements: &[InputRequirement],
    diagnostics: &mut Diagnostics,
) -> DiscoveryResult<()> {
    let find = |name: &str| requirements.iter().find(|r| r.name == name);
    for start in requirements {
        let mut chain = vec![start.name.clone()];
        let mut current = start;
        while let Some(DefaultValue::Reference(next)) = &current.default {
            if let Some(index) = chain.iter().position(|name| name == next) {
                let mut cycle = chain[index..].to_vec();
                cycle.push(next.clone());
                return Err(DiscoveryError::CyclicReference { cycle });
            }
            chain.push(next.clone());
            match find(next) {
                Some(requirement) => current = requirement,
                None => {
                    diagnostics.warn(
                        DiagnosticCode::InvalidAttribute,
                        format!(
                            "Default of `{}` refers to unknown input `{}`",
                            current.name, next
                        ),
                    );
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FieldPath;
    use crate::parser::parse;

    async fn discover(source: &str) -> DiscoveryResult<Discovery> {
        let root = parse(source, "test.prompt").unwrap();
        DiscoveryPass::new(None).run(&root).await
    }

    #[tokio::test]
    async fn test_collects_inputs_in_document_order() {
        let discovery = discover(
            r#"<Prompt>
                <Ask.Text name="topic" label="Topic" />
                <If when={false}><Ask.Number name="count" min={1} max={5} /></If>
                <ForEach items={inputs.topic}><Ask.Confirm name="ok" required={false} /></ForEach>
            </Prompt>"#,
        )
        .await
        .unwrap();
        assert_eq!(discovery.names(), vec!["topic", "count", "ok"]);
        let count = discovery.requirement("count").unwrap();
        assert_eq!(count.input_type, InputType::Number);
        assert_eq!(count.constraints.min, Some(1.0));
        assert!(!discovery.requirement("ok").unwrap().required);
    }

    #[tokio::test]
    async fn test_deduplicates_and_warns_on_conflict() {
        let discovery = discover(
            r#"<Prompt>
                <Ask.Text name="outputFile" />
                <Ask.Text name="outputFile" />
                <Ask.Number name="outputFile" />
            </Prompt>"#,
        )
        .await
        .unwrap();
        assert_eq!(discovery.requirements.len(), 1);
        assert_eq!(discovery.requirements[0].input_type, InputType::Text);
        assert_eq!(discovery.diagnostics.len(), 1);
        assert_eq!(discovery.diagnostics[0].code, DiagnosticCode::DuplicateInput);
    }

    #[tokio::test]
    async fn test_declared_input_overrides_inline() {
        let discovery = discover(
            r#"<Prompt>
                <Task>Write about <Ask.Text name="topic" /></Task>
                <Inputs><Ask.Text name="topic" label="Topic" required={false} /></Inputs>
            </Prompt>"#,
        )
        .await
        .unwrap();
        assert_eq!(discovery.requirements.len(), 1);
        let topic = &discovery.requirements[0];
        assert_eq!(topic.origin, InputOrigin::Declared);
        assert_eq!(topic.label, "Topic");
        assert!(!topic.required);
        assert!(discovery.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_nested_inputs_block_does_not_override() {
        let discovery = discover(
            r#"<Prompt>
                <Task>Write about <Ask.Text name="topic" /></Task>
                <If when={true}>
                    <Inputs><Ask.Text name="topic" required={false} /></Inputs>
                </If>
            </Prompt>"#,
        )
        .await
        .unwrap();
        assert_eq!(discovery.requirements.len(), 1);
        let topic = &discovery.requirements[0];
        assert_eq!(topic.origin, InputOrigin::Inline);
        assert!(topic.required);
        assert_eq!(discovery.diagnostics[0].code, DiagnosticCode::DuplicateInput);
    }

    #[tokio::test]
    async fn test_inputs_inside_attributes_and_options() {
        let discovery = discover(
            r#"<Prompt>
                <Section title={<Ask.Text name="title" />}>x</Section>
                <Ask.Select name="lang" options={["rust", "go"]}>
                    <Ask.Option value="zig" label="Zig" />
                </Ask.Select>
            </Prompt>"#,
        )
        .await
        .unwrap();
        assert_eq!(discovery.names(), vec!["title", "lang"]);
        let choices = &discovery.requirement("lang").unwrap().constraints.choices;
        assert_eq!(
            choices,
            &vec![
                Choice::new("rust", "rust"),
                Choice::new("go", "go"),
                Choice::new("zig", "Zig")
            ]
        );
    }

    #[tokio::test]
    async fn test_defaults() {
        let discovery = discover(
            r#"<Prompt>
                <Ask.Text name="a" default="x" />
                <Ask.Text name="b" default={inputs.a} />
            </Prompt>"#,
        )
        .await
        .unwrap();
        assert_eq!(
            discovery.requirement("a").unwrap().default,
            Some(DefaultValue::Literal(Value::string("x")))
        );
        assert_eq!(
            discovery.requirement("b").unwrap().default,
            Some(DefaultValue::Reference("a".to_string()))
        );
    }

    #[tokio::test]
    async fn test_cyclic_defaults() {
        let err = discover(
            r#"<Prompt>
                <Ask.Text name="a" default={inputs.b} />
                <Ask.Text name="b" default={inputs.a} />
            </Prompt>"#,
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            DiscoveryError::CyclicReference {
                cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_name_errors() {
        let err = discover(r#"<Prompt><Ask.Text label="x" /></Prompt>"#)
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingName { .. }));

        let root = Element::new("Prompt").with_child(Element::new("Ask.Text").with_attribute(
            "name",
            Expression::FieldRef(FieldPath::parse("inputs.n")),
        ));
        let err = DiscoveryPass::new(None).run(&root).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::DynamicName { .. }));
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let err = discover(r#"<Prompt><Ask.Text name="x" pattern="([a-z" /></Prompt>"#)
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidConstraint { .. }));
    }

    #[tokio::test]
    async fn test_cancelled() {
        let root = parse(r#"<Prompt><Ask.Text name="x" /></Prompt>"#, "t").unwrap();
        let signal = CancelSignal::new();
        signal.cancel();
        let err = DiscoveryPass::new(Some(&signal)).run(&root).await.unwrap_err();
        assert_eq!(err, DiscoveryError::Cancelled);
    }
}
