//! Render pass: walks the tree with final input values and produces text.
//!
//! Fragments bubble up from the leaves. Content components receive their
//! children already rendered; children whose tag the parent lists as an item
//! are rendered without an envelope so the parent can number or bullet them.
//! `PostExecution` regions are set aside with their scope and evaluated after
//! the text is complete.

use std::str::FromStr;

use async_recursion::async_recursion;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

use super::cancel::CancelSignal;
use super::diagnostics::{DiagnosticCode, Diagnostics};
use super::discovery::DiscoveryError;
use super::post_execution::PostAction;
use crate::ast::{AttributeValue, Element, Expression, Node, Position};
use crate::components::{
    is_enabled, join_fragments, Capability, ComponentRegistry, Fragment, Layout, Props,
    RenderContext,
};
use crate::eval::{EvaluationError, FieldLookup, Formula, Scope, ScopeError};
use crate::input::requirement::InputType;
use crate::provider::DelimiterStyle;
use crate::value::Value;

/// Name bound to the current element when `ForEach` has no `as` attribute.
pub const DEFAULT_LOOP_BINDING: &str = "item";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("Missing value for required input `{0}`")]
    MissingInput(String),
    #[error("Reference to undeclared input `{0}`")]
    UnknownInput(String),
    #[error("Unknown tag <{tag}>")]
    UnknownTag {
        tag: String,
        position: Option<Position>,
    },
    #[error("Render cancelled")]
    Cancelled,
}

impl From<ScopeError> for RenderError {
    fn from(error: ScopeError) -> Self {
        match error {
            ScopeError::MissingInput(name) => RenderError::MissingInput(name),
            ScopeError::UnknownInput(name) => RenderError::UnknownInput(name),
            ScopeError::Evaluation(e) => RenderError::Evaluation(e),
        }
    }
}

impl RenderError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            RenderError::Discovery(_) => DiagnosticCode::Discovery,
            RenderError::Evaluation(_) => DiagnosticCode::Evaluation,
            RenderError::MissingInput(_) => DiagnosticCode::MissingInput,
            RenderError::UnknownInput(_) => DiagnosticCode::UnknownInput,
            RenderError::UnknownTag { .. } => DiagnosticCode::UnknownTag,
            RenderError::Cancelled => DiagnosticCode::Cancelled,
        }
    }
}

pub type Rendered<T> = Result<T, RenderError>;

pub(crate) struct RenderPass<'a> {
    registry: &'a ComponentRegistry,
    strict_tags: bool,
    cancel: Option<&'a CancelSignal>,
    diagnostics: Diagnostics,
    /// `PostExecution` regions with the scope they appeared in.
    deferred: Vec<(Element, Scope<'a>)>,
    /// Actions contributed by the walk itself (`Ask.ReviewFile`).
    actions: Vec<PostAction>,
}

impl<'a> RenderPass<'a> {
    pub(crate) fn new(
        registry: &'a ComponentRegistry,
        strict_tags: bool,
        cancel: Option<&'a CancelSignal>,
    ) -> Self {
        Self {
            registry,
            strict_tags,
            cancel,
            diagnostics: Diagnostics::new(),
            deferred: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Renders the tree, then the post-execution regions.
    pub(crate) async fn run(
        &mut self,
        root: &Element,
        scope: &Scope<'a>,
        context: &RenderContext,
    ) -> Rendered<(String, Vec<PostAction>)> {
        let fragments = self.render_element(root, scope, context, &[]).await?;
        let text = join_fragments(&fragments);
        let actions = self.post_execution(context).await?;
        Ok((text, actions))
    }

    pub(crate) fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    fn check_cancel(&self) -> Rendered<()> {
        match self.cancel {
            Some(signal) if signal.is_cancelled() => Err(RenderError::Cancelled),
            _ => Ok(()),
        }
    }

    #[async_recursion]
    async fn render_nodes(
        &mut self,
        nodes: &[Node],
        scope: &Scope<'a>,
        context: &RenderContext,
        items: &'static [&'static str],
    ) -> Rendered<Vec<Fragment>> {
        let mut fragments = Vec::new();
        for node in nodes {
            self.check_cancel()?;
            match node {
                Node::Text(text) => fragments.push(Fragment::inline(text.clone())),
                Node::Expression(expression) => {
                    let value = scope.evaluate(expression)?;
                    fragments.push(Fragment::inline(value.to_string()));
                }
                Node::Element(element) => {
                    let child_context = if items.iter().any(|tag| *tag == element.tag()) {
                        context.item()
                    } else {
                        context.child()
                    };
                    fragments.extend(
                        self.render_element(element, scope, &child_context, items)
                            .await?,
                    );
                }
            }
        }
        Ok(fragments)
    }

    /// `items` are the item tags of the nearest content ancestor; they pass
    /// through control flow and unknown tags unchanged.
    #[async_recursion]
    async fn render_element(
        &mut self,
        element: &Element,
        scope: &Scope<'a>,
        context: &RenderContext,
        items: &'static [&'static str],
    ) -> Rendered<Vec<Fragment>> {
        self.check_cancel()?;
        trace!(tag = element.tag(), "render");
        let Some(component) = self.registry.get(element.tag()).cloned() else {
            if self.strict_tags {
                return Err(RenderError::UnknownTag {
                    tag: element.tag().to_string(),
                    position: element.position(),
                });
            }
            self.diagnostics.warn_at(
                element,
                DiagnosticCode::UnknownTag,
                format!("Unknown tag <{}>; rendering its children only", element.tag()),
            );
            return self
                .render_nodes(element.children(), scope, context, items)
                .await;
        };

        match component.capability() {
            Capability::Conditional => {
                if self.guard(element, scope)? {
                    self.render_nodes(element.children(), scope, context, items)
                        .await
                } else {
                    Ok(Vec::new())
                }
            }
            Capability::Loop => self.render_loop(element, scope, context, items).await,
            Capability::Input(input_type) => self.render_input(element, input_type, scope),
            Capability::Declarations | Capability::Silent => Ok(Vec::new()),
            Capability::PostExecution => {
                self.deferred.push((element.clone(), scope.clone()));
                Ok(Vec::new())
            }
            Capability::Action(_) => {
                self.diagnostics.warn_at(
                    element,
                    DiagnosticCode::MisplacedElement,
                    format!("<{}> only has an effect inside <PostExecution>", element.tag()),
                );
                Ok(Vec::new())
            }
            Capability::Content => {
                let attributes = self.resolve_attributes(element, scope, context).await?;
                let own = self.enter(element, &attributes, context);
                let envelope = component.envelope(&attributes);
                let child_context = if envelope.is_some() {
                    own.nested()
                } else {
                    own.child()
                };
                let children = self
                    .render_nodes(
                        element.children(),
                        scope,
                        &child_context,
                        component.item_tags(),
                    )
                    .await?;
                let props = Props {
                    element,
                    attributes: &attributes,
                    children: &children,
                    context: &own,
                };
                let body = component.render(&props, &mut self.diagnostics);
                let text = match envelope {
                    Some(envelope) => own.wrap(&envelope, &body),
                    None => body,
                };
                Ok(vec![Fragment {
                    tag: Some(element.tag().to_string()),
                    text,
                    layout: component.layout(),
                }])
            }
        }
    }

    /// Applies `delimiter` and `bare` attributes to the inherited context.
    fn enter(
        &mut self,
        element: &Element,
        attributes: &IndexMap<String, Value>,
        context: &RenderContext,
    ) -> RenderContext {
        let mut own = context.clone();
        if let Some(delimiter) = attributes.get("delimiter").filter(|v| !v.is_unset()) {
            match DelimiterStyle::from_str(delimiter.to_string().trim()) {
                Ok(style) => own = own.with_delimiter(style),
                Err(_) => self.diagnostics.warn_at(
                    element,
                    DiagnosticCode::InvalidAttribute,
                    format!(
                        "Unknown delimiter `{}`; expected xml, markdown or none",
                        delimiter
                    ),
                ),
            }
        }
        if attributes.get("bare").map(is_enabled).unwrap_or(false) {
            own = own.with_bare(true);
        }
        own
    }

    #[async_recursion]
    async fn resolve_attributes(
        &mut self,
        element: &Element,
        scope: &Scope<'a>,
        context: &RenderContext,
    ) -> Rendered<IndexMap<String, Value>> {
        let mut resolved = IndexMap::new();
        for (name, attribute) in element.attributes() {
            let value = match attribute {
                AttributeValue::Element(nested) => {
                    let fragments = self
                        .render_element(nested, scope, &context.item(), &[])
                        .await?;
                    Value::String(join_fragments(&fragments).trim().to_string())
                }
                other => scope.resolve_attribute(other)?,
            };
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }

    /// `If` condition: a boolean, a `=formula` string, a field reference or a
    /// formula expression.
    fn guard(&mut self, element: &Element, scope: &Scope<'a>) -> Rendered<bool> {
        let Some(condition) = element
            .attribute("when")
            .or_else(|| element.attribute("condition"))
        else {
            self.diagnostics.warn_at(
                element,
                DiagnosticCode::MissingAttribute,
                "<If> has no `when` condition and renders nothing",
            );
            return Ok(false);
        };
        Ok(match condition {
            AttributeValue::Bool(b) => *b,
            AttributeValue::String(s) if s.trim_start().starts_with('=') => {
                Formula::parse(s)?.evaluate_bool(scope)?
            }
            AttributeValue::String(s) => is_enabled(&Value::string(s.as_str())),
            AttributeValue::Expression(Expression::FieldRef(path)) => {
                scope.lookup(path).is_truthy()
            }
            AttributeValue::Expression(Expression::Formula(formula)) => {
                formula.evaluate_bool(scope)?
            }
            other => scope.resolve_attribute(other)?.is_truthy(),
        })
    }

    async fn render_loop(
        &mut self,
        element: &Element,
        scope: &Scope<'a>,
        context: &RenderContext,
        items: &'static [&'static str],
    ) -> Rendered<Vec<Fragment>> {
        let sequence = match element.attribute("items") {
            Some(attribute) => scope.resolve_attribute(attribute)?,
            None => {
                self.diagnostics.warn_at(
                    element,
                    DiagnosticCode::MissingAttribute,
                    "<ForEach> has no `items` and renders nothing",
                );
                Value::Unset
            }
        };
        let sequence = match sequence {
            Value::List(values) => values,
            Value::Map(map) => map
                .into_iter()
                .map(|(key, value)| {
                    let mut entry = IndexMap::new();
                    entry.insert("key".to_string(), Value::String(key));
                    entry.insert("value".to_string(), value);
                    Value::Map(entry)
                })
                .collect(),
            Value::Unset | Value::Placeholder(_) => Vec::new(),
            other => vec![other],
        };
        let binding = element.literal_str("as").unwrap_or(DEFAULT_LOOP_BINDING);
        let index = element.literal_str("index");

        let mut fragments = Vec::new();
        for (i, value) in sequence.into_iter().enumerate() {
            let mut inner = scope.bind(binding, value);
            if let Some(index) = index {
                inner = inner.bind(index, Value::Number(i as f64));
            }
            let iteration = self
                .render_nodes(element.children(), &inner, context, items)
                .await?;
            if iteration.iter().all(|f| f.layout == Layout::Inline) {
                // a text-only body becomes one line per iteration
                let line = join_fragments(&iteration).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if !fragments.is_empty() {
                    fragments.push(Fragment::inline("\n"));
                }
                fragments.push(Fragment::inline(line));
            } else {
                fragments.extend(iteration);
            }
        }
        Ok(fragments)
    }

    fn render_input(
        &mut self,
        element: &Element,
        input_type: InputType,
        scope: &Scope<'a>,
    ) -> Rendered<Vec<Fragment>> {
        let Some(name) = element.literal_str("name") else {
            return Ok(Vec::new());
        };
        let value = scope.input(name.trim())?;
        if input_type == InputType::ReviewFile
            && !value.is_empty()
            && !(scope.is_partial() && !scope.inputs().contains(name.trim()))
        {
            self.actions.push(PostAction::ReviewFile {
                file: value.to_string(),
                editor: element.literal_str("editor").map(str::to_string),
            });
        }
        let silent = element
            .attribute("silent")
            .and_then(AttributeValue::literal_value)
            .map(|v| is_enabled(&v))
            .unwrap_or(false);
        if silent {
            return Ok(Vec::new());
        }
        Ok(vec![Fragment::inline(value.to_string())])
    }

    async fn post_execution(&mut self, context: &RenderContext) -> Rendered<Vec<PostAction>> {
        let mut actions = std::mem::take(&mut self.actions);
        let deferred = std::mem::take(&mut self.deferred);
        for (region, scope) in &deferred {
            for child in region.child_elements() {
                self.check_cancel()?;
                let capability = self.registry.get(child.tag()).map(|c| c.capability());
                let Some(Capability::Action(kind)) = capability else {
                    self.diagnostics.warn_at(
                        child,
                        DiagnosticCode::MisplacedElement,
                        format!("<{}> is not a post-execution action", child.tag()),
                    );
                    continue;
                };
                let attributes = self.resolve_attributes(child, scope, context).await?;
                let body = join_fragments(
                    &self
                        .render_nodes(child.children(), scope, &context.item(), &[])
                        .await?,
                );
                match PostAction::from_attributes(kind, &attributes, body.trim()) {
                    Ok(action) => actions.push(action),
                    Err(missing) => self.diagnostics.warn_at(
                        child,
                        DiagnosticCode::MissingAttribute,
                        format!("<{}> needs a `{}` attribute", child.tag(), missing),
                    ),
                }
            }
        }
        Ok(actions)
    }
}
