//! # Components
//!
//! Every built-in tag maps to a [`Component`]: a pure function from resolved
//! attributes, already-rendered children and the [`RenderContext`] to one text
//! fragment. Tags are looked up in a [`ComponentRegistry`] populated once at
//! startup; a tag with no registered component is reported by the renderer as
//! unknown and its children render in its place.
//!
//! ```text
//! Element ─► attributes resolved against Scope ─┐
//!         └► children rendered (items marked) ──┼─► Component::render ─► envelope ─► Fragment
//!                                  RenderContext ┘
//! ```
//!
//! Components that steer the walk itself (`If`, `ForEach`, `Ask.*`, `Inputs`,
//! `PostExecution` and its actions) are registered with a non-content
//! [`Capability`]; the renderer handles them and never calls their `render`.

pub mod composite;
pub mod content;
pub mod context;
pub mod control;
pub mod structural;

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::ast::Element;
use crate::input::requirement::InputType;
use crate::renderer::diagnostics::Diagnostics;
use crate::renderer::post_execution::ActionKind;
use crate::value::Value;

pub use context::{Envelope, RenderContext};

/// How the renderer treats an element with this component's tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Renders children, then text through [`Component::render`].
    Content,
    /// `If`
    Conditional,
    /// `ForEach`
    Loop,
    /// `Ask.*`: renders the collected value.
    Input(InputType),
    /// `Inputs`: declarations only, renders nothing.
    Declarations,
    /// Contributes nothing to the text.
    Silent,
    /// Evaluated after the text is finalized.
    PostExecution,
    Action(ActionKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// A paragraph of its own.
    Block,
    /// Flows with the surrounding text.
    Inline,
}

/// A rendered piece of text and the tag that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub tag: Option<String>,
    pub text: String,
    pub layout: Layout,
}

impl Fragment {
    pub fn inline<S: Into<String>>(text: S) -> Self {
        Self {
            tag: None,
            text: text.into(),
            layout: Layout::Inline,
        }
    }

    pub fn block<S: Into<String>>(tag: &str, text: S) -> Self {
        Self {
            tag: Some(tag.to_string()),
            text: text.into(),
            layout: Layout::Block,
        }
    }

    pub fn is_from(&self, tags: &[&str]) -> bool {
        match &self.tag {
            Some(own) => tags.iter().any(|tag| tag == own),
            None => false,
        }
    }
}

/// Joins sibling fragments. Inline fragments run together; blocks are
/// separated from their neighbours by one blank line.
pub fn join_fragments<'f, I>(fragments: I) -> String
where
    I: IntoIterator<Item = &'f Fragment>,
{
    let mut out = String::new();
    let mut after_block = false;
    for fragment in fragments {
        match fragment.layout {
            Layout::Block => {
                let text = fragment.text.trim();
                if text.is_empty() {
                    continue;
                }
                let kept = out.trim_end().len();
                out.truncate(kept);
                if !out.is_empty() {
                    out.push_str("\n\n");
                }
                out.push_str(text);
                after_block = true;
            }
            Layout::Inline => {
                if after_block {
                    let text = fragment.text.trim_start();
                    if text.is_empty() {
                        continue;
                    }
                    out.push_str("\n\n");
                    out.push_str(text);
                } else {
                    out.push_str(&fragment.text);
                }
                after_block = false;
            }
        }
    }
    out
}

/// Non-empty parts separated by blank lines.
pub fn paragraphs<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .filter_map(|part| {
            let part = part.as_ref().trim();
            (!part.is_empty()).then(|| part.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// What a component sees when it renders.
pub struct Props<'a> {
    pub element: &'a Element,
    pub attributes: &'a IndexMap<String, Value>,
    pub children: &'a [Fragment],
    pub context: &'a RenderContext,
}

impl<'a> Props<'a> {
    /// Attribute value, ignoring unset ones.
    pub fn value(&self, name: &str) -> Option<&'a Value> {
        self.attributes.get(name).filter(|value| !value.is_unset())
    }

    /// Attribute as display text, ignoring blank ones.
    pub fn string(&self, name: &str) -> Option<String> {
        self.value(name)
            .map(|value| value.to_string().trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn flag(&self, name: &str) -> bool {
        self.value(name).map(is_enabled).unwrap_or(false)
    }

    /// A list attribute; a string is read as a comma separated list.
    pub fn list(&self, name: &str) -> Vec<String> {
        match self.value(name) {
            Some(Value::List(items)) => items
                .iter()
                .map(|item| item.to_string().trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            Some(other) => vec![other.to_string()],
            None => Vec::new(),
        }
    }

    /// Text of the children rendered as items of this component.
    pub fn items(&self, tags: &[&str]) -> Vec<String> {
        self.children
            .iter()
            .filter(|fragment| fragment.is_from(tags))
            .map(|fragment| fragment.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// All children joined.
    pub fn content(&self) -> String {
        join_fragments(self.children).trim().to_string()
    }

    /// Children other than items, joined.
    pub fn content_without(&self, tags: &[&str]) -> String {
        join_fragments(self.children.iter().filter(|f| !f.is_from(tags)))
            .trim()
            .to_string()
    }
}

/// Truthiness of a flag attribute; the strings `false`, `no` and `0` are off.
pub fn is_enabled(value: &Value) -> bool {
    match value {
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "no" | "0" | "off"
        ),
        other => other.is_truthy(),
    }
}

pub trait Component: Send + Sync {
    fn tag(&self) -> &str;

    fn capability(&self) -> Capability {
        Capability::Content
    }

    fn layout(&self) -> Layout {
        Layout::Block
    }

    /// Child tags rendered without their envelope for this component to compose.
    fn item_tags(&self) -> &'static [&'static str] {
        &[]
    }

    /// Label and heading of the delimiter envelope, if the component has one.
    fn envelope(&self, _attributes: &IndexMap<String, Value>) -> Option<Envelope> {
        None
    }

    fn render(&self, props: &Props<'_>, _diagnostics: &mut Diagnostics) -> String {
        props.content()
    }
}

/// Tag name → component lookup.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in component.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for component in structural::components()
            .into_iter()
            .chain(composite::components())
            .chain(content::components())
            .chain(control::components())
        {
            registry.register(component);
        }
        registry
    }

    /// Registers a component, replacing any previous one for the same tag.
    pub fn register(&mut self, component: Arc<dyn Component>) {
        self.components
            .insert(component.tag().to_string(), component);
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<dyn Component>> {
        self.components.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.components.contains_key(tag)
    }

    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.components.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

lazy_static! {
    static ref BUILTIN_REGISTRY: Arc<ComponentRegistry> = Arc::new(ComponentRegistry::builtin());
}

/// The shared built-in registry.
pub fn builtin_registry() -> Arc<ComponentRegistry> {
    Arc::clone(&BUILTIN_REGISTRY)
}
