//! # Element Tree
//!
//! The in-memory representation of a prompt. A tree is produced either by the
//! [`parser`](crate::parser) or by direct construction with the builder methods
//! on [`Element`]:
//!
//! ```rust
//! use promptmark::ast::{Element, Expression, FieldPath};
//!
//! let prompt = Element::new("Prompt")
//!     .with_attribute("name", "greeting")
//!     .with_child(Element::new("Ask.Text").with_attribute("name", "who"))
//!     .with_child(
//!         Element::new("Task")
//!             .with_text("Hello ")
//!             .with_child(Expression::FieldRef(FieldPath::input("who"))),
//!     );
//! assert_eq!(prompt.children().len(), 2);
//! ```
//!
//! Trees are immutable once built. Attribute expressions are kept as
//! [`Expression`] values and only resolved during a render pass, so a tree built
//! before any input is known renders correctly once values arrive.

use core::fmt;

use indexmap::IndexMap;

use crate::eval::formula::Formula;
use crate::value::Value;

/// Root segment that addresses the input value map in a field path.
pub const INPUTS_ROOT: &str = "inputs";

/// Source position of an element, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One node of the prompt tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: String,
    attributes: IndexMap<String, AttributeValue>,
    children: Vec<Node>,
    position: Option<Position>,
}

impl Element {
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            position: None,
        }
    }

    pub fn with_attribute<S: Into<String>, V: Into<AttributeValue>>(
        mut self,
        name: S,
        value: V,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child<N: Into<Node>>(mut self, child: N) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Splits `Ask.Text` into `("Ask", "Text")`.
    pub fn namespace(&self) -> Option<(&str, &str)> {
        self.tag.split_once('.')
    }

    pub fn attributes(&self) -> &IndexMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Literal string attribute, or `None` when absent or not a string literal.
    pub fn literal_str(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name) {
            Some(AttributeValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Visits this element and every descendant, including elements held in
    /// attribute values, in document order.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Element)) {
        visit(self);
        for value in self.attributes.values() {
            value.walk_elements(visit);
        }
        for child in &self.children {
            if let Node::Element(element) = child {
                element.walk(visit);
            }
        }
    }
}

/// A child of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Expression(Expression),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Expression> for Node {
    fn from(expression: Expression) -> Self {
        Node::Expression(expression)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

/// Attribute value as written in the markup.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Number(f64),
    Bool(bool),
    Array(Vec<AttributeValue>),
    Object(IndexMap<String, AttributeValue>),
    Element(Box<Element>),
    Expression(Expression),
}

impl AttributeValue {
    /// Converts a literal attribute into a value. Expressions and nested
    /// elements need a render scope and return `None`.
    pub fn literal_value(&self) -> Option<Value> {
        match self {
            AttributeValue::String(s) => Some(Value::String(s.clone())),
            AttributeValue::Number(n) => Some(Value::Number(*n)),
            AttributeValue::Bool(b) => Some(Value::Bool(*b)),
            AttributeValue::Array(items) => items
                .iter()
                .map(AttributeValue::literal_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            AttributeValue::Object(map) => map
                .iter()
                .map(|(key, value)| value.literal_value().map(|v| (key.clone(), v)))
                .collect::<Option<IndexMap<_, _>>>()
                .map(Value::Map),
            AttributeValue::Element(_) | AttributeValue::Expression(_) => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            AttributeValue::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    fn walk_elements<'a>(&'a self, visit: &mut dyn FnMut(&'a Element)) {
        match self {
            AttributeValue::Element(element) => element.walk(visit),
            AttributeValue::Array(items) => {
                for item in items {
                    item.walk_elements(visit);
                }
            }
            AttributeValue::Object(map) => {
                for value in map.values() {
                    value.walk_elements(visit);
                }
            }
            _ => {}
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(items: Vec<&str>) -> Self {
        AttributeValue::Array(items.into_iter().map(AttributeValue::from).collect())
    }
}

impl From<Element> for AttributeValue {
    fn from(element: Element) -> Self {
        AttributeValue::Element(Box::new(element))
    }
}

impl From<Expression> for AttributeValue {
    fn from(expression: Expression) -> Self {
        AttributeValue::Expression(expression)
    }
}

/// Deferred expression, resolved against the input map during rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Dotted path such as `inputs.name` or `item.title`.
    FieldRef(FieldPath),
    /// Boolean/arithmetic formula.
    Formula(Formula),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::FieldRef(path) => write!(f, "{}", path),
            Expression::Formula(formula) => write!(f, "{}", formula.source()),
        }
    }
}

/// `inputs.user.name` -> `["inputs", "user", "name"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(pub Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Shorthand for `inputs.<name>`.
    pub fn input(name: &str) -> Self {
        Self(vec![INPUTS_ROOT.to_string(), name.to_string()])
    }

    pub fn parse(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }

    pub fn root(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Name of the referenced input when the path starts with `inputs.`.
    pub fn input_name(&self) -> Option<&str> {
        match self.0.as_slice() {
            [root, name, ..] if root == INPUTS_ROOT => Some(name),
            _ => None,
        }
    }

    /// Segments after the input name, e.g. `["name"]` for `inputs.user.name`.
    pub fn input_properties(&self) -> &[String] {
        if self.input_name().is_some() {
            &self.0[2..]
        } else {
            &[]
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
