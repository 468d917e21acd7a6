//! Name resolution for field references.
//!
//! A [`Scope`] answers `inputs.x`, loop bindings such as `item.title`, and
//! bare identifiers used inside formulas. In discovery mode nothing is known
//! yet and every reference resolves to a [`Placeholder`]. In render mode
//! `inputs.x` must name a discovered input and resolves, in order, to the
//! supplied value, the input's default,
//! the unset value for optional or skipped inputs, a `{x}` marker in partial
//! renders, and otherwise fails with [`ScopeError::MissingInput`].

use thiserror::Error;

use super::formula::{EvaluationError, FieldLookup};
use crate::ast::{AttributeValue, Expression, FieldPath, INPUTS_ROOT};
use crate::input::requirement::{DefaultValue, InputRequirement};
use crate::value::{InputValues, Placeholder, Value};

/// Bound on chains of `default={inputs.other}` references.
const MAX_DEFAULT_DEPTH: usize = 16;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScopeError {
    #[error("Missing value for required input `{0}`")]
    MissingInput(String),
    #[error("Reference to undeclared input `{0}`")]
    UnknownInput(String),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

pub type ScopeResult<T> = Result<T, ScopeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    Discovery,
    Render,
}

#[derive(Debug, Clone)]
pub struct Scope<'a> {
    mode: ScopeMode,
    inputs: &'a InputValues,
    requirements: &'a [InputRequirement],
    bindings: Vec<(String, Value)>,
    partial: bool,
}

impl<'a> Scope<'a> {
    pub fn discovery(inputs: &'a InputValues) -> Self {
        Self {
            mode: ScopeMode::Discovery,
            inputs,
            requirements: &[],
            bindings: Vec::new(),
            partial: false,
        }
    }

    pub fn render(
        inputs: &'a InputValues,
        requirements: &'a [InputRequirement],
        partial: bool,
    ) -> Self {
        Self {
            mode: ScopeMode::Render,
            inputs,
            requirements,
            bindings: Vec::new(),
            partial,
        }
    }

    pub fn mode(&self) -> ScopeMode {
        self.mode
    }

    pub fn is_discovery(&self) -> bool {
        self.mode == ScopeMode::Discovery
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn inputs(&self) -> &'a InputValues {
        self.inputs
    }

    pub fn requirement(&self, name: &str) -> Option<&'a InputRequirement> {
        self.requirements.iter().find(|r| r.name == name)
    }

    /// A child scope with one more loop binding; inner bindings shadow outer ones.
    pub fn bind<S: Into<String>>(&self, name: S, value: Value) -> Scope<'a> {
        let mut scope = self.clone();
        scope.bindings.push((name.into(), value));
        scope
    }

    fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }

    /// Value of a declared input.
    pub fn input(&self, name: &str) -> ScopeResult<Value> {
        self.input_at_depth(name, 0)
    }

    fn input_at_depth(&self, name: &str, depth: usize) -> ScopeResult<Value> {
        if self.is_discovery() {
            return Ok(Value::Placeholder(Placeholder::new([INPUTS_ROOT, name])));
        }
        let Some(requirement) = self.requirement(name) else {
            if self.partial {
                return Ok(Value::String(format!("{{{}}}", name)));
            }
            return Err(ScopeError::UnknownInput(name.to_string()));
        };
        if let Some(value) = self.inputs.get(name).filter(|v| !v.is_unset()) {
            return Ok(value.clone());
        }
        match &requirement.default {
            Some(DefaultValue::Literal(value)) => return Ok(value.clone()),
            Some(DefaultValue::Reference(other)) if depth < MAX_DEFAULT_DEPTH => {
                if let Ok(value) = self.input_at_depth(other, depth + 1) {
                    if !value.is_unset() {
                        return Ok(value);
                    }
                }
            }
            _ => {}
        }
        if !requirement.required || self.inputs.contains(name) {
            // optional, or deliberately skipped by the input iterator
            Ok(Value::Unset)
        } else if self.partial {
            Ok(Value::String(format!("{{{}}}", name)))
        } else {
            Err(ScopeError::MissingInput(name.to_string()))
        }
    }

    /// Resolves a field reference. `inputs.*` paths must name a declared
    /// input; a bare root is a loop binding or, failing that, an input name.
    pub fn resolve_path(&self, path: &FieldPath) -> ScopeResult<Value> {
        let segments = path.segments();
        let (base, properties) = match segments {
            [root, name, rest @ ..] if root == INPUTS_ROOT => (self.input(name)?, rest),
            [root, rest @ ..] => match self.binding(root) {
                Some(value) => (value.clone(), rest),
                None if self.is_discovery() => {
                    (Value::Placeholder(Placeholder::new([root.as_str()])), rest)
                }
                None => (self.lenient_input(root), rest),
            },
            [] => return Ok(Value::Unset),
        };
        Ok(properties
            .iter()
            .fold(base, |value, property| value.property(property)))
    }

    fn lenient_input(&self, name: &str) -> Value {
        match self.input(name) {
            Ok(value) => value,
            Err(_) => Value::Unset,
        }
    }

    pub fn evaluate(&self, expression: &Expression) -> ScopeResult<Value> {
        match expression {
            Expression::FieldRef(path) => self.resolve_path(path),
            Expression::Formula(formula) => Ok(formula.evaluate(self)?),
        }
    }

    /// Resolves an attribute to a value. Nested elements have no value and
    /// resolve to unset; components render them separately.
    pub fn resolve_attribute(&self, attribute: &AttributeValue) -> ScopeResult<Value> {
        Ok(match attribute {
            AttributeValue::String(s) => Value::String(s.clone()),
            AttributeValue::Number(n) => Value::Number(*n),
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Array(items) => Value::List(
                items
                    .iter()
                    .map(|item| self.resolve_attribute(item))
                    .collect::<ScopeResult<Vec<_>>>()?,
            ),
            AttributeValue::Object(map) => Value::Map(
                map.iter()
                    .map(|(key, value)| Ok((key.clone(), self.resolve_attribute(value)?)))
                    .collect::<ScopeResult<_>>()?,
            ),
            AttributeValue::Expression(expression) => self.evaluate(expression)?,
            AttributeValue::Element(_) => Value::Unset,
        })
    }
}

/// Formulas never fail on names: anything unresolvable is unset.
impl FieldLookup for Scope<'_> {
    fn lookup(&self, path: &FieldPath) -> Value {
        match self.resolve_path(path) {
            Ok(value) => value,
            Err(_) => Value::Unset,
        }
    }
}
