use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Kind of answer an input expects.
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
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum InputType {
    Text,
    Select,
    #[serde(rename = "multiselect")]
    #[strum(serialize = "multiselect")]
    MultiSelect,
    Number,
    Boolean,
    File,
    Secret,
    Editor,
    ReviewFile,
}

impl InputType {
    /// Maps an `Ask.*` member name to its input type.
    pub fn from_ask_member(member: &str) -> Option<Self> {
        match member {
            "Confirm" => Some(InputType::Boolean),
            "MultiSelect" => Some(InputType::MultiSelect),
            "ReviewFile" => Some(InputType::ReviewFile),
            "Option" => None,
            other => InputType::from_str(&other.to_ascii_lowercase()).ok(),
        }
    }

    /// Free-text answers: the value is kept as a string.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            InputType::Text
                | InputType::Secret
                | InputType::Editor
                | InputType::File
                | InputType::ReviewFile
        )
    }

    pub fn is_path(&self) -> bool {
        matches!(self, InputType::File | InputType::ReviewFile)
    }

    /// Value substituted by the `default` missing-value policy.
    pub fn empty_value(&self) -> Value {
        match self {
            InputType::Number => Value::Number(0.0),
            InputType::Boolean => Value::Bool(false),
            InputType::MultiSelect => Value::List(Vec::new()),
            _ => Value::String(String::new()),
        }
    }
}

/// Default of an input: a literal, or the value of another input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum DefaultValue {
    Literal(Value),
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new<V: Into<String>, L: Into<String>>(value: V, label: L) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self == &Constraints::default()
    }
}

/// Where a requirement was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum InputOrigin {
    /// An `Ask.*` element in the prompt body.
    Inline,
    /// An `Ask.*` element inside the top-level `<Inputs>` block.
    Declared,
}

/// One input a prompt needs before it can be rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRequirement {
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    pub origin: InputOrigin,
    #[serde(default)]
    pub silent: bool,
}

impl InputRequirement {
    pub fn new<S: Into<String>>(name: S, input_type: InputType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            description: None,
            input_type,
            required: true,
            default: None,
            constraints: Constraints::default(),
            origin: InputOrigin::Inline,
            silent: false,
        }
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Same logical input declared twice with different settings.
    pub fn conflicts_with(&self, other: &InputRequirement) -> bool {
        self.input_type != other.input_type
            || self.required != other.required
            || self.constraints != other.constraints
            || self.default != other.default
    }
}
