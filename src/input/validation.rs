//! Field-level validation of submitted values.
//!
//! Validation both checks and coerces: `"42"` submitted for a number input is
//! stored as `42`, `"yes"` for a boolean as `true`, `"a, b"` for a
//! multiselect as `["a", "b"]`. Failures are returned as data, never raised.

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use super::requirement::{InputRequirement, InputType};
use crate::value::Value;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "camelCase")]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },
    #[error("{field} must be a {expected}, got `{found}`")]
    InvalidType {
        field: String,
        expected: String,
        found: String,
    },
    #[error("{field} does not match pattern `{pattern}`")]
    PatternMismatch { field: String, pattern: String },
    #[error("{field} has an invalid pattern `{pattern}`: {message}")]
    InvalidPattern {
        field: String,
        pattern: String,
        message: String,
    },
    #[error("{field} must be at least {min}")]
    BelowMinimum { field: String, min: f64 },
    #[error("{field} must be at most {max}")]
    AboveMaximum { field: String, max: f64 },
    #[error("{field}: `{value}` is not an allowed choice")]
    InvalidChoice { field: String, value: String },
    #[error("{field}: file must end with one of {}", .allowed.join(", "))]
    InvalidExtension { field: String, allowed: Vec<String> },
    #[error("No input is awaiting a value")]
    NotAccepting,
}

pub type ValidationResult = Result<Value, Vec<ValidationError>>;

/// Validates `value` against `requirement`, returning the coerced value.
/// An empty value passes only when the input is optional.
#[tracing::instrument(level = "debug", skip(requirement), fields(input = %requirement.name))]
pub fn validate(requirement: &InputRequirement, value: &Value) -> ValidationResult {
    let field = requirement.name.as_str();
    if value.is_empty() {
        return if requirement.required {
            Err(vec![ValidationError::Required {
                field: field.to_string(),
            }])
        } else {
            match value {
                Value::String(_) if requirement.input_type.is_text_like() => Ok(value.clone()),
                _ => Ok(requirement.input_type.empty_value()),
            }
        };
    }

    let coerced = coerce(requirement.input_type, field, value).map_err(|e| vec![e])?;
    let errors = check_constraints(requirement, &coerced);
    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

fn invalid_type(field: &str, expected: InputType, value: &Value) -> ValidationError {
    ValidationError::InvalidType {
        field: field.to_string(),
        expected: expected.to_string(),
        found: value.to_string(),
    }
}

fn coerce(input_type: InputType, field: &str, value: &Value) -> Result<Value, ValidationError> {
    match input_type {
        InputType::Number => value
            .as_number()
            .filter(|n| n.is_finite())
            .map(Value::Number)
            .ok_or_else(|| invalid_type(field, input_type, value)),
        InputType::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Number(n) if *n == 0.0 || *n == 1.0 => Ok(Value::Bool(*n == 1.0)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" | "on" => Ok(Value::Bool(true)),
                "false" | "no" | "n" | "0" | "off" => Ok(Value::Bool(false)),
                _ => Err(invalid_type(field, input_type, value)),
            },
            _ => Err(invalid_type(field, input_type, value)),
        },
        InputType::MultiSelect => match value {
            Value::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            )),
            Value::String(s) => Ok(Value::List(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(Value::string)
                    .collect(),
            )),
            _ => Err(invalid_type(field, input_type, value)),
        },
        _ => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            Value::Number(_) | Value::Bool(_) => Ok(Value::String(value.to_string())),
            _ => Err(invalid_type(field, input_type, value)),
        },
    }
}

fn check_constraints(requirement: &InputRequirement, value: &Value) -> Vec<ValidationError> {
    let field = requirement.name.as_str();
    let constraints = &requirement.constraints;
    let mut errors = Vec::new();

    // measured quantity for min/max: numeric value, selection count or text length
    let measure = match value {
        Value::Number(n) => Some(*n),
        Value::List(items) => Some(items.len() as f64),
        Value::String(s) if requirement.input_type.is_text_like() => {
            Some(s.chars().count() as f64)
        }
        _ => None,
    };
    if let Some(measure) = measure {
        if let Some(min) = constraints.min.filter(|min| measure < *min) {
            errors.push(ValidationError::BelowMinimum {
                field: field.to_string(),
                min,
            });
        }
        if let Some(max) = constraints.max.filter(|max| measure > *max) {
            errors.push(ValidationError::AboveMaximum {
                field: field.to_string(),
                max,
            });
        }
    }

    if let (Some(pattern), Value::String(text)) = (&constraints.pattern, value) {
        match Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(re) if re.is_match(text) => {}
            Ok(_) => errors.push(ValidationError::PatternMismatch {
                field: field.to_string(),
                pattern: pattern.clone(),
            }),
            Err(e) => errors.push(ValidationError::InvalidPattern {
                field: field.to_string(),
                pattern: pattern.clone(),
                message: e.to_string(),
            }),
        }
    }

    if !constraints.choices.is_empty() {
        let selected: Vec<String> = match value {
            Value::List(items) => items.iter().map(Value::to_string).collect(),
            other if requirement.input_type == InputType::Select => vec![other.to_string()],
            _ => Vec::new(),
        };
        for choice in selected {
            if !constraints.choices.iter().any(|c| c.value == choice) {
                errors.push(ValidationError::InvalidChoice {
                    field: field.to_string(),
                    value: choice,
                });
            }
        }
    }

    if requirement.input_type.is_path() && !constraints.extensions.is_empty() {
        let path = value.to_string().to_ascii_lowercase();
        let accepted = constraints.extensions.iter().any(|extension| {
            let extension = extension.trim_start_matches('.').to_ascii_lowercase();
            path.ends_with(&format!(".{}", extension))
        });
        if !accepted {
            errors.push(ValidationError::InvalidExtension {
                field: field.to_string(),
                allowed: constraints.extensions.clone(),
            });
        }
    }

    errors
}
