//! Content helpers without envelopes: code fences, JSON, timestamps, ids.

use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};

use super::{Component, Layout, Props};
use crate::renderer::diagnostics::{DiagnosticCode, Diagnostics};
use crate::value::Value;

pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn components() -> Vec<Arc<dyn Component>> {
    vec![
        Arc::new(Code),
        Arc::new(Json),
        Arc::new(DateTime),
        Arc::new(Uuid),
    ]
}

pub(crate) fn pretty_json(value: &Value) -> String {
    let json: serde_json::Value = value.clone().into();
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| value.to_string())
}

/// Fenced code block; the body is the `content` attribute or the children.
pub struct Code;

impl Component for Code {
    fn tag(&self) -> &'static str {
        "Code"
    }

    fn render(&self, props: &Props<'_>, _diagnostics: &mut Diagnostics) -> String {
        let body = props
            .value("content")
            .map(|content| content.to_string())
            .unwrap_or_else(|| props.content());
        let language = props.string("language").unwrap_or_default();
        format!("```{}\n{}\n```", language, body.trim_matches('\n'))
    }
}

/// Pretty-printed JSON of the `data` attribute, or of the children when they
/// parse as JSON.
pub struct Json;

impl Component for Json {
    fn tag(&self) -> &'static str {
        "Json"
    }

    fn render(&self, props: &Props<'_>, diagnostics: &mut Diagnostics) -> String {
        if let Some(data) = props.value("data") {
            return pretty_json(data);
        }
        let content = props.content();
        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(json) => pretty_json(&Value::from(json)),
            Err(e) => {
                if !content.is_empty() {
                    diagnostics.warn_at(
                        props.element,
                        DiagnosticCode::InvalidAttribute,
                        format!("Json content is not valid JSON: {}", e),
                    );
                }
                content
            }
        }
    }
}

fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Current time. Output is not deterministic across renders.
pub struct DateTime;

impl Component for DateTime {
    fn tag(&self) -> &'static str {
        "DateTime"
    }

    fn layout(&self) -> Layout {
        Layout::Inline
    }

    fn render(&self, props: &Props<'_>, diagnostics: &mut Diagnostics) -> String {
        let format = match props.string("format") {
            Some(format) if is_valid_format(&format) => format,
            Some(format) => {
                diagnostics.warn_at(
                    props.element,
                    DiagnosticCode::InvalidAttribute,
                    format!("Invalid date format `{}`", format),
                );
                DEFAULT_DATETIME_FORMAT.to_string()
            }
            None => DEFAULT_DATETIME_FORMAT.to_string(),
        };
        if props.flag("utc") {
            chrono::Utc::now().format(&format).to_string()
        } else {
            chrono::Local::now().format(&format).to_string()
        }
    }
}

/// Random v4 UUID.
pub struct Uuid;

impl Component for Uuid {
    fn tag(&self) -> &'static str {
        "Uuid"
    }

    fn layout(&self) -> Layout {
        Layout::Inline
    }

    fn render(&self, _props: &Props<'_>, _diagnostics: &mut Diagnostics) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_validation() {
        assert!(is_valid_format("%Y-%m-%d"));
        assert!(!is_valid_format("%Q"));
    }

    #[test]
    fn test_pretty_json() {
        let value = Value::from(serde_json::json!({"a": [1, 2]}));
        assert_eq!(pretty_json(&value), "{\n  \"a\": [\n    1,\n    2\n  ]\n}");
    }
}
