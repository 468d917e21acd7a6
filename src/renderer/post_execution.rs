//! Side effects requested by a prompt. The renderer only describes them; the
//! caller decides whether to run them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Action elements allowed inside `<PostExecution>`; `Display` gives the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum ActionKind {
    ReviewFile,
    OpenUrl,
    RunCommand,
    WriteFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PostAction {
    #[serde(rename_all = "camelCase")]
    ReviewFile {
        file: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        editor: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    OpenUrl {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        browser: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RunCommand {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    WriteFile { path: String, content: String },
}

fn text(attributes: &IndexMap<String, Value>, name: &str) -> Option<String> {
    attributes
        .get(name)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string().trim().to_string())
}

impl PostAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PostAction::ReviewFile { .. } => ActionKind::ReviewFile,
            PostAction::OpenUrl { .. } => ActionKind::OpenUrl,
            PostAction::RunCommand { .. } => ActionKind::RunCommand,
            PostAction::WriteFile { .. } => ActionKind::WriteFile,
        }
    }

    /// Builds an action from resolved attributes. `body` is the rendered
    /// children of the action element. Returns the name of the first missing
    /// attribute on failure.
    pub fn from_attributes(
        kind: ActionKind,
        attributes: &IndexMap<String, Value>,
        body: &str,
    ) -> Result<PostAction, &'static str> {
        match kind {
            ActionKind::ReviewFile => Ok(PostAction::ReviewFile {
                file: text(attributes, "file").ok_or("file")?,
                editor: text(attributes, "editor"),
            }),
            ActionKind::OpenUrl => Ok(PostAction::OpenUrl {
                url: text(attributes, "url").ok_or("url")?,
                browser: text(attributes, "browser"),
            }),
            ActionKind::RunCommand => Ok(PostAction::RunCommand {
                command: text(attributes, "command")
                    .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
                    .ok_or("command")?,
                cwd: text(attributes, "cwd"),
            }),
            ActionKind::WriteFile => {
                let path = text(attributes, "path").ok_or("path")?;
                let content = match attributes.get("content").filter(|v| !v.is_unset()) {
                    Some(value) => value.to_string(),
                    None => body.to_string(),
                };
                Ok(PostAction::WriteFile { path, content })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(pairs: &[(&str, &str)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), Value::string(*value)))
            .collect()
    }

    #[test]
    fn test_write_file_prefers_content_attribute() {
        let action = PostAction::from_attributes(
            ActionKind::WriteFile,
            &attributes(&[("path", "out.md"), ("content", "hello")]),
            "ignored",
        )
        .unwrap();
        assert_eq!(
            action,
            PostAction::WriteFile {
                path: "out.md".to_string(),
                content: "hello".to_string()
            }
        );
        let from_body =
            PostAction::from_attributes(ActionKind::WriteFile, &attributes(&[("path", "a")]), "b")
                .unwrap();
        assert_eq!(from_body.kind(), ActionKind::WriteFile);
    }

    #[test]
    fn test_action_tags_are_registered() {
        use crate::components::{builtin_registry, Capability, Component};
        use strum::IntoEnumIterator;

        let registry = builtin_registry();
        for kind in ActionKind::iter() {
            let component = registry.get(&kind.to_string()).unwrap();
            assert_eq!(component.capability(), Capability::Action(kind));
        }
        assert_eq!(ActionKind::ReviewFile.to_string(), "ReviewFile");
        assert!(registry.get("WriteFile").is_some());
    }

    #[test]
    fn test_missing_attribute() {
        assert_eq!(
            PostAction::from_attributes(ActionKind::OpenUrl, &IndexMap::new(), ""),
            Err("url")
        );
    }

    #[test]
    fn test_serialized_shape() {
        let action = PostAction::ReviewFile {
            file: "a.rs".to_string(),
            editor: None,
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            serde_json::json!({"type": "reviewFile", "file": "a.rs"})
        );
    }
}
