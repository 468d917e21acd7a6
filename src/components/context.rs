use crate::provider::{DelimiterStyle, ProviderAdaptation};

/// Heading levels stop at `######`.
const MAX_HEADING_LEVEL: usize = 6;

/// Section label used by the delimiter envelope: `<label>` in xml, `## Title`
/// in markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub label: String,
    pub title: String,
}

impl Envelope {
    pub fn new<L: Into<String>, T: Into<String>>(label: L, title: T) -> Self {
        Self {
            label: label.into(),
            title: title.into(),
        }
    }
}

/// Formatting state inherited down the tree.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub adaptation: &'static ProviderAdaptation,
    pub delimiter: DelimiterStyle,
    /// Set by a `bare` ancestor: no envelopes below it.
    pub bare: bool,
    /// Rendered as an item of its parent, which supplies the framing.
    pub as_item: bool,
    /// Number of enclosing envelopes.
    pub depth: usize,
    /// Spaces to indent xml envelope bodies by.
    pub indent: Option<usize>,
}

impl RenderContext {
    pub fn new(adaptation: &'static ProviderAdaptation) -> Self {
        Self {
            adaptation,
            delimiter: adaptation.delimiter,
            bare: false,
            as_item: false,
            depth: 0,
            indent: None,
        }
    }

    pub fn with_indent(mut self, indent: Option<usize>) -> Self {
        self.indent = indent.filter(|n| *n > 0);
        self
    }

    pub fn with_delimiter(mut self, delimiter: DelimiterStyle) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_bare(mut self, bare: bool) -> Self {
        self.bare = self.bare || bare;
        self
    }

    /// Context for an item child.
    pub fn item(&self) -> Self {
        Self {
            as_item: true,
            ..self.clone()
        }
    }

    /// Context for the children of an element without an envelope.
    pub fn child(&self) -> Self {
        Self {
            as_item: false,
            ..self.clone()
        }
    }

    /// Context for the children of an enveloped element.
    pub fn nested(&self) -> Self {
        Self {
            as_item: false,
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    /// Wraps `body` in the active delimiter style. Blank bodies vanish.
    pub fn wrap(&self, envelope: &Envelope, body: &str) -> String {
        let body = body.trim();
        if body.is_empty() {
            return String::new();
        }
        if self.bare || self.as_item {
            return body.to_string();
        }
        match self.delimiter {
            DelimiterStyle::Xml => format!(
                "<{label}>\n{}\n</{label}>",
                self.indented(body),
                label = envelope.label
            ),
            DelimiterStyle::Markdown => {
                let level = (2 + self.depth).min(MAX_HEADING_LEVEL);
                format!("{} {}\n\n{}", "#".repeat(level), envelope.title, body)
            }
            DelimiterStyle::None => body.to_string(),
        }
    }

    fn indented(&self, body: &str) -> String {
        match self.indent {
            Some(width) => {
                let pad = " ".repeat(width);
                body.lines()
                    .map(|line| {
                        if line.trim().is_empty() {
                            String::new()
                        } else {
                            format!("{}{}", pad, line)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            None => body.to_string(),
        }
    }
}

/// `Success Criteria` → `success_criteria`.
pub fn label_of(title: &str) -> String {
    let mut label = String::new();
    for c in title.trim().chars() {
        if c.is_alphanumeric() {
            label.extend(c.to_lowercase());
        } else if !label.ends_with('_') {
            label.push('_');
        }
    }
    let label = label.trim_matches('_').to_string();
    if label.is_empty() {
        "section".to_string()
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{adaptation, ProviderId};
    use pretty_assertions::assert_eq;

    fn role() -> Envelope {
        Envelope::new("role", "Role")
    }

    #[test]
    fn test_xml_envelope() {
        let context = RenderContext::new(adaptation(ProviderId::Anthropic));
        assert_eq!(context.wrap(&role(), " body "), "<role>\nbody\n</role>");
        let indented = context.clone().with_indent(Some(2));
        assert_eq!(
            indented.wrap(&role(), "a\n\nb"),
            "<role>\n  a\n\n  b\n</role>"
        );
    }

    #[test]
    fn test_markdown_heading_levels() {
        let context = RenderContext::new(adaptation(ProviderId::OpenAI));
        assert_eq!(context.wrap(&role(), "body"), "## Role\n\nbody");
        let deep = context.nested().nested().nested().nested().nested();
        assert_eq!(deep.wrap(&role(), "body"), "###### Role\n\nbody");
    }

    #[test]
    fn test_bare_item_and_empty() {
        let context = RenderContext::new(adaptation(ProviderId::Anthropic));
        assert_eq!(context.item().wrap(&role(), "body"), "body");
        assert_eq!(context.clone().with_bare(true).wrap(&role(), "body"), "body");
        assert_eq!(
            context
                .clone()
                .with_delimiter(DelimiterStyle::None)
                .wrap(&role(), "body"),
            "body"
        );
        assert_eq!(context.wrap(&role(), "  \n "), "");
    }

    #[test]
    fn test_label_of() {
        assert_eq!(label_of("Success Criteria"), "success_criteria");
        assert_eq!(label_of("  API / Design! "), "api_design");
        assert_eq!(label_of("!!"), "section");
    }
}
