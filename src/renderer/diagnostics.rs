use serde::Serialize;

use crate::ast::{Element, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DiagnosticCode {
    UnknownTag,
    UnknownPreset,
    UnknownProvider,
    UnknownLevel,
    DuplicateInput,
    MisplacedElement,
    MissingAttribute,
    InvalidAttribute,
    Evaluation,
    MissingInput,
    UnknownInput,
    Discovery,
    Cancelled,
}

/// A recoverable problem, or the reason a render failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(severity: Severity, code: DiagnosticCode, message: S) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            tag: None,
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, element: &Element) -> Self {
        self.tag = Some(element.tag().to_string());
        self.set_position(element.position());
        self
    }

    fn set_position(&mut self, position: Option<Position>) {
        if let Some(position) = position {
            self.line = Some(position.line);
            self.column = Some(position.column);
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Diagnostics collected during one walk. Warnings are also logged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn<S: Into<String>>(&mut self, code: DiagnosticCode, message: S) {
        let diagnostic = Diagnostic::new(Severity::Warning, code, message);
        tracing::warn!(code = %diagnostic.code, "{}", diagnostic.message);
        self.0.push(diagnostic);
    }

    /// Warning attributed to an element.
    pub fn warn_at<S: Into<String>>(&mut self, element: &Element, code: DiagnosticCode, message: S) {
        let diagnostic = Diagnostic::new(Severity::Warning, code, message).at(element);
        tracing::warn!(
            code = %diagnostic.code,
            tag = element.tag(),
            "{}",
            diagnostic.message
        );
        self.0.push(diagnostic);
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, diagnostics: I) {
        self.0.extend(diagnostics);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_carries_element_position() {
        let element = Element::new("Role").with_position(Position { line: 3, column: 5 });
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn_at(&element, DiagnosticCode::UnknownPreset, "unknown preset `x`");
        let collected = diagnostics.into_vec();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].tag.as_deref(), Some("Role"));
        assert_eq!(collected[0].line, Some(3));
        assert!(!collected[0].is_error());
    }

    #[test]
    fn test_serialized_codes() {
        let diagnostic = Diagnostic::new(Severity::Error, DiagnosticCode::UnknownTag, "x");
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["code"], "unknown-tag");
        assert_eq!(json["severity"], "error");
        assert!(json.get("tag").is_none());
    }
}
