//! Parse entry points: markup text to [`Element`].
//!
//! ```rust
//! use promptmark::parser::parse;
//!
//! let root = parse(r#"<Prompt name="p"><Task>Say hi</Task></Prompt>"#, "inline").unwrap();
//! assert_eq!(root.tag(), "Prompt");
//! ```

use std::path::Path;

use tracing::{debug, instrument};

use crate::analyzer::{Location, ParseError, ParseResult, TreeBuilder};
use crate::ast::Element;
use crate::preprocessor::{Preprocessor, TokenPreprocessor};
use crate::tokenizer::token::Tokenizer;

/// File suffix of prompt markup files.
pub const PROMPT_FILE_SUFFIX: &str = ".prompt";

/// Parses a complete document. `source_name` only appears in error locations.
#[instrument(level = "debug", skip(source))]
pub fn parse(source: &str, source_name: &str) -> ParseResult<Element> {
    let tokens = Tokenizer::new()
        .tokenize(source)
        .map_err(|e| ParseError::from_tokenizer(e, source_name))?;
    let tokens = TokenPreprocessor::new().process(tokens);
    debug!("{} tokens after preprocessing", tokens.len());
    TreeBuilder::new(source_name, &parse_fragment).build(tokens)
}

/// Reads and parses a markup file; the path becomes the source name.
pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<Element> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| ParseError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse(&source, &path.display().to_string())
}

/// Markup nested inside an expression, e.g. `title={<Ask.Text name="t" />}`.
/// Positions inside the fragment are relative to the fragment.
fn parse_fragment(source: &str, location: &Location) -> ParseResult<Element> {
    parse(source, &location.source_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AttributeValue, Expression, FieldPath, Node};

    #[test]
    fn test_parse_scenario_markup() {
        let root = parse(
            r#"<Prompt name="p"><Ask.Text name="who" label="Who"/><Task>Hello {inputs.who}</Task></Prompt>"#,
            "scenario",
        )
        .unwrap();
        assert_eq!(root.tag(), "Prompt");
        assert_eq!(root.literal_str("name"), Some("p"));
        let children: Vec<&Element> = root.child_elements().collect();
        assert_eq!(children[0].tag(), "Ask.Text");
        assert_eq!(
            children[1].children(),
            &[
                Node::Text("Hello ".to_string()),
                Node::Expression(Expression::FieldRef(FieldPath::input("who"))),
            ]
        );
    }

    #[test]
    fn test_leading_comments_and_position() {
        let root = parse("// comment\n/* block */\n<Prompt>\n  <Task/>\n</Prompt>\n", "p").unwrap();
        assert_eq!(root.position().map(|p| p.line), Some(3));
        let task = root.child_elements().next().unwrap();
        assert_eq!(task.position().map(|p| (p.line, p.column)), Some((4, 3)));
    }

    #[test]
    fn test_nested_element_attribute() {
        let root = parse(
            r#"<Role title={<Ask.Text name="title" />}>x</Role>"#,
            "nested",
        )
        .unwrap();
        match root.attribute("title") {
            Some(AttributeValue::Element(element)) => assert_eq!(element.tag(), "Ask.Text"),
            other => panic!("unexpected attribute {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("<Prompt><Task></Prompt>", "e"),
            Err(ParseError::MismatchedTag { .. })
        ));
        assert!(matches!(
            parse("<Prompt><Task>", "e"),
            Err(ParseError::UnclosedTag { .. })
        ));
        assert!(matches!(
            parse("<Prompt/><Prompt/>", "e"),
            Err(ParseError::MultipleRoots { .. })
        ));
        assert!(matches!(
            parse("<Prompt/> trailing", "e"),
            Err(ParseError::TextOutsideRoot { .. })
        ));
        assert!(matches!(
            parse("<Prompt><Tell.Me/></Prompt>", "e"),
            Err(ParseError::UnknownNamespace { .. })
        ));
        assert!(matches!(
            parse("<Prompt><Ask.Color/></Prompt>", "e"),
            Err(ParseError::UnknownNamespaceMember { .. })
        ));
        assert!(matches!(parse("   ", "e"), Err(ParseError::EmptyDocument { .. })));
        assert!(matches!(
            parse("<Prompt a=\"1\" a=\"2\"/>", "e"),
            Err(ParseError::DuplicateAttribute { .. })
        ));
        assert!(matches!(
            parse("<Prompt", "e"),
            Err(ParseError::Syntax { .. })
        ));
    }

    #[test]
    fn test_error_location_names_source() {
        let err = parse("<Prompt>\n  <Task>\n</Prompt>", "greeting.prompt").unwrap_err();
        let location = err.location().unwrap();
        assert_eq!(location.source_name, "greeting.prompt");
        assert_eq!(location.line, 3);
    }
}
