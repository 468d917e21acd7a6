//! # Tree Builder
//!
//! Folds the preprocessed token stream into a single [`Element`] using an
//! explicit stack of open elements.
//!
//! Text runs are normalised when their element closes, because the rules
//! depend on a run's place among its siblings:
//!
//! * whitespace-only text that contains a line break is dropped
//! * inner lines are stripped on both sides, line breaks are kept
//! * the first child loses leading blank lines, the last child trailing ones
//! * HTML entities are decoded

use std::borrow::Cow;

use indexmap::IndexMap;

use super::core::{Location, ParseError, ParseResult};
use super::expression::{parse_attribute_expression, parse_child_expression, FragmentParser};
use super::tags::{check_tag, NamespaceCheck};
use crate::ast::{AttributeValue, Element, Node};
use crate::tokenizer::token::{RawAttribute, RawAttributeValue, Token, TokenSpan};

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Decodes `&lt; &gt; &amp; &quot; &apos; &nbsp;` and numeric references.
/// Unknown entities are left untouched.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start + 1..];
        let decoded = candidate
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&candidate[..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Applies the whitespace rules to one text run. `None` means the run
/// disappears.
pub fn normalize_text(raw: &str, is_first: bool, is_last: bool) -> Option<String> {
    if raw.trim().is_empty() && (raw.contains('\n') || is_first || is_last) {
        return None;
    }

    let lines: Vec<&str> = raw.split('\n').collect();
    let count = lines.len();
    let mut lines: Vec<&str> = lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            let line = if index > 0 { line.trim_start() } else { line };
            if index + 1 < count {
                line.trim_end()
            } else {
                line
            }
        })
        .collect();

    if is_first {
        while lines.first().is_some_and(|line| line.trim().is_empty()) {
            lines.remove(0);
        }
        if let Some(first) = lines.first_mut() {
            *first = first.trim_start();
        }
    }
    if is_last {
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }
        if let Some(last) = lines.last_mut() {
            *last = last.trim_end();
        }
    }

    let text = lines.join("\n");
    if text.is_empty() {
        None
    } else {
        Some(decode_entities(&text).into_owned())
    }
}

enum RawChild {
    Text(String),
    Node(Node),
}

struct Frame {
    tag: String,
    attributes: IndexMap<String, AttributeValue>,
    children: Vec<RawChild>,
    location: Location,
}

impl Frame {
    fn finish(self) -> Element {
        let count = self.children.len();
        let children = self
            .children
            .into_iter()
            .enumerate()
            .filter_map(|(index, child)| match child {
                RawChild::Text(raw) => {
                    normalize_text(&raw, index == 0, index + 1 == count).map(Node::Text)
                }
                RawChild::Node(node) => Some(node),
            });
        let element = self
            .attributes
            .into_iter()
            .fold(Element::new(self.tag), |element, (name, value)| {
                element.with_attribute(name, value)
            });
        element
            .with_children(children)
            .with_position(self.location.position())
    }
}

pub struct TreeBuilder<'a> {
    source_name: &'a str,
    fragment: FragmentParser<'a>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(source_name: &'a str, fragment: FragmentParser<'a>) -> Self {
        Self {
            source_name,
            fragment,
        }
    }

    #[tracing::instrument(level = "debug", skip(self, tokens), fields(source = self.source_name))]
    pub fn build(&self, tokens: Vec<TokenSpan>) -> ParseResult<Element> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut root: Option<Element> = None;

        for span in tokens {
            let location = Location::of_span(self.source_name, &span);
            match span.token {
                Token::OpenTag {
                    name,
                    attributes,
                    self_closing,
                } => {
                    if root.is_some() && stack.is_empty() {
                        return Err(ParseError::MultipleRoots {
                            tag: name,
                            location,
                        });
                    }
                    self.check_namespace(&name, &location)?;
                    let frame = Frame {
                        attributes: self.convert_attributes(attributes, &location)?,
                        tag: name,
                        children: Vec::new(),
                        location,
                    };
                    if self_closing {
                        Self::attach(&mut stack, &mut root, frame)?;
                    } else {
                        stack.push(frame);
                    }
                }
                Token::CloseTag(name) => {
                    let Some(frame) = stack.pop() else {
                        return Err(ParseError::UnexpectedCloseTag {
                            tag: name,
                            location,
                        });
                    };
                    if frame.tag != name {
                        return Err(ParseError::MismatchedTag {
                            expected: frame.tag,
                            found: name,
                            location,
                        });
                    }
                    Self::attach(&mut stack, &mut root, frame)?;
                }
                Token::Text(text) => match stack.last_mut() {
                    Some(parent) => parent.children.push(RawChild::Text(text)),
                    None if text.trim().is_empty() => {}
                    None => return Err(ParseError::TextOutsideRoot { location }),
                },
                Token::Expression(source) => {
                    let node = parse_child_expression(&source, &location, self.fragment)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(RawChild::Node(node)),
                        None => return Err(ParseError::TextOutsideRoot { location }),
                    }
                }
                Token::Comment { .. } => {}
            }
        }

        if let Some(frame) = stack.pop() {
            return Err(ParseError::UnclosedTag {
                tag: frame.tag,
                location: frame.location,
            });
        }

        root.ok_or_else(|| ParseError::EmptyDocument {
            source_name: self.source_name.to_string(),
        })
    }

    fn attach(stack: &mut [Frame], root: &mut Option<Element>, frame: Frame) -> ParseResult<()> {
        match stack.last_mut() {
            Some(parent) => {
                parent
                    .children
                    .push(RawChild::Node(Node::Element(frame.finish())));
            }
            None if root.is_some() => {
                return Err(ParseError::MultipleRoots {
                    tag: frame.tag,
                    location: frame.location,
                });
            }
            None => *root = Some(frame.finish()),
        }
        Ok(())
    }

    fn check_namespace(&self, tag: &str, location: &Location) -> ParseResult<()> {
        match check_tag(tag) {
            NamespaceCheck::Plain | NamespaceCheck::Member => Ok(()),
            NamespaceCheck::UnknownNamespace(namespace) => Err(ParseError::UnknownNamespace {
                namespace,
                tag: tag.to_string(),
                location: location.clone(),
            }),
            NamespaceCheck::UnknownMember { namespace, member } => {
                Err(ParseError::UnknownNamespaceMember {
                    namespace,
                    member,
                    location: location.clone(),
                })
            }
        }
    }

    fn convert_attributes(
        &self,
        raw: Vec<RawAttribute>,
        location: &Location,
    ) -> ParseResult<IndexMap<String, AttributeValue>> {
        let mut attributes = IndexMap::with_capacity(raw.len());
        for attribute in raw {
            if attributes.contains_key(&attribute.name) {
                return Err(ParseError::DuplicateAttribute {
                    name: attribute.name,
                    location: location.clone(),
                });
            }
            let value = match attribute.value {
                RawAttributeValue::Quoted(text) => {
                    AttributeValue::String(decode_entities(&text).into_owned())
                }
                RawAttributeValue::Flag => AttributeValue::Bool(true),
                RawAttributeValue::Expression(source) => {
                    parse_attribute_expression(&source, location, self.fragment)?
                }
            };
            attributes.insert(attribute.name, value);
        }
        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dedents_block_text() {
        let raw = "\n    You are precise.\n    Answer briefly.\n  ";
        assert_eq!(
            normalize_text(raw, true, true).as_deref(),
            Some("You are precise.\nAnswer briefly.")
        );
    }

    #[test]
    fn test_normalize_keeps_inline_spacing() {
        assert_eq!(normalize_text("Hello ", true, false).as_deref(), Some("Hello "));
        assert_eq!(normalize_text(" and ", false, false).as_deref(), Some(" and "));
        assert_eq!(normalize_text(" ", false, false).as_deref(), Some(" "));
        assert_eq!(normalize_text(" ", true, false), None);
        assert_eq!(normalize_text("\n   ", false, false), None);
    }

    #[test]
    fn test_normalize_keeps_paragraph_breaks() {
        assert_eq!(
            normalize_text("\n  First.\n\n  Second.\n", true, true).as_deref(),
            Some("First.\n\nSecond.")
        );
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_entities("a &lt;b&gt; &amp; &#123;x&#x7D; &bogus;"),
            "a <b> & {x} &bogus;"
        );
    }
}
