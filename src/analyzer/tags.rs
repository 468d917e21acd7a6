//! Namespaced tag table.
//!
//! Plain tag names are never rejected here; an unrecognised plain tag is a
//! render-time concern. A dotted name must name a known namespace and one of
//! its members.

use std::collections::HashMap;

use lazy_static::lazy_static;

pub const ASK_NAMESPACE: &str = "Ask";
pub const EXAMPLE_NAMESPACE: &str = "Example";

pub const ASK_MEMBERS: &[&str] = &[
    "Text",
    "Select",
    "MultiSelect",
    "Number",
    "Confirm",
    "File",
    "Secret",
    "Editor",
    "ReviewFile",
    "Option",
];

pub const EXAMPLE_MEMBERS: &[&str] = &["Input", "Output"];

lazy_static! {
    static ref NAMESPACES: HashMap<&'static str, &'static [&'static str]> = {
        let mut m = HashMap::new();
        m.insert(ASK_NAMESPACE, ASK_MEMBERS);
        m.insert(EXAMPLE_NAMESPACE, EXAMPLE_MEMBERS);
        m
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceCheck {
    Plain,
    Member,
    UnknownNamespace(String),
    UnknownMember { namespace: String, member: String },
}

pub fn check_tag(tag: &str) -> NamespaceCheck {
    let Some((namespace, member)) = tag.split_once('.') else {
        return NamespaceCheck::Plain;
    };
    match NAMESPACES.get(namespace) {
        None => NamespaceCheck::UnknownNamespace(namespace.to_string()),
        Some(members) if members.contains(&member) => NamespaceCheck::Member,
        Some(_) => NamespaceCheck::UnknownMember {
            namespace: namespace.to_string(),
            member: member.to_string(),
        },
    }
}

/// `Ask.Text` etc., excluding `Ask.Option` which only annotates its parent.
pub fn is_input_tag(tag: &str) -> bool {
    matches!(tag.split_once('.'), Some((ASK_NAMESPACE, member)) if member != "Option" && ASK_MEMBERS.contains(&member))
}
