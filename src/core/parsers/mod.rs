//! Pure functions turning `cm` output into typed records.
//!
//! Line parsers log and skip malformed lines. XML parsers check the root element and
//! the few required children, and return [`PlasticError::UnexpectedXml`] when the
//! document does not have the expected shape; unknown elements are ignored.

pub mod changelists;
pub mod fileinfo;
pub mod history;
pub mod merge;
pub mod query;
pub mod status;
pub mod workspace;

use crate::core::error::{PlasticError, Result};
use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};

/// Separator of the machine readable outputs requested with `--fieldseparator=";"`
pub const FIELD_SEPARATOR: char = ';';

/// Split a machine readable line, keeping empty fields.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(FIELD_SEPARATOR).collect()
}

/// Parse `text` and check the name of its root element.
pub(crate) fn parse_document<'input>(
    text: &'input str,
    root_tag: &'static str,
) -> Result<Document<'input>> {
    let document = Document::parse(text.trim_start_matches('\u{feff}'))?;
    if document.root_element().tag_name().name() != root_tag {
        return Err(PlasticError::unexpected_xml(root_tag));
    }
    Ok(document)
}

pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

pub(crate) fn elements<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

/// Text of the child element `tag`; an empty element gives an empty string.
pub(crate) fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag).map(|child| child.text().unwrap_or_default().to_string())
}

/// Parse an ISO 8601 date such as `2022-04-28T16:00:37+02:00`.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|date| date.with_timezone(&Utc))
        .ok()
}

/// Hide the domain part of an e-mail user name.
pub fn user_name_to_display_name(user_name: &str) -> &str {
    match user_name.find('@') {
        Some(index) => &user_name[..index],
        None => user_name,
    }
}
