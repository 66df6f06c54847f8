//! Nested content trees and the structure-preserving annotator.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dictionary::TermDictionary;
use crate::error::GlossaryError;
use crate::scanner::scan;
use crate::term::GlossaryTerm;
use crate::tracker::OccurrenceSet;

/// Element tags whose subtree is never annotated: interactive controls and code.
pub const OPAQUE_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "code", "pre",
];

/// A node of page content.
///
/// Serialised untagged: a JSON string is a text leaf, an array is a fragment, an object
/// with `term` and `text` is a marker, and an object with `tag` is an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentNode {
    Text(String),
    Fragment(Vec<ContentNode>),
    Marker(Marker),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentNode>,
}

/// Interactive wrapper around one matched term occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker {
    pub term: Arc<GlossaryTerm>,
    pub text: String,
}

impl ContentNode {
    pub fn text(value: impl Into<String>) -> Self {
        ContentNode::Text(value.into())
    }

    pub fn element(tag: impl Into<String>, children: Vec<ContentNode>) -> Self {
        ContentNode::Element(Element::new(tag, children))
    }

    /// Parses a JSON content tree. Input that is not JSON or does not fit the tree shape
    /// is rejected as [`GlossaryError::InvalidInput`].
    pub fn from_json_str(input: &str) -> Result<Self, GlossaryError> {
        serde_json::from_str(input)
            .map_err(|err| GlossaryError::InvalidInput(format!("content tree: {err}")))
    }

    /// Concatenated text of the subtree, markers included.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            ContentNode::Text(text) => out.push_str(text),
            ContentNode::Marker(marker) => out.push_str(&marker.text),
            ContentNode::Fragment(children) => {
                children.iter().for_each(|child| child.collect_text(out))
            }
            ContentNode::Element(element) => element
                .children
                .iter()
                .for_each(|child| child.collect_text(out)),
        }
    }

    /// Markers in document order.
    pub fn markers(&self) -> Vec<&Marker> {
        let mut out = Vec::new();
        self.collect_markers(&mut out);
        out
    }

    fn collect_markers<'a>(&'a self, out: &mut Vec<&'a Marker>) {
        match self {
            ContentNode::Text(_) => {}
            ContentNode::Marker(marker) => out.push(marker),
            ContentNode::Fragment(children) => {
                children.iter().for_each(|child| child.collect_markers(out))
            }
            ContentNode::Element(element) => element
                .children
                .iter()
                .for_each(|child| child.collect_markers(out)),
        }
    }
}

impl Element {
    pub fn new(tag: impl Into<String>, children: Vec<ContentNode>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn is_opaque(&self) -> bool {
        OPAQUE_TAGS
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(self.tag.trim()))
    }
}

/// Rebuilds `node` with every matched term in its text leaves wrapped in a marker.
///
/// Opaque elements and existing markers are returned as they are. Other elements keep
/// their tag and attributes; only their children are replaced. A text leaf with matches
/// becomes a fragment of text and marker segments, spliced in place when it sits inside
/// a container.
pub fn annotate(
    node: &ContentNode,
    dictionary: &TermDictionary,
    mut tracker: Option<&mut OccurrenceSet>,
) -> ContentNode {
    if dictionary.is_empty() {
        return node.clone();
    }
    match node {
        ContentNode::Text(text) => match split_text(text, dictionary, tracker.as_deref_mut()) {
            Some(segments) => ContentNode::Fragment(segments),
            None => node.clone(),
        },
        ContentNode::Marker(_) => node.clone(),
        ContentNode::Element(element) if element.is_opaque() => node.clone(),
        ContentNode::Element(element) => ContentNode::Element(Element {
            tag: element.tag.clone(),
            attrs: element.attrs.clone(),
            children: annotate_children(&element.children, dictionary, tracker),
        }),
        ContentNode::Fragment(children) => {
            ContentNode::Fragment(annotate_children(children, dictionary, tracker))
        }
    }
}

fn annotate_children(
    children: &[ContentNode],
    dictionary: &TermDictionary,
    mut tracker: Option<&mut OccurrenceSet>,
) -> Vec<ContentNode> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match child {
            ContentNode::Text(text) => {
                match split_text(text, dictionary, tracker.as_deref_mut()) {
                    Some(segments) => out.extend(segments),
                    None => out.push(child.clone()),
                }
            }
            _ => out.push(annotate(child, dictionary, tracker.as_deref_mut())),
        }
    }
    out
}

/// Splits a text run into text and marker segments; `None` when nothing matched.
pub fn split_text(
    text: &str,
    dictionary: &TermDictionary,
    tracker: Option<&mut OccurrenceSet>,
) -> Option<Vec<ContentNode>> {
    let matches = scan(text, dictionary, tracker);
    if matches.is_empty() {
        return None;
    }

    let mut segments = Vec::with_capacity(matches.len() * 2 + 1);
    let mut cursor = 0;
    for found in matches {
        if found.start > cursor {
            segments.push(ContentNode::Text(text[cursor..found.start].to_owned()));
        }
        segments.push(ContentNode::Marker(Marker {
            term: found.term,
            text: found.matched_text,
        }));
        cursor = found.end;
    }
    if cursor < text.len() {
        segments.push(ContentNode::Text(text[cursor..].to_owned()));
    }
    Some(segments)
}
