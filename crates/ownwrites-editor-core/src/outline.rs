//! Outline and first-draft import.
//!
//! An outline is a tree of headings and bullet points. It flattens to HTML with
//! children emitted after their parent; a non-point item whose children are all
//! points gets them wrapped in one `<ul>`.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::dom::{self, Element, Node};
use crate::error::AiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineItem {
    /// `h2`, `h3`, `h4` or `point`. Anything else renders as a paragraph.
    #[serde(rename = "type")]
    pub kind: SmolStr,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    pub fn new(kind: &str, text: impl Into<String>) -> Self {
        Self {
            kind: SmolStr::new(kind),
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<OutlineItem>) -> Self {
        self.children = children;
        self
    }

    pub fn is_point(&self) -> bool {
        self.kind == "point"
    }

    fn tag(&self) -> &'static str {
        match self.kind.as_str() {
            "h2" => "h2",
            "h3" => "h3",
            "h4" => "h4",
            "point" => "li",
            _ => "p",
        }
    }
}

/// An AI-written post, ready to seed a fresh editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstDraft {
    pub title: String,
    pub content: String,
}

/// Parse an outline from JSON, rejecting anything that isn't a list of typed items.
pub fn parse_outline(json: &serde_json::Value) -> Result<Vec<OutlineItem>, AiError> {
    serde_json::from_value(json.clone()).map_err(|e| {
        tracing::warn!(error = %e, "outline failed to parse");
        AiError::InvalidOutline
    })
}

pub fn outline_to_nodes(items: &[OutlineItem]) -> Vec<Node> {
    let mut out = Vec::new();
    for item in items {
        push_item(item, &mut out);
    }
    out
}

fn push_item(item: &OutlineItem, out: &mut Vec<Node>) {
    out.push(Element::new(item.tag()).with_children(vec![Node::text(&item.text)]).into());
    if item.children.is_empty() {
        return;
    }
    if !item.is_point() && item.children.iter().all(OutlineItem::is_point) {
        out.push(Element::new("ul").with_children(outline_to_nodes(&item.children)).into());
    } else {
        for child in &item.children {
            push_item(child, out);
        }
    }
}

/// Deterministic markup for an outline. Item text is escaped.
pub fn outline_to_html(items: &[OutlineItem]) -> String {
    dom::serialize(&outline_to_nodes(items))
}
