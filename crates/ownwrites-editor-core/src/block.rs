//! Block-level formatting: headings, quotes, code blocks and lists.

use std::ops::Range;

use crate::dom::{self, Element, Node, NodePath};
use crate::surface::{IMAGE_CONTAINER_CLASS, leaves};
use crate::types::Selection;

/// Elements a caret can sit in as a formatting block.
const TEXT_BLOCKS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "div", "li",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Ordered => "ol",
            ListKind::Unordered => "ul",
        }
    }
}

/// What a block command acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// A whole block element.
    Block(NodePath),
    /// A run of inline siblings with no block of their own.
    Inline { parent: NodePath, span: Range<usize> },
}

impl Target {
    fn parent(&self) -> &[usize] {
        match self {
            Target::Block(path) => &path[..path.len() - 1],
            Target::Inline { parent, .. } => parent,
        }
    }

    /// Path of the first node covered, for document ordering.
    fn anchor(&self) -> NodePath {
        match self {
            Target::Block(path) => path.clone(),
            Target::Inline { parent, span } => {
                let mut path = parent.clone();
                path.push(span.start);
                path
            }
        }
    }

    fn span(&self) -> Range<usize> {
        match self {
            Target::Block(path) => {
                let idx = path[path.len() - 1];
                idx..idx + 1
            }
            Target::Inline { span, .. } => span.clone(),
        }
    }
}

fn is_text_block(el: &Element) -> bool {
    TEXT_BLOCKS.contains(&el.tag.as_str()) && !el.has_class(IMAGE_CONTAINER_CLASS)
}

/// Blocks touched by the selection, in document order.
///
/// With `whole_items`, a leaf inside a list item targets the item itself
/// rather than the content inside it.
fn targets(nodes: &[Node], selection: Selection, whole_items: bool) -> Vec<Target> {
    let (start, end) = (selection.start(), selection.end());
    let mut out: Vec<Target> = Vec::new();
    for leaf in leaves(nodes) {
        let touched = if start == end {
            leaf.start <= start && start <= leaf.end()
        } else {
            leaf.start < end && leaf.end() > start
        };
        if !touched {
            continue;
        }
        if let Some(target) = target_of(nodes, &leaf.path, whole_items) {
            if !out.contains(&target) {
                out.push(target);
            }
        }
        if start == end {
            break;
        }
    }
    out
}

fn target_of(nodes: &[Node], leaf: &[usize], whole_items: bool) -> Option<Target> {
    // Deepest text block on the path; nodes inside an image wrapper don't count.
    let mut block: Option<usize> = None;
    let mut item: Option<usize> = None;
    let mut level = nodes;
    for (depth, &idx) in leaf[..leaf.len() - 1].iter().enumerate() {
        let el = level.get(idx)?.as_element()?;
        if el.has_class(IMAGE_CONTAINER_CLASS) {
            return None;
        }
        if is_text_block(el) {
            block = Some(depth);
        }
        if el.tag == "li" {
            item = Some(depth);
        }
        level = &el.children;
    }
    if let (true, Some(depth)) = (whole_items, item) {
        return Some(Target::Block(leaf[..=depth].to_vec()));
    }
    let parent_len = block.map(|d| d + 1).unwrap_or(0);
    let parent: NodePath = leaf[..parent_len].to_vec();
    if let Some(depth) = block {
        let el = dom::node_at(nodes, &parent)?.as_element()?;
        let all_inline = el.children.iter().all(Node::is_inline);
        if el.tag != "li" && all_inline {
            return Some(Target::Block(leaf[..=depth].to_vec()));
        }
    }
    // Maximal run of inline siblings around the leaf's top inline ancestor.
    let siblings = dom::children_at(nodes, &parent)?;
    let anchor = leaf[parent_len];
    if !siblings.get(anchor)?.is_inline() {
        return None;
    }
    let mut lo = anchor;
    while lo > 0 && siblings[lo - 1].is_inline() {
        lo -= 1;
    }
    let mut hi = anchor + 1;
    while hi < siblings.len() && siblings[hi].is_inline() {
        hi += 1;
    }
    Some(Target::Inline {
        parent,
        span: lo..hi,
    })
}

/// `formatBlock`: turn every touched block into `tag`.
pub(crate) fn format_block(nodes: &mut Vec<Node>, selection: Selection, tag: &str) {
    let mut targets = targets(nodes, selection, false);
    targets.sort_by_key(Target::anchor);
    for target in targets.into_iter().rev() {
        match target {
            Target::Block(path) => {
                if let Some(Node::Element(el)) = dom::node_at_mut(nodes, &path) {
                    el.tag = tag.into();
                }
            }
            Target::Inline { parent, span } => {
                if let Some(children) = dom::children_at_mut(nodes, &parent) {
                    let run: Vec<Node> = children.drain(span.clone()).collect();
                    children.insert(span.start, Element::new(tag).with_children(run).into());
                }
            }
        }
    }
}

/// Insert or remove a list around the touched blocks.
///
/// Items already in a list of the same kind are lifted back out into
/// paragraphs; items in the other kind of list switch kind; anything else is
/// gathered into a new list, one item per block.
pub(crate) fn toggle_list(nodes: &mut Vec<Node>, selection: Selection, kind: ListKind) {
    let mut targets = targets(nodes, selection, true);
    if targets.is_empty() {
        return;
    }
    targets.sort_by_key(Target::anchor);

    let list_items: Vec<(NodePath, bool)> = targets
        .iter()
        .filter_map(|t| match t {
            Target::Block(path) => list_item_parent(nodes, path, kind),
            Target::Inline { .. } => None,
        })
        .collect();

    if list_items.len() == targets.len() {
        if list_items.iter().all(|(_, same)| *same) {
            for target in targets.into_iter().rev() {
                if let Target::Block(path) = target {
                    lift_item(nodes, &path);
                }
            }
        } else {
            let mut lists: Vec<NodePath> = list_items.into_iter().map(|(p, _)| p).collect();
            lists.dedup();
            for list in lists {
                if let Some(Node::Element(el)) = dom::node_at_mut(nodes, &list) {
                    el.tag = kind.tag().into();
                }
            }
        }
        return;
    }

    let fresh: Vec<Target> = targets
        .into_iter()
        .filter(|t| !matches!(t, Target::Block(path) if list_item_parent(nodes, path, kind).is_some()))
        .collect();
    for group in group_adjacent(fresh).into_iter().rev() {
        wrap_in_list(nodes, &group, kind);
    }
}

/// `(list path, list matches kind)` for an `li` target.
fn list_item_parent(nodes: &[Node], path: &[usize], kind: ListKind) -> Option<(NodePath, bool)> {
    let el = dom::node_at(nodes, path)?.as_element()?;
    if el.tag != "li" {
        return None;
    }
    let parent = &path[..path.len() - 1];
    let list = dom::node_at(nodes, parent)?.as_element()?;
    match list.tag.as_str() {
        "ul" | "ol" => Some((parent.to_vec(), list.tag == kind.tag())),
        _ => None,
    }
}

/// Split the list around one item and turn the item into a paragraph.
fn lift_item(nodes: &mut Vec<Node>, item: &[usize]) {
    let Some((&idx, list_path)) = item.split_last() else {
        return;
    };
    let Some((&list_idx, outer)) = list_path.split_last() else {
        return;
    };
    let Some(children) = dom::children_at_mut(nodes, outer) else {
        return;
    };
    let Some(Node::Element(list)) = children.get_mut(list_idx) else {
        return;
    };
    if idx >= list.children.len() {
        return;
    }
    let after: Vec<Node> = list.children.split_off(idx + 1);
    let Some(Node::Element(li)) = list.children.pop() else {
        return;
    };
    let before_empty = list.children.is_empty();

    let mut replacement = Vec::new();
    if li.children.iter().all(Node::is_inline) {
        replacement.push(Element::new("p").with_children(li.children).into());
    } else {
        replacement.extend(li.children);
    }
    if !after.is_empty() {
        replacement.push(list.shallow_clone().with_children(after).into());
    }

    if before_empty {
        children.splice(list_idx..list_idx + 1, replacement);
    } else {
        children.splice(list_idx + 1..list_idx + 1, replacement);
    }
}

/// Group targets that sit next to each other under the same parent.
fn group_adjacent(targets: Vec<Target>) -> Vec<Vec<Target>> {
    let mut groups: Vec<Vec<Target>> = Vec::new();
    for target in targets {
        let joins = groups.last().and_then(|g| g.last()).is_some_and(|prev| {
            prev.parent() == target.parent() && prev.span().end == target.span().start
        });
        match groups.last_mut() {
            Some(group) if joins => group.push(target),
            _ => groups.push(vec![target]),
        }
    }
    groups
}

fn wrap_in_list(nodes: &mut Vec<Node>, group: &[Target], kind: ListKind) {
    let (Some(first), Some(last)) = (group.first(), group.last()) else {
        return;
    };
    let parent = first.parent().to_vec();
    let span = first.span().start..last.span().end;
    let Some(children) = dom::children_at_mut(nodes, &parent) else {
        return;
    };
    let mut drained = children.drain(span.clone());
    let mut items = Vec::new();
    for target in group {
        let taken: Vec<Node> = drained.by_ref().take(target.span().len()).collect();
        let item = match target {
            Target::Inline { .. } => Element::new("li").with_children(taken),
            Target::Block(_) => {
                let mut taken = taken;
                match taken.pop() {
                    Some(Node::Element(el)) if matches!(el.tag.as_str(), "p" | "div") => {
                        Element::new("li").with_children(el.children)
                    }
                    Some(other) => Element::new("li").with_children(vec![other]),
                    None => continue,
                }
            }
        };
        items.push(Node::Element(item));
    }
    drop(drained);
    children.insert(span.start, Element::new(kind.tag()).with_children(items).into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn format(html: &str, sel: Selection, tag: &str) -> String {
        let mut nodes = dom::parse_fragment(html);
        format_block(&mut nodes, sel, tag);
        dom::serialize(&nodes)
    }

    fn list(html: &str, sel: Selection, kind: ListKind) -> String {
        let mut nodes = dom::parse_fragment(html);
        toggle_list(&mut nodes, sel, kind);
        dom::serialize(&nodes)
    }

    #[test]
    fn test_heading_from_paragraph() {
        assert_snapshot!(format("<p>Title</p><p>body</p>", Selection::collapsed(2), "h2"), @"<h2>Title</h2><p>body</p>");
    }

    #[test]
    fn test_format_spans_blocks() {
        assert_snapshot!(
            format("<p>one</p><p>two</p><p>three</p>", Selection::new(1, 5), "blockquote"),
            @"<blockquote>one</blockquote><blockquote>two</blockquote><p>three</p>"
        );
    }

    #[test]
    fn test_format_bare_inline_run() {
        assert_snapshot!(
            format("loose <b>text</b><p>para</p>", Selection::collapsed(1), "pre"),
            @"<pre>loose <b>text</b></pre><p>para</p>"
        );
    }

    #[test]
    fn test_format_inside_list_item_wraps_content() {
        assert_snapshot!(
            format("<ul><li>item</li></ul>", Selection::collapsed(1), "h3"),
            @"<ul><li><h3>item</h3></li></ul>"
        );
    }

    #[test]
    fn test_image_wrapper_is_not_a_block_target() {
        let html = r#"<div class="img-container"><img src="x"></div>"#;
        assert_eq!(format(html, Selection::collapsed(0), "h1"), html);
    }

    #[test]
    fn test_wrap_paragraphs_in_list() {
        assert_snapshot!(
            list("<p>a</p><p>b</p><h2>c</h2>", Selection::new(0, 2), ListKind::Unordered),
            @"<ul><li>a</li><li>b</li></ul><h2>c</h2>"
        );
    }

    #[test]
    fn test_unwrap_same_kind() {
        assert_snapshot!(
            list("<ol><li>a</li><li>b</li><li>c</li></ol>", Selection::collapsed(2), ListKind::Ordered),
            @"<ol><li>a</li></ol><p>b</p><ol><li>c</li></ol>"
        );
        assert_snapshot!(
            list("<ol><li>a</li><li>b</li></ol>", Selection::collapsed(0), ListKind::Ordered),
            @"<p>a</p><ol><li>b</li></ol>"
        );
    }

    #[test]
    fn test_switch_list_kind() {
        assert_snapshot!(
            list("<ol><li>a</li><li>b</li></ol>", Selection::new(0, 2), ListKind::Unordered),
            @"<ul><li>a</li><li>b</li></ul>"
        );
    }
}
