//! The content surface: the editable document the user types into.
//!
//! The parsed node tree is the single source of truth for post content while
//! editing. Every mutation goes through [`ContentSurface::edit`], which records
//! an undo snapshot and bumps the generation counter so outstanding
//! [`TextRange`] handles go stale.

use crate::dom::{self, Element, Node, NodePath};
use crate::error::CommandError;
use crate::inline::{self, InlineOp};
use crate::types::{Affinity, CursorState, ImageRef, Selection, TextRange};
use crate::undo::{SnapshotHistory, UndoManager};

pub const IMAGE_CONTAINER_CLASS: &str = "img-container";

/// One caret-addressable leaf: a non-empty text node or an atomic element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Leaf {
    pub path: NodePath,
    pub start: usize,
    pub len: usize,
    pub atom: bool,
}

impl Leaf {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn parent(&self) -> &[usize] {
        &self.path[..self.path.len() - 1]
    }

    pub fn index(&self) -> usize {
        self.path[self.path.len() - 1]
    }
}

/// All leaves in document order.
pub(crate) fn leaves(nodes: &[Node]) -> Vec<Leaf> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    let mut pos = 0;
    collect_leaves(nodes, &mut path, &mut pos, &mut out);
    out
}

fn collect_leaves(nodes: &[Node], path: &mut NodePath, pos: &mut usize, out: &mut Vec<Leaf>) {
    for (i, node) in nodes.iter().enumerate() {
        path.push(i);
        match node {
            Node::Text(t) if !t.is_empty() => {
                let len = t.chars().count();
                out.push(Leaf {
                    path: path.clone(),
                    start: *pos,
                    len,
                    atom: false,
                });
                *pos += len;
            }
            Node::Element(el) if el.is_void() => {
                out.push(Leaf {
                    path: path.clone(),
                    start: *pos,
                    len: 1,
                    atom: true,
                });
                *pos += 1;
            }
            Node::Element(el) => collect_leaves(&el.children, path, pos, out),
            Node::Text(_) | Node::Comment(_) => {}
        }
        path.pop();
    }
}

/// Caret position of the start of the node at `path`.
pub(crate) fn offset_of(nodes: &[Node], path: &[usize]) -> usize {
    let mut offset = 0;
    let mut level = nodes;
    for &idx in path {
        offset += dom::units(&level[..idx.min(level.len())]);
        match level.get(idx) {
            Some(Node::Element(el)) => level = &el.children,
            _ => break,
        }
    }
    offset
}

/// Where an insertion lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Point {
    /// Inside a text node, at a char index.
    Text { path: NodePath, idx: usize },
    /// Between children of `parent`.
    Slot { parent: NodePath, index: usize },
}

/// Resolve a caret to an insertion point.
pub(crate) fn locate(nodes: &[Node], cursor: CursorState) -> Point {
    let leaves = leaves(nodes);
    let o = cursor.offset;
    let before = || leaves.iter().find(|l| l.start < o && o <= l.end());
    let after = || leaves.iter().find(|l| l.start <= o && o < l.end());
    let (leaf, stick_before) = match cursor.affinity {
        Affinity::Before => match before() {
            Some(l) => (Some(l), true),
            None => (after(), false),
        },
        Affinity::After => match after() {
            Some(l) => (Some(l), false),
            None => (before(), true),
        },
    };
    match leaf {
        Some(l) if !l.atom => Point::Text {
            path: l.path.clone(),
            idx: o - l.start,
        },
        Some(l) => Point::Slot {
            parent: l.parent().to_vec(),
            index: if stick_before { l.index() + 1 } else { l.index() },
        },
        None => Point::Slot {
            parent: Vec::new(),
            index: nodes.len(),
        },
    }
}

pub(crate) fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Split the text leaf that strictly contains `offset` so a node boundary sits there.
pub(crate) fn split_text_at(nodes: &mut Vec<Node>, offset: usize) {
    let Some(leaf) = leaves(nodes)
        .into_iter()
        .find(|l| !l.atom && l.start < offset && offset < l.end())
    else {
        return;
    };
    let Some(children) = dom::children_at_mut(nodes, leaf.parent()) else {
        return;
    };
    let idx = leaf.index();
    if let Some(Node::Text(t)) = children.get_mut(idx) {
        let tail = t.split_off(char_to_byte(t, offset - leaf.start));
        children.insert(idx + 1, Node::Text(tail));
    }
}

/// Remove everything in `[start, end)` without merging blocks.
///
/// Ancestors of the first removed leaf survive (possibly empty), except an
/// image wrapper left without its image; any other node whose every leaf
/// falls in the range is removed whole. Returns the slot where the first
/// removed leaf (or the emptied wrapper) used to be.
pub(crate) fn delete_span(nodes: &mut Vec<Node>, start: usize, end: usize) -> Option<Point> {
    if start >= end {
        return None;
    }
    split_text_at(nodes, end);
    split_text_at(nodes, start);
    let first = leaves(nodes).into_iter().find(|l| l.start >= start && l.end() <= end)?;
    prune(nodes, 0, start, end, Some(&first.path));
    if let Some(point) = remove_emptied_wrapper(nodes, first.parent()) {
        return Some(point);
    }
    Some(Point::Slot {
        parent: first.parent().to_vec(),
        index: first.index(),
    })
}

/// Drop an image wrapper around `path` that no longer holds its image.
fn remove_emptied_wrapper(nodes: &mut Vec<Node>, path: &[usize]) -> Option<Point> {
    let wrapper = image_container_around(nodes, path)?;
    let emptied = dom::node_at(nodes, &wrapper)
        .and_then(Node::as_element)
        .is_some_and(|el| !is_image_wrapper(el));
    if !emptied {
        return None;
    }
    let (&index, parent) = wrapper.split_last()?;
    dom::children_at_mut(nodes, parent)?.remove(index);
    Some(Point::Slot {
        parent: parent.to_vec(),
        index,
    })
}

/// Outermost `img-container` element on the way down to `path`, inclusive.
fn image_container_around(nodes: &[Node], path: &[usize]) -> Option<NodePath> {
    (1..=path.len()).map(|n| &path[..n]).find_map(|prefix| {
        dom::node_at(nodes, prefix)
            .and_then(Node::as_element)
            .filter(|el| el.has_class(IMAGE_CONTAINER_CLASS))
            .map(|_| prefix.to_vec())
    })
}

/// Insert `node` as a sibling just before or after the node at `path`.
fn insert_beside(nodes: &mut Vec<Node>, path: &[usize], before: bool, node: Node) -> bool {
    let Some((&index, parent)) = path.split_last() else {
        return false;
    };
    match dom::children_at_mut(nodes, parent) {
        Some(children) => {
            children.insert(if before { index } else { index + 1 }, node);
            true
        }
        None => false,
    }
}

/// The node list a point inserts into.
fn point_container(point: &Point) -> &[usize] {
    match point {
        Point::Text { path, .. } => path.split_last().map_or(&[][..], |(_, parent)| parent),
        Point::Slot { parent, .. } => parent,
    }
}

fn prune(children: &mut Vec<Node>, base: usize, start: usize, end: usize, protect: Option<&[usize]>) {
    let old = std::mem::take(children);
    let mut pos = base;
    for (i, mut child) in old.into_iter().enumerate() {
        let u = child.units();
        let p = pos;
        pos += u;
        let inner_protect = protect.and_then(|path| match path.split_first() {
            Some((&first, rest)) if first == i && !rest.is_empty() => Some(rest),
            _ => None,
        });
        if u == 0 || p >= end || p + u <= start {
            children.push(child);
            continue;
        }
        let contained = p >= start && p + u <= end;
        if contained && inner_protect.is_none() {
            continue;
        }
        if let Node::Element(el) = &mut child {
            prune(&mut el.children, p, start, end, inner_protect);
        }
        children.push(child);
    }
}

/// Insert text at a point. Returns false if the point no longer resolves.
pub(crate) fn insert_at_point(nodes: &mut Vec<Node>, point: &Point, text: &str) -> bool {
    match point {
        Point::Text { path, idx } => match dom::node_at_mut(nodes, path) {
            Some(Node::Text(t)) => {
                let byte = char_to_byte(t, *idx);
                t.insert_str(byte, text);
                true
            }
            _ => false,
        },
        Point::Slot { parent, index } => match dom::children_at_mut(nodes, parent) {
            Some(children) => {
                let index = (*index).min(children.len());
                children.insert(index, Node::text(text));
                true
            }
            None => false,
        },
    }
}

/// Typing right after an atom (an image, a `<br>`) continues in whatever follows it.
fn typing_cursor(nodes: &[Node], offset: usize) -> CursorState {
    if leaves(nodes).iter().any(|l| l.atom && l.end() == offset) {
        CursorState::with_affinity(offset, Affinity::After)
    } else {
        CursorState::new(offset)
    }
}

/// A block holding nothing but a `<br>` placeholder (`<p><br></p>`).
///
/// Returns the placeholder's path so typing can replace it.
fn placeholder_br(nodes: &[Node], offset: usize) -> Option<NodePath> {
    leaves(nodes)
        .into_iter()
        .filter(|l| l.atom && (l.start == offset || l.end() == offset))
        .find(|l| {
            let is_br = matches!(dom::node_at(nodes, &l.path), Some(Node::Element(el)) if el.tag == "br");
            let lone = !l.parent().is_empty()
                && dom::children_at(nodes, l.parent()).is_some_and(|c| c.len() == 1);
            is_br && lone
        })
        .map(|l| l.path)
}

/// Split a node list at a caret offset, cloning element shells on both sides.
///
/// Zero-width children before the cut stay left. Sides that end up holding no
/// caret positions are dropped.
pub(crate) fn split_children(children: Vec<Node>, offset: usize) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut cut = false;
    let mut pos = 0;
    for child in children {
        let u = child.units();
        let p = pos;
        pos += u;
        if cut {
            right.push(child);
        } else if u == 0 || p + u <= offset {
            left.push(child);
        } else if p >= offset {
            cut = true;
            right.push(child);
        } else {
            cut = true;
            let (l, r) = split_node(child, offset - p);
            left.extend(l);
            right.extend(r);
        }
    }
    (left, right)
}

fn split_node(node: Node, offset: usize) -> (Option<Node>, Option<Node>) {
    match node {
        Node::Text(mut t) => {
            let tail = t.split_off(char_to_byte(&t, offset));
            let side = |s: String| (!s.is_empty()).then_some(Node::Text(s));
            (side(t), side(tail))
        }
        Node::Element(el) if !el.is_void() => {
            let shell = el.shallow_clone();
            let (l, r) = split_children(el.children, offset);
            let side = |children: Vec<Node>| {
                (dom::units(&children) > 0).then(|| Node::Element(shell.clone().with_children(children)))
            };
            (side(l), side(r))
        }
        atom if offset == 0 => (None, Some(atom)),
        atom => (Some(atom), None),
    }
}

/// Image size classes applied to the wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Small,
    Medium,
    Full,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [ImageSize::Small, ImageSize::Medium, ImageSize::Full];

    pub fn class(self) -> &'static str {
        match self {
            ImageSize::Small => "size-sm",
            ImageSize::Medium => "size-md",
            ImageSize::Full => "size-full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAlign {
    Left,
    Center,
    Right,
}

impl ImageAlign {
    pub const ALL: [ImageAlign; 3] = [ImageAlign::Left, ImageAlign::Center, ImageAlign::Right];

    pub fn class(self) -> &'static str {
        match self {
            ImageAlign::Left => "align-left",
            ImageAlign::Center => "align-center",
            ImageAlign::Right => "align-right",
        }
    }
}

/// Wrapper markup for a newly inserted inline image, plus the empty paragraph after it.
pub fn image_wrapper(src: &str) -> Vec<Node> {
    let img = Element::new("img")
        .with_attr("src", src)
        .with_attr("alt", "User uploaded content");
    let wrapper = Element::new("div")
        .with_attr(
            "class",
            format!(
                "{IMAGE_CONTAINER_CLASS} {} {}",
                ImageAlign::Center.class(),
                ImageSize::Full.class()
            ),
        )
        .with_attr("contenteditable", "false")
        .with_children(vec![img.into()]);
    let paragraph = Element::new("p").with_children(vec![Element::new("br").into()]);
    vec![wrapper.into(), paragraph.into()]
}

/// Whether `el` is a recognised image wrapper holding an `<img>`.
pub fn is_image_wrapper(el: &Element) -> bool {
    el.has_class(IMAGE_CONTAINER_CLASS)
        && el
            .children
            .iter()
            .any(|c| matches!(c, Node::Element(img) if img.tag == "img"))
}

#[derive(Debug, Clone)]
pub struct ContentSurface {
    nodes: Vec<Node>,
    generation: u64,
    history: SnapshotHistory<Vec<Node>>,
}

impl Default for ContentSurface {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ContentSurface {
    pub fn new(undo_depth: usize) -> Self {
        Self {
            nodes: Vec::new(),
            generation: 0,
            history: SnapshotHistory::new(undo_depth),
        }
    }

    pub fn from_html(html: &str, undo_depth: usize) -> Self {
        let mut surface = Self::new(undo_depth);
        surface.set_inner_html(html);
        surface
    }

    /// Replace the whole document (hydration, restore). Clears undo history.
    pub fn set_inner_html(&mut self, html: &str) {
        self.nodes = dom::parse_fragment(html);
        self.generation += 1;
        self.history.clear();
    }

    /// Full re-read of the surface markup.
    pub fn inner_html(&self) -> String {
        dom::serialize(&self.nodes)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Document length in caret positions.
    pub fn len(&self) -> usize {
        dom::units(&self.nodes)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Plain text of the whole document.
    pub fn text(&self) -> String {
        self.nodes.iter().map(Node::text_content).collect()
    }

    /// Plain text between two caret positions. Atoms contribute nothing.
    pub fn text_in(&self, start: usize, end: usize) -> String {
        let mut out = String::new();
        for leaf in leaves(&self.nodes) {
            if leaf.atom || leaf.end() <= start || leaf.start >= end {
                continue;
            }
            if let Some(Node::Text(t)) = dom::node_at(&self.nodes, &leaf.path) {
                let from = start.saturating_sub(leaf.start);
                let to = (end - leaf.start).min(leaf.len);
                out.extend(t.chars().skip(from).take(to - from));
            }
        }
        out
    }

    /// Take a range handle for the current generation.
    pub fn range(&self, selection: Selection) -> Result<TextRange, CommandError> {
        self.check_bounds(selection.end())?;
        Ok(TextRange {
            start: selection.start(),
            end: selection.end(),
            generation: self.generation,
        })
    }

    /// Reject handles taken before the last mutation.
    pub fn validate(&self, range: &TextRange) -> Result<(), CommandError> {
        if range.generation != self.generation {
            return Err(CommandError::StaleRange {
                taken: range.generation,
                current: self.generation,
            });
        }
        self.check_bounds(range.end)
    }

    fn check_bounds(&self, offset: usize) -> Result<(), CommandError> {
        let len = self.len();
        if offset > len {
            return Err(CommandError::OutOfBounds { offset, len });
        }
        Ok(())
    }

    /// Run a mutation with undo recording and a generation bump.
    pub(crate) fn edit<R>(&mut self, f: impl FnOnce(&mut Vec<Node>) -> R) -> R {
        self.history.record(self.nodes.clone());
        let out = f(&mut self.nodes);
        self.generation += 1;
        out
    }

    /// Type `text` over the selection. Returns the caret after the inserted text.
    pub fn insert_text(&mut self, selection: Selection, text: &str) -> Result<usize, CommandError> {
        self.check_bounds(selection.end())?;
        let start = selection.start();
        let end = selection.end();
        let inserted = text.chars().count();
        let caret = self.edit(|nodes| {
            if let Some(point) = delete_span(nodes, start, end) {
                insert_at_point(nodes, &point, text);
                return start + inserted;
            }
            // A lone `<br>` placeholder gives up its caret position to the text.
            if let Some(path) = placeholder_br(nodes, start) {
                let br_start = offset_of(nodes, &path);
                if let Some(node) = dom::node_at_mut(nodes, &path) {
                    *node = Node::text(text);
                }
                return br_start + inserted;
            }
            let point = locate(nodes, typing_cursor(nodes, start));
            // Image wrappers are not editable; text next to one gets its own paragraph.
            if let Some(wrapper) = image_container_around(nodes, point_container(&point)) {
                let before = start <= offset_of(nodes, &wrapper);
                let paragraph = Element::new("p").with_children(vec![Node::text(text)]);
                if insert_beside(nodes, &wrapper, before, paragraph.into()) {
                    return start + inserted;
                }
            }
            insert_at_point(nodes, &point, text);
            start + inserted
        });
        Ok(caret)
    }

    /// Replace a range with plain text (AI rewrite apply path).
    pub fn replace_range(&mut self, range: &TextRange, text: &str) -> Result<Selection, CommandError> {
        self.validate(range)?;
        let start = range.start;
        let end = range.end;
        self.edit(|nodes| {
            let point = delete_span(nodes, start, end)
                .unwrap_or_else(|| locate(nodes, CursorState::new(start)));
            if !text.is_empty() {
                insert_at_point(nodes, &point, text);
            }
        });
        Ok(Selection::new(start, start + text.chars().count()))
    }

    /// Backspace. Deletes the selection, or the caret position before a collapsed caret.
    ///
    /// At a block start this removes the preceding leaf but never merges blocks.
    pub fn delete_backward(&mut self, selection: Selection) -> Result<usize, CommandError> {
        self.check_bounds(selection.end())?;
        let (start, end) = if selection.is_collapsed() {
            (selection.head.saturating_sub(1), selection.head)
        } else {
            (selection.start(), selection.end())
        };
        if start == end {
            return Ok(start);
        }
        self.edit(|nodes| {
            delete_span(nodes, start, end);
        });
        Ok(start)
    }

    /// Apply an inline formatting operation over the selection.
    pub fn apply_inline(&mut self, selection: Selection, op: &InlineOp) -> Result<(), CommandError> {
        self.check_bounds(selection.end())?;
        if selection.is_collapsed() {
            return Ok(());
        }
        self.edit(|nodes| inline::apply(nodes, selection.start(), selection.end(), op));
        Ok(())
    }

    /// Delete the selection, then splice block nodes in where it started,
    /// splitting the top-level block the caret sits in.
    ///
    /// Returns the offset just past the inserted blocks.
    pub fn insert_blocks(&mut self, selection: Selection, blocks: Vec<Node>) -> Result<usize, CommandError> {
        self.check_bounds(selection.end())?;
        let at = selection.start();
        let width = dom::units(&blocks);
        self.edit(|nodes| {
            delete_span(nodes, at, selection.end());
            let (mut left, right) = split_children(std::mem::take(nodes), at);
            left.extend(blocks);
            left.extend(right);
            *nodes = left;
        });
        Ok(at + width)
    }

    /// Run a block-structure rewrite over the selection.
    pub(crate) fn restructure(
        &mut self,
        selection: Selection,
        f: impl FnOnce(&mut Vec<Node>, Selection),
    ) -> Result<(), CommandError> {
        self.check_bounds(selection.end())?;
        self.edit(|nodes| f(nodes, selection));
        Ok(())
    }

    /// Append nodes at the end of the document.
    pub fn append_nodes(&mut self, fragment: Vec<Node>) {
        self.edit(|nodes| nodes.extend(fragment));
    }

    /// Path of the image wrapper containing the `<img>` at `img_path`, if any.
    ///
    /// Only images directly inside an `img-container` wrapper qualify.
    pub fn image_wrapper_of(&self, img_path: &[usize]) -> Option<NodePath> {
        let (_, parent) = img_path.split_last()?;
        let is_img = matches!(dom::node_at(&self.nodes, img_path), Some(Node::Element(el)) if el.tag == "img");
        let wrapper = dom::node_at(&self.nodes, parent)?.as_element()?;
        (is_img && wrapper.has_class(IMAGE_CONTAINER_CLASS)).then(|| parent.to_vec())
    }

    /// Take an image handle for the current generation.
    pub fn image_ref(&self, img_path: &[usize]) -> Option<ImageRef> {
        self.image_wrapper_of(img_path).map(|wrapper| ImageRef {
            wrapper,
            generation: self.generation,
        })
    }

    /// Reject image handles taken before the last mutation, or whose wrapper is gone.
    pub fn validate_image(&self, image: &ImageRef) -> Result<(), CommandError> {
        if image.generation != self.generation {
            return Err(CommandError::StaleRange {
                taken: image.generation,
                current: self.generation,
            });
        }
        self.wrapper(&image.wrapper).map(|_| ()).ok_or(CommandError::NoImageTarget)
    }

    /// Path of the `<img>` occupying caret position `offset`, if any.
    pub fn image_at(&self, offset: usize) -> Option<NodePath> {
        leaves(&self.nodes)
            .into_iter()
            .find(|l| l.atom && l.start == offset)
            .filter(|l| matches!(dom::node_at(&self.nodes, &l.path), Some(Node::Element(el)) if el.tag == "img"))
            .map(|l| l.path)
    }

    /// Paths of every image wrapper in document order.
    pub fn image_wrappers(&self) -> Vec<NodePath> {
        leaves(&self.nodes)
            .into_iter()
            .filter_map(|l| self.image_wrapper_of(&l.path))
            .collect()
    }

    pub fn wrapper(&self, path: &[usize]) -> Option<&Element> {
        dom::node_at(&self.nodes, path)
            .and_then(Node::as_element)
            .filter(|el| is_image_wrapper(el))
    }

    /// Swap the wrapper's size class.
    pub fn set_image_size(&mut self, wrapper: &[usize], size: ImageSize) -> Result<(), CommandError> {
        let remove = ImageSize::ALL.map(ImageSize::class);
        self.mutate_wrapper(wrapper, |el| el.swap_classes(&remove, size.class()))
    }

    /// Swap the wrapper's alignment class.
    pub fn set_image_align(&mut self, wrapper: &[usize], align: ImageAlign) -> Result<(), CommandError> {
        let remove = ImageAlign::ALL.map(ImageAlign::class);
        self.mutate_wrapper(wrapper, |el| el.swap_classes(&remove, align.class()))
    }

    /// Remove the whole wrapper node.
    pub fn remove_image(&mut self, wrapper: &[usize]) -> Result<(), CommandError> {
        if self.wrapper(wrapper).is_none() {
            return Err(CommandError::NoImageTarget);
        }
        let Some((&idx, parent)) = wrapper.split_last() else {
            return Err(CommandError::NoImageTarget);
        };
        let parent = parent.to_vec();
        self.edit(|nodes| {
            if let Some(children) = dom::children_at_mut(nodes, &parent) {
                children.remove(idx);
            }
        });
        Ok(())
    }

    fn mutate_wrapper(&mut self, wrapper: &[usize], f: impl FnOnce(&mut Element)) -> Result<(), CommandError> {
        if self.wrapper(wrapper).is_none() {
            return Err(CommandError::NoImageTarget);
        }
        self.edit(|nodes| {
            if let Some(Node::Element(el)) = dom::node_at_mut(nodes, wrapper) {
                f(el);
            }
        });
        Ok(())
    }
}

impl UndoManager for ContentSurface {
    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        let current = std::mem::take(&mut self.nodes);
        match self.history.undo(current) {
            Ok(prev) => {
                self.nodes = prev;
                self.generation += 1;
                true
            }
            Err(current) => {
                self.nodes = current;
                false
            }
        }
    }

    fn redo(&mut self) -> bool {
        let current = std::mem::take(&mut self.nodes);
        match self.history.redo(current) {
            Ok(next) => {
                self.nodes = next;
                self.generation += 1;
                true
            }
            Err(current) => {
                self.nodes = current;
                false
            }
        }
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn surface(html: &str) -> ContentSurface {
        ContentSurface::from_html(html, 100)
    }

    #[test]
    fn test_leaves_count_atoms() {
        let s = surface("<p>ab<br>c</p><div class=\"img-container\"><img src=\"x\"></div>");
        assert_eq!(s.len(), 5);
        assert_eq!(s.text(), "abc");
        assert_eq!(s.text_in(1, 4), "bc");
    }

    #[test]
    fn test_typing_into_paragraph() {
        let mut s = surface("<p>Hello</p>");
        let caret = s.insert_text(Selection::collapsed(5), " world").unwrap();
        assert_eq!(caret, 11);
        assert_snapshot!(s.inner_html(), @"<p>Hello world</p>");
    }

    #[test]
    fn test_typing_replaces_placeholder_br() {
        let mut s = surface("<p><br></p>");
        let caret = s.insert_text(Selection::collapsed(0), "Hi").unwrap();
        assert_snapshot!(s.inner_html(), @"<p>Hi</p>");
        assert_eq!(caret, 2);
    }

    #[test]
    fn test_typing_after_image_stays_out_of_wrapper() {
        let mut s = surface(
            r#"<div class="img-container align-center size-full" contenteditable="false"><img src="x.png"></div><p>b</p>"#,
        );
        s.insert_text(Selection::collapsed(1), "a").unwrap();
        assert!(s.inner_html().ends_with("</div><p>ab</p>"));
    }

    #[test]
    fn test_typing_at_end_after_trailing_image() {
        let mut s = surface(
            r#"<p>x</p><div class="img-container align-center size-full" contenteditable="false"><img src="a.png"></div>"#,
        );
        let caret = s.insert_text(Selection::collapsed(2), "abc").unwrap();
        assert_eq!(caret, 5);
        assert!(s.inner_html().ends_with(r#"<img src="a.png"></div><p>abc</p>"#));
        assert_eq!(s.image_wrappers(), vec![vec![1]]);
    }

    #[test]
    fn test_typing_before_leading_image() {
        let mut s = surface(r#"<div class="img-container"><img src="a.png"></div><p>t</p>"#);
        s.insert_text(Selection::collapsed(0), "a").unwrap();
        assert_snapshot!(s.inner_html(), @r#"<p>a</p><div class="img-container"><img src="a.png"></div><p>t</p>"#);
    }

    #[test]
    fn test_typing_over_selection() {
        let mut s = surface("<p>one <b>two</b> three</p>");
        let caret = s.insert_text(Selection::new(4, 7), "2").unwrap();
        assert_eq!(caret, 5);
        assert_snapshot!(s.inner_html(), @"<p>one <b>2</b> three</p>");
    }

    #[test]
    fn test_backspace_does_not_merge_blocks() {
        let mut s = surface("<p>ab</p><p>cd</p>");
        assert_eq!(s.delete_backward(Selection::collapsed(2)).unwrap(), 1);
        assert_snapshot!(s.inner_html(), @"<p>a</p><p>cd</p>");
        s.delete_backward(Selection::new(0, 2)).unwrap();
        assert_snapshot!(s.inner_html(), @"<p></p><p>d</p>");
    }

    #[test]
    fn test_backspace_over_image_removes_wrapper() {
        let mut s = surface(
            r#"<div class="img-container align-center size-full" contenteditable="false"><img src="a.png"></div><p>b</p>"#,
        );
        assert_eq!(s.delete_backward(Selection::collapsed(1)).unwrap(), 0);
        assert_snapshot!(s.inner_html(), @"<p>b</p>");
        assert!(s.image_wrappers().is_empty());
    }

    #[test]
    fn test_delete_across_blocks_removes_contained() {
        let mut s = surface("<p>a</p><p>b</p><p>c</p><p>d</p>");
        s.delete_backward(Selection::new(0, 3)).unwrap();
        assert_snapshot!(s.inner_html(), @"<p></p><p>d</p>");
    }

    #[test]
    fn test_replace_range_rejects_stale_handle() {
        let mut s = surface("<p>The quick fox</p>");
        let range = s.range(Selection::new(4, 9)).unwrap();
        s.insert_text(Selection::collapsed(0), "!").unwrap();
        let err = s.replace_range(&range, "slow").unwrap_err();
        assert!(matches!(err, CommandError::StaleRange { .. }));

        let range = s.range(Selection::new(5, 10)).unwrap();
        let sel = s.replace_range(&range, "slow").unwrap();
        assert_eq!(sel, Selection::new(5, 9));
        assert_snapshot!(s.inner_html(), @"<p>!The slow fox</p>");
    }

    #[test]
    fn test_out_of_bounds() {
        let s = surface("<p>abc</p>");
        assert_eq!(
            s.range(Selection::new(0, 9)),
            Err(CommandError::OutOfBounds { offset: 9, len: 3 })
        );
    }

    #[test]
    fn test_insert_blocks_splits_paragraph() {
        let mut s = surface("<p>ab<i>cd</i></p>");
        let after = s.insert_blocks(Selection::collapsed(3), vec![Element::new("hr").into()]).unwrap();
        assert_eq!(after, 4);
        assert_snapshot!(s.inner_html(), @"<p>ab<i>c</i></p><hr><p><i>d</i></p>");
    }

    #[test]
    fn test_insert_image_at_block_boundary() {
        let mut s = surface("<p>ab</p>");
        s.insert_blocks(Selection::collapsed(0), image_wrapper("data:image/png;base64,AA==")).unwrap();
        assert_snapshot!(
            s.inner_html(),
            @r#"<div class="img-container align-center size-full" contenteditable="false"><img src="data:image/png;base64,AA==" alt="User uploaded content"></div><p><br></p><p>ab</p>"#
        );
    }

    #[test]
    fn test_image_wrapper_classes() {
        let mut s = surface("");
        s.insert_blocks(Selection::collapsed(0), image_wrapper("a.png")).unwrap();
        let wrapper = s.image_wrappers().remove(0);
        s.set_image_size(&wrapper, ImageSize::Small).unwrap();
        s.set_image_align(&wrapper, ImageAlign::Right).unwrap();
        assert_eq!(
            s.wrapper(&wrapper).and_then(|el| el.attr("class")),
            Some("img-container size-sm align-right")
        );
        s.remove_image(&wrapper).unwrap();
        assert_snapshot!(s.inner_html(), @"<p><br></p>");
        assert_eq!(s.remove_image(&wrapper), Err(CommandError::NoImageTarget));
    }

    #[test]
    fn test_image_outside_wrapper_is_not_selectable() {
        let s = surface("<p><img src=\"x\"></p>");
        let img = s.image_at(0).unwrap();
        assert_eq!(s.image_wrapper_of(&img), None);
    }

    #[test]
    fn test_undo_redo() {
        let mut s = surface("<p>a</p>");
        s.insert_text(Selection::collapsed(1), "b").unwrap();
        assert!(s.undo());
        assert_eq!(s.inner_html(), "<p>a</p>");
        assert!(s.redo());
        assert_eq!(s.inner_html(), "<p>ab</p>");
        assert!(!s.redo());
    }

    #[test]
    fn test_set_inner_html_clears_history() {
        let mut s = surface("<p>a</p>");
        s.insert_text(Selection::collapsed(1), "b").unwrap();
        s.set_inner_html("<p>z</p>");
        assert!(!s.can_undo());
    }
}
