//! Inline formatting over a caret range.
//!
//! Each block that holds selected leaves is flattened into a list of runs, each
//! carrying the stack of inline elements ("marks") it sits under. Operations
//! rewrite the mark stacks of the runs inside the range; the block's children
//! are then rebuilt by grouping runs on common mark prefixes. Rebuilding is
//! canonical, so applying the same operation twice is stable.

use smol_str::SmolStr;

use crate::dom::{self, Element, Node, NodePath};
use crate::surface::{leaves, offset_of, split_text_at};

/// Formatting operation applied to every run in a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineOp {
    /// Add `tag` unless every selected text run already carries one of `family`,
    /// in which case remove the whole family.
    Toggle {
        tag: &'static str,
        family: &'static [&'static str],
    },
    /// Strip every mark except links.
    ClearFormatting,
    /// Replace any link over the range with one to `href`.
    Link { href: String },
}

impl InlineOp {
    pub const BOLD: InlineOp = InlineOp::Toggle {
        tag: "b",
        family: &["b", "strong"],
    };
    pub const ITALIC: InlineOp = InlineOp::Toggle {
        tag: "i",
        family: &["i", "em"],
    };
    pub const UNDERLINE: InlineOp = InlineOp::Toggle {
        tag: "u",
        family: &["u"],
    };
    pub const STRIKETHROUGH: InlineOp = InlineOp::Toggle {
        tag: "s",
        family: &["s", "strike", "del"],
    };
    pub const HIGHLIGHT: InlineOp = InlineOp::Toggle {
        tag: "mark",
        family: &["mark"],
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Mark {
    tag: SmolStr,
    attrs: Vec<(SmolStr, String)>,
}

impl Mark {
    fn of(el: &Element) -> Self {
        Self {
            tag: el.tag.clone(),
            attrs: el.attrs.clone(),
        }
    }

    fn element(&self, children: Vec<Node>) -> Node {
        Node::Element(Element {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children,
        })
    }
}

#[derive(Debug, Clone)]
enum RunKind {
    Text(String),
    /// Void inline element (`<img>`, `<br>`).
    Atom(Node),
    /// Anything else nested in inline content: comments, stray blocks.
    Opaque(Node),
}

#[derive(Debug, Clone)]
struct Run {
    kind: RunKind,
    marks: Vec<Mark>,
    start: usize,
    units: usize,
}

impl Run {
    fn within(&self, start: usize, end: usize) -> bool {
        self.units > 0 && self.start >= start && self.start + self.units <= end
    }
}

/// Apply `op` to `[start, end)`.
pub(crate) fn apply(nodes: &mut Vec<Node>, start: usize, end: usize, op: &InlineOp) {
    if start >= end {
        return;
    }
    split_text_at(nodes, end);
    split_text_at(nodes, start);

    let mut containers: Vec<NodePath> = Vec::new();
    for leaf in leaves(nodes) {
        if leaf.start < start || leaf.end() > end {
            continue;
        }
        let container = inline_container(nodes, &leaf.path);
        if !containers.contains(&container) {
            containers.push(container);
        }
    }
    // Deepest first: rebuilding a block never moves blocks nested below it,
    // but can shift siblings inside it.
    containers.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| b.cmp(a)));

    for path in containers {
        let base = offset_of(nodes, &path);
        let Some(children) = dom::children_at_mut(nodes, &path) else {
            continue;
        };
        let mut runs = Vec::new();
        let mut pos = base;
        flatten(std::mem::take(children), &mut Vec::new(), &mut pos, &mut runs);
        apply_to_runs(&mut runs, start, end, op);
        *children = rebuild(&runs, 0);
    }
}

/// Nearest ancestor of `path` that is not an inline element, or the root.
fn inline_container(nodes: &[Node], path: &[usize]) -> NodePath {
    let mut container = Vec::new();
    let mut level = nodes;
    for (depth, &idx) in path.iter().enumerate() {
        match level.get(idx) {
            Some(Node::Element(el)) if !el.is_void() => {
                if !el.is_inline() {
                    container = path[..=depth].to_vec();
                }
                level = &el.children;
            }
            _ => break,
        }
    }
    container
}

fn flatten(children: Vec<Node>, marks: &mut Vec<Mark>, pos: &mut usize, out: &mut Vec<Run>) {
    for child in children {
        let start = *pos;
        match child {
            Node::Text(t) if t.is_empty() => {}
            Node::Text(t) => {
                let units = t.chars().count();
                *pos += units;
                out.push(Run {
                    kind: RunKind::Text(t),
                    marks: marks.clone(),
                    start,
                    units,
                });
            }
            Node::Element(el) if el.is_void() && el.is_inline() => {
                *pos += 1;
                out.push(Run {
                    kind: RunKind::Atom(Node::Element(el)),
                    marks: marks.clone(),
                    start,
                    units: 1,
                });
            }
            Node::Element(el) if el.is_inline() => {
                marks.push(Mark::of(&el));
                flatten(el.children, marks, pos, out);
                marks.pop();
            }
            other => {
                let units = other.units();
                *pos += units;
                out.push(Run {
                    kind: RunKind::Opaque(other),
                    marks: marks.clone(),
                    start,
                    units,
                });
            }
        }
    }
}

fn apply_to_runs(runs: &mut [Run], start: usize, end: usize, op: &InlineOp) {
    let selected = |run: &Run| run.within(start, end) && !matches!(run.kind, RunKind::Opaque(_));
    match op {
        InlineOp::Toggle { tag, family } => {
            let in_family = |m: &Mark| family.contains(&m.tag.as_str());
            let mut texts = runs
                .iter()
                .filter(|r| selected(*r) && matches!(r.kind, RunKind::Text(_)))
                .peekable();
            if texts.peek().is_none() {
                return;
            }
            let all_marked = texts.all(|r| r.marks.iter().any(in_family));
            for run in runs.iter_mut().filter(|r| selected(&**r)) {
                if all_marked {
                    run.marks.retain(|m| !in_family(m));
                } else if matches!(run.kind, RunKind::Text(_)) && !run.marks.iter().any(in_family) {
                    run.marks.push(Mark {
                        tag: SmolStr::new_static(*tag),
                        attrs: Vec::new(),
                    });
                }
            }
        }
        InlineOp::ClearFormatting => {
            for run in runs.iter_mut().filter(|r| selected(&**r)) {
                run.marks.retain(|m| m.tag == "a");
            }
        }
        InlineOp::Link { href } => {
            let link = Mark {
                tag: SmolStr::new_static("a"),
                attrs: vec![(SmolStr::new_static("href"), href.clone())],
            };
            for run in runs.iter_mut().filter(|r| selected(&**r)) {
                run.marks.retain(|m| m.tag != "a");
                run.marks.insert(0, link.clone());
            }
        }
    }
}

/// Group runs into nested elements on shared mark prefixes.
fn rebuild(runs: &[Run], depth: usize) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    let mut i = 0;
    while i < runs.len() {
        match runs[i].marks.get(depth) {
            None => {
                match &runs[i].kind {
                    RunKind::Text(t) => match out.last_mut() {
                        Some(Node::Text(prev)) => prev.push_str(t),
                        _ => out.push(Node::Text(t.clone())),
                    },
                    RunKind::Atom(node) | RunKind::Opaque(node) => out.push(node.clone()),
                }
                i += 1;
            }
            Some(mark) => {
                let mut j = i + 1;
                while j < runs.len() && runs[j].marks.get(depth) == Some(mark) {
                    j += 1;
                }
                out.push(mark.element(rebuild(&runs[i..j], depth + 1)));
                i = j;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn run(html: &str, start: usize, end: usize, op: &InlineOp) -> String {
        let mut nodes = dom::parse_fragment(html);
        apply(&mut nodes, start, end, op);
        dom::serialize(&nodes)
    }

    #[test]
    fn test_bold_middle_of_word() {
        assert_snapshot!(run("<p>hello</p>", 1, 4, &InlineOp::BOLD), @"<p>h<b>ell</b>o</p>");
    }

    #[test]
    fn test_bold_toggles_off_including_strong() {
        assert_snapshot!(
            run("<p><strong>hello</strong> world</p>", 0, 5, &InlineOp::BOLD),
            @"<p>hello world</p>"
        );
        assert_snapshot!(
            run("<p><b>hello</b> world</p>", 2, 4, &InlineOp::BOLD),
            @"<p><b>he</b>ll<b>o</b> world</p>"
        );
    }

    #[test]
    fn test_partial_mark_extends() {
        assert_snapshot!(
            run("<p><b>he</b>llo</p>", 0, 5, &InlineOp::BOLD),
            @"<p><b>hello</b></p>"
        );
    }

    #[test]
    fn test_across_blocks() {
        assert_snapshot!(
            run("<p>one</p><h2>two</h2>", 1, 5, &InlineOp::ITALIC),
            @"<p>o<i>ne</i></p><h2><i>tw</i>o</h2>"
        );
    }

    #[test]
    fn test_clear_formatting_keeps_links() {
        let html = r#"<p><b><a href="https://a.test"><i>x</i>y</a></b>z</p>"#;
        let once = run(html, 0, 3, &InlineOp::ClearFormatting);
        assert_snapshot!(once, @r#"<p><a href="https://a.test">xy</a>z</p>"#);
        let mut nodes = dom::parse_fragment(&once);
        apply(&mut nodes, 0, 3, &InlineOp::ClearFormatting);
        assert_eq!(dom::serialize(&nodes), once);
    }

    #[test]
    fn test_link_replaces_existing() {
        assert_snapshot!(
            run(r#"<p>go <a href="http://old">here</a></p>"#, 3, 7, &InlineOp::Link { href: "https://new".into() }),
            @r#"<p>go <a href="https://new">here</a></p>"#
        );
    }

    #[test]
    fn test_image_is_left_alone_by_toggle() {
        assert_snapshot!(
            run(r#"<p>a<img src="x">b</p>"#, 0, 3, &InlineOp::UNDERLINE),
            @r#"<p><u>a</u><img src="x"><u>b</u></p>"#
        );
    }
}
