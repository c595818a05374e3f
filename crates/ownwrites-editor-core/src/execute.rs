//! Command execution against the content surface.
//!
//! `execute_command` is the single dispatch point for every formatting and
//! structural edit, whether it came from a toolbar button or a shortcut. It
//! takes the document and selection and returns the selection to restore.

use crate::actions::EditorAction;
use crate::block::{self, ListKind};
use crate::dom::{Element, Node};
use crate::error::CommandError;
use crate::inline::InlineOp;
use crate::surface::{ContentSurface, image_wrapper};
use crate::types::Selection;
use crate::undo::UndoManager;

/// A fully resolved command: everything it needs from the user is already here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Inline(InlineOp),
    FormatBlock(&'static str),
    List(ListKind),
    HorizontalRule,
    Link { url: String },
    /// Splice an image wrapper at a saved caret, or at the end when none was saved.
    InsertImage { src: String, at: Option<Selection> },
    Undo,
    Redo,
}

impl Command {
    /// Resolve actions that need no input from the host.
    ///
    /// Returns `None` for `InsertLink` and `InsertImage`.
    pub fn from_action(action: EditorAction) -> Option<Command> {
        let command = match action {
            EditorAction::Bold => Command::Inline(InlineOp::BOLD),
            EditorAction::Italic => Command::Inline(InlineOp::ITALIC),
            EditorAction::Underline => Command::Inline(InlineOp::UNDERLINE),
            EditorAction::Strikethrough => Command::Inline(InlineOp::STRIKETHROUGH),
            EditorAction::Highlight => Command::Inline(InlineOp::HIGHLIGHT),
            EditorAction::ClearFormatting => Command::Inline(InlineOp::ClearFormatting),
            EditorAction::Heading(level) => Command::FormatBlock(level.tag()),
            EditorAction::Blockquote => Command::FormatBlock("blockquote"),
            EditorAction::CodeBlock => Command::FormatBlock("pre"),
            EditorAction::Paragraph => Command::FormatBlock("p"),
            EditorAction::OrderedList => Command::List(ListKind::Ordered),
            EditorAction::UnorderedList => Command::List(ListKind::Unordered),
            EditorAction::HorizontalRule => Command::HorizontalRule,
            EditorAction::Undo => Command::Undo,
            EditorAction::Redo => Command::Redo,
            EditorAction::InsertLink | EditorAction::InsertImage => return None,
        };
        Some(command)
    }
}

/// Prefix `https://` unless the URL already carries an http(s) scheme.
///
/// Empty input means the prompt was cancelled.
pub fn normalize_link_url(input: &str) -> Option<String> {
    let url = input.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url.to_string())
    } else {
        Some(format!("https://{url}"))
    }
}

/// A link needs selected text; checked before prompting for the URL.
pub fn check_link_selection(surface: &ContentSurface, selection: Selection) -> Result<(), CommandError> {
    if selection.is_collapsed() || surface.text_in(selection.start(), selection.end()).is_empty() {
        return Err(CommandError::NoSelection);
    }
    Ok(())
}

/// Execute a command on the surface.
///
/// Returns the selection after the command.
pub fn execute_command(
    surface: &mut ContentSurface,
    selection: Selection,
    command: &Command,
) -> Result<Selection, CommandError> {
    tracing::debug!(?command, start = selection.start(), end = selection.end(), "execute command");
    match command {
        Command::Inline(op) => {
            surface.apply_inline(selection, op)?;
            Ok(selection)
        }
        Command::FormatBlock(tag) => {
            surface.restructure(selection, |nodes, sel| block::format_block(nodes, sel, tag))?;
            Ok(selection)
        }
        Command::List(kind) => {
            let kind = *kind;
            surface.restructure(selection, |nodes, sel| block::toggle_list(nodes, sel, kind))?;
            Ok(selection)
        }
        Command::HorizontalRule => {
            let hr: Node = Element::new("hr").into();
            let after = surface.insert_blocks(selection, vec![hr])?;
            Ok(Selection::collapsed(after))
        }
        Command::Link { url } => {
            check_link_selection(surface, selection)?;
            surface.apply_inline(selection, &InlineOp::Link { href: url.clone() })?;
            Ok(selection)
        }
        Command::InsertImage { src, at } => {
            let at = at.unwrap_or_else(|| Selection::collapsed(surface.len()));
            surface.insert_blocks(at, image_wrapper(src))?;
            // Caret lands in the empty paragraph after the wrapper.
            Ok(Selection::collapsed(at.start() + 1))
        }
        Command::Undo => {
            surface.undo();
            Ok(clamp(selection, surface.len()))
        }
        Command::Redo => {
            surface.redo();
            Ok(clamp(selection, surface.len()))
        }
    }
}

fn clamp(selection: Selection, len: usize) -> Selection {
    Selection::new(selection.anchor.min(len), selection.head.min(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::HeadingLevel;
    use insta::assert_snapshot;

    fn make_surface(html: &str) -> ContentSurface {
        ContentSurface::from_html(html, 100)
    }

    fn run(surface: &mut ContentSurface, sel: Selection, action: EditorAction) -> Selection {
        let command = Command::from_action(action).unwrap();
        execute_command(surface, sel, &command).unwrap()
    }

    #[test]
    fn test_toggle_bold() {
        let mut surface = make_surface("<p>hello</p>");
        run(&mut surface, Selection::new(0, 5), EditorAction::Bold);
        assert_snapshot!(surface.inner_html(), @"<p><b>hello</b></p>");
        run(&mut surface, Selection::new(0, 5), EditorAction::Bold);
        assert_snapshot!(surface.inner_html(), @"<p>hello</p>");
    }

    #[test]
    fn test_heading_and_code_block() {
        let mut surface = make_surface("<p>Intro</p><p>let x = 1;</p>");
        run(&mut surface, Selection::collapsed(2), EditorAction::Heading(HeadingLevel::H1));
        run(&mut surface, Selection::collapsed(7), EditorAction::CodeBlock);
        assert_snapshot!(surface.inner_html(), @"<h1>Intro</h1><pre>let x = 1;</pre>");
    }

    #[test]
    fn test_horizontal_rule_replaces_selection() {
        let mut surface = make_surface("<p>abcd</p>");
        let sel = run(&mut surface, Selection::new(1, 3), EditorAction::HorizontalRule);
        assert_eq!(sel, Selection::collapsed(2));
        assert_snapshot!(surface.inner_html(), @"<p>a</p><hr><p>d</p>");
    }

    #[test]
    fn test_link_requires_selection() {
        let mut surface = make_surface("<p>hello</p>");
        let cmd = Command::Link {
            url: "https://example.com".into(),
        };
        let err = execute_command(&mut surface, Selection::collapsed(2), &cmd).unwrap_err();
        assert_eq!(err, CommandError::NoSelection);
        assert_eq!(err.to_string(), "Please select text to create a link.");
        assert_eq!(surface.inner_html(), "<p>hello</p>");
        assert!(!surface.can_undo());

        execute_command(&mut surface, Selection::new(0, 5), &cmd).unwrap();
        assert_snapshot!(surface.inner_html(), @r#"<p><a href="https://example.com">hello</a></p>"#);
    }

    #[test]
    fn test_normalize_link_url() {
        assert_eq!(normalize_link_url("example.com").as_deref(), Some("https://example.com"));
        assert_eq!(normalize_link_url("http://a.test").as_deref(), Some("http://a.test"));
        assert_eq!(normalize_link_url("https://a.test").as_deref(), Some("https://a.test"));
        assert_eq!(normalize_link_url("  "), None);
    }

    #[test]
    fn test_insert_image_at_saved_caret() {
        let mut surface = make_surface("<p>before</p><p>after</p>");
        let cmd = Command::InsertImage {
            src: "data:image/png;base64,AA==".into(),
            at: Some(Selection::collapsed(6)),
        };
        let sel = execute_command(&mut surface, Selection::collapsed(0), &cmd).unwrap();
        assert_eq!(sel, Selection::collapsed(7));
        assert_snapshot!(
            surface.inner_html(),
            @r#"<p>before</p><div class="img-container align-center size-full" contenteditable="false"><img src="data:image/png;base64,AA==" alt="User uploaded content"></div><p><br></p><p>after</p>"#
        );
    }

    #[test]
    fn test_insert_image_without_caret_appends() {
        let mut surface = make_surface("<p>text</p>");
        let cmd = Command::InsertImage {
            src: "x.png".into(),
            at: None,
        };
        execute_command(&mut surface, Selection::collapsed(0), &cmd).unwrap();
        assert!(surface.inner_html().starts_with("<p>text</p><div class=\"img-container"));
    }

    #[test]
    fn test_list_then_undo() {
        let mut surface = make_surface("<p>a</p><p>b</p>");
        run(&mut surface, Selection::new(0, 2), EditorAction::OrderedList);
        assert_snapshot!(surface.inner_html(), @"<ol><li>a</li><li>b</li></ol>");
        run(&mut surface, Selection::new(0, 2), EditorAction::Undo);
        assert_eq!(surface.inner_html(), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_host_actions_do_not_resolve() {
        assert_eq!(Command::from_action(EditorAction::InsertLink), None);
        assert_eq!(Command::from_action(EditorAction::InsertImage), None);
    }
}
