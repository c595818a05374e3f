//! Editor actions and keyboard input types.
//!
//! `EditorAction` is what a toolbar button or shortcut asks for. Actions that
//! need something from the user first (a link URL, an image file) are resolved
//! by the editor into an [`crate::execute::Command`] before touching the surface.

use smol_str::SmolStr;

/// Heading levels offered by the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
}

impl HeadingLevel {
    pub fn tag(self) -> &'static str {
        match self {
            HeadingLevel::H1 => "h1",
            HeadingLevel::H2 => "h2",
            HeadingLevel::H3 => "h3",
            HeadingLevel::H4 => "h4",
        }
    }
}

/// Semantic editing operations, decoupled from how they're triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorAction {
    // === Inline formatting ===
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Highlight,
    /// Strip inline formatting from the selection. Links survive.
    ClearFormatting,

    // === Blocks ===
    Heading(HeadingLevel),
    Blockquote,
    CodeBlock,
    Paragraph,
    OrderedList,
    UnorderedList,
    HorizontalRule,

    // === Needs host input ===
    /// Prompt for a URL and link the selection.
    InsertLink,
    /// Pick an image file and splice it in at the saved caret.
    InsertImage,

    // === History ===
    Undo,
    Redo,
}

/// Key values for keyboard input.
///
/// Platform-agnostic key representation. Platform-specific code converts
/// from native key events to this enum; keys the editor never binds arrive
/// as `Unidentified` and fall through to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),
    Backspace,
    Unidentified,
}

impl Key {
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    pub const META_SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: true,
    };

    /// Ctrl or Cmd, whichever the user held.
    pub fn has_primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key combination for triggering an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::CTRL,
        }
    }

    pub fn meta(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::META,
        }
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a keybinding, let platform handle it.
    NotHandled,
}

/// Map a shortcut to the action a toolbar button would dispatch.
///
/// Either Ctrl or Cmd counts as the primary modifier so the same table works
/// everywhere.
pub fn action_for_key(combo: &KeyCombo) -> Option<EditorAction> {
    if !combo.modifiers.has_primary() || combo.modifiers.alt {
        return None;
    }
    let Key::Character(c) = &combo.key else {
        return None;
    };
    let shift = combo.modifiers.shift;
    match (c.to_lowercase().as_str(), shift) {
        ("b", false) => Some(EditorAction::Bold),
        ("i", false) => Some(EditorAction::Italic),
        ("u", false) => Some(EditorAction::Underline),
        ("k", false) => Some(EditorAction::InsertLink),
        ("z", false) => Some(EditorAction::Undo),
        ("z", true) | ("y", false) => Some(EditorAction::Redo),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_shortcuts() {
        let b = KeyCombo::ctrl(Key::character("b"));
        assert_eq!(action_for_key(&b), Some(EditorAction::Bold));
        let k = KeyCombo::meta(Key::character("K"));
        assert_eq!(action_for_key(&k), Some(EditorAction::InsertLink));
        let redo = KeyCombo::with_modifiers(Key::character("z"), Modifiers::META_SHIFT);
        assert_eq!(action_for_key(&redo), Some(EditorAction::Redo));
    }

    #[test]
    fn test_unbound_keys_pass_through() {
        assert_eq!(action_for_key(&KeyCombo::new(Key::character("b"))), None);
        assert_eq!(action_for_key(&KeyCombo::ctrl(Key::character("q"))), None);
        assert_eq!(action_for_key(&KeyCombo::ctrl(Key::Unidentified)), None);
        assert_eq!(action_for_key(&KeyCombo::ctrl(Key::Backspace)), None);
    }
}
