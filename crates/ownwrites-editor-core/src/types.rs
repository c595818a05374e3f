//! Core editor types: cursor, selection and range handles.
//!
//! Offsets are in caret positions over the document's leaves: every character
//! of text counts one, and so does every atomic element (`<img>`, `<br>`,
//! `<hr>`), which contributes no text.

use crate::dom::NodePath;
use std::ops::Range;

/// Cursor state including position and affinity.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct CursorState {
    /// Caret position (NOT a byte offset)
    pub offset: usize,

    /// Which leaf wins when the offset sits on a boundary between two
    pub affinity: Affinity,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            offset: 0,
            affinity: Affinity::Before,
        }
    }
}

impl CursorState {
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            affinity: Affinity::Before,
        }
    }

    pub fn with_affinity(offset: usize, affinity: Affinity) -> Self {
        Self { offset, affinity }
    }
}

/// Boundary preference for a caret sitting between two leaves.
///
/// `Before` sticks to the end of the preceding leaf (typing continues the
/// previous word), `After` sticks to the start of the following leaf (the
/// caret just after an inserted image lands in the paragraph below it).
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    #[default]
    Before,
    After,
}

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the caret is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (caret position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }
}

/// Short-lived handle to a span of the surface.
///
/// Carries the surface generation it was taken at; the surface rejects it once
/// anything has mutated the document since. Take a fresh one per interaction.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
    pub generation: u64,
}

impl TextRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn selection(&self) -> Selection {
        Selection::new(self.start, self.end)
    }
}

/// Handle to a selected image wrapper, stamped like [`TextRange`].
///
/// Paths shift when blocks are inserted or removed above the image, so a
/// handle from an older generation must be re-taken before use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    pub wrapper: NodePath,
    pub generation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_bounds() {
        let sel = Selection::new(9, 4);
        assert!(sel.is_backwards());
        assert_eq!(sel.to_range(), 4..9);
        assert_eq!(sel.len(), 5);
        assert!(Selection::collapsed(3).is_collapsed());
    }
}
