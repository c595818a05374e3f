//! Undo/redo management for the content surface.
//!
//! Provides:
//! - `UndoManager` trait for abstracting undo implementations
//! - `SnapshotHistory<T>` - bounded whole-document snapshot stacks

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo, not just track state.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if successful.
    fn undo(&mut self) -> bool;

    /// Perform redo. Returns true if successful.
    fn redo(&mut self) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// Undo and redo stacks of full document states.
///
/// Blog-post-sized documents are cheap to clone, so each edit stores the
/// state it replaced instead of an inverse operation.
#[derive(Debug, Clone)]
pub struct SnapshotHistory<T> {
    undo_stack: Vec<T>,
    redo_stack: Vec<T>,
    max_steps: usize,
}

impl<T> SnapshotHistory<T> {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
        }
    }

    /// Record the state an edit is about to replace.
    pub fn record(&mut self, before: T) {
        // Clear redo stack on new edit
        self.redo_stack.clear();
        self.undo_stack.push(before);

        // Trim if over max
        if self.undo_stack.len() > self.max_steps {
            let excess = self.undo_stack.len() - self.max_steps;
            self.undo_stack.drain(..excess);
        }
    }

    /// Swap `current` for the most recent recorded state.
    pub fn undo(&mut self, current: T) -> Result<T, T> {
        match self.undo_stack.pop() {
            Some(prev) => {
                self.redo_stack.push(current);
                Ok(prev)
            }
            None => Err(current),
        }
    }

    /// Swap `current` for the most recently undone state.
    pub fn redo(&mut self, current: T) -> Result<T, T> {
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack.push(current);
                Ok(next)
            }
            None => Err(current),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
