//! # Undo/Redo History
//!
//! Tracks local changes and enables undo/redo.
//!
//! ## Design
//!
//! - Each local change records its inverse steps before application
//! - Undo pops a change, the session applies the inverses and the change
//!   moves to the redo stack
//! - New local changes clear the redo stack
//! - Remote transactions are never recorded: undoing your own work must
//!   not revert a collaborator's edits

use crate::steps::Step;

/// One locally-originated change: the steps as applied and their
/// inverses in undo order.
#[derive(Debug, Clone)]
pub struct LocalChange {
    /// Steps in application order.
    pub steps: Vec<Step>,

    /// Inverse steps, reversed so they replay front to back.
    pub inverses: Vec<Step>,
}

/// Bounded undo/redo stacks of local changes.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<LocalChange>,
    redo_stack: Vec<LocalChange>,

    /// Maximum undo depth (0 = unlimited).
    max_levels: usize,
}

impl History {
    /// History with the default depth (100).
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a freshly-applied local change.
    pub fn record(&mut self, change: LocalChange) {
        self.undo_stack.push(change);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // A new action invalidates the redone future.
        self.redo_stack.clear();
    }

    /// Take the most recent change for undoing.
    pub fn pop_undo(&mut self) -> Option<LocalChange> {
        self.undo_stack.pop()
    }

    /// Park an undone change so it can be redone.
    pub fn push_redo(&mut self, change: LocalChange) {
        self.redo_stack.push(change);
    }

    /// Take the most recently undone change for redoing.
    pub fn pop_redo(&mut self) -> Option<LocalChange> {
        self.redo_stack.pop()
    }

    /// Put a redone change back on the undo stack without clearing redo.
    pub fn restore(&mut self, change: LocalChange) {
        self.undo_stack.push(change);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change() -> LocalChange {
        LocalChange {
            steps: vec![Step::insert(0, "x")],
            inverses: vec![Step::delete(0, 1)],
        }
    }

    #[test]
    fn test_empty_history() {
        let history = History::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_and_pop() {
        let mut history = History::new();
        history.record(change());

        assert_eq!(history.undo_levels(), 1);

        let popped = history.pop_undo().unwrap();
        history.push_redo(popped);

        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 1);
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new();
        history.record(change());
        let popped = history.pop_undo().unwrap();
        history.push_redo(popped);

        history.record(change());
        assert_eq!(history.redo_levels(), 0);
    }

    #[test]
    fn test_restore_keeps_redo() {
        let mut history = History::new();
        history.record(change());
        history.record(change());
        let a = history.pop_undo().unwrap();
        history.push_redo(a);
        let b = history.pop_undo().unwrap();
        history.push_redo(b);

        let redone = history.pop_redo().unwrap();
        history.restore(redone);

        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.redo_levels(), 1);
    }

    #[test]
    fn test_max_levels_drops_oldest() {
        let mut history = History::with_max_levels(2);
        for _ in 0..3 {
            history.record(change());
        }
        assert_eq!(history.undo_levels(), 2);
    }
}
