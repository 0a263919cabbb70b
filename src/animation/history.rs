use std::collections::VecDeque;

use crate::animation::composite::GroupEdit;
use crate::foundation::core::EntityKey;
use crate::scene::entity::PropertyKey;

/// One undoable unit: a batched edit of one property of one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    /// Edited entity.
    pub entity: EntityKey,
    /// Edited property.
    pub property: PropertyKey,
    /// Channel states around the edit.
    pub edit: GroupEdit,
}

/// Bounded undo stack with a redo stack that is cleared by new edits.
#[derive(Debug)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    cap: usize,
}

impl History {
    pub fn new(cap: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            cap: cap.max(1),
        }
    }

    /// Record an edit; no-op edits are dropped, the oldest entry falls off past the cap.
    pub fn push(&mut self, entry: HistoryEntry) {
        if entry.edit.is_noop() {
            return;
        }
        self.redo.clear();
        self.undo.push_back(entry);
        while self.undo.len() > self.cap {
            self.undo.pop_front();
        }
    }

    /// Pop the newest entry for undoing; it moves onto the redo stack.
    pub fn take_undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.undo.pop_back()?;
        self.redo.push(entry.clone());
        Some(entry)
    }

    /// Pop the newest undone entry for redoing; it moves back onto the undo stack.
    pub fn take_redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.redo.pop()?;
        self.undo.push_back(entry.clone());
        Some(entry)
    }

    /// Newest entry [`History::take_undo`] would return.
    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        self.undo.back()
    }

    pub fn peek_redo(&self) -> Option<&HistoryEntry> {
        self.redo.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/history.rs"]
mod tests;
