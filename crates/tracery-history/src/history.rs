#![forbid(unsafe_code)]

//! Bounded, cursor-indexed sequence of committed edits.
//!
//! [`History`] keeps every committed [`CompoundEdit`] in one list and a cursor
//! that splits it into an undoable past and a redoable future:
//!
//! - **Eviction**: the oldest edit is dropped when the list is full
//! - **Branch truncation**: committing after an undo discards the future
//! - **Unbounded mode**: a negative maximum disables eviction
//!
//! # Invariants
//!
//! 1. `cursor <= edits.len()`
//! 2. `edits[..cursor]` are undoable, newest last
//! 3. `edits[cursor..]` are redoable, next-to-redo first
//! 4. `edits.len() <= max_edit_count` when bounded (after any operation)
//!
//! # Memory Model
//!
//! Edits are stored in a `VecDeque` for O(1) eviction from the front, each
//! behind an `Rc` so lifecycle notifications can hand out the same edit the
//! history holds.
//!
//! ```text
//! commit A, B, C           undo x2                 commit D
//! ┌───────────────┐        ┌───────────────┐        ┌───────────────┐
//! │ [A, B, C]     │        │ [A, B, C]     │        │ [A, D]        │
//! │          ^    │  ───►  │    ^          │  ───►  │       ^       │
//! │ cursor = 3    │        │ cursor = 1    │        │ cursor = 2    │
//! └───────────────┘        └───────────────┘        └───────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::compound::CompoundEdit;

/// What a commit did to the existing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushOutcome {
    /// Redoable edits discarded by branch truncation.
    pub truncated: usize,
    /// Oldest edits dropped to respect the bound.
    pub evicted: usize,
}

/// Normalize a raw maximum: negative means unbounded, zero means one.
#[must_use]
pub fn normalize_max_edit_count(max_edit_count: i64) -> Option<usize> {
    match max_edit_count {
        n if n < 0 => None,
        0 => Some(1),
        n => Some(usize::try_from(n).unwrap_or(usize::MAX)),
    }
}

/// Committed edits plus the undo/redo cursor.
pub struct History<C> {
    edits: VecDeque<Rc<CompoundEdit<C>>>,
    /// Number of undoable edits; `edits[cursor - 1]` is next to undo.
    cursor: usize,
    max_edit_count: i64,
}

impl<C> fmt::Debug for History<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("len", &self.edits.len())
            .field("cursor", &self.cursor)
            .field("max_edit_count", &self.max_edit_count)
            .finish()
    }
}

impl<C> Default for History<C> {
    fn default() -> Self {
        Self::new(-1)
    }
}

impl<C> History<C> {
    /// Create an empty history; `max_edit_count < 0` means unbounded.
    #[must_use]
    pub fn new(max_edit_count: i64) -> Self {
        Self {
            edits: VecDeque::new(),
            cursor: 0,
            max_edit_count: Self::stored_max(max_edit_count),
        }
    }

    fn stored_max(max_edit_count: i64) -> i64 {
        if max_edit_count == 0 { 1 } else { max_edit_count }
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Append a committed edit.
    ///
    /// Discards every redoable edit first, then evicts from the front until
    /// there is room, then appends and moves the cursor past the new edit.
    pub fn push(&mut self, edit: Rc<CompoundEdit<C>>) -> PushOutcome {
        let truncated = self.edits.len() - self.cursor;
        self.edits.truncate(self.cursor);

        let mut evicted = 0;
        if let Some(max) = self.bound() {
            while self.edits.len() >= max {
                if self.edits.pop_front().is_none() {
                    break;
                }
                evicted += 1;
            }
        }

        self.edits.push_back(edit);
        self.cursor = self.edits.len();
        PushOutcome { truncated, evicted }
    }

    /// Move the cursor one edit back, returning the edit to undo.
    pub(crate) fn step_back(&mut self) -> Option<Rc<CompoundEdit<C>>> {
        let edit = self.edit_to_undo()?.clone();
        self.cursor -= 1;
        Some(edit)
    }

    /// Move the cursor one edit forward, returning the edit to redo.
    pub(crate) fn step_forward(&mut self) -> Option<Rc<CompoundEdit<C>>> {
        let edit = self.edit_to_redo()?.clone();
        self.cursor += 1;
        Some(edit)
    }

    /// The edit `undo` would replay.
    #[must_use]
    pub fn edit_to_undo(&self) -> Option<&Rc<CompoundEdit<C>>> {
        self.cursor.checked_sub(1).and_then(|i| self.edits.get(i))
    }

    /// The edit `redo` would replay.
    #[must_use]
    pub fn edit_to_redo(&self) -> Option<&Rc<CompoundEdit<C>>> {
        self.edits.get(self.cursor)
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Index of the last undoable edit; `None` when nothing is undoable.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.cursor.checked_sub(1)
    }

    /// All committed edits, oldest first.
    pub fn edits(&self) -> impl ExactSizeIterator<Item = &Rc<CompoundEdit<C>>> + '_ {
        self.edits.iter()
    }

    /// Edit at `index`, oldest first.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Rc<CompoundEdit<C>>> {
        self.edits.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Number of undoable edits.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    /// Number of redoable edits.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.edits.len() - self.cursor
    }

    /// Presentation names of undoable edits, most recent first.
    pub fn undo_names(&self, limit: usize) -> Vec<&str> {
        self.edits
            .iter()
            .take(self.cursor)
            .rev()
            .take(limit)
            .map(|e| e.presentation_name())
            .collect()
    }

    /// Presentation names of redoable edits, next-to-redo first.
    pub fn redo_names(&self, limit: usize) -> Vec<&str> {
        self.edits
            .iter()
            .skip(self.cursor)
            .take(limit)
            .map(|e| e.presentation_name())
            .collect()
    }

    /// Maximum as stored: negative for unbounded, never zero.
    #[must_use]
    pub fn max_edit_count(&self) -> i64 {
        self.max_edit_count
    }

    fn bound(&self) -> Option<usize> {
        normalize_max_edit_count(self.max_edit_count)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Change the bound, dropping edits until it holds.
    ///
    /// Undoable edits go oldest first. Once none are left, redoable edits go
    /// from the far end of the redo chain, so the next redo still applies to
    /// the current state. Returns the number of dropped edits.
    pub fn set_max_edit_count(&mut self, max_edit_count: i64) -> usize {
        self.max_edit_count = Self::stored_max(max_edit_count);
        let Some(max) = self.bound() else {
            return 0;
        };
        let mut evicted = 0;
        while self.edits.len() > max {
            if self.cursor > 0 {
                self.edits.pop_front();
                self.cursor -= 1;
            } else {
                self.edits.pop_back();
            }
            evicted += 1;
        }
        evicted
    }

    /// Drop every edit and reset the cursor.
    pub fn clear(&mut self) {
        self.edits.clear();
        self.cursor = 0;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Change, ChangeRecord, Delta, DocumentId};

    #[derive(Debug, Clone, PartialEq)]
    struct Touch(Delta<u32>);

    impl Change for Touch {
        type Kind = ();
        fn kind(&self) {}
    }

    fn edit(name: &str) -> Rc<CompoundEdit<Touch>> {
        let mut e = CompoundEdit::new();
        e.add_record(ChangeRecord::new(DocumentId(1), Touch(Delta::new(0, 1))))
            .unwrap();
        e.complete(name, "");
        Rc::new(e)
    }

    fn names(h: &History<Touch>) -> Vec<String> {
        h.edits().map(|e| e.name().to_owned()).collect()
    }

    #[test]
    fn new_history_is_empty() {
        let h: History<Touch> = History::default();
        assert!(h.is_empty());
        assert_eq!(h.current_index(), None);
        assert!(h.edit_to_undo().is_none());
        assert!(h.edit_to_redo().is_none());
    }

    #[test]
    fn push_advances_cursor() {
        let mut h = History::new(-1);
        h.push(edit("A"));
        h.push(edit("B"));
        assert_eq!(h.current_index(), Some(1));
        assert_eq!(h.edit_to_undo().unwrap().name(), "B");
        assert!(h.edit_to_redo().is_none());
    }

    #[test]
    fn step_back_and_forward_move_cursor() {
        let mut h = History::new(-1);
        h.push(edit("A"));
        h.push(edit("B"));

        assert_eq!(h.step_back().unwrap().name(), "B");
        assert_eq!(h.current_index(), Some(0));
        assert_eq!(h.edit_to_redo().unwrap().name(), "B");

        assert_eq!(h.step_back().unwrap().name(), "A");
        assert_eq!(h.current_index(), None);
        assert!(h.step_back().is_none());

        assert_eq!(h.step_forward().unwrap().name(), "A");
        assert_eq!(h.step_forward().unwrap().name(), "B");
        assert!(h.step_forward().is_none());
        assert_eq!(h.current_index(), Some(1));
    }

    #[test]
    fn push_after_undo_truncates_branch() {
        let mut h = History::new(-1);
        h.push(edit("A"));
        h.push(edit("B"));
        h.push(edit("C"));
        h.step_back();
        h.step_back();

        let outcome = h.push(edit("D"));
        assert_eq!(outcome.truncated, 2);
        assert_eq!(names(&h), vec!["A", "D"]);
        assert_eq!(h.current_index(), Some(1));
    }

    #[test]
    fn bound_evicts_oldest() {
        let mut h = History::new(3);
        for n in ["A", "B", "C", "D"] {
            h.push(edit(n));
        }
        assert_eq!(names(&h), vec!["B", "C", "D"]);
        assert_eq!(h.current_index(), Some(2));
    }

    #[test]
    fn zero_max_is_normalized_to_one() {
        let mut h = History::new(0);
        assert_eq!(h.max_edit_count(), 1);
        h.push(edit("A"));
        let outcome = h.push(edit("B"));
        assert_eq!(outcome.evicted, 1);
        assert_eq!(names(&h), vec!["B"]);
    }

    #[test]
    fn negative_max_is_unbounded() {
        let mut h = History::new(-5);
        for i in 0..500 {
            h.push(edit(&i.to_string()));
        }
        assert_eq!(h.len(), 500);
        assert_eq!(normalize_max_edit_count(-5), None);
    }

    #[test]
    fn shrinking_bound_evicts_and_adjusts_cursor() {
        let mut h = History::new(-1);
        for n in ["A", "B", "C", "D"] {
            h.push(edit(n));
        }
        h.step_back();
        assert_eq!(h.set_max_edit_count(2), 2);
        assert_eq!(names(&h), vec!["C", "D"]);
        assert_eq!(h.edit_to_undo().unwrap().name(), "C");
        assert_eq!(h.edit_to_redo().unwrap().name(), "D");
    }

    #[test]
    fn shrinking_bound_with_everything_undone_keeps_redo_order() {
        let mut h = History::new(-1);
        for n in ["A", "B", "C"] {
            h.push(edit(n));
        }
        h.step_back();
        h.step_back();
        h.step_back();

        assert_eq!(h.set_max_edit_count(1), 2);
        assert_eq!(names(&h), vec!["A"]);
        assert_eq!(h.current_index(), None);
        assert_eq!(h.step_forward().unwrap().name(), "A");
        assert!(h.step_forward().is_none());
    }

    #[test]
    fn shrinking_bound_drops_undo_side_before_redo_side() {
        let mut h = History::new(-1);
        for n in ["A", "B", "C", "D"] {
            h.push(edit(n));
        }
        h.step_back();
        h.step_back();

        // A and B are undoable, C and D redoable.
        assert_eq!(h.set_max_edit_count(1), 3);
        assert_eq!(names(&h), vec!["C"]);
        assert_eq!(h.undo_depth(), 0);
        assert_eq!(h.edit_to_redo().unwrap().name(), "C");
    }

    #[test]
    fn names_do_not_need_a_change_type() {
        let mut h: History<String> = History::new(-1);
        let mut e = CompoundEdit::default();
        e.complete("Plain", "Plain Edit");
        h.push(Rc::new(e));
        assert_eq!(h.undo_names(3), vec!["Plain Edit"]);
        assert!(h.redo_names(3).is_empty());
    }

    #[test]
    fn undo_and_redo_names() {
        let mut h = History::new(-1);
        for n in ["A", "B", "C"] {
            h.push(edit(n));
        }
        h.step_back();
        assert_eq!(h.undo_names(5), vec!["B", "A"]);
        assert_eq!(h.undo_names(1), vec!["B"]);
        assert_eq!(h.redo_names(5), vec!["C"]);
        assert_eq!(h.undo_depth(), 2);
        assert_eq!(h.redo_depth(), 1);
    }

    #[test]
    fn clear_resets() {
        let mut h = History::new(-1);
        h.push(edit("A"));
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.current_index(), None);
    }

    #[test]
    fn debug_impl() {
        let h: History<Touch> = History::new(4);
        let s = format!("{h:?}");
        assert!(s.contains("History"));
        assert!(s.contains("cursor"));
    }
}
