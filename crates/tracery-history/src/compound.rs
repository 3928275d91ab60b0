#![forbid(unsafe_code)]

//! Compound edits: the records of one committed transaction.
//!
//! A [`CompoundEdit`] is append-only while its transaction is open and frozen
//! once committed. Replay walks the records in capture order for redo and in
//! reverse capture order for undo, since later records may depend on state
//! established by earlier ones in the same transaction.
//!
//! ```text
//! capture:  r1 ──► r2 ──► r3
//! undo:     r3 ──► r2 ──► r1   (old side)
//! redo:     r1 ──► r2 ──► r3   (new side)
//! ```

use std::fmt;

use crate::error::UndoError;
use crate::record::{Change, ChangeRecord, Direction, DocumentId};

/// Something a compound edit can be replayed onto.
pub trait ReplayTarget<C: Change> {
    /// Whether `document` is still registered and alive.
    fn is_live(&self, document: DocumentId) -> bool;

    /// Apply one record in `direction`.
    fn apply(&mut self, record: &ChangeRecord<C>, direction: Direction) -> Result<(), UndoError>;
}

/// An ordered, named group of change records.
#[derive(Clone)]
pub struct CompoundEdit<C> {
    records: Vec<ChangeRecord<C>>,
    complete: bool,
    name: String,
    presentation_name: String,
}

impl<C> fmt::Debug for CompoundEdit<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundEdit")
            .field("name", &self.name)
            .field("records", &self.records.len())
            .field("complete", &self.complete)
            .finish()
    }
}

impl<C> Default for CompoundEdit<C> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            complete: false,
            name: String::new(),
            presentation_name: String::new(),
        }
    }
}

impl<C> CompoundEdit<C> {
    /// Freeze the edit under a transaction name.
    pub(crate) fn complete(&mut self, name: &str, presentation_name: &str) {
        self.complete = true;
        self.name = name.to_owned();
        self.presentation_name = if presentation_name.is_empty() {
            name.to_owned()
        } else {
            presentation_name.to_owned()
        };
    }

    /// Records in capture order.
    #[must_use]
    pub fn records(&self) -> &[ChangeRecord<C>] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True once committed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The transaction-name token given at commit.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// User-facing label; falls back to the name when none was given.
    #[must_use]
    pub fn presentation_name(&self) -> &str {
        &self.presentation_name
    }

    /// Drop every record, releasing whatever they hold.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl<C: Change> CompoundEdit<C> {
    /// Create an empty, open edit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    ///
    /// # Errors
    ///
    /// [`UndoError::EditComplete`] once the edit has been committed.
    pub fn add_record(&mut self, record: ChangeRecord<C>) -> Result<(), UndoError> {
        if self.complete {
            return Err(UndoError::EditComplete);
        }
        self.records.push(record);
        Ok(())
    }

    /// Distinct documents touched by this edit, in first-touch order.
    #[must_use]
    pub fn documents(&self) -> Vec<DocumentId> {
        let mut seen = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.document()) {
                seen.push(record.document());
            }
        }
        seen
    }

    /// True when the edit is committed and every document it touches is live.
    #[must_use]
    pub fn can_undo(&self, target: &impl ReplayTarget<C>) -> bool {
        self.complete && self.records.iter().all(|r| target.is_live(r.document()))
    }

    /// Mirror of [`can_undo`](Self::can_undo); the cursor decides which one applies.
    #[must_use]
    pub fn can_redo(&self, target: &impl ReplayTarget<C>) -> bool {
        self.can_undo(target)
    }

    /// Apply the old side of every record, newest first.
    ///
    /// Stops at the first failure and returns it.
    pub fn undo(&self, target: &mut impl ReplayTarget<C>) -> Result<(), UndoError> {
        for record in self.records.iter().rev() {
            target.apply(record, Direction::Undo)?;
        }
        Ok(())
    }

    /// Apply the new side of every record, oldest first.
    ///
    /// Stops at the first failure and returns it.
    pub fn redo(&self, target: &mut impl ReplayTarget<C>) -> Result<(), UndoError> {
        for record in &self.records {
            target.apply(record, Direction::Redo)?;
        }
        Ok(())
    }

    /// Most recent before-phase record that pairs with `after`.
    ///
    /// Linear backward scan, O(records-in-transaction).
    #[must_use]
    pub fn find_paired_before(&self, after: &ChangeRecord<C>) -> Option<&ChangeRecord<C>> {
        self.records.iter().rev().find(|r| after.pairs_with(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Delta, EntityId};
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq)]
    struct Set(Delta<i32>);

    impl Change for Set {
        type Kind = ();
        fn kind(&self) {}
    }

    /// Replays onto a log so ordering is observable.
    #[derive(Default)]
    struct Log {
        applied: Vec<(u64, Direction, i32)>,
        dead: HashSet<DocumentId>,
        fail_at: Option<u64>,
    }

    impl ReplayTarget<Set> for Log {
        fn is_live(&self, document: DocumentId) -> bool {
            !self.dead.contains(&document)
        }

        fn apply(&mut self, record: &ChangeRecord<Set>, direction: Direction) -> Result<(), UndoError> {
            if self.fail_at == Some(record.sequence()) {
                return Err(UndoError::Apply {
                    document: record.document(),
                    sequence: record.sequence(),
                    source: crate::ApplyError::rejected("boom"),
                });
            }
            self.applied
                .push((record.sequence(), direction, *record.change().0.get(direction)));
            Ok(())
        }
    }

    fn rec(seq: u64, old: i32, new: i32) -> ChangeRecord<Set> {
        let mut r = ChangeRecord::new(DocumentId(1), Set(Delta::new(old, new)));
        r.set_sequence(seq);
        r
    }

    fn committed(records: Vec<ChangeRecord<Set>>) -> CompoundEdit<Set> {
        let mut edit = CompoundEdit::new();
        for r in records {
            edit.add_record(r).unwrap();
        }
        edit.complete("Set", "");
        edit
    }

    #[test]
    fn add_after_complete_is_rejected() {
        let mut edit = committed(vec![rec(1, 0, 1)]);
        assert_eq!(edit.add_record(rec(2, 1, 2)), Err(UndoError::EditComplete));
        assert_eq!(edit.len(), 1);
    }

    #[test]
    fn undo_replays_in_reverse_order_with_old_values() {
        let edit = committed(vec![rec(1, 0, 1), rec(2, 1, 2), rec(3, 2, 3)]);
        let mut log = Log::default();
        edit.undo(&mut log).unwrap();
        assert_eq!(
            log.applied,
            vec![
                (3, Direction::Undo, 2),
                (2, Direction::Undo, 1),
                (1, Direction::Undo, 0)
            ]
        );
    }

    #[test]
    fn redo_replays_in_forward_order_with_new_values() {
        let edit = committed(vec![rec(1, 0, 1), rec(2, 1, 2)]);
        let mut log = Log::default();
        edit.redo(&mut log).unwrap();
        assert_eq!(
            log.applied,
            vec![(1, Direction::Redo, 1), (2, Direction::Redo, 2)]
        );
    }

    #[test]
    fn replay_stops_at_first_failure() {
        let edit = committed(vec![rec(1, 0, 1), rec(2, 1, 2), rec(3, 2, 3)]);
        let mut log = Log {
            fail_at: Some(2),
            ..Log::default()
        };
        let err = edit.undo(&mut log).unwrap_err();
        assert!(matches!(err, UndoError::Apply { sequence: 2, .. }));
        assert_eq!(log.applied, vec![(3, Direction::Undo, 2)]);
    }

    #[test]
    fn can_undo_requires_complete_and_live_documents() {
        let mut open = CompoundEdit::new();
        open.add_record(rec(1, 0, 1)).unwrap();
        let log = Log::default();
        assert!(!open.can_undo(&log));

        let edit = committed(vec![rec(1, 0, 1)]);
        assert!(edit.can_undo(&log));
        assert!(edit.can_redo(&log));

        let mut dead = Log::default();
        dead.dead.insert(DocumentId(1));
        assert!(!edit.can_undo(&dead));
    }

    #[test]
    fn presentation_name_falls_back_to_name() {
        let edit = committed(vec![rec(1, 0, 1)]);
        assert_eq!(edit.name(), "Set");
        assert_eq!(edit.presentation_name(), "Set");

        let mut named = CompoundEdit::new();
        named.add_record(rec(1, 0, 1)).unwrap();
        named.complete("Resize", "Resize Shape");
        assert_eq!(named.presentation_name(), "Resize Shape");
    }

    #[test]
    fn find_paired_before_takes_most_recent_match() {
        let mut edit = CompoundEdit::new();
        let mut first = rec(1, 0, 0).with_subject(EntityId(5)).before();
        first.set_sequence(1);
        let mut second = rec(2, 0, 0).with_subject(EntityId(5)).before();
        second.set_sequence(2);
        edit.add_record(first).unwrap();
        edit.add_record(second).unwrap();
        edit.add_record(rec(3, 0, 1).with_subject(EntityId(6)).before())
            .unwrap();

        let after = rec(0, 0, 1).with_subject(EntityId(5));
        let found = edit.find_paired_before(&after).unwrap();
        assert_eq!(found.sequence(), 2);

        let unmatched = rec(0, 0, 1).with_subject(EntityId(7));
        assert!(edit.find_paired_before(&unmatched).is_none());
    }

    #[test]
    fn documents_are_distinct_in_first_touch_order() {
        let mut edit = CompoundEdit::new();
        edit.add_record(ChangeRecord::new(DocumentId(2), Set(Delta::default())))
            .unwrap();
        edit.add_record(ChangeRecord::new(DocumentId(1), Set(Delta::default())))
            .unwrap();
        edit.add_record(ChangeRecord::new(DocumentId(2), Set(Delta::default())))
            .unwrap();
        assert_eq!(edit.documents(), vec![DocumentId(2), DocumentId(1)]);
    }

    #[test]
    fn accessors_do_not_need_a_change_type() {
        let mut edit: CompoundEdit<&str> = CompoundEdit::default();
        edit.complete("Plain", "");
        assert!(edit.is_complete());
        assert!(edit.is_empty());
        assert_eq!(edit.len(), 0);
        assert_eq!(edit.presentation_name(), "Plain");
        assert!(format!("{edit:?}").contains("Plain"));
    }

    #[test]
    fn clear_releases_records() {
        let mut edit = committed(vec![rec(1, 0, 1), rec(2, 1, 2)]);
        edit.clear();
        assert!(edit.is_empty());
    }
}
