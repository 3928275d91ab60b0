#![forbid(unsafe_code)]

//! Transaction controller: nesting, ingestion, commit and abort.
//!
//! The controller owns the [`History`], the single open [`CompoundEdit`] and
//! the [`Mode`] the engine is in. It knows nothing about documents beyond the
//! [`HistorySource`] handed to it with each record; broadcasting lifecycle
//! events to documents is the job of [`UndoManager`](crate::UndoManager),
//! which reads the outcome of each transition from the return values here.
//!
//! # State machine
//!
//! ```text
//!            start                start
//!   Idle ──────────► InTx(1) ──────────► InTx(n+1)
//!    ▲ ▲               │  ▲                 │
//!    │ │  end(commit/  │  └─────── end ─────┘
//!    │ └── abort) ─────┘
//!    │
//!    ├── undo ──► Undoing ── done ──► Idle
//!    └── redo ──► Redoing ── done ──► Idle
//! ```
//!
//! Starting a transaction while undoing or redoing is refused, and undo or
//! redo is refused while a transaction is open.

use std::fmt;
use std::rc::Rc;

use crate::compound::{CompoundEdit, ReplayTarget};
use crate::config::UndoConfig;
use crate::history::{History, PushOutcome};
use crate::record::{Change, ChangeRecord, Direction};
use crate::sink::{ChangeSink, HistorySource};

/// What the engine is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No transaction open, no replay running.
    #[default]
    Idle,
    /// Inside a transaction bracket; the depth is always at least 1.
    InTransaction(usize),
    /// Replaying an edit backwards.
    Undoing,
    /// Replaying an edit forwards.
    Redoing,
}

impl Mode {
    /// Transaction nesting depth; 0 outside any bracket.
    #[must_use]
    pub const fn level(self) -> usize {
        match self {
            Self::InTransaction(depth) => depth,
            _ => 0,
        }
    }

    /// True while an undo or redo is running.
    #[must_use]
    pub const fn is_replaying(self) -> bool {
        matches!(self, Self::Undoing | Self::Redoing)
    }
}

/// Result of closing one transaction level.
#[derive(Debug)]
pub enum EndOutcome<C> {
    /// No transaction was open.
    Unbalanced,
    /// An inner level closed; nothing else happened.
    Nested { level: usize },
    /// The outermost level closed and an edit entered history.
    Committed {
        edit: Rc<CompoundEdit<C>>,
        push: PushOutcome,
    },
    /// The outermost level closed without touching history.
    Aborted,
}

impl<C> EndOutcome<C> {
    /// True only for [`EndOutcome::Committed`].
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Tracks nesting, routes records into the open edit, commits into history.
pub struct TransactionController<C> {
    mode: Mode,
    history: History<C>,
    open: Option<CompoundEdit<C>>,
    checks_transaction_level: bool,
    next_sequence: u64,
}

impl<C> fmt::Debug for TransactionController<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionController")
            .field("mode", &self.mode)
            .field("history", &self.history)
            .field("open_records", &self.open.as_ref().map(|e| e.len()))
            .field("checks_transaction_level", &self.checks_transaction_level)
            .finish()
    }
}

impl<C> TransactionController<C> {
    // ========================================================================
    // State
    // ========================================================================

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Transaction nesting depth; 0 when idle.
    #[must_use]
    pub fn level(&self) -> usize {
        self.mode.level()
    }

    #[must_use]
    pub fn is_in_transaction(&self) -> bool {
        self.level() > 0
    }

    #[must_use]
    pub fn is_undoing(&self) -> bool {
        self.mode == Mode::Undoing
    }

    #[must_use]
    pub fn is_redoing(&self) -> bool {
        self.mode == Mode::Redoing
    }

    #[must_use]
    pub fn history(&self) -> &History<C> {
        &self.history
    }

    /// The open, not yet committed edit.
    #[must_use]
    pub fn current_edit(&self) -> Option<&CompoundEdit<C>> {
        self.open.as_ref()
    }

    #[must_use]
    pub fn checks_transaction_level(&self) -> bool {
        self.checks_transaction_level
    }

    pub fn set_checks_transaction_level(&mut self, enabled: bool) {
        self.checks_transaction_level = enabled;
    }
}

impl<C: Change> Default for TransactionController<C> {
    fn default() -> Self {
        Self::new(&UndoConfig::default())
    }
}

impl<C: Change> TransactionController<C> {
    /// Create a controller from `config`.
    #[must_use]
    pub fn new(config: &UndoConfig) -> Self {
        Self {
            mode: Mode::Idle,
            history: History::new(config.max_edit_count),
            open: None,
            checks_transaction_level: config.checks_transaction_level,
            next_sequence: 1,
        }
    }

    /// Change the history bound; returns the number of evicted edits.
    pub fn set_max_edit_count(&mut self, max_edit_count: i64) -> usize {
        let evicted = self.history.set_max_edit_count(max_edit_count);
        if evicted > 0 {
            tracing::debug!(
                target: "tracery.history",
                evicted,
                max_edit_count,
                "history bound lowered"
            );
        }
        evicted
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Open one transaction level.
    ///
    /// Returns true only on the outermost start (`0 → 1`). Refused while
    /// undoing or redoing.
    pub fn start_transaction(&mut self) -> bool {
        match self.mode {
            Mode::Idle => {
                self.mode = Mode::InTransaction(1);
                tracing::debug!(target: "tracery.history", level = 1usize, "transaction started");
                true
            }
            Mode::InTransaction(depth) => {
                self.mode = Mode::InTransaction(depth + 1);
                false
            }
            Mode::Undoing | Mode::Redoing => {
                tracing::debug!(
                    target: "tracery.history",
                    mode = ?self.mode,
                    "start_transaction ignored during replay"
                );
                false
            }
        }
    }

    /// Close one transaction level.
    ///
    /// Only the outermost close acts. With `commit` and a non-empty open
    /// edit, the edit is named, frozen and pushed into history; otherwise the
    /// open edit is discarded. An empty `presentation_name` falls back to
    /// `name`.
    pub fn end_transaction(
        &mut self,
        commit: bool,
        name: &str,
        presentation_name: &str,
    ) -> EndOutcome<C> {
        match self.mode {
            Mode::InTransaction(1) => {
                self.mode = Mode::Idle;
                self.close_outermost(commit, name, presentation_name)
            }
            Mode::InTransaction(depth) => {
                self.mode = Mode::InTransaction(depth - 1);
                EndOutcome::Nested { level: depth - 1 }
            }
            Mode::Idle | Mode::Undoing | Mode::Redoing => {
                tracing::warn!(
                    target: "tracery.history",
                    mode = ?self.mode,
                    name,
                    "end_transaction without a matching start"
                );
                EndOutcome::Unbalanced
            }
        }
    }

    fn close_outermost(&mut self, commit: bool, name: &str, presentation_name: &str) -> EndOutcome<C> {
        let open = self.open.take();
        match open {
            Some(mut edit) if commit && !edit.is_empty() => {
                edit.complete(name, presentation_name);
                let edit = Rc::new(edit);
                let push = self.history.push(Rc::clone(&edit));
                tracing::debug!(
                    target: "tracery.history",
                    name,
                    records = edit.len(),
                    truncated = push.truncated,
                    evicted = push.evicted,
                    edits = self.history.len(),
                    "transaction committed"
                );
                EndOutcome::Committed { edit, push }
            }
            mut open => {
                let dropped = open.as_ref().map_or(0, CompoundEdit::len);
                if let Some(edit) = open.as_mut() {
                    edit.clear();
                }
                tracing::debug!(
                    target: "tracery.history",
                    name,
                    commit,
                    dropped,
                    "transaction aborted"
                );
                EndOutcome::Aborted
            }
        }
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// The noise filter: true when `record` must not enter history.
    #[must_use]
    pub fn should_skip(&self, sender: &dyn HistorySource, record: &ChangeRecord<C>) -> bool {
        if sender.skips_history() {
            return true;
        }
        if record.change().significance().is_noise() {
            return true;
        }
        record
            .subject()
            .is_some_and(|subject| sender.skips_subject(subject))
    }

    fn ingest(&mut self, sender: &dyn HistorySource, mut record: ChangeRecord<C>) {
        if self.mode.is_replaying() {
            tracing::trace!(
                target: "tracery.history",
                mode = ?self.mode,
                "change during replay ignored"
            );
            return;
        }
        if self.should_skip(sender, &record) {
            tracing::trace!(
                target: "tracery.history",
                document = %record.document(),
                kind = ?record.kind(),
                "change filtered"
            );
            return;
        }
        if self.checks_transaction_level && self.level() == 0 {
            tracing::warn!(
                target: "tracery.history",
                document = %record.document(),
                kind = ?record.kind(),
                "change recorded outside of a transaction"
            );
        }

        record.set_sequence(self.next_sequence);
        self.next_sequence += 1;
        let open = self.open.get_or_insert_with(CompoundEdit::new);
        if open.add_record(record).is_err() {
            // The open slot only ever holds incomplete edits.
            tracing::error!(target: "tracery.history", "open edit was already complete");
        }
    }

    // ========================================================================
    // Replay gating
    // ========================================================================

    /// True when `undo` would do something against `target`.
    #[must_use]
    pub fn can_undo(&self, target: &impl ReplayTarget<C>) -> bool {
        self.mode == Mode::Idle
            && self
                .history
                .edit_to_undo()
                .is_some_and(|edit| edit.can_undo(target))
    }

    /// True when `redo` would do something against `target`.
    #[must_use]
    pub fn can_redo(&self, target: &impl ReplayTarget<C>) -> bool {
        self.mode == Mode::Idle
            && self
                .history
                .edit_to_redo()
                .is_some_and(|edit| edit.can_redo(target))
    }

    /// Enter the replay mode for `direction` and move the cursor.
    ///
    /// The returned guard puts the controller back to idle when dropped,
    /// whether the replay succeeded, failed or panicked. `None` when there is
    /// nothing to replay or the controller is not idle.
    pub(crate) fn begin_replay(
        &mut self,
        direction: Direction,
    ) -> Option<(ReplayGuard<'_, C>, Rc<CompoundEdit<C>>)> {
        if self.mode != Mode::Idle {
            return None;
        }
        let edit = match direction {
            Direction::Undo => self.history.step_back()?,
            Direction::Redo => self.history.step_forward()?,
        };
        self.mode = match direction {
            Direction::Undo => Mode::Undoing,
            Direction::Redo => Mode::Redoing,
        };
        Some((ReplayGuard { controller: self }, edit))
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Drop all history and any open edit. Refused while replaying.
    pub fn clear(&mut self) -> bool {
        if self.mode.is_replaying() {
            return false;
        }
        if let Some(mut open) = self.open.take() {
            open.clear();
        }
        self.history.clear();
        tracing::debug!(target: "tracery.history", "history cleared");
        true
    }
}

impl<C: Change> ChangeSink<C> for TransactionController<C> {
    fn document_changed(&mut self, sender: &dyn HistorySource, record: ChangeRecord<C>) {
        self.ingest(sender, record);
    }

    fn find_paired_before(&self, after: &ChangeRecord<C>) -> Option<&ChangeRecord<C>> {
        self.open.as_ref()?.find_paired_before(after)
    }
}

/// Resets the controller to [`Mode::Idle`] on drop.
pub(crate) struct ReplayGuard<'a, C> {
    controller: &'a mut TransactionController<C>,
}

impl<C> Drop for ReplayGuard<'_, C> {
    fn drop(&mut self) {
        self.controller.mode = Mode::Idle;
    }
}

// ============================================================================
// Tests
// ============================================================================
