#![forbid(unsafe_code)]

//! The undo manager: documents, transaction controller and replay engine.
//!
//! [`UndoManager`] is the object a hosting editor constructs once per undo
//! scope and passes explicitly to its tools. It owns the registered
//! documents and the [`TransactionController`], broadcasts every lifecycle
//! notification to all documents, and replays committed edits.
//!
//! # Mutating a document
//!
//! ```rust,ignore
//! manager.start_transaction();
//! manager.edit_document(doc_id, |diagram, sink| {
//!     diagram.move_shape(shape, 10.0, 0.0, sink);
//! });
//! manager.finish_transaction(names::MOVE_SELECTION);
//!
//! manager.undo()?;
//! ```
//!
//! # Failure Modes
//!
//! - **Replay failure**: a document rejects a record mid-edit. The error is
//!   logged and returned; the cursor has already moved and the documents may
//!   be partially replayed. The manager itself returns to idle and stays
//!   usable.
//! - **Closed document**: an edit touching a document that is no longer
//!   registered or live reports `can_undo() == false`; undo is a no-op.

use std::fmt;
use std::rc::Rc;

use crate::compound::CompoundEdit;
use crate::config::UndoConfig;
use crate::controller::{EndOutcome, Mode, TransactionController};
use crate::document::{Document, DocumentSet, UndoEvent};
use crate::error::UndoError;
use crate::names::PresentationNames;
use crate::record::{ChangeRecord, Direction, DocumentId};
use crate::sink::{ChangeSink, HistorySource};

/// A [`ChangeSink`] into the manager's controller, handed out next to a
/// mutable document borrow.
pub struct Recorder<'a, C> {
    controller: &'a mut TransactionController<C>,
}

impl<C> fmt::Debug for Recorder<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("mode", &self.controller.mode())
            .finish()
    }
}

impl<C: crate::Change> ChangeSink<C> for Recorder<'_, C> {
    fn document_changed(&mut self, sender: &dyn HistorySource, record: ChangeRecord<C>) {
        self.controller.document_changed(sender, record);
    }

    fn find_paired_before(&self, after: &ChangeRecord<C>) -> Option<&ChangeRecord<C>> {
        self.controller.find_paired_before(after)
    }
}

/// Session-level undo scope over one or more documents.
pub struct UndoManager<D: Document> {
    documents: DocumentSet<D>,
    controller: TransactionController<D::Change>,
    names: PresentationNames,
}

impl<D: Document> fmt::Debug for UndoManager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoManager")
            .field("documents", &self.documents)
            .field("controller", &self.controller)
            .field("locale", &self.names.locale())
            .finish()
    }
}

impl<D: Document> Default for UndoManager<D> {
    fn default() -> Self {
        Self::with_config(UndoConfig::default())
    }
}

impl<D: Document> UndoManager<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `config`, resolving presentation names in `config.locale`.
    #[must_use]
    pub fn with_config(config: UndoConfig) -> Self {
        let mut names = PresentationNames::english();
        names.set_locale(config.locale.clone());
        Self {
            documents: DocumentSet::new(),
            controller: TransactionController::new(&config),
            names,
        }
    }

    /// Replace the presentation-name resolver.
    #[must_use]
    pub fn with_names(mut self, names: PresentationNames) -> Self {
        self.names = names;
        self
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Register a document; returns any document it replaced.
    pub fn add_document(&mut self, document: D) -> Option<D> {
        self.documents.insert(document)
    }

    /// Unregister a document. Edits touching it can no longer replay.
    pub fn remove_document(&mut self, id: DocumentId) -> Option<D> {
        self.documents.remove(id)
    }

    #[must_use]
    pub fn document(&self, id: DocumentId) -> Option<&D> {
        self.documents.get(id)
    }

    /// Mutable access without a sink; changes made this way are not recorded.
    pub fn document_mut(&mut self, id: DocumentId) -> Option<&mut D> {
        self.documents.get_mut(id)
    }

    #[must_use]
    pub fn documents(&self) -> &DocumentSet<D> {
        &self.documents
    }

    /// A document together with a sink into this manager's history.
    pub fn recorder(&mut self, id: DocumentId) -> Option<(&mut D, Recorder<'_, D::Change>)> {
        let document = self.documents.get_mut(id)?;
        let recorder = Recorder {
            controller: &mut self.controller,
        };
        Some((document, recorder))
    }

    /// Run `f` with a document and a sink into this manager's history.
    ///
    /// `None` when `id` is not registered.
    pub fn edit_document<R>(
        &mut self,
        id: DocumentId,
        f: impl FnOnce(&mut D, &mut Recorder<'_, D::Change>) -> R,
    ) -> Option<R> {
        let (document, mut recorder) = self.recorder(id)?;
        Some(f(document, &mut recorder))
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Open one transaction level; true only on the outermost start.
    pub fn start_transaction(&mut self) -> bool {
        let started = self.controller.start_transaction();
        if started {
            self.documents.broadcast(&UndoEvent::TransactionStarted);
        }
        started
    }

    /// Close one transaction level; true when an edit was committed.
    pub fn end_transaction(&mut self, commit: bool, name: &str, presentation_name: &str) -> bool {
        match self.controller.end_transaction(commit, name, presentation_name) {
            EndOutcome::Committed { edit, .. } => {
                self.documents
                    .broadcast(&UndoEvent::TransactionFinished { edit: &edit });
                true
            }
            EndOutcome::Aborted => {
                self.documents.broadcast(&UndoEvent::TransactionAborted);
                false
            }
            EndOutcome::Nested { .. } | EndOutcome::Unbalanced => false,
        }
    }

    /// Commit the current level under `name`.
    pub fn finish_transaction(&mut self, name: &str) -> bool {
        self.end_transaction(true, name, "")
    }

    /// Abandon the current level.
    pub fn abort_transaction(&mut self) {
        self.end_transaction(false, "", "");
    }

    #[must_use]
    pub fn transaction_level(&self) -> usize {
        self.controller.level()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    #[must_use]
    pub fn controller(&self) -> &TransactionController<D::Change> {
        &self.controller
    }

    // ========================================================================
    // Replay
    // ========================================================================

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.controller.can_undo(&self.documents)
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.controller.can_redo(&self.documents)
    }

    /// Undo the last committed edit.
    ///
    /// `Ok(false)` when [`can_undo`](Self::can_undo) is false.
    ///
    /// # Errors
    ///
    /// The first record a document failed to apply.
    pub fn undo(&mut self) -> Result<bool, UndoError> {
        self.replay(Direction::Undo)
    }

    /// Redo the next undone edit.
    ///
    /// `Ok(false)` when [`can_redo`](Self::can_redo) is false.
    ///
    /// # Errors
    ///
    /// The first record a document failed to apply.
    pub fn redo(&mut self) -> Result<bool, UndoError> {
        self.replay(Direction::Redo)
    }

    fn replay(&mut self, direction: Direction) -> Result<bool, UndoError> {
        let allowed = match direction {
            Direction::Undo => self.can_undo(),
            Direction::Redo => self.can_redo(),
        };
        if !allowed {
            return Ok(false);
        }
        let Some(edit) = self.target(direction).cloned() else {
            return Ok(false);
        };

        self.documents.broadcast(&match direction {
            Direction::Undo => UndoEvent::UndoStarting { edit: &edit },
            Direction::Redo => UndoEvent::RedoStarting { edit: &edit },
        });

        let result = {
            let span = match direction {
                Direction::Undo => {
                    tracing::debug_span!(
                        target: "tracery.history",
                        "history.undo",
                        edit = edit.name(),
                        records = edit.len()
                    )
                }
                Direction::Redo => {
                    tracing::debug_span!(
                        target: "tracery.history",
                        "history.redo",
                        edit = edit.name(),
                        records = edit.len()
                    )
                }
            };
            let _enter = span.enter();
            match self.controller.begin_replay(direction) {
                Some((_guard, _)) => match direction {
                    Direction::Undo => edit.undo(&mut self.documents),
                    Direction::Redo => edit.redo(&mut self.documents),
                },
                None => Ok(()),
            }
        };

        if let Err(err) = &result {
            tracing::error!(
                target: "tracery.history",
                direction = ?direction,
                edit = edit.name(),
                error = %err,
                "replay failed"
            );
        } else {
            tracing::debug!(
                target: "tracery.history",
                direction = ?direction,
                edit = edit.name(),
                records = edit.len(),
                "replay finished"
            );
        }

        self.documents.broadcast(&match direction {
            Direction::Undo => UndoEvent::UndoFinished { edit: &edit },
            Direction::Redo => UndoEvent::RedoFinished { edit: &edit },
        });

        result.map(|()| true)
    }

    fn target(&self, direction: Direction) -> Option<&Rc<CompoundEdit<D::Change>>> {
        match direction {
            Direction::Undo => self.controller.history().edit_to_undo(),
            Direction::Redo => self.controller.history().edit_to_redo(),
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Label of the edit `direction` would replay.
    ///
    /// Localized through the catalog by the edit's name; falls back to the
    /// presentation name given at commit.
    #[must_use]
    pub fn presentation_name(&self, direction: Direction) -> Option<&str> {
        let edit = self.target(direction)?;
        Some(
            self.names
                .lookup(edit.name())
                .unwrap_or_else(|| edit.presentation_name()),
        )
    }

    #[must_use]
    pub fn undo_presentation_name(&self) -> Option<&str> {
        self.presentation_name(Direction::Undo)
    }

    #[must_use]
    pub fn redo_presentation_name(&self) -> Option<&str> {
        self.presentation_name(Direction::Redo)
    }

    /// Committed edits, oldest first.
    pub fn all_edits(&self) -> impl ExactSizeIterator<Item = &Rc<CompoundEdit<D::Change>>> + '_ {
        self.controller.history().edits()
    }

    /// The edit `undo` would replay.
    #[must_use]
    pub fn edit_to_undo(&self) -> Option<&Rc<CompoundEdit<D::Change>>> {
        self.target(Direction::Undo)
    }

    /// The edit `redo` would replay.
    #[must_use]
    pub fn edit_to_redo(&self) -> Option<&Rc<CompoundEdit<D::Change>>> {
        self.target(Direction::Redo)
    }

    /// The open, not yet committed edit.
    #[must_use]
    pub fn current_edit(&self) -> Option<&CompoundEdit<D::Change>> {
        self.controller.current_edit()
    }

    #[must_use]
    pub fn names(&self) -> &PresentationNames {
        &self.names
    }

    pub fn names_mut(&mut self) -> &mut PresentationNames {
        &mut self.names
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Drop all history. Refused while replaying.
    pub fn clear(&mut self) -> bool {
        self.controller.clear()
    }

    /// Change the history bound; returns the number of evicted edits.
    pub fn set_max_edit_count(&mut self, max_edit_count: i64) -> usize {
        self.controller.set_max_edit_count(max_edit_count)
    }

    pub fn set_checks_transaction_level(&mut self, enabled: bool) {
        self.controller.set_checks_transaction_level(enabled);
    }
}

// ============================================================================
// Tests
// ============================================================================
