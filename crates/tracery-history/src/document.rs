#![forbid(unsafe_code)]

//! Document collaborators and the set the replay engine applies to.

use std::fmt;

use crate::compound::{CompoundEdit, ReplayTarget};
use crate::error::{ApplyError, UndoError};
use crate::record::{Change, ChangeRecord, Direction, DocumentId};
use crate::sink::HistorySource;

/// Lifecycle notification broadcast to every registered document.
#[derive(Debug)]
pub enum UndoEvent<'a, C> {
    /// The outermost transaction opened.
    TransactionStarted,
    /// The outermost transaction committed `edit`.
    TransactionFinished { edit: &'a CompoundEdit<C> },
    /// The outermost transaction closed without a new edit.
    TransactionAborted,
    /// `edit` is about to be undone.
    UndoStarting { edit: &'a CompoundEdit<C> },
    /// `edit` was undone, or the attempt failed.
    UndoFinished { edit: &'a CompoundEdit<C> },
    /// `edit` is about to be redone.
    RedoStarting { edit: &'a CompoundEdit<C> },
    /// `edit` was redone, or the attempt failed.
    RedoFinished { edit: &'a CompoundEdit<C> },
}

impl<C> UndoEvent<'_, C> {
    /// Short stable label, for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::TransactionStarted => "transaction_started",
            Self::TransactionFinished { .. } => "transaction_finished",
            Self::TransactionAborted => "transaction_aborted",
            Self::UndoStarting { .. } => "undo_starting",
            Self::UndoFinished { .. } => "undo_finished",
            Self::RedoStarting { .. } => "redo_starting",
            Self::RedoFinished { .. } => "redo_finished",
        }
    }
}

/// A document whose state history can replay.
///
/// `apply_change` gets no [`ChangeSink`](crate::ChangeSink): the mutation it
/// performs cannot be reported back into history.
pub trait Document: HistorySource {
    /// The document's change enum.
    type Change: Change;

    /// False once the document is closed or disposed; edits touching it can
    /// no longer be undone or redone.
    fn is_live(&self) -> bool {
        true
    }

    /// Apply the side of `record` selected by `direction` to this document.
    fn apply_change(
        &mut self,
        record: &ChangeRecord<Self::Change>,
        direction: Direction,
    ) -> Result<(), ApplyError>;

    /// Observe a lifecycle notification.
    fn on_undo_event(&mut self, _event: &UndoEvent<'_, Self::Change>) {}
}

/// Registered documents, in registration order.
pub struct DocumentSet<D> {
    documents: Vec<D>,
}

impl<D: Document> fmt::Debug for DocumentSet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.documents.iter().map(HistorySource::document_id))
            .finish()
    }
}

impl<D> Default for DocumentSet<D> {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
        }
    }
}

impl<D: Document> DocumentSet<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document, replacing any with the same ID.
    ///
    /// Returns the replaced document.
    pub fn insert(&mut self, document: D) -> Option<D> {
        let id = document.document_id();
        match self.position(id) {
            Some(i) => Some(std::mem::replace(&mut self.documents[i], document)),
            None => {
                self.documents.push(document);
                None
            }
        }
    }

    /// Unregister and return a document.
    pub fn remove(&mut self, id: DocumentId) -> Option<D> {
        let i = self.position(id)?;
        Some(self.documents.remove(i))
    }

    #[must_use]
    pub fn get(&self, id: DocumentId) -> Option<&D> {
        self.documents.iter().find(|d| d.document_id() == id)
    }

    pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut D> {
        self.documents.iter_mut().find(|d| d.document_id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &D> + '_ {
        self.documents.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Deliver `event` to every document.
    pub fn broadcast(&mut self, event: &UndoEvent<'_, D::Change>) {
        tracing::trace!(
            target: "tracery.history",
            event = event.label(),
            documents = self.documents.len(),
            "broadcast"
        );
        for document in &mut self.documents {
            document.on_undo_event(event);
        }
    }

    fn position(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| d.document_id() == id)
    }
}

impl<D: Document> ReplayTarget<D::Change> for DocumentSet<D> {
    fn is_live(&self, document: DocumentId) -> bool {
        self.get(document).is_some_and(Document::is_live)
    }

    fn apply(&mut self, record: &ChangeRecord<D::Change>, direction: Direction) -> Result<(), UndoError> {
        let document = record.document();
        let target = self
            .get_mut(document)
            .ok_or(UndoError::DocumentNotFound(document))?;
        target
            .apply_change(record, direction)
            .map_err(|source| UndoError::Apply {
                document,
                sequence: record.sequence(),
                source,
            })
    }
}
