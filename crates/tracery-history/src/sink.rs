#![forbid(unsafe_code)]

//! The ingestion seam between documents and the transaction controller.
//!
//! A document mutates itself, builds a [`ChangeRecord`] describing the old and
//! new value, and hands it to a [`ChangeSink`] together with a reference to
//! itself as the [`HistorySource`]. The sink decides whether the record is
//! noise and, if not, appends it to the open compound edit.

use crate::record::{Change, ChangeRecord, DocumentId, EntityId};

/// The sender side of a change notification.
///
/// Lets the controller ask the document about opt-outs without holding on
/// to it.
pub trait HistorySource {
    /// The document's identity; records it emits carry the same ID.
    fn document_id(&self) -> DocumentId;

    /// True when the whole document opts out of history.
    fn skips_history(&self) -> bool {
        false
    }

    /// True when changes to `subject` should never be recorded.
    fn skips_subject(&self, _subject: EntityId) -> bool {
        false
    }
}

/// Where documents report their mutations.
pub trait ChangeSink<C: Change> {
    /// Report one mutation. Must be called once per observable state change,
    /// or twice (before/after) for two-phase changes.
    fn document_changed(&mut self, sender: &dyn HistorySource, record: ChangeRecord<C>);

    /// Most recent before-phase record in the open edit that pairs with
    /// `after`, if any. `None` is a normal outcome.
    fn find_paired_before(&self, after: &ChangeRecord<C>) -> Option<&ChangeRecord<C>>;
}

/// A sink that drops everything. Useful for mutating a document while it is
/// being built, before any history exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl<C: Change> ChangeSink<C> for NullSink {
    fn document_changed(&mut self, _sender: &dyn HistorySource, _record: ChangeRecord<C>) {}

    fn find_paired_before(&self, _after: &ChangeRecord<C>) -> Option<&ChangeRecord<C>> {
        None
    }
}
