#![forbid(unsafe_code)]

//! Error types for history capture and replay.

use thiserror::Error;

use crate::record::{DocumentId, EntityId};

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, UndoError>;

/// Failure reported by a document while applying one record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// The record names an entity the document no longer has.
    #[error("subject {0:?} not found")]
    UnknownSubject(EntityId),

    /// The document refused the change.
    #[error("change rejected: {reason}")]
    Rejected { reason: String },
}

impl ApplyError {
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the transaction controller and replay engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    /// A document failed to apply a record during undo or redo.
    #[error("replay failed on {document} at record {sequence}: {source}")]
    Apply {
        document: DocumentId,
        sequence: u64,
        #[source]
        source: ApplyError,
    },

    /// A record names a document that is not registered.
    #[error("document {0} is not registered")]
    DocumentNotFound(DocumentId),

    /// Attempted to append to an edit that was already committed.
    #[error("compound edit is already complete")]
    EditComplete,
}
