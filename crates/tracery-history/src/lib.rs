#![forbid(unsafe_code)]

//! Tracery History
//!
//! Change capture and transactional undo/redo for graphical documents.
//!
//! Every mutation of a document is captured generically as a before/after
//! value pair tagged with a change kind. Undo and redo replay those pairs;
//! no mutation type needs its own inverse operation.
//!
//! # Key Components
//!
//! - [`ChangeRecord`] - one captured state transition
//! - [`CompoundEdit`] - the records of one committed transaction
//! - [`History`] - bounded list of edits with an undo/redo cursor
//! - [`TransactionController`] - nesting, noise filtering, commit and abort
//! - [`UndoManager`] - documents, lifecycle broadcast and replay
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐ document_changed ┌───────────────────────┐
//! │ Document │ ───────────────► │ TransactionController │
//! │          │                  │  open CompoundEdit    │
//! │          │                  │         │ commit      │
//! │          │                  │         ▼             │
//! │          │ apply_change     │  History [e0 .. eN]   │
//! │          │ ◄─────────────── │         ^ cursor      │
//! └──────────┘   (undo / redo)  └───────────────────────┘
//! ```
//!
//! # Threading
//!
//! The engine is single-threaded and synchronous. Transaction nesting is a
//! counter on one thread, not a lock. Committed edits are shared through
//! `Rc`, so an [`UndoManager`] is neither `Send` nor `Sync`.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tracery_history::{UndoManager, names};
//!
//! let mut manager = UndoManager::new();
//! manager.add_document(diagram);
//!
//! manager.start_transaction();
//! manager.edit_document(doc_id, |d, sink| d.set_bounds(shape, bounds, sink));
//! manager.finish_transaction(names::RESIZE);
//!
//! assert_eq!(manager.undo_presentation_name(), Some("Resize"));
//! manager.undo()?;
//! ```

pub mod compound;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod history;
pub mod manager;
pub mod names;
pub mod record;
pub mod sink;

pub use compound::{CompoundEdit, ReplayTarget};
pub use config::{ConfigError, UndoConfig};
pub use controller::{EndOutcome, Mode, TransactionController};
pub use document::{Document, DocumentSet, UndoEvent};
pub use error::{ApplyError, UndoError};
pub use history::{History, PushOutcome, normalize_max_edit_count};
pub use manager::{Recorder, UndoManager};
pub use names::PresentationNames;
pub use record::{
    Change, ChangeRecord, Delta, Direction, DocumentId, EntityId, Phase, Quad, Significance,
};
pub use sink::{ChangeSink, HistorySource, NullSink};
