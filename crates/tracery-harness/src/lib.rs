#![forbid(unsafe_code)]

//! Test harness and reference fixtures for Tracery history.
//!
//! - [`diagram`] - an in-memory shape diagram implementing the full document
//!   contract
//! - [`script`] - deterministic edit scripts driven through an
//!   [`UndoManager`](tracery_history::UndoManager)

pub mod diagram;
pub mod script;

pub use diagram::{Diagram, DiagramChange, DiagramKind, DiagramState, Shape};
pub use script::{Op, Session};
