#![forbid(unsafe_code)]

//! Deterministic edit scripts.
//!
//! A [`Session`] owns an [`UndoManager`] over one or more [`Diagram`]s and
//! runs [`Op`]s against them inside transactions, so tests can describe a
//! sequence of user gestures as data.

use tracery_history::{DocumentId, EntityId, Quad, UndoConfig, UndoManager};
use tracing::debug_span;

use crate::diagram::{Diagram, DiagramState};

/// One user gesture against a diagram.
///
/// `slot` picks an existing shape by position in ID order, wrapping around;
/// ops that need a shape do nothing on an empty diagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Add { x: f32, y: f32 },
    Move { slot: usize, dx: f32, dy: f32 },
    Retext { slot: usize, text: String },
    Hide { slot: usize },
    Remove { slot: usize },
    Title(String),
    /// Cosmetic; never reaches history.
    Highlight { slot: usize },
}

/// An undo manager over numbered diagrams.
#[derive(Debug)]
pub struct Session {
    manager: UndoManager<Diagram>,
    ids: Vec<DocumentId>,
}

impl Session {
    /// `documents` empty diagrams with IDs `1..=documents`.
    #[must_use]
    pub fn new(documents: u64) -> Self {
        Self::with_config(UndoConfig::default(), documents)
    }

    #[must_use]
    pub fn with_config(config: UndoConfig, documents: u64) -> Self {
        let mut manager = UndoManager::with_config(config);
        let ids = (1..=documents)
            .map(|n| {
                let diagram = Diagram::new(n);
                let id = diagram.id();
                manager.add_document(diagram);
                id
            })
            .collect();
        Self { manager, ids }
    }

    /// The `n`th diagram's ID.
    ///
    /// # Panics
    ///
    /// When `n` is out of range.
    #[must_use]
    pub fn id(&self, n: usize) -> DocumentId {
        self.ids[n]
    }

    #[must_use]
    pub fn manager(&self) -> &UndoManager<Diagram> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut UndoManager<Diagram> {
        &mut self.manager
    }

    #[must_use]
    pub fn diagram(&self, id: DocumentId) -> Option<&Diagram> {
        self.manager.document(id)
    }

    /// Tracked state of every diagram, in ID order.
    #[must_use]
    pub fn states(&self) -> Vec<DiagramState> {
        self.ids
            .iter()
            .filter_map(|id| self.manager.document(*id).map(Diagram::state))
            .collect()
    }

    /// Run one op against `id`, reporting into history.
    ///
    /// Returns false when the op found nothing to act on.
    pub fn apply(&mut self, id: DocumentId, op: &Op) -> bool {
        self.manager
            .edit_document(id, |diagram, sink| {
                let pick = |slot: usize| -> Option<EntityId> {
                    let count = diagram.shape_count();
                    (count > 0).then(|| diagram.shape_ids().nth(slot % count)).flatten()
                };
                match op {
                    Op::Add { x, y } => {
                        diagram.add_shape(Quad::new(*x, *y, 10.0, 10.0), "shape", sink);
                        true
                    }
                    Op::Move { slot, dx, dy } => {
                        pick(*slot).is_some_and(|s| diagram.move_shape(s, *dx, *dy, sink))
                    }
                    Op::Retext { slot, text } => {
                        pick(*slot).is_some_and(|s| diagram.set_text(s, text, sink))
                    }
                    Op::Hide { slot } => {
                        pick(*slot).is_some_and(|s| diagram.set_visible(s, false, sink))
                    }
                    Op::Remove { slot } => {
                        pick(*slot).is_some_and(|s| diagram.remove_shape(s, sink).is_some())
                    }
                    Op::Title(title) => {
                        diagram.set_title(title, sink);
                        true
                    }
                    Op::Highlight { slot } => {
                        pick(*slot).is_some_and(|s| diagram.set_highlight(s, true, sink))
                    }
                }
            })
            .unwrap_or(false)
    }

    /// Run `ops` inside one transaction committed as `name`.
    ///
    /// True when an edit was committed.
    pub fn transaction(&mut self, name: &str, ops: &[(DocumentId, Op)]) -> bool {
        let span = debug_span!("harness.transaction", name, ops = ops.len());
        let _enter = span.enter();
        self.manager.start_transaction();
        for (id, op) in ops {
            self.apply(*id, op);
        }
        self.manager.finish_transaction(name)
    }

    /// Run `ops` inside one transaction, then abort it.
    pub fn aborted(&mut self, ops: &[(DocumentId, Op)]) {
        let span = debug_span!("harness.aborted", ops = ops.len());
        let _enter = span.enter();
        self.manager.start_transaction();
        for (id, op) in ops {
            self.apply(*id, op);
        }
        self.manager.abort_transaction();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_on_empty_diagram_do_nothing() {
        let mut session = Session::new(1);
        let id = session.id(0);
        assert!(!session.apply(id, &Op::Move { slot: 3, dx: 1.0, dy: 1.0 }));
        assert!(!session.apply(id, &Op::Remove { slot: 0 }));
        assert!(session.manager().current_edit().is_none());
    }

    #[test]
    fn transaction_commits_one_edit() {
        let mut session = Session::new(1);
        let id = session.id(0);
        assert!(session.transaction(
            "Insert",
            &[(id, Op::Add { x: 0.0, y: 0.0 }), (id, Op::Add { x: 5.0, y: 5.0 })],
        ));
        assert_eq!(session.manager().all_edits().len(), 1);
        assert_eq!(session.diagram(id).unwrap().shape_count(), 2);
    }

    #[test]
    fn highlight_only_transaction_commits_nothing() {
        let mut session = Session::new(1);
        let id = session.id(0);
        session.transaction("Insert", &[(id, Op::Add { x: 0.0, y: 0.0 })]);
        assert!(!session.transaction("Hover", &[(id, Op::Highlight { slot: 0 })]));
        assert_eq!(session.manager().all_edits().len(), 1);
    }

    #[test]
    fn unknown_document_is_ignored() {
        let mut session = Session::new(1);
        assert!(!session.apply(DocumentId(42), &Op::Title("x".into())));
    }
}
