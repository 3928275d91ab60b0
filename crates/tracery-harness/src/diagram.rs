#![forbid(unsafe_code)]

//! Reference diagram document.
//!
//! A small in-memory diagram of shapes that speaks the full collaborator
//! contract: every mutator reports a [`ChangeRecord`] into a [`ChangeSink`],
//! and [`Document::apply_change`] replays records in either direction.
//!
//! Before-phase records are informational; replay ignores them and applies
//! only the after-phase record of a pair.

use std::collections::{BTreeMap, BTreeSet};

use tracery_history::{
    ApplyError, Change, ChangeRecord, ChangeSink, Delta, Direction, Document, DocumentId,
    EntityId, HistorySource, Quad, Significance, UndoEvent,
};

/// One shape on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub bounds: Quad,
    pub text: String,
    pub visible: bool,
}

impl Shape {
    #[must_use]
    pub fn new(bounds: Quad, text: impl Into<String>) -> Self {
        Self {
            bounds,
            text: text.into(),
            visible: true,
        }
    }
}

/// Every attribute change a diagram can report.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramChange {
    /// Shape moved or resized.
    Bounds(Delta<Quad>),
    /// Shape label edited.
    Text(Delta<String>),
    /// Shape shown or hidden.
    Visible(Delta<bool>),
    /// Shape inserted (`None → Some`) or removed (`Some → None`).
    Presence(Delta<Option<Shape>>),
    /// Document title edited.
    Title(Delta<String>),
    /// Hover highlight toggled; cosmetic.
    Highlight(Delta<bool>),
    /// Whole canvas must repaint; carries no state.
    RepaintAll,
}

/// Payload-free identity of a [`DiagramChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    Bounds,
    Text,
    Visible,
    Presence,
    Title,
    Highlight,
    RepaintAll,
}

impl Change for DiagramChange {
    type Kind = DiagramKind;

    fn kind(&self) -> DiagramKind {
        match self {
            Self::Bounds(_) => DiagramKind::Bounds,
            Self::Text(_) => DiagramKind::Text,
            Self::Visible(_) => DiagramKind::Visible,
            Self::Presence(_) => DiagramKind::Presence,
            Self::Title(_) => DiagramKind::Title,
            Self::Highlight(_) => DiagramKind::Highlight,
            Self::RepaintAll => DiagramKind::RepaintAll,
        }
    }

    fn significance(&self) -> Significance {
        match self {
            Self::Highlight(_) => Significance::Repaint,
            Self::RepaintAll => Significance::RepaintAll,
            _ => Significance::Semantic,
        }
    }
}

/// The tracked state of a diagram, comparable across undo/redo.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramState {
    pub title: String,
    pub shapes: BTreeMap<EntityId, Shape>,
}

/// An in-memory diagram document.
#[derive(Debug)]
pub struct Diagram {
    id: DocumentId,
    title: String,
    shapes: BTreeMap<EntityId, Shape>,
    next_entity: u64,
    skips_history: bool,
    untracked: BTreeSet<EntityId>,
    highlighted: BTreeSet<EntityId>,
    live: bool,
    fail_on: Option<DiagramKind>,
    layout_suspended: bool,
    events: Vec<&'static str>,
}

impl Diagram {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self {
            id: DocumentId(id),
            title: String::new(),
            shapes: BTreeMap::new(),
            next_entity: 1,
            skips_history: false,
            untracked: BTreeSet::new(),
            highlighted: BTreeSet::new(),
            live: true,
            fail_on: None,
            layout_suspended: false,
            events: Vec::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn shape(&self, id: EntityId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Shape IDs in ascending order.
    pub fn shape_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.shapes.keys().copied()
    }

    /// True while the hover highlight is on for `id`.
    #[must_use]
    pub fn is_highlighted(&self, id: EntityId) -> bool {
        self.highlighted.contains(&id)
    }

    /// Copy of everything undo/redo is expected to restore.
    #[must_use]
    pub fn state(&self) -> DiagramState {
        DiagramState {
            title: self.title.clone(),
            shapes: self.shapes.clone(),
        }
    }

    /// Labels of every lifecycle event received, oldest first.
    #[must_use]
    pub fn events(&self) -> &[&'static str] {
        &self.events
    }

    /// True between a transaction start and its finish or abort.
    #[must_use]
    pub fn layout_suspended(&self) -> bool {
        self.layout_suspended
    }

    // ========================================================================
    // History participation
    // ========================================================================

    /// Opt the whole document in or out of history.
    pub fn set_skips_history(&mut self, skips: bool) {
        self.skips_history = skips;
    }

    /// Opt one shape in or out of history.
    pub fn set_tracked(&mut self, id: EntityId, tracked: bool) {
        if tracked {
            self.untracked.remove(&id);
        } else {
            self.untracked.insert(id);
        }
    }

    /// Mark the document closed; its edits stop being replayable.
    pub fn close(&mut self) {
        self.live = false;
    }

    /// Make replay of `kind` fail until cleared with `None`.
    pub fn fail_on(&mut self, kind: Option<DiagramKind>) {
        self.fail_on = kind;
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    fn emit(
        &self,
        sink: &mut dyn ChangeSink<DiagramChange>,
        subject: Option<EntityId>,
        change: DiagramChange,
    ) {
        let mut record = ChangeRecord::new(self.id, change);
        if let Some(subject) = subject {
            record = record.with_subject(subject);
        }
        sink.document_changed(self, record);
    }

    /// Insert a shape and return its ID.
    pub fn add_shape(
        &mut self,
        bounds: Quad,
        text: &str,
        sink: &mut dyn ChangeSink<DiagramChange>,
    ) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        let shape = Shape::new(bounds, text);
        self.shapes.insert(id, shape.clone());
        self.emit(
            sink,
            Some(id),
            DiagramChange::Presence(Delta::new(None, Some(shape))),
        );
        id
    }

    /// Remove a shape, returning it.
    pub fn remove_shape(
        &mut self,
        id: EntityId,
        sink: &mut dyn ChangeSink<DiagramChange>,
    ) -> Option<Shape> {
        let shape = self.shapes.remove(&id)?;
        self.emit(
            sink,
            Some(id),
            DiagramChange::Presence(Delta::new(Some(shape.clone()), None)),
        );
        Some(shape)
    }

    /// Move or resize a shape. False when the shape does not exist.
    pub fn set_bounds(
        &mut self,
        id: EntityId,
        bounds: Quad,
        sink: &mut dyn ChangeSink<DiagramChange>,
    ) -> bool {
        let Some(shape) = self.shapes.get_mut(&id) else {
            return false;
        };
        let old = std::mem::replace(&mut shape.bounds, bounds);
        if old != bounds {
            self.emit(sink, Some(id), DiagramChange::Bounds(Delta::new(old, bounds)));
        }
        true
    }

    /// Translate a shape by `(dx, dy)`.
    pub fn move_shape(
        &mut self,
        id: EntityId,
        dx: f32,
        dy: f32,
        sink: &mut dyn ChangeSink<DiagramChange>,
    ) -> bool {
        let Some(bounds) = self.shapes.get(&id).map(|s| s.bounds) else {
            return false;
        };
        self.set_bounds(id, bounds.translate(dx, dy), sink)
    }

    /// Edit a shape's label as a two-phase change.
    ///
    /// A before-phase record snapshots the current text; the after-phase
    /// record takes its old side from the paired before record.
    pub fn set_text(
        &mut self,
        id: EntityId,
        text: &str,
        sink: &mut dyn ChangeSink<DiagramChange>,
    ) -> bool {
        let Some(current) = self.shapes.get(&id).map(|s| s.text.clone()) else {
            return false;
        };
        let snapshot = DiagramChange::Text(Delta::new(current.clone(), current.clone()));
        let before = ChangeRecord::new(self.id, snapshot)
            .with_subject(id)
            .before();
        sink.document_changed(&*self, before);

        if let Some(shape) = self.shapes.get_mut(&id) {
            shape.text = text.to_owned();
        }

        let probe = ChangeRecord::new(self.id, DiagramChange::Text(Delta::default())).with_subject(id);
        let old = match sink.find_paired_before(&probe).map(ChangeRecord::change) {
            Some(DiagramChange::Text(delta)) => delta.old.clone(),
            _ => current,
        };
        self.emit(
            sink,
            Some(id),
            DiagramChange::Text(Delta::new(old, text.to_owned())),
        );
        true
    }

    /// Show or hide a shape.
    pub fn set_visible(
        &mut self,
        id: EntityId,
        visible: bool,
        sink: &mut dyn ChangeSink<DiagramChange>,
    ) -> bool {
        let Some(shape) = self.shapes.get_mut(&id) else {
            return false;
        };
        let old = std::mem::replace(&mut shape.visible, visible);
        self.emit(sink, Some(id), DiagramChange::Visible(Delta::new(old, visible)));
        true
    }

    /// Toggle the hover highlight. Reported, but never recorded.
    pub fn set_highlight(
        &mut self,
        id: EntityId,
        highlighted: bool,
        sink: &mut dyn ChangeSink<DiagramChange>,
    ) -> bool {
        if !self.shapes.contains_key(&id) {
            return false;
        }
        let old = self.highlighted.contains(&id);
        self.apply_highlight(id, highlighted);
        self.emit(
            sink,
            Some(id),
            DiagramChange::Highlight(Delta::new(old, highlighted)),
        );
        true
    }

    fn apply_highlight(&mut self, id: EntityId, highlighted: bool) {
        if highlighted {
            self.highlighted.insert(id);
        } else {
            self.highlighted.remove(&id);
        }
    }

    /// Rename the document.
    pub fn set_title(&mut self, title: &str, sink: &mut dyn ChangeSink<DiagramChange>) {
        let old = std::mem::replace(&mut self.title, title.to_owned());
        self.emit(sink, None, DiagramChange::Title(Delta::new(old, title.to_owned())));
    }

    /// Request a full repaint.
    pub fn repaint_all(&mut self, sink: &mut dyn ChangeSink<DiagramChange>) {
        self.emit(sink, None, DiagramChange::RepaintAll);
    }

    fn shape_mut(&mut self, id: Option<EntityId>) -> Result<&mut Shape, ApplyError> {
        let id = id.ok_or_else(|| ApplyError::rejected("shape change without subject"))?;
        self.shapes.get_mut(&id).ok_or(ApplyError::UnknownSubject(id))
    }
}

impl HistorySource for Diagram {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn skips_history(&self) -> bool {
        self.skips_history
    }

    fn skips_subject(&self, subject: EntityId) -> bool {
        self.untracked.contains(&subject)
    }
}

impl Document for Diagram {
    type Change = DiagramChange;

    fn is_live(&self) -> bool {
        self.live
    }

    fn apply_change(
        &mut self,
        record: &ChangeRecord<DiagramChange>,
        direction: Direction,
    ) -> Result<(), ApplyError> {
        if record.is_before_changing() {
            return Ok(());
        }
        if self.fail_on == Some(record.kind()) {
            return Err(ApplyError::rejected(format!("{:?} is locked", record.kind())));
        }
        let subject = record.subject();
        match record.change() {
            DiagramChange::Bounds(d) => self.shape_mut(subject)?.bounds = *d.get(direction),
            DiagramChange::Text(d) => self.shape_mut(subject)?.text = d.get(direction).clone(),
            DiagramChange::Visible(d) => self.shape_mut(subject)?.visible = *d.get(direction),
            DiagramChange::Highlight(d) => {
                let id = subject.ok_or_else(|| ApplyError::rejected("highlight without subject"))?;
                self.apply_highlight(id, *d.get(direction));
            }
            DiagramChange::Presence(d) => {
                let id = subject.ok_or_else(|| ApplyError::rejected("presence without subject"))?;
                match d.get(direction) {
                    Some(shape) => {
                        self.shapes.insert(id, shape.clone());
                    }
                    None => {
                        self.shapes.remove(&id);
                    }
                }
            }
            DiagramChange::Title(d) => self.title = d.get(direction).clone(),
            DiagramChange::RepaintAll => {}
        }
        Ok(())
    }

    fn on_undo_event(&mut self, event: &UndoEvent<'_, DiagramChange>) {
        match event {
            UndoEvent::TransactionStarted => self.layout_suspended = true,
            UndoEvent::TransactionFinished { .. } | UndoEvent::TransactionAborted => {
                self.layout_suspended = false;
            }
            _ => {}
        }
        self.events.push(event.label());
    }
}
