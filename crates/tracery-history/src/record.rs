#![forbid(unsafe_code)]

//! Change records: the captured before/after value pairs that make up history.
//!
//! A [`ChangeRecord`] is built by a document collaborator at the moment it
//! mutates its own state. The record carries the collaborator's typed change
//! value (anything implementing [`Change`]), and every variant of that value
//! holds its payload as a [`Delta`]: the old and the new side of the attribute.
//!
//! Replay never needs a bespoke inverse. Undo applies the old side of each
//! delta, redo applies the new side, and the [`Direction`] picks which one.
//!
//! # Invariants
//!
//! - A record is immutable once captured. The only field the controller
//!   touches is the capture `sequence`, assigned when the record enters an
//!   open [`CompoundEdit`](crate::CompoundEdit).
//! - `sequence` is strictly increasing in capture order across the whole
//!   controller lifetime.

use std::fmt;

/// Opaque handle to a document (or session) that owns mutated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

impl DocumentId {
    /// Create a document ID from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Opaque handle to a mutated entity inside a document (shape, node, link).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create an entity ID from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Replay direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Apply old-side payloads, newest record first.
    Undo,
    /// Apply new-side payloads, oldest record first.
    Redo,
}

impl Direction {
    /// True when this direction reads the old side of a delta.
    #[must_use]
    pub const fn is_undo(self) -> bool {
        matches!(self, Self::Undo)
    }

    /// The opposite direction.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Undo => Self::Redo,
            Self::Redo => Self::Undo,
        }
    }
}

/// Whether a record was captured before or after its mutation took effect.
///
/// Two-phase notifications emit a `Before` record first and an `After`
/// record later; [`ChangeSink::find_paired_before`](crate::ChangeSink::find_paired_before)
/// joins them back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Snapshot taken before the mutation.
    Before,
    /// Snapshot taken after the mutation.
    #[default]
    After,
}

/// How much a change matters to history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Significance {
    /// A real attribute change; recorded.
    #[default]
    Semantic,
    /// Cosmetic repaint of a single entity with no semantic effect; dropped.
    Repaint,
    /// Full-document repaint marker; dropped.
    RepaintAll,
}

impl Significance {
    /// True when records of this significance never enter history.
    #[must_use]
    pub const fn is_noise(self) -> bool {
        !matches!(self, Self::Semantic)
    }
}

/// The old and new value of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Delta<T> {
    /// Value before the mutation.
    pub old: T,
    /// Value after the mutation.
    pub new: T,
}

impl<T> Delta<T> {
    /// Create a delta from its two sides.
    #[must_use]
    pub const fn new(old: T, new: T) -> Self {
        Self { old, new }
    }

    /// The side to apply when replaying in `direction`.
    ///
    /// Undo reads `old`, redo reads `new`.
    #[must_use]
    pub fn get(&self, direction: Direction) -> &T {
        match direction {
            Direction::Undo => &self.old,
            Direction::Redo => &self.new,
        }
    }

    /// Map both sides through `f`.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Delta<U> {
        Delta {
            old: f(self.old),
            new: f(self.new),
        }
    }

    /// Borrow both sides.
    #[must_use]
    pub fn as_ref(&self) -> Delta<&T> {
        Delta {
            old: &self.old,
            new: &self.new,
        }
    }
}

impl<T: PartialEq> Delta<T> {
    /// True when the mutation did not change the value.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.old == self.new
    }
}

/// A rectangle-like payload: position plus extent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quad {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Quad {
    /// Create a quad.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The same extent moved by `(dx, dy)`.
    #[must_use]
    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

/// A collaborator's typed change value.
///
/// Implemented by a document's change enum, one variant per kind of
/// attribute. Each variant carries its payload as a [`Delta`].
pub trait Change: Clone + fmt::Debug {
    /// Identity of the change kind, independent of payload.
    ///
    /// Plays the role of a hint/subhint code pair: two records with equal
    /// kinds describe the same logical attribute.
    type Kind: Copy + Eq + fmt::Debug;

    /// The kind of this change.
    fn kind(&self) -> Self::Kind;

    /// Whether this change belongs in history at all.
    fn significance(&self) -> Significance {
        Significance::Semantic
    }
}

/// One captured state transition.
#[derive(Clone, PartialEq)]
pub struct ChangeRecord<C> {
    document: DocumentId,
    subject: Option<EntityId>,
    phase: Phase,
    change: C,
    sequence: u64,
}

impl<C: fmt::Debug> fmt::Debug for ChangeRecord<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRecord")
            .field("document", &self.document)
            .field("subject", &self.subject)
            .field("phase", &self.phase)
            .field("sequence", &self.sequence)
            .field("change", &self.change)
            .finish()
    }
}

impl<C: Change> ChangeRecord<C> {
    /// Create an after-phase, document-level record.
    #[must_use]
    pub fn new(document: DocumentId, change: C) -> Self {
        Self {
            document,
            subject: None,
            phase: Phase::After,
            change,
            sequence: 0,
        }
    }

    /// Attach the mutated entity.
    #[must_use]
    pub fn with_subject(mut self, subject: EntityId) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Mark as the before-phase half of a two-phase notification.
    #[must_use]
    pub fn before(mut self) -> Self {
        self.phase = Phase::Before;
        self
    }

    /// Owning document.
    #[must_use]
    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// Mutated entity, if any.
    #[must_use]
    pub fn subject(&self) -> Option<EntityId> {
        self.subject
    }

    /// Capture phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True for the before-phase half of a pair.
    #[must_use]
    pub fn is_before_changing(&self) -> bool {
        self.phase == Phase::Before
    }

    /// The typed change value.
    #[must_use]
    pub fn change(&self) -> &C {
        &self.change
    }

    /// Kind of the carried change.
    #[must_use]
    pub fn kind(&self) -> C::Kind {
        self.change.kind()
    }

    /// Capture order within the controller; 0 until captured.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// True when `other` is a before-phase record for the same document,
    /// kind and subject as this one.
    #[must_use]
    pub fn pairs_with(&self, other: &Self) -> bool {
        other.is_before_changing()
            && other.document == self.document
            && other.subject == self.subject
            && other.kind() == self.kind()
    }
}
