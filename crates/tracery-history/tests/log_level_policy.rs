#![forbid(unsafe_code)]

//! Log level policy for the history engine.
//!
//! Verify that:
//! - Discipline problems (changes outside a transaction, unbalanced ends)
//!   are WARN, never ERROR
//! - Replay failures are ERROR and carry the edit and the cause
//! - Commit, abort and replay milestones are DEBUG with structured fields
//! - Filtered noise only shows up at TRACE
//! - Every engine event uses the `tracery.history` target
//!
//! Run:
//!   cargo test -p tracery-history --test log_level_policy

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracery_harness::{Diagram, DiagramKind};
use tracery_history::{DocumentId, EntityId, NullSink, Quad, UndoConfig, UndoManager, names};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

const TARGET: &str = "tracery.history";

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    fields: HashMap<String, String>,
    message: Option<String>,
}

impl CapturedEvent {
    fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    target: String,
    fields: HashMap<String, String>,
}

#[derive(Default, Clone)]
struct Captured {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

impl Captured {
    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.message.as_deref() == Some(message))
            .collect()
    }

    fn at_level(&self, level: tracing::Level) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

struct CaptureLayer(Captured);

impl<S> tracing_subscriber::Layer<S> for CaptureLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.0.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            target: attrs.metadata().target().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned();
        self.0.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields,
            message,
        });
    }
}

fn capture(f: impl FnOnce()) -> Captured {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(CaptureLayer(captured.clone()));
    tracing::subscriber::with_default(subscriber, f);
    captured
}

fn manager(config: UndoConfig) -> (UndoManager<Diagram>, DocumentId, EntityId) {
    let mut diagram = Diagram::new(1);
    let shape = diagram.add_shape(Quad::new(0.0, 0.0, 4.0, 4.0), "s", &mut NullSink);
    let doc = diagram.id();
    let mut manager = UndoManager::with_config(config);
    manager.add_document(diagram);
    (manager, doc, shape)
}

// ============================================================================
// WARN
// ============================================================================

#[test]
fn change_outside_transaction_warns_when_checking() {
    let captured = capture(|| {
        let (mut manager, doc, shape) = manager(UndoConfig::default().with_transaction_checks(true));
        manager.edit_document(doc, |d, sink| d.move_shape(shape, 1.0, 0.0, sink));
    });

    let warnings = captured.with_message("change recorded outside of a transaction");
    assert_eq!(warnings.len(), 1);
    let warning = &warnings[0];
    assert_eq!(warning.level, tracing::Level::WARN);
    assert_eq!(warning.target, TARGET);
    assert!(warning.has("document"));
    assert!(warning.has("kind"));
    assert!(captured.at_level(tracing::Level::ERROR).is_empty());
}

#[test]
fn change_outside_transaction_silent_by_default() {
    let captured = capture(|| {
        let (mut manager, doc, shape) = manager(UndoConfig::default());
        manager.edit_document(doc, |d, sink| d.move_shape(shape, 1.0, 0.0, sink));
    });
    assert!(captured.at_level(tracing::Level::WARN).is_empty());
}

#[test]
fn unbalanced_end_warns() {
    let captured = capture(|| {
        let (mut manager, _, _) = manager(UndoConfig::default());
        manager.finish_transaction("stray");
    });
    let warnings = captured.with_message("end_transaction without a matching start");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, tracing::Level::WARN);
    assert_eq!(warnings[0].fields.get("name").map(String::as_str), Some("stray"));
}

// ============================================================================
// ERROR
// ============================================================================

#[test]
fn failed_replay_logs_error_with_cause() {
    let captured = capture(|| {
        let (mut manager, doc, shape) = manager(UndoConfig::default());
        manager.start_transaction();
        manager.edit_document(doc, |d, sink| d.move_shape(shape, 1.0, 0.0, sink));
        manager.finish_transaction(names::MOVE_SELECTION);
        manager
            .document_mut(doc)
            .unwrap()
            .fail_on(Some(DiagramKind::Bounds));
        assert!(manager.undo().is_err());
    });

    let errors = captured.at_level(tracing::Level::ERROR);
    assert_eq!(errors.len(), 1);
    let error = &errors[0];
    assert_eq!(error.target, TARGET);
    assert_eq!(error.message.as_deref(), Some("replay failed"));
    assert_eq!(error.fields.get("edit").map(String::as_str), Some(names::MOVE_SELECTION));
    assert!(error.fields.get("error").is_some_and(|e| e.contains("locked")));
    assert_eq!(error.fields.get("direction").map(String::as_str), Some("Undo"));
}

// ============================================================================
// DEBUG / TRACE
// ============================================================================

#[test]
fn milestones_are_debug_with_fields() {
    let captured = capture(|| {
        let (mut manager, doc, shape) = manager(UndoConfig::default());
        manager.start_transaction();
        manager.edit_document(doc, |d, sink| d.move_shape(shape, 1.0, 0.0, sink));
        manager.finish_transaction(names::MOVE_SELECTION);
        manager.start_transaction();
        manager.abort_transaction();
        manager.undo().unwrap();
        manager.redo().unwrap();
    });

    let committed = captured.with_message("transaction committed");
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].level, tracing::Level::DEBUG);
    assert_eq!(committed[0].fields.get("records").map(String::as_str), Some("1"));

    let aborted = captured.with_message("transaction aborted");
    assert_eq!(aborted.len(), 1);
    assert_eq!(aborted[0].level, tracing::Level::DEBUG);

    let replays = captured.with_message("replay finished");
    assert_eq!(replays.len(), 2);
    assert!(replays.iter().all(|e| e.level == tracing::Level::DEBUG));

    let spans: Vec<String> = captured.spans().into_iter().map(|s| s.name).collect();
    assert!(spans.contains(&"history.undo".to_string()));
    assert!(spans.contains(&"history.redo".to_string()));
    let undo_span = captured
        .spans()
        .into_iter()
        .find(|s| s.name == "history.undo")
        .unwrap();
    assert_eq!(undo_span.fields.get("records").map(String::as_str), Some("1"));
}

#[test]
fn filtered_noise_is_trace_only() {
    let captured = capture(|| {
        let (mut manager, doc, shape) = manager(UndoConfig::default().with_transaction_checks(true));
        manager.start_transaction();
        manager.edit_document(doc, |d, sink| {
            d.set_highlight(shape, true, sink);
            d.repaint_all(sink);
        });
        manager.abort_transaction();
    });

    let filtered = captured.with_message("change filtered");
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|e| e.level == tracing::Level::TRACE));
    assert!(captured.at_level(tracing::Level::WARN).is_empty());
}

#[test]
fn engine_events_use_history_target() {
    let captured = capture(|| {
        let (mut manager, doc, shape) = manager(UndoConfig::default());
        manager.start_transaction();
        manager.edit_document(doc, |d, sink| d.set_text(shape, "t", sink));
        manager.finish_transaction(names::TEXT_EDIT);
        manager.undo().unwrap();
        manager.clear();
    });
    let events = captured.events();
    assert!(!events.is_empty());
    for event in events {
        assert_eq!(event.target, TARGET, "event {:?} off target", event.message);
    }
}

#[test]
fn replay_spans_use_history_target() {
    let captured = capture(|| {
        let (mut manager, doc, shape) = manager(UndoConfig::default());
        manager.start_transaction();
        manager.edit_document(doc, |d, sink| d.move_shape(shape, 1.0, 0.0, sink));
        manager.finish_transaction(names::MOVE_SELECTION);
        manager.undo().unwrap();
        manager.redo().unwrap();
    });
    let replay_spans: Vec<CapturedSpan> = captured
        .spans()
        .into_iter()
        .filter(|s| s.name.starts_with("history."))
        .collect();
    assert_eq!(replay_spans.len(), 2);
    for span in replay_spans {
        assert_eq!(span.target, TARGET, "span {} off target", span.name);
    }
}
