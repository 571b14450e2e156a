//! Span capture for asserting on worker behaviour.
//!
//! The worker opens an `afz.*` span for every lifecycle event and fetch and a
//! `strategy.*` span for the strategy that handled a fetch. Capturing those
//! spans lets tests check which path a request took without reaching into
//! private state.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tracing::Dispatch;
use tracing::instrument::WithSubscriber;
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

const CAPTURED_PREFIXES: [&str; 2] = ["afz.", "strategy."];

fn is_captured(name: &str) -> bool {
    CAPTURED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// A captured span.
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub id: u64,
    pub parent_id: Option<u64>,
    /// Span name, e.g. `"strategy.cache_first"`.
    pub name: String,
    pub target: String,
    /// Field values rendered as strings.
    pub fields: Vec<(String, String)>,
}

impl CapturedSpan {
    /// Value of `field`, if recorded.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }
}

/// Layer recording `afz.*` and `strategy.*` spans.
pub struct SpanCaptureLayer {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

#[derive(Default)]
struct FieldVisitor {
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.fields
            .push((field.name().to_string(), format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }
}

impl<S> Layer<S> for SpanCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let metadata = attrs.metadata();
        if !is_captured(metadata.name()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);

        let parent_id = attrs
            .parent()
            .cloned()
            .or_else(|| {
                if attrs.is_contextual() {
                    ctx.current_span().id().cloned()
                } else {
                    None
                }
            })
            .map(|id| id.into_u64());

        self.spans.lock().unwrap().push(CapturedSpan {
            id: id.into_u64(),
            parent_id,
            name: metadata.name().to_string(),
            target: metadata.target().to_string(),
            fields: visitor.fields,
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span_ref) = ctx.span(id) else {
            return;
        };
        if !is_captured(span_ref.metadata().name()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);

        let span_id = id.into_u64();
        let mut spans = self.spans.lock().unwrap();
        if let Some(captured) = spans.iter_mut().find(|s| s.id == span_id) {
            for (key, value) in visitor.fields {
                match captured.fields.iter_mut().find(|(k, _)| k == &key) {
                    Some(existing) => existing.1 = value,
                    None => captured.fields.push((key, value)),
                }
            }
        }
    }

    fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {}
}

/// Shared view over captured spans.
#[derive(Clone)]
pub struct SpanCollector {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    dispatch: Dispatch,
}

/// Creates a collector together with the dispatch that feeds it.
pub fn create_span_collector() -> SpanCollector {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let layer = SpanCaptureLayer {
        spans: spans.clone(),
    };
    let dispatch = Dispatch::new(Registry::default().with(layer));
    SpanCollector { spans, dispatch }
}

impl SpanCollector {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    /// Span names in creation order.
    pub fn span_names(&self) -> Vec<String> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    /// Strategies that ran, in order, without the `strategy.` prefix.
    pub fn strategies(&self) -> Vec<String> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| s.name.strip_prefix("strategy.").map(String::from))
            .collect()
    }

    /// Captured `afz.fetch` spans, one per handled request.
    pub fn fetches(&self) -> Vec<CapturedSpan> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name == "afz.fetch")
            .cloned()
            .collect()
    }

    pub fn has_span(&self, name: &str) -> bool {
        self.spans.lock().unwrap().iter().any(|s| s.name == name)
    }

    /// Last span called `name`.
    pub fn get_span(&self, name: &str) -> Option<CapturedSpan> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.name == name)
            .cloned()
    }

    /// Field of the last span called `span_name`.
    pub fn get_field(&self, span_name: &str, field_name: &str) -> Option<String> {
        self.get_span(span_name)
            .and_then(|s| s.field(field_name).map(String::from))
    }

    pub fn clear(&self) {
        self.spans.lock().unwrap().clear();
    }

    /// Asserts that `expected` appears in order, other spans may sit in between.
    pub fn assert_span_sequence(&self, expected: &[&str]) {
        let names = self.span_names();
        let mut expected_iter = expected.iter();
        let mut current_expected = expected_iter.next();

        for name in &names {
            if let Some(exp) = current_expected
                && name == *exp
            {
                current_expected = expected_iter.next();
            }
        }

        if current_expected.is_some() {
            panic!("Expected span sequence {:?} but got {:?}", expected, names);
        }
    }

    pub fn assert_has_spans(&self, expected: &[&str]) {
        for name in expected {
            if !self.has_span(name) {
                panic!(
                    "Expected span '{}' not found. Captured spans: {:?}",
                    name,
                    self.span_names()
                );
            }
        }
    }
}

/// Runs `f` with span capture enabled.
pub fn with_span_capture<F, R>(f: F) -> (R, SpanCollector)
where
    F: FnOnce() -> R,
{
    let collector = create_span_collector();
    let result = tracing::dispatcher::with_default(collector.dispatch(), f);
    (result, collector)
}

/// Awaits `future` with span capture enabled.
///
/// Tasks spawned by the future do not inherit the capture.
///
/// ```ignore
/// let (outcome, spans) = capture_spans(worker.fetch(request)).await;
/// assert_eq!(spans.strategies(), vec!["cache_first"]);
/// ```
pub async fn capture_spans<F>(future: F) -> (F::Output, SpanCollector)
where
    F: Future,
{
    let collector = create_span_collector();
    let result = future.with_subscriber(collector.dispatch().clone()).await;
    (result, collector)
}
