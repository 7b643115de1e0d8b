//! Tracing layer that streams session protocol events to a host.
//!
//! The orchestrator logs its lifecycle under the `mindshift::session`
//! target. [`SessionTraceLayer`] picks those events up, attaches the fields
//! of the enclosing `session` span and forwards them over a tokio channel so
//! a UI can show what the protocol is doing.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Target prefix of the events forwarded by default.
pub const SESSION_TARGET: &str = "mindshift::session";

/// Event data sent to the host.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionTraceEvent {
    /// Event target (e.g., "mindshift::session")
    pub target: String,
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    /// Human-readable message
    pub message: String,
    /// Structured fields from the event (step_id, latency_ms, ...)
    pub fields: HashMap<String, Value>,
    /// Fields of the enclosing spans, innermost last (e.g., session_id)
    pub span: HashMap<String, Value>,
    pub timestamp: String,
}

impl SessionTraceEvent {
    /// The session the event belongs to, from the event itself or its span.
    pub fn session_id(&self) -> Option<&str> {
        self.fields
            .get("session_id")
            .or_else(|| self.span.get("session_id"))
            .and_then(Value::as_str)
    }
}

/// Span fields recorded at span creation.
#[derive(Debug, Clone, Default)]
struct SpanFields(HashMap<String, Value>);

/// A tracing layer that sends session events to a channel.
pub struct SessionTraceLayer {
    sender: mpsc::UnboundedSender<SessionTraceEvent>,
    target_prefix: String,
}

impl SessionTraceLayer {
    /// Creates a layer forwarding events under [`SESSION_TARGET`].
    pub fn new(sender: mpsc::UnboundedSender<SessionTraceEvent>) -> Self {
        Self::with_target(sender, SESSION_TARGET)
    }

    /// Creates a layer forwarding events whose target starts with `target_prefix`.
    pub fn with_target(
        sender: mpsc::UnboundedSender<SessionTraceEvent>,
        target_prefix: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            target_prefix: target_prefix.into(),
        }
    }
}

impl<S> Layer<S> for SessionTraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with(&self.target_prefix) {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let mut span_fields = HashMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(stored) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(stored.0.clone());
                }
            }
        }

        let trace_event = SessionTraceEvent {
            target: event.metadata().target().to_string(),
            level: event.metadata().level().to_string(),
            message: fields
                .remove("message")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            fields,
            span: span_fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // The host may have gone away; tracing must never fail.
        let _ = self.sender.send(trace_event);
    }
}

/// Field visitor that extracts tracing fields into a HashMap
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(format!("{:?}", value)));
    }
}
