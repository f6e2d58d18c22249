use crate::dispatch::Dispatcher;
use crate::event::{Context, ErrorInfo, Level, LogEvent, Origin};
use crate::DIAGNOSTIC_TARGET;
use serde_json::{Number, Value};
use std::error::Error;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns every event into a [`LogEvent`]
/// and hands it to a [`Dispatcher`] on the emitting thread.
///
/// The event target becomes the logger name, the `message` field the
/// message, and every other field a context entry. A field recorded as a
/// `std::error::Error` is attached as the record's `exception`. Level
/// filtering is left to the subscriber the layer is composed into.
pub struct ShippingLayer {
    dispatcher: Arc<Dispatcher>,
}

impl ShippingLayer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        ShippingLayer { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl<S> Layer<S> for ShippingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let meta = event.metadata();
        // The transport's own diagnostics must not be shipped through itself.
        if meta.target().starts_with(DIAGNOSTIC_TARGET) {
            return;
        }

        let mut context = Context::new();
        let mut message: Option<String> = None;
        let mut error: Option<ErrorInfo> = None;

        let mut visitor = FieldVisitor {
            context: &mut context,
            message: &mut message,
            error: &mut error,
        };
        event.record(&mut visitor);

        // Call-site metadata has no function name, so `function` stays unset.
        let origin = match (meta.file(), meta.line()) {
            (Some(file), Some(line)) => Some(Origin::new(file, line)),
            _ => None,
        };

        let log_event = LogEvent {
            timestamp: self.dispatcher.now(),
            level: Level::from(meta.level()),
            logger_name: meta.target().to_string(),
            message: message.unwrap_or_default(),
            origin,
            error,
            context,
        };

        self.dispatcher.dispatch(&log_event);
    }
}

/// Collects event fields into a [`Context`], pulling out the message and
/// the first error value.
pub struct FieldVisitor<'a> {
    pub context: &'a mut Context,
    pub message: &'a mut Option<String>,
    pub error: &'a mut Option<ErrorInfo>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.context.insert_value(field.name(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.context.insert_value(field.name(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.context.insert_value(field.name(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        let json = Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.context.insert_value(field.name(), json);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.context.insert_value(field.name(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if self.error.is_none() {
            *self.error = Some(ErrorInfo::from_dyn(value));
        } else {
            self.context.insert_value(field.name(), Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.context.insert_value(field.name(), Value::String(format!("{:?}", value)));
        }
    }
}
