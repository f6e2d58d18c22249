use crate::event::LogEvent;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};
use std::env;

/// Timestamp layout of the `timestamp` field: UTC, microseconds, literal `Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Source of the current time for events created by the dispatcher.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

static HOSTNAME: Lazy<String> = Lazy::new(resolve_hostname);

/// Hostname of this machine, resolved on first use and cached for the
/// lifetime of the process.
pub fn local_hostname() -> &'static str {
    HOSTNAME.as_str()
}

fn resolve_hostname() -> String {
    if let Ok(hostname) = env::var("HOSTNAME") {
        if !hostname.is_empty() {
            return hostname;
        }
    }

    match nix::unistd::gethostname() {
        Ok(name) => match name.into_string() {
            Ok(name) if !name.is_empty() => return name,
            _ => {}
        },
        Err(e) => eprintln!("failed to resolve hostname: {e}"),
    }

    "unknown".to_string()
}

/// Canonical JSON object for one event, ready to be written to the wire.
///
/// Field order is preserved: fixed fields first, caller context last.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Encode the record as one JSON line terminated by `\n`.
    ///
    /// The record only holds `serde_json::Value`s keyed by strings, which
    /// always encode; the fallback exists so the caller never has to handle
    /// an encoding error.
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = serde_json::to_vec(&self.fields).unwrap_or_else(|e| {
            let mut fallback = Map::new();
            fallback.insert("message".into(), Value::String(format!("unencodable record: {e}")));
            serde_json::to_vec(&fallback).unwrap_or_default()
        });
        line.push(b'\n');
        line
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.fields)
    }
}

/// Turns [`LogEvent`]s into [`Record`]s stamped with process identity.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    app: String,
    host: String,
}

impl RecordBuilder {
    /// Builder for `app`, using the cached [`local_hostname`].
    pub fn new(app: impl Into<String>) -> Self {
        Self::with_host(app, local_hostname())
    }

    pub fn with_host(app: impl Into<String>, host: impl Into<String>) -> Self {
        RecordBuilder { app: app.into(), host: host.into() }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn build(&self, event: &LogEvent) -> Record {
        let mut fields = Map::new();
        fields.insert(
            "timestamp".into(),
            Value::String(event.timestamp.format(TIMESTAMP_FORMAT).to_string()),
        );
        fields.insert("app".into(), Value::String(self.app.clone()));
        fields.insert("host".into(), Value::String(self.host.clone()));
        fields.insert("level".into(), Value::String(event.level.as_str().into()));
        fields.insert("logger".into(), Value::String(event.logger_name.clone()));
        fields.insert("message".into(), Value::String(event.message.clone()));

        if let Some(origin) = &event.origin {
            fields.insert("path".into(), Value::String(origin.path.clone()));
            fields.insert("lineno".into(), Value::from(origin.lineno));
            if let Some(function) = &origin.function {
                fields.insert("function".into(), Value::String(function.clone()));
            }
        }

        if let Some(error) = &event.error {
            let exception = serde_json::to_value(error).unwrap_or_else(|_| {
                Value::String(format!("{}: {}", error.type_name, error.message))
            });
            fields.insert("exception".into(), exception);
        }

        for (key, value) in event.context.iter() {
            fields.insert(key.clone(), value.clone());
        }

        Record { fields }
    }
}
