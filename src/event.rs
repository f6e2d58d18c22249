use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use std::panic::Location;
use std::str::FromStr;

/// Severity of a [`LogEvent`].
///
/// Ordered from least to most severe so thresholds can be compared with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `tracing` has no CRITICAL and a TRACE below DEBUG; both collapse to the
/// nearest level here.
impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        if *level == tracing::Level::ERROR {
            Level::Error
        } else if *level == tracing::Level::WARN {
            Level::Warning
        } else if *level == tracing::Level::INFO {
            Level::Info
        } else {
            Level::Debug
        }
    }
}

/// Error returned when a level name is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level `{0}`")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "TRACE" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Call site that produced an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub path: String,
    pub lineno: u32,
    pub function: Option<String>,
}

impl Origin {
    pub fn new(path: impl Into<String>, lineno: u32) -> Self {
        Origin { path: path.into(), lineno, function: None }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Origin of the caller, resolved through `#[track_caller]`.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Origin::new(location.file(), location.line())
    }
}

/// Structured description of an error attached to an event.
///
/// `traceback` lists the error chain oldest first: the root cause comes
/// first and the error that was caught comes last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub type_name: String,
    pub message: String,
    pub traceback: Vec<String>,
}

impl ErrorInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>, traceback: Vec<String>) -> Self {
        ErrorInfo { type_name: type_name.into(), message: message.into(), traceback }
    }

    /// Capture an error whose concrete type is known at the catch site.
    pub fn from_error<E: Error + 'static>(err: &E) -> Self {
        Self::capture(short_type_name(std::any::type_name::<E>()), err)
    }

    /// Capture a type-erased error.
    ///
    /// `io::Error` is recognised by downcasting. Other types are named by
    /// the leading identifier of their `Debug` output when that output has
    /// the shape of a derived impl (`Name`, `Name(..)` or `Name { .. }`),
    /// and `Error` otherwise.
    pub fn from_dyn(err: &(dyn Error + 'static)) -> Self {
        let type_name = if err.downcast_ref::<std::io::Error>().is_some() {
            "io::Error".to_string()
        } else {
            debug_type_name(&format!("{err:?}")).unwrap_or_else(|| "Error".to_string())
        };
        Self::capture(type_name, err)
    }

    fn capture(type_name: String, err: &(dyn Error + 'static)) -> Self {
        let message = err.to_string();

        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        let mut traceback: Vec<String> = causes.into_iter().rev().collect();
        traceback.push(format!("{type_name}: {message}"));

        ErrorInfo { type_name, message, traceback }
    }
}

fn debug_type_name(debug: &str) -> Option<String> {
    let end = debug
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(debug.len());
    let (ident, rest) = debug.split_at(end);
    let starts_upper = ident.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    let derived_shape = rest.is_empty() || rest.starts_with('(') || rest.starts_with(" {");
    (starts_upper && derived_shape).then(|| ident.to_string())
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Caller-supplied structured fields merged into the record.
///
/// Values are converted to JSON on insertion. A value whose `Serialize`
/// impl fails, or a non-finite float, is stored as its string form so the
/// record stays shippable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    fields: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<V>(&mut self, key: impl Into<String>, value: V) -> &mut Self
    where
        V: Serialize + fmt::Debug,
    {
        let value = match serde_json::to_value(&value) {
            Ok(json) if contains_null(&json) && mentions_non_finite(&value) => {
                Value::String(format!("{value:?}"))
            }
            Ok(json) => json,
            Err(_) => Value::String(format!("{value:?}")),
        };
        self.fields.insert(key.into(), value);
        self
    }

    /// Builder-style variant of [`Context::insert`].
    pub fn with<V>(mut self, key: impl Into<String>, value: V) -> Self
    where
        V: Serialize + fmt::Debug,
    {
        self.insert(key, value);
        self
    }

    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

// serde_json encodes NaN and infinities as `null`, at any depth. When the
// encoded tree has a null and the value's Debug output spells a non-finite
// float, the whole value falls back to its string form.
fn contains_null(json: &Value) -> bool {
    match json {
        Value::Null => true,
        Value::Array(items) => items.iter().any(contains_null),
        Value::Object(fields) => fields.values().any(contains_null),
        _ => false,
    }
}

fn mentions_non_finite<V: fmt::Debug>(value: &V) -> bool {
    format!("{value:?}")
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == "NaN" || token == "inf")
}

impl From<Map<String, Value>> for Context {
    fn from(fields: Map<String, Value>) -> Self {
        Context { fields }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Context {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Context { fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

/// One log call, as seen by the sinks.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub logger_name: String,
    pub message: String,
    pub origin: Option<Origin>,
    pub error: Option<ErrorInfo>,
    pub context: Context,
}

impl LogEvent {
    pub fn new(level: Level, logger_name: impl Into<String>, message: impl Into<String>) -> Self {
        LogEvent {
            timestamp: Utc::now(),
            level,
            logger_name: logger_name.into(),
            message: message.into(),
            origin: None,
            error: None,
            context: Context::default(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}
