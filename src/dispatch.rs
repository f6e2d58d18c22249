use crate::console::ConsoleSink;
use crate::error::ShipError;
use crate::event::{Context, ErrorInfo, Level, LogEvent, Origin};
use crate::init::ShipperConfig;
use crate::record::{Clock, RecordBuilder, SystemClock};
use crate::report::{ErrorReporter, StderrReporter};
use crate::sink::LogSink;
use crate::transport::{TcpConnector, Transport};
use std::error::Error;
use std::sync::Arc;

/// Entry point that fans every event out to the console and the collector.
///
/// Construct one per process and hand it (or [`Logger`]s borrowed from it)
/// to the code that logs. Building a new dispatcher replaces the old one;
/// sinks are owned, never registered globally, so they cannot pile up.
///
/// Every call is synchronous: the caller's thread formats the console line,
/// builds the record and writes it to the socket before returning. Shipping
/// failures go to the [`ErrorReporter`], never back to the caller.
pub struct Dispatcher {
    builder: RecordBuilder,
    console: Option<ConsoleSink>,
    sink: Arc<dyn LogSink>,
    reporter: Arc<dyn ErrorReporter>,
    clock: Arc<dyn Clock>,
    level: Level,
}

impl Dispatcher {
    /// Dispatcher shipping to the TCP collector named in `config`.
    pub fn new(config: &ShipperConfig) -> Self {
        let connector = TcpConnector::new(config.collector_addr())
            .with_timeouts(config.connect_timeout, config.write_timeout);
        let mut builder = DispatcherBuilder::new(&config.app_name)
            .sink(Arc::new(Transport::with_connector(connector)))
            .level(config.level);
        if !config.console {
            builder = builder.without_console();
        }
        builder.build()
    }

    pub fn builder(app_name: impl Into<String>) -> DispatcherBuilder {
        DispatcherBuilder::new(app_name)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    pub fn record_builder(&self) -> &RecordBuilder {
        &self.builder
    }

    /// Named handle for emitting events.
    pub fn logger(&self, name: impl Into<String>) -> Logger<'_> {
        Logger { dispatcher: self, name: name.into() }
    }

    /// Timestamp for a new event from the configured clock.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Hand one event to both sinks.
    ///
    /// The console line is written first; a console failure is reported and
    /// does not stop the record from being shipped.
    pub fn dispatch(&self, event: &LogEvent) {
        if !self.enabled(event.level) {
            return;
        }

        if let Some(console) = &self.console {
            if let Err(e) = console.emit(event) {
                self.reporter.report(&ShipError::Console(e));
            }
        }

        let record = self.builder.build(event);
        if let Err(e) = self.sink.send(&record) {
            self.reporter.report(&ShipError::Transport(e));
        }
    }

    /// Release the collector connection. Later events reconnect.
    pub fn close(&self) {
        self.sink.close();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.sink.close();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("app", &self.builder.app())
            .field("host", &self.builder.host())
            .field("console", &self.console.is_some())
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Dispatcher`] from parts; anything not set gets a default
/// (stdout console, no network sink, stderr reporter, system clock, INFO).
pub struct DispatcherBuilder {
    app_name: String,
    host: Option<String>,
    console: Option<ConsoleSink>,
    sink: Option<Arc<dyn LogSink>>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    clock: Option<Arc<dyn Clock>>,
    level: Level,
}

impl DispatcherBuilder {
    pub fn new(app_name: impl Into<String>) -> Self {
        DispatcherBuilder {
            app_name: app_name.into(),
            host: None,
            console: Some(ConsoleSink::stdout()),
            sink: None,
            reporter: None,
            clock: None,
            level: Level::Info,
        }
    }

    /// Override the `host` field instead of using the local hostname.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn console(mut self, console: ConsoleSink) -> Self {
        self.console = Some(console);
        self
    }

    pub fn without_console(mut self) -> Self {
        self.console = None;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn build(self) -> Dispatcher {
        let builder = match self.host {
            Some(host) => RecordBuilder::with_host(self.app_name, host),
            None => RecordBuilder::new(self.app_name),
        };
        Dispatcher {
            builder,
            console: self.console,
            sink: self.sink.unwrap_or_else(|| Arc::new(crate::noop_sink::NoopSink)),
            reporter: self.reporter.unwrap_or_else(|| Arc::new(StderrReporter)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            level: self.level,
        }
    }
}

/// Named logging handle borrowed from a [`Dispatcher`].
///
/// The per-level methods record the caller's file and line as the event
/// origin.
#[derive(Debug, Clone)]
pub struct Logger<'a> {
    dispatcher: &'a Dispatcher,
    name: String,
}

impl<'a> Logger<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>, context: Option<Context>) {
        self.emit(level, message.into(), context, None, Origin::caller());
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.emit(Level::Debug, message.into(), None, None, Origin::caller());
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.emit(Level::Info, message.into(), None, None, Origin::caller());
    }

    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.emit(Level::Warning, message.into(), None, None, Origin::caller());
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.emit(Level::Error, message.into(), None, None, Origin::caller());
    }

    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) {
        self.emit(Level::Critical, message.into(), None, None, Origin::caller());
    }

    /// Log at ERROR with `err` attached as the record's `exception`.
    #[track_caller]
    pub fn exception<E: Error + 'static>(
        &self,
        message: impl Into<String>,
        err: &E,
        context: Option<Context>,
    ) {
        let info = ErrorInfo::from_error(err);
        self.emit(Level::Error, message.into(), context, Some(info), Origin::caller());
    }

    fn emit(
        &self,
        level: Level,
        message: String,
        context: Option<Context>,
        error: Option<ErrorInfo>,
        origin: Origin,
    ) {
        if !self.dispatcher.enabled(level) {
            return;
        }
        let mut event = LogEvent::new(level, self.name.clone(), message)
            .at(self.dispatcher.now())
            .with_origin(origin);
        event.error = error;
        if let Some(context) = context {
            event.context = context;
        }
        self.dispatcher.dispatch(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::record::Record;
    use parking_lot::Mutex;
    use std::io;

    #[derive(Default)]
    struct Recorded {
        records: Mutex<Vec<Record>>,
    }

    impl LogSink for Recorded {
        fn send(&self, record: &Record) -> Result<(), TransportError> {
            self.records.lock().push(record.clone());
            Ok(())
        }
    }

    struct Failing;

    impl LogSink for Failing {
        fn send(&self, _record: &Record) -> Result<(), TransportError> {
            Err(TransportError::Write {
                addr: "test".into(),
                source: io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
            })
        }
    }

    #[derive(Default)]
    struct Reports(Mutex<Vec<String>>);

    impl ErrorReporter for Reports {
        fn report(&self, error: &ShipError) {
            self.0.lock().push(error.to_string());
        }
    }

    #[test]
    fn events_below_threshold_are_dropped() {
        let sink = Arc::new(Recorded::default());
        let dispatcher = Dispatcher::builder("svc")
            .without_console()
            .sink(sink.clone())
            .level(Level::Warning)
            .build();
        let log = dispatcher.logger("svc.worker");

        log.info("ignored");
        log.warning("kept");

        let records = sink.records.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("message").unwrap(), "kept");
    }

    #[test]
    fn logger_records_call_site() {
        let sink = Arc::new(Recorded::default());
        let dispatcher = Dispatcher::builder("svc").without_console().sink(sink.clone()).build();

        dispatcher.logger("svc").info("here");

        let records = sink.records.lock();
        let path = records[0].get("path").unwrap().as_str().unwrap();
        assert!(path.ends_with("dispatch.rs"));
        assert!(records[0].get("lineno").unwrap().as_u64().unwrap() > 0);
    }

    #[test]
    fn transport_failure_is_reported_not_returned() {
        let reports = Arc::new(Reports::default());
        let dispatcher = Dispatcher::builder("svc")
            .without_console()
            .sink(Arc::new(Failing))
            .reporter(reports.clone())
            .build();

        dispatcher.logger("svc").error("lost");

        let reports = reports.0.lock();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("reset"));
    }
}
