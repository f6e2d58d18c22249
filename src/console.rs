use crate::event::LogEvent;
use parking_lot::Mutex;
use std::io::{self, Write};

/// Timestamp layout of console lines, e.g. `2024-05-17 08:30:00,123`.
pub const CONSOLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Human-readable sink writing `time - logger - level - message` lines.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Console sink on the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn new(out: impl Write + Send + 'static) -> Self {
        ConsoleSink { out: Mutex::new(Box::new(out)) }
    }

    pub fn format(event: &LogEvent) -> String {
        format!(
            "{} - {} - {} - {}",
            event.timestamp.format(CONSOLE_TIME_FORMAT),
            event.logger_name,
            event.level,
            event.message
        )
    }

    pub fn emit(&self, event: &LogEvent) -> io::Result<()> {
        let line = Self::format(event);
        let mut out = self.out.lock();
        writeln!(out, "{line}")?;
        out.flush()
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}
