use crate::error::ShipError;
use std::error::Error;
use std::io::{self, Write};

/// Fallback error channel.
///
/// Receives failures that happen while handling a log event. Nothing here
/// is ever returned to the code that emitted the event.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &ShipError);
}

/// Writes a short diagnostic, including the error's source chain, to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrReporter;

impl ErrorReporter for StderrReporter {
    fn report(&self, error: &ShipError) {
        let mut stderr = io::stderr().lock();
        // Nowhere left to report a failing stderr.
        let _ = write_diagnostic(&mut stderr, error);
    }
}

fn write_diagnostic(out: &mut impl Write, error: &ShipError) -> io::Result<()> {
    writeln!(out, "--- Logging error ---")?;
    writeln!(out, "{error}")?;
    let mut source = error.source();
    while let Some(cause) = source {
        writeln!(out, "  caused by: {cause}")?;
        source = cause.source();
    }
    out.flush()
}
