use crate::error::TransportError;
use crate::record::Record;
use crate::sink::LogSink;

/// A sink that simply drops all records.
///
/// Used when only the console stream is wanted, and by tests that don't
/// care about the network side.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn send(&self, _record: &Record) -> Result<(), TransportError> {
        Ok(())
    }
}
