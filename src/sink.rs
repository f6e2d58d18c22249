use crate::error::TransportError;
use crate::record::Record;

/// Destination for [`Record`]s produced by the dispatcher.
///
/// Implementations carry a record to a concrete backend (a TCP collector,
/// nothing at all). The dispatcher calls `send` inline on the logging thread
/// and routes any error to the fallback error channel, so implementations
/// must return failures rather than retry or block on them.
pub trait LogSink: Send + Sync {
    /// Send a single record to the underlying backend.
    ///
    /// **Returns**
    /// - `Ok(())` if the whole record was handed to the backend.
    /// - `Err(..)` if the backend failed. The record is lost; the sink is
    ///   expected to recover on the next call.
    fn send(&self, record: &Record) -> Result<(), TransportError>;

    /// Release any held connection. Calling it more than once is a no-op.
    ///
    /// Default implementation does nothing.
    fn close(&self) {}
}
