//! Ship structured log events as newline-delimited JSON to a TCP collector,
//! with a parallel human-readable console stream.
//!
//! ```no_run
//! use tracing_log_shipper::{Context, Dispatcher, ShipperConfig};
//!
//! let dispatcher = Dispatcher::new(&ShipperConfig::new("orders", "127.0.0.1", 5000));
//! let log = dispatcher.logger("orders.api");
//! log.log(
//!     tracing_log_shipper::Level::Info,
//!     "order placed",
//!     Some(Context::new().with("orderId", 42)),
//! );
//! ```

pub mod console;
pub mod dispatch;
pub mod endpoint;
pub mod env;
pub mod error;
pub mod event;
pub mod init;
pub mod noop_sink;
pub mod record;
pub mod report;
pub mod sink;
pub mod transport;

#[cfg(feature = "tracing-layer")]
pub mod layer;

pub use dispatch::{Dispatcher, DispatcherBuilder, Logger};
pub use error::{ConfigError, InitError, ShipError, TransportError};
pub use event::{Context, ErrorInfo, Level, LogEvent, Origin};
pub use init::ShipperConfig;
pub use record::{Record, RecordBuilder};
pub use sink::LogSink;
pub use transport::{CollectorAddr, Transport};

/// Target of the crate's own `tracing` diagnostics. The shipping layer
/// never forwards events with this target.
pub const DIAGNOSTIC_TARGET: &str = "tracing_log_shipper::diagnostics";
