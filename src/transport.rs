//! TCP transport for newline-delimited JSON records.
//!
//! A [`Transport`] owns at most one connection to the collector. The
//! connection is opened lazily by the first `send`, discarded on any connect
//! or write error, and opened again by the next `send`. There is no retry
//! inside a single call and no buffering of records that failed.

use crate::error::TransportError;
use crate::record::Record;
use crate::sink::LogSink;
use crate::DIAGNOSTIC_TARGET;
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Default timeout for establishing the collector connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for a single socket write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Collector destination, fixed for the lifetime of a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectorAddr {
    pub host: String,
    pub port: u16,
}

impl CollectorAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        CollectorAddr { host: host.into(), port }
    }

    fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map(|iter| iter.collect())
    }
}

impl fmt::Display for CollectorAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Byte stream to the collector.
pub trait CollectorStream: Write + Send {
    /// Close both directions of the stream.
    fn shutdown(&mut self) -> io::Result<()>;
}

impl CollectorStream for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Opens new [`CollectorStream`]s. Each call is one connection attempt.
pub trait Connector: Send + Sync {
    type Stream: CollectorStream;

    fn connect(&self) -> io::Result<Self::Stream>;

    /// Destination shown in error messages.
    fn destination(&self) -> String;
}

/// Plain TCP connector with optional connect and write timeouts.
///
/// A `None` timeout leaves the OS default in place, which can block the
/// logging thread for minutes while the collector is unreachable.
#[derive(Clone, Debug)]
pub struct TcpConnector {
    pub addr: CollectorAddr,
    pub connect_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(addr: CollectorAddr) -> Self {
        TcpConnector {
            addr,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
        }
    }

    pub fn with_timeouts(mut self, connect: Option<Duration>, write: Option<Duration>) -> Self {
        self.connect_timeout = connect;
        self.write_timeout = write;
        self
    }

    fn connect_one(&self, addr: &SocketAddr) -> io::Result<TcpStream> {
        match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in self.addr.socket_addrs()? {
            match self.connect_one(&addr) {
                Ok(stream) => {
                    stream.set_write_timeout(self.write_timeout)?;
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} did not resolve to any address", self.addr),
            )
        }))
    }

    fn destination(&self) -> String {
        self.addr.to_string()
    }
}

/// Counters describing the life of a [`Transport`].
#[derive(Debug, Default)]
pub struct TransportStats {
    connects: AtomicU64,
    sent: AtomicU64,
    failures: AtomicU64,
}

impl TransportStats {
    /// Connections successfully opened.
    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    /// Records fully written.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Sends that failed to connect or write.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Shipping client owning a single lazily-opened collector connection.
///
/// `send` holds an internal lock for the whole connect-and-write sequence,
/// so a transport can be shared between threads and lines never interleave.
pub struct Transport<C: Connector = TcpConnector> {
    connector: C,
    conn: Mutex<Option<C::Stream>>,
    stats: TransportStats,
}

impl Transport<TcpConnector> {
    /// TCP transport to `addr` with the default timeouts.
    pub fn tcp(addr: CollectorAddr) -> Self {
        Self::with_connector(TcpConnector::new(addr))
    }
}

impl<C: Connector> Transport<C> {
    pub fn with_connector(connector: C) -> Self {
        Transport {
            connector,
            conn: Mutex::new(None),
            stats: TransportStats::default(),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    pub fn is_connected(&self) -> bool {
        self.conn.lock().is_some()
    }

    /// Open a fresh connection, replacing the current one if any.
    pub fn connect(&self) -> Result<(), TransportError> {
        let mut slot = self.conn.lock();
        if let Some(old) = slot.take() {
            self.shutdown(old);
        }
        *slot = Some(self.open()?);
        Ok(())
    }

    /// Write one record as a JSON line, connecting first when needed.
    ///
    /// On failure the connection is dropped and the error returned; the
    /// record is not retried.
    pub fn send(&self, record: &Record) -> Result<(), TransportError> {
        let line = record.to_line();
        let mut slot = self.conn.lock();

        let mut stream = match slot.take() {
            Some(stream) => stream,
            None => self.open()?,
        };

        match write_line(&mut stream, &line) {
            Ok(()) => {
                *slot = Some(stream);
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(source) => {
                self.shutdown(stream);
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                Err(TransportError::Write { addr: self.connector.destination(), source })
            }
        }
    }

    /// Close the live connection, if any. Safe to call repeatedly.
    pub fn close(&self) {
        if let Some(stream) = self.conn.lock().take() {
            self.shutdown(stream);
        }
    }

    fn open(&self) -> Result<C::Stream, TransportError> {
        match self.connector.connect() {
            Ok(stream) => {
                self.stats.connects.fetch_add(1, Ordering::Relaxed);
                debug!(
                    target: DIAGNOSTIC_TARGET,
                    collector = %self.connector.destination(),
                    "connected to log collector"
                );
                Ok(stream)
            }
            Err(source) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                Err(TransportError::Connect { addr: self.connector.destination(), source })
            }
        }
    }

    fn shutdown(&self, mut stream: C::Stream) {
        // The peer may already be gone; closing is best effort.
        let _ = stream.shutdown();
        debug!(
            target: DIAGNOSTIC_TARGET,
            collector = %self.connector.destination(),
            "closed log collector connection"
        );
    }
}

fn write_line<W: Write + ?Sized>(stream: &mut W, line: &[u8]) -> io::Result<()> {
    // write_all loops over short writes and retries on EINTR.
    stream.write_all(line)?;
    stream.flush()
}

impl<C: Connector> LogSink for Transport<C> {
    fn send(&self, record: &Record) -> Result<(), TransportError> {
        Transport::send(self, record)
    }

    fn close(&self) {
        Transport::close(self)
    }
}

impl<C: Connector> fmt::Debug for Transport<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("destination", &self.connector.destination())
            .field("connected", &self.is_connected())
            .field("stats", &self.stats)
            .finish()
    }
}
