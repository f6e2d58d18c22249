//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use tracing_log_shipper::error::ShipError;
use tracing_log_shipper::report::ErrorReporter;
use tracing_log_shipper::transport::{CollectorStream, Connector};

/// Thread-safe byte buffer usable as a console writer.
#[derive(Clone, Default)]
pub struct SharedBuf {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    pub fn text(&self) -> String {
        String::from_utf8(self.buffer.lock().expect("SharedBuf mutex poisoned").clone())
            .expect("buffer contains invalid UTF-8")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().expect("SharedBuf mutex poisoned").write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Observable state shared between a [`MockConnector`] and its streams.
#[derive(Default)]
pub struct MockState {
    pub connects: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub refuse_connect: AtomicBool,
    /// Set to make every write on the current stream fail, as if the peer
    /// had reset the connection.
    pub broken: AtomicBool,
    pub lines: Mutex<Vec<String>>,
}

impl MockState {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("lines mutex poisoned").clone()
    }
}

/// In-memory connector recording every opened stream.
#[derive(Clone, Default)]
pub struct MockConnector {
    pub state: Arc<MockState>,
}

impl Connector for MockConnector {
    type Stream = MockStream;

    fn connect(&self) -> io::Result<MockStream> {
        if self.state.refuse_connect.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        // A fresh connection is healthy until told otherwise.
        self.state.broken.store(false, Ordering::SeqCst);
        Ok(MockStream { state: Arc::clone(&self.state), pending: Vec::new() })
    }

    fn destination(&self) -> String {
        "mock:5000".to_string()
    }
}

pub struct MockStream {
    state: Arc<MockState>,
    pending: Vec<u8>,
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.state.broken.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            self.state.lines.lock().expect("lines mutex poisoned").push(text);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CollectorStream for MockStream {
    fn shutdown(&mut self) -> io::Result<()> {
        self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fallback channel that keeps every report.
#[derive(Default)]
pub struct CountingReporter {
    reports: Mutex<Vec<String>>,
}

impl CountingReporter {
    pub fn count(&self) -> usize {
        self.reports.lock().expect("reports mutex poisoned").len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.reports.lock().expect("reports mutex poisoned").clone()
    }
}

impl ErrorReporter for CountingReporter {
    fn report(&self, error: &ShipError) {
        self.reports.lock().expect("reports mutex poisoned").push(error.to_string());
    }
}

/// Collector on an ephemeral local port. Every received line, across all
/// accepted connections, is forwarded on the returned channel.
pub fn spawn_collector() -> (SocketAddr, mpsc::Receiver<String>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("listener has address");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let tx = tx.clone();
            thread::spawn(move || {
                for line in BufReader::new(stream).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        }
    });
    (addr, rx)
}
