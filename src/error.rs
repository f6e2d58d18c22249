use std::io;

/// Failure while shipping a record to the collector.
///
/// Both variants are recoverable: the broken connection has already been
/// discarded and the next send connects again.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("failed to connect to collector {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write record to collector {addr}: {source}")]
    Write {
        addr: String,
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    pub fn io_error(&self) -> &io::Error {
        match self {
            TransportError::Connect { source, .. } | TransportError::Write { source, .. } => source,
        }
    }
}

/// Failure reported on the fallback error channel.
#[derive(thiserror::Error, Debug)]
pub enum ShipError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("console sink write failed: {0}")]
    Console(#[source] io::Error),
}

/// Error returned when a configuration value is invalid.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("collector port must be in 1..=65535, got {0}")]
    InvalidPort(String),

    #[error("collector host must not be empty")]
    EmptyHost,

    #[error("invalid collector endpoint `{0}`, expected tcp://host:port")]
    InvalidEndpoint(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Error returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[cfg(feature = "tracing-layer")]
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}
