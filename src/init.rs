use crate::endpoint::{parse_endpoint, parse_port};
use crate::env::*;
use crate::error::ConfigError;
use crate::event::Level;
use crate::transport::{CollectorAddr, DEFAULT_CONNECT_TIMEOUT, DEFAULT_WRITE_TIMEOUT};
use std::time::Duration;

#[cfg(feature = "tracing-layer")]
use crate::{dispatch::Dispatcher, error::InitError, layer::ShippingLayer};
#[cfg(feature = "tracing-layer")]
use std::sync::Arc;
#[cfg(feature = "tracing-layer")]
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, Registry};

/// Shipper configuration.
///
/// **Fields**
/// - `app_name`: written to the `app` field of every record.
/// - `collector_host` / `collector_port`: TCP destination of the records.
/// - `connect_timeout` / `write_timeout`: upper bounds for blocking socket
///   calls made on the logging thread; `None` keeps the OS default.
/// - `level`: events below this level are neither printed nor shipped.
/// - `console`: also print `time - logger - level - message` lines to stdout.
#[derive(Clone, Debug, PartialEq)]
pub struct ShipperConfig {
    pub app_name: String,
    pub collector_host: String,
    pub collector_port: u16,
    pub connect_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub level: Level,
    pub console: bool,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            app_name: "fastapi".to_string(),
            collector_host: "logstash".to_string(),
            collector_port: 5000,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
            level: Level::Info,
            console: true,
        }
    }
}

impl ShipperConfig {
    /// Config for `app_name` shipping to `host:port`, other fields default.
    pub fn new(app_name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            app_name: app_name.into(),
            collector_host: host.into(),
            collector_port: port,
            ..Self::default()
        }
    }

    /// Build a config from `LOG_SHIPPER_*` environment variables, falling
    /// back to [`ShipperConfig::default`] for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let addr = match env_opt(LOG_SHIPPER_ENDPOINT_ENV) {
            Some(endpoint) => parse_endpoint(&endpoint)?,
            None => {
                let host = env_or(LOG_SHIPPER_HOST_ENV, &defaults.collector_host);
                let port = match env_opt(LOG_SHIPPER_PORT_ENV) {
                    Some(port) => parse_port(&port)?,
                    None => defaults.collector_port,
                };
                CollectorAddr::new(host, port)
            }
        };

        let level = match env_opt(LOG_SHIPPER_LEVEL_ENV) {
            Some(level) => level.parse().map_err(|_| ConfigError::InvalidValue {
                key: LOG_SHIPPER_LEVEL_ENV,
                value: level,
            })?,
            None => defaults.level,
        };

        let config = Self {
            app_name: env_or(LOG_SHIPPER_APP_NAME_ENV, &defaults.app_name),
            collector_host: addr.host,
            collector_port: addr.port,
            connect_timeout: timeout_from_env(LOG_SHIPPER_CONNECT_TIMEOUT_MS_ENV, defaults.connect_timeout)?,
            write_timeout: timeout_from_env(LOG_SHIPPER_WRITE_TIMEOUT_MS_ENV, defaults.write_timeout)?,
            level,
            console: defaults.console,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collector_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.collector_port == 0 {
            return Err(ConfigError::InvalidPort(self.collector_port.to_string()));
        }
        for (key, timeout) in [
            ("connect_timeout", self.connect_timeout),
            ("write_timeout", self.write_timeout),
        ] {
            if timeout == Some(Duration::ZERO) {
                return Err(ConfigError::InvalidValue { key, value: "0s".to_string() });
            }
        }
        Ok(())
    }

    pub fn collector_addr(&self) -> CollectorAddr {
        CollectorAddr::new(self.collector_host.clone(), self.collector_port)
    }
}

fn timeout_from_env(key: &'static str, default: Option<Duration>) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = env_opt(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(ms) => Ok(Some(Duration::from_millis(ms))),
        Err(_) => Err(ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(feature = "tracing-layer")]
fn level_filter(level: Level) -> LevelFilter {
    match level {
        Level::Debug => LevelFilter::DEBUG,
        Level::Info => LevelFilter::INFO,
        Level::Warning => LevelFilter::WARN,
        Level::Error | Level::Critical => LevelFilter::ERROR,
    }
}

/// Initialize the global `tracing` subscriber with a [`ShippingLayer`]
/// built from `config`.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with a level filter and the shipping
/// layer as the global default subscriber, so every `tracing` event at or
/// above `config.level` is printed and shipped.
///
/// **Returns**
/// - The dispatcher behind the layer, for direct use or to `close` at
///   shutdown.
/// - `Err(InitError::AlreadyInstalled)` if a global subscriber exists
///   already; the existing sinks are left untouched.
#[cfg(feature = "tracing-layer")]
pub fn init_tracing_with_config(config: &ShipperConfig) -> Result<Arc<Dispatcher>, InitError> {
    config.validate()?;
    let dispatcher = Arc::new(Dispatcher::new(config));
    let subscriber = Registry::default()
        .with(level_filter(config.level))
        .with(ShippingLayer::new(Arc::clone(&dispatcher)));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(dispatcher)
}

/// Initialize tracing from the `LOG_SHIPPER_*` environment.
///
/// Equivalent to [`init_tracing_with_config`] with
/// [`ShipperConfig::from_env`], so deployments can point the shipper at a
/// collector without code changes.
#[cfg(feature = "tracing-layer")]
pub fn init_tracing() -> Result<Arc<Dispatcher>, InitError> {
    init_tracing_with_config(&ShipperConfig::from_env()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 7] = [
        LOG_SHIPPER_APP_NAME_ENV,
        LOG_SHIPPER_HOST_ENV,
        LOG_SHIPPER_PORT_ENV,
        LOG_SHIPPER_ENDPOINT_ENV,
        LOG_SHIPPER_CONNECT_TIMEOUT_MS_ENV,
        LOG_SHIPPER_WRITE_TIMEOUT_MS_ENV,
        LOG_SHIPPER_LEVEL_ENV,
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_when_environment_is_empty() {
        clear_env();
        assert_eq!(ShipperConfig::from_env().unwrap(), ShipperConfig::default());
    }

    #[test]
    #[serial]
    fn endpoint_overrides_host_and_port() {
        clear_env();
        std::env::set_var(LOG_SHIPPER_HOST_ENV, "ignored");
        std::env::set_var(LOG_SHIPPER_ENDPOINT_ENV, "tcp://collector:5044");
        std::env::set_var(LOG_SHIPPER_APP_NAME_ENV, "orders");
        std::env::set_var(LOG_SHIPPER_WRITE_TIMEOUT_MS_ENV, "0");
        std::env::set_var(LOG_SHIPPER_LEVEL_ENV, "warning");

        let config = ShipperConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.app_name, "orders");
        assert_eq!(config.collector_addr(), CollectorAddr::new("collector", 5044));
        assert_eq!(config.write_timeout, None);
        assert_eq!(config.connect_timeout, Some(DEFAULT_CONNECT_TIMEOUT));
        assert_eq!(config.level, Level::Warning);
    }

    #[test]
    #[serial]
    fn rejects_out_of_range_port() {
        clear_env();
        std::env::set_var(LOG_SHIPPER_PORT_ENV, "65536");
        let err = ShipperConfig::from_env().unwrap_err();
        clear_env();
        assert_eq!(err, ConfigError::InvalidPort("65536".to_string()));
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let config = ShipperConfig {
            connect_timeout: Some(Duration::ZERO),
            ..ShipperConfig::new("orders", "127.0.0.1", 5000)
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { key: "connect_timeout", .. })));
    }
}
