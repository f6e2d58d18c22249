//! Environment variable names used by this crate for convenient
//! configuration of the shipper from microservices.
//!
//! These are purely helpers; the dispatcher and transport types remain
//! decoupled from environment access.

/// Service name written to the `app` field of every record.
pub const LOG_SHIPPER_APP_NAME_ENV: &str = "LOG_SHIPPER_APP_NAME";

/// Collector host name or IP address.
pub const LOG_SHIPPER_HOST_ENV: &str = "LOG_SHIPPER_HOST";

/// Collector TCP port.
pub const LOG_SHIPPER_PORT_ENV: &str = "LOG_SHIPPER_PORT";

/// Collector endpoint as `tcp://host:port`; takes precedence over host/port.
pub const LOG_SHIPPER_ENDPOINT_ENV: &str = "LOG_SHIPPER_ENDPOINT";

/// Connect timeout in milliseconds, `0` for the OS default.
pub const LOG_SHIPPER_CONNECT_TIMEOUT_MS_ENV: &str = "LOG_SHIPPER_CONNECT_TIMEOUT_MS";

/// Write timeout in milliseconds, `0` for the OS default.
pub const LOG_SHIPPER_WRITE_TIMEOUT_MS_ENV: &str = "LOG_SHIPPER_WRITE_TIMEOUT_MS";

/// Minimum level shipped, e.g. `INFO`.
pub const LOG_SHIPPER_LEVEL_ENV: &str = "LOG_SHIPPER_LEVEL";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating an empty value as unset.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
