use crate::error::ConfigError;
use crate::transport::CollectorAddr;

/// Parse a collector endpoint string into a [`CollectorAddr`].
///
/// Accepted forms:
/// - "tcp://logstash:5000"
/// - "logstash:5000"
/// - "tcp://[::1]:5000"
pub fn parse_endpoint(endpoint: &str) -> Result<CollectorAddr, ConfigError> {
    let invalid = || ConfigError::InvalidEndpoint(endpoint.to_string());

    let trimmed = endpoint.trim();
    let lower = trimmed.to_ascii_lowercase();
    let without_scheme = if lower.starts_with("tcp://") {
        &trimmed["tcp://".len()..]
    } else if lower.contains("://") {
        return Err(invalid());
    } else {
        trimmed
    };
    let authority = without_scheme.trim_end_matches('/');

    let (host, port) = authority.rsplit_once(':').ok_or_else(invalid)?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(ConfigError::EmptyHost);
    }

    Ok(CollectorAddr::new(host, parse_port(port)?))
}

/// Parse a port number, rejecting 0 and anything above 65535.
pub fn parse_port(port: &str) -> Result<u16, ConfigError> {
    match port.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidPort(port.to_string())),
        Ok(p) => Ok(p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_and_bare_forms() {
        assert_eq!(parse_endpoint("tcp://logstash:5000").unwrap(), CollectorAddr::new("logstash", 5000));
        assert_eq!(parse_endpoint("TCP://logstash:5000/").unwrap(), CollectorAddr::new("logstash", 5000));
        assert_eq!(parse_endpoint("10.0.0.7:5044").unwrap(), CollectorAddr::new("10.0.0.7", 5044));
        assert_eq!(parse_endpoint("tcp://[::1]:5000").unwrap(), CollectorAddr::new("::1", 5000));
    }

    #[test]
    fn rejects_other_schemes_and_bad_ports() {
        assert!(matches!(parse_endpoint("udp://logstash:5000"), Err(ConfigError::InvalidEndpoint(_))));
        assert!(matches!(parse_endpoint("logstash"), Err(ConfigError::InvalidEndpoint(_))));
        assert!(matches!(parse_endpoint("tcp://:5000"), Err(ConfigError::EmptyHost)));
        assert!(matches!(parse_endpoint("logstash:0"), Err(ConfigError::InvalidPort(_))));
        assert!(matches!(parse_endpoint("logstash:70000"), Err(ConfigError::InvalidPort(_))));
    }
}
