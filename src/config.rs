use std::{env, net::SocketAddr, time::Duration};

use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_BROWSER_BACKEND_URL: &str = "http://127.0.0.1:9223";
pub const DEFAULT_CLEANUP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub browser_backend_url: Url,
    pub cleanup_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT must be a valid u16")]
    InvalidPort,
    #[error("BROWSER_BACKEND_URL must be an absolute http(s) URL")]
    InvalidBackendUrl,
    #[error("CLEANUP_TIMEOUT_SECS must be a positive integer")]
    InvalidCleanupTimeout,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parses the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = read("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let port = read("PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(DEFAULT_PORT);
        let browser_backend_url = parse_backend_url(
            read("BROWSER_BACKEND_URL")
                .as_deref()
                .unwrap_or(DEFAULT_BROWSER_BACKEND_URL),
        )?;
        let cleanup_timeout = read("CLEANUP_TIMEOUT_SECS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::InvalidCleanupTimeout)
            })
            .transpose()?
            .unwrap_or(DEFAULT_CLEANUP_TIMEOUT_SECS);

        let config = Self {
            bind_addr,
            port,
            browser_backend_url,
            cleanup_timeout: Duration::from_secs(cleanup_timeout),
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

fn parse_backend_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidBackendUrl)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBackendUrl);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = config_from(&[]).expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.browser_backend_url.as_str(), "http://127.0.0.1:9223/");
        assert_eq!(config.cleanup_timeout, Duration::from_secs(10));
    }

    #[test]
    fn port_override_is_honoured() {
        let config = config_from(&[("PORT", " 8931 ")]).expect("config should parse");
        assert_eq!(config.port, 8931);
        assert_eq!(
            config.bind_socket().expect("socket"),
            "127.0.0.1:8931".parse::<SocketAddr>().expect("addr")
        );
    }

    #[test]
    fn blank_port_falls_back_to_default() {
        let config = config_from(&[("PORT", "   ")]).expect("config should parse");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn invalid_port_fails() {
        let err = config_from(&[("PORT", "70000")]).expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn invalid_bind_addr_fails() {
        let err = config_from(&[("BIND_ADDR", "not an address")]).expect_err("expected bad socket");
        assert!(matches!(err, ConfigError::InvalidSocket));
    }

    #[test]
    fn backend_url_must_be_http() {
        let err = config_from(&[("BROWSER_BACKEND_URL", "ftp://worker")])
            .expect_err("expected invalid backend url");
        assert!(matches!(err, ConfigError::InvalidBackendUrl));
    }

    #[test]
    fn zero_cleanup_timeout_fails() {
        let err = config_from(&[("CLEANUP_TIMEOUT_SECS", "0")])
            .expect_err("expected invalid cleanup timeout");
        assert!(matches!(err, ConfigError::InvalidCleanupTimeout));
    }
}
