//! HTTP transport settings.
//!
//! Deserialized from the `[http]` table of the client configuration file.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{GraphError, Result};

/// Settings of the reqwest-backed transport.
///
/// # Examples
///
/// ```toml
/// [http]
/// timeout_secs = 30
/// connect_timeout_secs = 10
/// pool_max_idle_per_host = 10
/// http_version = "auto"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpSettings {
    /// Maximum idle connections per host.
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    /// Whole-request timeout in seconds. Timeouts are retried as transient failures.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// HTTP version preference.
    #[serde(default)]
    pub http_version: HttpVersion,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: default_pool_max_idle(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            http_version: HttpVersion::default(),
        }
    }
}

impl HttpSettings {
    /// Validates settings are within acceptable bounds.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConfigError`] if timeout values are outside valid ranges:
    /// - `timeout_secs`: must be 1-300 seconds
    /// - `connect_timeout_secs`: must be 1-60 seconds
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(GraphError::ConfigError(
                "http.timeout_secs must be between 1 and 300".to_owned(),
            ));
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 60 {
            return Err(GraphError::ConfigError(
                "http.connect_timeout_secs must be between 1 and 60".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns timeout as Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns connect timeout as Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// HTTP version preference.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HttpVersion {
    /// HTTP/1.1 only.
    Http1,
    /// HTTP/2 only (requires prior knowledge).
    Http2,
    /// Auto-negotiate (prefer HTTP/2, fall back to HTTP/1.1).
    #[default]
    Auto,
}

const fn default_pool_max_idle() -> usize {
    10
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_settings_default() {
        let settings = HttpSettings::default();
        assert_eq!(settings.pool_max_idle_per_host, 10);
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.connect_timeout_secs, 10);
        assert_eq!(settings.http_version, HttpVersion::Auto);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_http_settings_durations() {
        let settings = HttpSettings::default();
        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert_eq!(settings.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_http_settings_from_toml() {
        let toml = "
            pool_max_idle_per_host = 20
            timeout_secs = 45
            connect_timeout_secs = 15
            http_version = \"http2\"
        ";

        let settings: HttpSettings = toml::from_str(toml).unwrap();
        assert_eq!(settings.pool_max_idle_per_host, 20);
        assert_eq!(settings.timeout_secs, 45);
        assert_eq!(settings.connect_timeout_secs, 15);
        assert_eq!(settings.http_version, HttpVersion::Http2);
    }

    #[test]
    fn test_http_settings_partial_toml_uses_defaults() {
        let settings: HttpSettings = toml::from_str("timeout_secs = 60").unwrap();
        assert_eq!(settings.timeout_secs, 60);
        assert_eq!(settings.connect_timeout_secs, 10);
        assert_eq!(settings.http_version, HttpVersion::Auto);
    }

    #[test]
    fn test_http_settings_zero_timeout_rejected() {
        let settings = HttpSettings { timeout_secs: 0, ..HttpSettings::default() };
        assert!(matches!(settings.validate(), Err(GraphError::ConfigError(_))));
    }

    #[test]
    fn test_http_settings_connect_timeout_rejected() {
        let settings = HttpSettings { connect_timeout_secs: 61, ..HttpSettings::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_http_settings_invalid_version() {
        let result: std::result::Result<HttpSettings, _> = toml::from_str("http_version = \"h3\"");
        assert!(result.is_err());
    }
}
