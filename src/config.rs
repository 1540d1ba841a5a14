//! TOML-backed client configuration.
//!
//! Credentials are never written into config files; the file names the
//! environment variables that hold them and they are resolved at the moment
//! the connection target is built.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::runtime::ConnectionTarget;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid broker url: {0}")]
    InvalidBrokerUrl(String),

    #[error("unsupported broker scheme '{0}' (expected mqtt or mqtts)")]
    UnsupportedScheme(String),
}

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourierConfig {
    pub broker: BrokerSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub session: SessionSection,
}

/// Broker endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokerSection {
    /// Broker URL with scheme and optional port, e.g. `mqtt://broker:1883`
    /// or `mqtts://broker` (defaults to 8883).
    pub url: String,
}

/// Authentication via environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthSection {
    /// Environment variable containing the username.
    pub username_env: Option<String>,
    /// Environment variable containing the password.
    pub password_env: Option<String>,
}

/// Session parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSection {
    /// Client identifier; a unique one is generated when absent.
    pub client_id: Option<String>,
    /// Keep-alive interval in seconds; 0 disables the idle ping.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u16,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            client_id: None,
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

fn default_keep_alive_secs() -> u16 {
    60
}

impl CourierConfig {
    /// Load and parse a TOML config file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Resolve the configuration into a connection target: parse the broker
    /// URL, pick the scheme-appropriate default port, and read credentials
    /// from the configured environment variables.
    pub fn target(&self) -> Result<ConnectionTarget, ConfigError> {
        let url = Url::parse(&self.broker.url)
            .map_err(|_| ConfigError::InvalidBrokerUrl(self.broker.url.clone()))?;

        let use_tls = match url.scheme() {
            "mqtt" => false,
            "mqtts" => true,
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::InvalidBrokerUrl(self.broker.url.clone()))?
            .to_string();
        let port = url.port().unwrap_or(if use_tls { 8883 } else { 1883 });

        let username = self
            .auth
            .username_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .unwrap_or_default();
        let password = self
            .auth
            .password_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .unwrap_or_default();

        Ok(ConnectionTarget {
            host,
            port,
            use_tls,
            client_id: self.session.client_id.clone().unwrap_or_default(),
            username,
            password,
            keep_alive_secs: self.session.keep_alive_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config = CourierConfig::from_toml_str(
            r#"
            [broker]
            url = "mqtt://broker.example"
            "#,
        )
        .unwrap();

        let target = config.target().unwrap();
        assert_eq!(target.host, "broker.example");
        assert_eq!(target.port, 1883);
        assert!(!target.use_tls);
        assert_eq!(target.keep_alive_secs, 60);
        assert!(target.client_id.is_empty());
    }

    #[test]
    fn mqtts_scheme_selects_tls_and_port() {
        let config = CourierConfig::from_toml_str(
            r#"
            [broker]
            url = "mqtts://secure.example"
            "#,
        )
        .unwrap();

        let target = config.target().unwrap();
        assert_eq!(target.port, 8883);
        assert!(target.use_tls);
    }

    #[test]
    fn explicit_port_overrides_default() {
        let config = CourierConfig::from_toml_str(
            r#"
            [broker]
            url = "mqtt://broker.example:2883"
            "#,
        )
        .unwrap();
        assert_eq!(config.target().unwrap().port, 2883);
    }

    #[test]
    fn rejects_unknown_scheme() {
        let config = CourierConfig::from_toml_str(
            r#"
            [broker]
            url = "http://broker.example"
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.target(),
            Err(ConfigError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn rejects_unparsable_url() {
        let config = CourierConfig::from_toml_str(
            r#"
            [broker]
            url = "not a url"
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.target(),
            Err(ConfigError::InvalidBrokerUrl(_))
        ));
    }

    #[test]
    fn resolves_credentials_from_environment() {
        std::env::set_var("COURIER_TEST_USERNAME", "alice");
        std::env::set_var("COURIER_TEST_PASSWORD", "s3cret");

        let config = CourierConfig::from_toml_str(
            r#"
            [broker]
            url = "mqtt://broker.example"

            [auth]
            username_env = "COURIER_TEST_USERNAME"
            password_env = "COURIER_TEST_PASSWORD"
            "#,
        )
        .unwrap();

        let target = config.target().unwrap();
        assert_eq!(target.username, "alice");
        assert_eq!(target.password, "s3cret");
    }

    #[test]
    fn missing_credential_env_resolves_empty() {
        let config = CourierConfig::from_toml_str(
            r#"
            [broker]
            url = "mqtt://broker.example"

            [auth]
            username_env = "COURIER_TEST_DOES_NOT_EXIST"
            "#,
        )
        .unwrap();
        assert!(config.target().unwrap().username.is_empty());
    }

    #[test]
    fn session_section_roundtrips() {
        let config = CourierConfig::from_toml_str(
            r#"
            [broker]
            url = "mqtt://broker.example"

            [session]
            client_id = "sensor-42"
            keep_alive_secs = 30
            "#,
        )
        .unwrap();

        let target = config.target().unwrap();
        assert_eq!(target.client_id, "sensor-42");
        assert_eq!(target.keep_alive_secs, 30);
    }
}
