//! Configuration management for the relay chat server
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `RELAY_CHAT_*` environment variables (e.g. `RELAY_CHAT_PORT=5000`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::ChatServerError;

/// Port the server listens on and the client connects to by default.
pub const DEFAULT_PORT: u16 = 4396;

/// Complete server configuration. Loaded once at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind the listener to
    pub bind_address: String,

    /// TCP port for client connections
    pub port: u16,

    /// Maximum number of users registered at the same time
    pub max_clients: usize,

    /// Maximum username length, in characters
    pub max_username_length: usize,

    /// Maximum length of one chat line, in bytes
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_clients: 64,
            max_username_length: 32,
            max_line_length: 4096,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `path` (extension optional, file optional) with
    /// environment overrides on top.
    pub fn load(path: &str) -> Result<Self, ChatServerError> {
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("max_clients", defaults.max_clients as i64)?
            .set_default("max_username_length", defaults.max_username_length as i64)?
            .set_default("max_line_length", defaults.max_line_length as i64)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("RELAY_CHAT").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Bind address and port as a socket address string.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Message("bind_address cannot be empty".into()));
        }

        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        if self.max_clients == 0 {
            return Err(ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.max_username_length == 0 {
            return Err(ConfigError::Message(
                "max_username_length must be greater than 0".into(),
            ));
        }

        if self.max_line_length == 0 {
            return Err(ConfigError::Message(
                "max_line_length must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 4396);
        assert_eq!(config.listen_address(), "0.0.0.0:4396");
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            max_clients: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            max_username_length: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            max_line_length: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_bind_address() {
        let config = ServerConfig {
            bind_address: "  ".into(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = ServerConfig::load("relay-chat-test-missing-config").unwrap();
        assert_eq!(config.max_username_length, 32);
        assert_eq!(config.max_line_length, 4096);
    }
}
