//! # Configuration
//!
//! Session and transport settings, loaded once at startup from TOML.
//!
//! ```toml
//! [session]
//! max_message_size = 524287
//! writer_pool_size = 8
//! initial_writer_capacity = 256
//!
//! [transport]
//! bind = "0.0.0.0:13209"
//! channel_capacity = 1024
//! accept_poll_ms = 10
//! read_chunk_size = 4096
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_BIND, MESSAGE_TYPE_SIZE, NETBUFFER_MAXSIZE};

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has wrong value types.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Message session settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Network buffer capacity in bytes, type tag included.
    pub max_message_size: usize,
    /// Number of idle writer buffers kept for reuse.
    pub writer_pool_size: usize,
    /// Initial capacity of a freshly allocated writer.
    pub initial_writer_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_message_size: NETBUFFER_MAXSIZE,
            writer_pool_size: 8,
            initial_writer_capacity: 256,
        }
    }
}

/// Transport settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Listen address.
    pub bind: String,
    /// Capacity of the per-link send and receive queues.
    pub channel_capacity: usize,
    /// Poll interval of the accept thread in milliseconds.
    pub accept_poll_ms: u64,
    /// Size of one socket read.
    pub read_chunk_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            channel_capacity: 1024,
            accept_poll_ms: 10,
            read_chunk_size: 4096,
        }
    }
}

impl TransportConfig {
    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `bind` is not a socket address.
    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bind address {:?}", self.bind)))
    }
}

/// Complete configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Session settings.
    pub session: SessionConfig,
    /// Transport settings.
    pub transport: TransportConfig,
}

impl NetConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> ConfigResult<()> {
        let session = &self.session;
        if session.max_message_size <= MESSAGE_TYPE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "session.max_message_size must exceed {MESSAGE_TYPE_SIZE}, got {}",
                session.max_message_size
            )));
        }
        if u32::try_from(session.max_message_size).is_err() {
            return Err(ConfigError::Invalid(format!(
                "session.max_message_size {} does not fit a frame length",
                session.max_message_size
            )));
        }
        let transport = &self.transport;
        if transport.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "transport.channel_capacity must be positive".to_owned(),
            ));
        }
        if transport.read_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "transport.read_chunk_size must be positive".to_owned(),
            ));
        }
        if transport.accept_poll_ms == 0 {
            return Err(ConfigError::Invalid(
                "transport.accept_poll_ms must be positive".to_owned(),
            ));
        }
        transport.bind_addr()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = NetConfig::from_toml_str("").unwrap();
        assert_eq!(config, NetConfig::default());
        assert_eq!(config.session.max_message_size, NETBUFFER_MAXSIZE);
    }

    #[test]
    fn test_partial_override() {
        let config = NetConfig::from_toml_str(
            "[session]\nmax_message_size = 1400\n[transport]\nbind = \"127.0.0.1:0\"\n",
        )
        .unwrap();
        assert_eq!(config.session.max_message_size, 1400);
        assert_eq!(config.session.writer_pool_size, 8);
        assert_eq!(config.transport.bind_addr().unwrap().ip().to_string(), "127.0.0.1");
    }

    #[test]
    fn test_rejects_tiny_message_size() {
        let err = NetConfig::from_toml_str("[session]\nmax_message_size = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_bind() {
        let err = NetConfig::from_toml_str("[transport]\nbind = \"nowhere\"\n").unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_rejects_wrong_type() {
        let err = NetConfig::from_toml_str("[session]\nwriter_pool_size = \"many\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = NetConfig::load("/nonexistent/netmsg.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
