//! Server configuration loaded from TOML.
//!
//! ```toml
//! bind_addr = "0.0.0.0:7777"
//!
//! [session]
//! idle_timeout_secs = 60
//! write_timeout_ms = 5000
//!
//! [frame]
//! max_frame_len = 32767
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use wyrmgate_crypto::TAG_LEN;
use wyrmgate_protocol::FrameConfig;
use wyrmgate_session::SessionConfig;

/// Errors raised while loading a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub bind_addr: String,
    pub session: SessionConfig,
    pub frame: FrameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:7777".to_string(),
            session: SessionConfig::default(),
            frame: FrameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if (self.frame.max_frame_len as usize) <= TAG_LEN {
            return Err(ConfigError::Invalid(format!(
                "frame.max_frame_len must exceed the {TAG_LEN}-byte authentication tag"
            )));
        }
        if self.session.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "session.write_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_str_empty_uses_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_from_toml_str_overrides_nested_tables() {
        let config = ServerConfig::from_toml_str(
            r#"
            bind_addr = "127.0.0.1:9000"

            [session]
            idle_timeout_secs = 15

            [frame]
            max_frame_len = 4096
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.session.idle_timeout_secs, 15);
        assert_eq!(config.session.write_timeout_ms, 5000);
        assert_eq!(config.frame.max_frame_len, 4096);
    }

    #[test]
    fn test_from_toml_str_malformed_returns_parse_error() {
        let result = ServerConfig::from_toml_str("bind_addr = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_toml_str_tiny_frame_limit_is_invalid() {
        let result = ServerConfig::from_toml_str("[frame]\nmax_frame_len = 8\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_missing_file_returns_read_error() {
        let result = ServerConfig::load("/nonexistent/wyrmgate.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
