//! Configuration management.
//!
//! All configuration is driven by environment variables.

use std::str::FromStr;

use crate::error::{ReqkitError, ReqkitResult};

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address.
    pub gateway_listen: String,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Keep JSON bodies readable after ingestion.
    pub replay_body: bool,
    /// Multipart file parts above this many bytes are spilled to disk.
    pub max_memory_size: usize,
    /// Request bodies above this many bytes are rejected.
    pub max_body_size: usize,
    /// Where the demo handler stores uploads.
    pub upload_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:9999".to_owned(),
            log_level: "info".to_owned(),
            replay_body: false,
            max_memory_size: 32 * 1024,
            max_body_size: 32 * 1024 * 1024,
            upload_dir: "./uploads".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// [`ReqkitError::Config`] when a size variable is not a number.
    pub fn from_env() -> ReqkitResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ReqkitResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("REPLAY_BODY") {
            config.replay_body = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("MAX_MEMORY_SIZE") {
            config.max_memory_size = parse_var("MAX_MEMORY_SIZE", &v)?;
        }
        if let Some(v) = lookup("MAX_BODY_SIZE") {
            config.max_body_size = parse_var("MAX_BODY_SIZE", &v)?;
        }
        if let Some(v) = lookup("UPLOAD_DIR") {
            config.upload_dir = v;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> ReqkitResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ReqkitError::Config(format!("{key} must be a number, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> ReqkitResult<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_should_create_default_config() {
        let config = load(&[]).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.gateway_listen, "0.0.0.0:9999");
        assert_eq!(config.max_memory_size, 32_768);
        assert!(!config.replay_body);
    }

    #[test]
    fn test_should_override_from_variables() {
        let config = load(&[
            ("GATEWAY_LISTEN", "127.0.0.1:8080"),
            ("REPLAY_BODY", "TRUE"),
            ("MAX_BODY_SIZE", " 1024 "),
            ("UPLOAD_DIR", "/tmp/up"),
        ])
        .unwrap();
        assert_eq!(config.gateway_listen, "127.0.0.1:8080");
        assert!(config.replay_body);
        assert_eq!(config.max_body_size, 1024);
        assert_eq!(config.upload_dir, "/tmp/up");
    }

    #[test]
    fn test_should_reject_non_numeric_sizes() {
        let err = load(&[("MAX_MEMORY_SIZE", "lots")]).unwrap_err();
        assert!(matches!(err, ReqkitError::Config(_)));
        assert!(err.to_string().contains("MAX_MEMORY_SIZE"));
    }
}
