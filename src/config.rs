//! Configuration management with environment variable support
//!
//! Provides a centralized configuration system for the MCP server

pub mod errors;

pub use errors::{ConfigError, ErrorContextExt, Result};

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which vector store backend the server talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Qdrant over its REST API
    Qdrant,
    /// In-process store, nothing survives a restart
    Memory,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::invalid(
                "VECTOR_BACKEND",
                format!("unknown backend '{}', expected 'qdrant' or 'memory'", other),
            )),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Qdrant server URL
    pub qdrant_url: String,
    /// Optional Qdrant API key, sent as the `api-key` header
    pub qdrant_api_key: Option<String>,
    /// Collection holding every stored record
    pub collection_name: String,
    /// Vector dimensions (768 for all-mpnet-base-v2)
    pub vector_size: usize,
    /// Base URL of the embedding service
    pub embedding_url: String,
    /// Vector store backend
    pub backend: BackendKind,
    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,
    /// Directory for error.log and combined.log
    pub log_dir: PathBuf,
    /// Name reported to MCP clients
    pub server_name: String,
    /// Version reported to MCP clients
    pub server_version: String,
    /// Timeout applied to every outgoing HTTP request
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6333".to_string(),
            qdrant_api_key: None,
            collection_name: "mcp".to_string(),
            vector_size: 768,
            embedding_url: "http://localhost:8000".to_string(),
            backend: BackendKind::Qdrant,
            log_level: "info".to_string(),
            log_dir: default_log_dir(),
            server_name: env!("CARGO_PKG_NAME").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - QDRANT_URL: Qdrant server URL (default: http://localhost:6333)
    /// - QDRANT_API_KEY: Qdrant API key (default: none)
    /// - QDRANT_COLLECTION: Collection name (default: mcp)
    /// - VECTOR_SIZE: Embedding dimensions (default: 768)
    /// - EMBEDDING_URL: Embedding service URL (default: http://localhost:8000)
    /// - VECTOR_BACKEND: `qdrant` or `memory` (default: qdrant)
    /// - LOG_LEVEL: Log level (default: info)
    /// - LOG_DIR: Log directory (default: platform data dir + /logs)
    /// - SERVER_NAME / SERVER_VERSION: Identity reported to clients
    /// - HTTP_TIMEOUT_SECS: Outgoing request timeout (default: 30)
    ///
    /// Unlike unset variables, values that fail to parse are errors.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = non_empty_var("QDRANT_URL") {
            config.qdrant_url = url;
        }

        config.qdrant_api_key = non_empty_var("QDRANT_API_KEY");

        if let Some(collection) = non_empty_var("QDRANT_COLLECTION") {
            config.collection_name = collection;
        }

        if let Some(size) = non_empty_var("VECTOR_SIZE") {
            config.vector_size = parse_var("VECTOR_SIZE", &size)?;
        }

        if let Some(url) = non_empty_var("EMBEDDING_URL") {
            config.embedding_url = url;
        }

        if let Some(backend) = non_empty_var("VECTOR_BACKEND") {
            config.backend = backend.parse()?;
        }

        if let Some(level) = non_empty_var("LOG_LEVEL") {
            config.log_level = level.to_ascii_lowercase();
        }

        if let Some(dir) = non_empty_var("LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        if let Some(name) = non_empty_var("SERVER_NAME") {
            config.server_name = name;
        }

        if let Some(version) = non_empty_var("SERVER_VERSION") {
            config.server_version = version;
        }

        if let Some(secs) = non_empty_var("HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(parse_var("HTTP_TIMEOUT_SECS", &secs)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that a single parse can't catch
    pub fn validate(&self) -> Result<()> {
        validate_http_url("QDRANT_URL", &self.qdrant_url)?;
        validate_http_url("EMBEDDING_URL", &self.embedding_url)?;

        if self.collection_name.trim().is_empty() {
            return Err(ConfigError::invalid("QDRANT_COLLECTION", "must not be empty"));
        }

        if self.vector_size == 0 {
            return Err(ConfigError::invalid("VECTOR_SIZE", "must be greater than zero"));
        }

        if !matches!(
            self.log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::invalid(
                "LOG_LEVEL",
                format!(
                    "invalid level '{}', use trace, debug, info, warn, or error",
                    self.log_level
                ),
            ));
        }

        if self.http_timeout.is_zero() {
            return Err(ConfigError::invalid("HTTP_TIMEOUT_SECS", "must be greater than zero"));
        }

        Ok(())
    }

    /// Log configuration summary (API key is never printed)
    pub fn log_summary(&self) {
        tracing::info!(
            qdrant_url = %self.qdrant_url,
            collection = %self.collection_name,
            vector_size = self.vector_size,
            embedding_url = %self.embedding_url,
            backend = ?self.backend,
            api_key_set = self.qdrant_api_key.is_some(),
            "Configuration loaded"
        );
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &'static str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(key, format!("'{}' is not valid: {}", raw, e)))
}

fn validate_http_url(key: &'static str, raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ConfigError::invalid(key, format!("'{}' is not a URL: {}", raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::invalid(
            key,
            format!("unsupported scheme '{}', expected http or https", scheme),
        )),
    }
}

/// Get the default log directory
fn default_log_dir() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("dev", "code-snippet-mcp", "server") {
        dirs.data_dir().join("logs")
    } else {
        // Fallback to current directory
        PathBuf::from("./logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "QDRANT_URL",
        "QDRANT_API_KEY",
        "QDRANT_COLLECTION",
        "VECTOR_SIZE",
        "EMBEDDING_URL",
        "VECTOR_BACKEND",
        "LOG_LEVEL",
        "LOG_DIR",
        "SERVER_NAME",
        "SERVER_VERSION",
        "HTTP_TIMEOUT_SECS",
    ];

    // Environment is process-global; serialize the tests that touch it.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn clear_env() {
        for var in VARS {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.qdrant_url, "http://localhost:6333");
        assert_eq!(config.collection_name, "mcp");
        assert_eq!(config.vector_size, 768);
        assert_eq!(config.backend, BackendKind::Qdrant);
        assert!(config.qdrant_api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("QDRANT_URL", "http://qdrant.test:6333");
            env::set_var("QDRANT_API_KEY", "secret");
            env::set_var("QDRANT_COLLECTION", "snippets");
            env::set_var("VECTOR_SIZE", "384");
            env::set_var("VECTOR_BACKEND", "memory");
            env::set_var("LOG_LEVEL", "DEBUG");
            env::set_var("HTTP_TIMEOUT_SECS", "5");
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.qdrant_url, "http://qdrant.test:6333");
        assert_eq!(config.qdrant_api_key.as_deref(), Some("secret"));
        assert_eq!(config.collection_name, "snippets");
        assert_eq!(config.vector_size, 384);
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.http_timeout, Duration::from_secs(5));

        clear_env();
    }

    #[test]
    fn test_unparseable_vector_size_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe { env::set_var("VECTOR_SIZE", "lots") };

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("VECTOR_SIZE"));

        clear_env();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            vector_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            qdrant_url: "ftp://example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            collection_name: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("Qdrant".parse::<BackendKind>().unwrap(), BackendKind::Qdrant);
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("sqlite".parse::<BackendKind>().is_err());
    }
}
