//! Configuration structures for wordfleet.
//!
//! - [`ScanConfig`] - Scanning agent settings (root, server, parallelism, cache)
//! - [`ServiceConfig`] - Counting service settings (bind address, workers)
//! - [`Config`] - Root configuration combining both
//!
//! All types implement [`Default`] and deserialize with `#[serde(default)]`,
//! so a configuration file only needs the fields it overrides.

use std::net::{Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// TCP port the counting service listens on by default.
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of entries kept by the scanning agent's result cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Worker count used when the available parallelism cannot be determined.
const FALLBACK_PARALLELISM: usize = 2;

/// Returns the number of hardware threads, or 2 if it cannot be determined.
#[must_use]
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(FALLBACK_PARALLELISM, NonZeroUsize::get)
}

/// Configuration for the scanning agent.
///
/// # Examples
///
/// ```
/// use wf_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.root.as_str(), "./directory_big");
/// assert_eq!(config.server_addr.port(), 8080);
/// assert_eq!(config.cache_capacity, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory the scan starts from.
    pub root: Utf8PathBuf,

    /// Address of the counting service.
    pub server_addr: SocketAddr,

    /// Number of scan workers.
    /// `None` means use all available CPU cores.
    pub workers: Option<usize>,

    /// Maximum number of per-file results kept by the result cache.
    pub cache_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("./directory_big"),
            server_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            workers: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ScanConfig {
    /// Returns the configured worker count, or the available parallelism.
    #[must_use]
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_parallelism)
    }
}

/// Configuration for the counting service.
///
/// # Examples
///
/// ```
/// use wf_core::ServiceConfig;
///
/// let config = ServiceConfig::default();
/// assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
/// assert_eq!(config.mapper_workers, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the listener binds to.
    pub bind_addr: SocketAddr,

    /// Number of mapper workers, each handling one batch at a time.
    pub mapper_workers: usize,

    /// Threads shared by all mappers for counting files within a batch.
    /// `None` means use all available CPU cores.
    pub inner_parallelism: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            mapper_workers: 4,
            inner_parallelism: None,
        }
    }
}

impl ServiceConfig {
    /// Returns the configured inner parallelism, or the available parallelism.
    #[must_use]
    pub fn resolved_inner_parallelism(&self) -> usize {
        self.inner_parallelism.unwrap_or_else(default_parallelism)
    }
}

/// Root configuration for wordfleet.
///
/// # Examples
///
/// ```
/// use wf_core::Config;
///
/// let config = Config::from_json_str(r#"{"service": {"mapper_workers": 8}}"#).unwrap();
/// assert_eq!(config.service.mapper_workers, 8);
/// assert_eq!(config.scan.cache_capacity, 10_000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanning agent configuration.
    pub scan: ScanConfig,

    /// Counting service configuration.
    pub service: ServiceConfig,
}

impl Config {
    /// Parses and validates a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::InvalidOption`] if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise
    /// the errors of [`from_json_str`](Self::from_json_str).
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Checks that every count-like option is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the first bad option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.workers == Some(0) {
            return Err(ConfigError::invalid_option("scan.workers", "must be at least 1"));
        }
        if self.scan.cache_capacity == 0 {
            return Err(ConfigError::invalid_option(
                "scan.cache_capacity",
                "must be at least 1",
            ));
        }
        if self.service.mapper_workers == 0 {
            return Err(ConfigError::invalid_option(
                "service.mapper_workers",
                "must be at least 1",
            ));
        }
        if self.service.inner_parallelism == Some(0) {
            return Err(ConfigError::invalid_option(
                "service.inner_parallelism",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_config_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.root.as_str(), "./directory_big");
        assert_eq!(config.server_addr.to_string(), "127.0.0.1:8080");
        assert!(config.workers.is_none());
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.mapper_workers, 4);
        assert!(config.inner_parallelism.is_none());
    }

    #[test]
    fn test_resolved_workers() {
        let mut config = ScanConfig::default();
        assert!(config.resolved_workers() >= 1);
        config.workers = Some(3);
        assert_eq!(config.resolved_workers(), 3);
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = Config::from_json_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"scan": {"root": "/data", "server_addr": "10.0.0.5:9000"}}"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.scan.root.as_str(), "/data");
        assert_eq!(config.scan.server_addr.port(), 9000);
        // Other fields keep their defaults
        assert_eq!(config.scan.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.service, ServiceConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_counts() {
        for json in [
            r#"{"scan": {"workers": 0}}"#,
            r#"{"scan": {"cache_capacity": 0}}"#,
            r#"{"service": {"mapper_workers": 0}}"#,
            r#"{"service": {"inner_parallelism": 0}}"#,
        ] {
            let err = Config::from_json_str(json).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidOption { .. }), "{json}");
        }
    }

    #[test]
    fn test_bad_address_is_parse_error() {
        let err = Config::from_json_str(r#"{"service": {"bind_addr": "nowhere"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = Config::from_json_file(Utf8Path::new("/nonexistent/wordfleet.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
