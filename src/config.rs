//! Server configuration
//!
//! Built once at startup and shared read-only with every request.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Defaults
// =============================================================================

/// Ray tracer executable, relative paths resolve against the working directory
pub const DEFAULT_BINARY: &str = "./calcus";

/// Working directory the executable runs in
pub const DEFAULT_WORKING_DIR: &str = "/app";

/// Listening port when PORT is not set
pub const DEFAULT_PORT: u16 = 10000;

/// Hard deadline for one ray tracer invocation
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum accepted request body (5 MiB)
pub const MAX_REQUEST_SIZE: usize = 5 * 1024 * 1024;

pub const ENV_BINARY: &str = "RAY_TRACER_BINARY";
pub const ENV_WORKING_DIR: &str = "RAY_TRACER_WORKDIR";
pub const ENV_STAGING_DIR: &str = "RAY_TRACER_STAGING_DIR";
pub const ENV_TIMEOUT_SECS: &str = "RAY_TRACER_TIMEOUT_SECS";
pub const ENV_PORT: &str = "PORT";

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a valid port number, got '{value}'")]
    InvalidPort { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
}

// =============================================================================
// ServerConfig
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Ray tracer executable
    pub binary_path: PathBuf,
    /// Directory the executable is run from
    pub working_dir: PathBuf,
    /// Directory staged input files are created in
    pub staging_dir: PathBuf,
    pub port: u16,
    pub timeout: Duration,
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from(DEFAULT_BINARY),
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            staging_dir: std::env::temp_dir(),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_request_size: MAX_REQUEST_SIZE,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables
    ///
    /// Optional:
    /// - PORT: listening port (default: 10000)
    /// - RAY_TRACER_BINARY: executable path (default: ./calcus)
    /// - RAY_TRACER_WORKDIR: working directory (default: /app)
    /// - RAY_TRACER_STAGING_DIR: where input files are staged (default: system temp dir)
    /// - RAY_TRACER_TIMEOUT_SECS: invocation deadline (default: 60)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(binary) = get(ENV_BINARY) {
            config.binary_path = PathBuf::from(binary);
        }
        if let Some(dir) = get(ENV_WORKING_DIR) {
            config.working_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get(ENV_STAGING_DIR) {
            config.staging_dir = PathBuf::from(dir);
        }
        if let Some(port) = get(ENV_PORT) {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: ENV_PORT,
                value: port.clone(),
            })?;
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            let parsed = secs
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout {
                    var: ENV_TIMEOUT_SECS,
                    value: secs.clone(),
                })?;
            config.timeout = Duration::from_secs(parsed);
        }

        Ok(config)
    }

    /// Executable path as it will be spawned.
    /// Relative paths are anchored at `working_dir`, the directory the child runs in.
    pub fn resolved_binary(&self) -> PathBuf {
        if self.binary_path.is_absolute() {
            self.binary_path.clone()
        } else {
            self.working_dir.join(&self.binary_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.binary_path, PathBuf::from("./calcus"));
        assert_eq!(config.working_dir, PathBuf::from("/app"));
        assert_eq!(config.port, 10000);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_request_size, 5 * 1024 * 1024);
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("RAY_TRACER_BINARY", "/opt/bin/calcus"),
            ("RAY_TRACER_WORKDIR", "/srv"),
            ("RAY_TRACER_STAGING_DIR", "/srv/tmp"),
            ("RAY_TRACER_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.binary_path, PathBuf::from("/opt/bin/calcus"));
        assert_eq!(config.working_dir, PathBuf::from("/srv"));
        assert_eq!(config.staging_dir, PathBuf::from("/srv/tmp"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[("PORT", ""), ("RAY_TRACER_BINARY", "  ")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.binary_path, PathBuf::from(DEFAULT_BINARY));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = ServerConfig::from_lookup(lookup_from(&[("PORT", "http")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidPort { var: "PORT", value: "http".to_string() }
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ServerConfig::from_lookup(lookup_from(&[("RAY_TRACER_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout { .. }));
    }

    #[test]
    fn test_resolved_binary() {
        let mut config = ServerConfig::default();
        assert_eq!(config.resolved_binary(), PathBuf::from("/app/./calcus"));

        config.binary_path = PathBuf::from("/usr/local/bin/calcus");
        assert_eq!(config.resolved_binary(), PathBuf::from("/usr/local/bin/calcus"));
    }
}
