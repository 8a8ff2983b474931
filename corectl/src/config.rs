//! Controller configuration
//!
//! This covers the controller's own knobs only. The core configuration text
//! passed to `start` is opaque and handed to the engine untouched.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::buffer::{normalize_buffer_size, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
use crate::error::{Error, Result};

/// Upper bound accepted for `probe_timeout_ms`
const MAX_PROBE_TIMEOUT_MS: u64 = 60_000;

/// Controller settings
///
/// # Example Configuration
///
/// ```toml
/// # I/O buffer size in bytes; non-positive values fall back to 4096
/// buffer_size = 16384
///
/// # Connect timeout for delay probes
/// probe_timeout_ms = 3000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Requested I/O buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: i64,

    /// Connect timeout for delay probes, in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ControllerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size > MAX_BUFFER_SIZE as i64 {
            return Err(Error::Config(format!(
                "buffer_size {} is too large (maximum {})",
                self.buffer_size, MAX_BUFFER_SIZE
            )));
        }

        if self.probe_timeout_ms == 0 {
            return Err(Error::Config("probe_timeout_ms must be positive".into()));
        }

        if self.probe_timeout_ms > MAX_PROBE_TIMEOUT_MS {
            return Err(Error::Config(format!(
                "probe_timeout_ms {} is too large (maximum {})",
                self.probe_timeout_ms, MAX_PROBE_TIMEOUT_MS
            )));
        }

        Ok(())
    }

    /// Buffer size after the non-positive fallback is applied
    pub fn effective_buffer_size(&self) -> usize {
        normalize_buffer_size(self.buffer_size)
    }

    /// Probe timeout as a `Duration`
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Generate a sample configuration
    pub fn sample() -> String {
        r#"# Core controller configuration

# I/O buffer size in bytes (default: 4096, max: 16777216)
# Zero or negative values fall back to the default.
# Takes effect the next time the core starts.
buffer_size = 4096

# Connect timeout for delay probes in milliseconds (default: 5000, max: 60000)
probe_timeout_ms = 5000
"#
        .to_string()
    }
}

fn default_buffer_size() -> i64 {
    DEFAULT_BUFFER_SIZE as i64
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
buffer_size = 16384
probe_timeout_ms = 2500
"#;

        let config = ControllerConfig::from_toml(toml).unwrap();
        assert_eq!(config.effective_buffer_size(), 16384);
        assert_eq!(config.probe_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_defaults_and_fallback() {
        let config = ControllerConfig::from_toml("").unwrap();
        assert_eq!(config, ControllerConfig::default());

        let config = ControllerConfig::from_toml("buffer_size = -1").unwrap();
        assert_eq!(config.effective_buffer_size(), DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_zero_timeout_fails() {
        let result = ControllerConfig::from_toml("probe_timeout_ms = 0");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_oversized_buffer_fails() {
        let result = ControllerConfig::from_toml("buffer_size = 9223372036854775807");
        assert!(matches!(result, Err(Error::Config(_))));

        let at_limit = format!("buffer_size = {}", MAX_BUFFER_SIZE);
        let config = ControllerConfig::from_toml(&at_limit).unwrap();
        assert_eq!(config.effective_buffer_size(), MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_bad_toml_fails() {
        let result = ControllerConfig::from_toml("buffer_size = \"big\"");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_sample_parses() {
        let config = ControllerConfig::from_toml(&ControllerConfig::sample()).unwrap();
        assert_eq!(config, ControllerConfig::default());
    }
}
