//! Configuration for the submission engine
//!
//! Configuration is loaded from TOML files, optionally with environment
//! overrides from a `.env` file. Every submitter timing has a default that
//! matches the protocol expectations of the RPC server:
//!
//! | setting                         | default  |
//! |---------------------------------|----------|
//! | `send_retry_interval_ms`        | 4000     |
//! | `send_retry_window_ms`          | 20000    |
//! | `confirmation_poll_interval_ms` | 1000     |
//! | `restore_fee_margin`            | 1000     |
//! | `confirmation_timeout_ms`       | none     |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tx_builder::TxBuilderOptions;

/// Environment variable overriding `rpc.url`
pub const ENV_RPC_URL: &str = "SOROBAN_RPC_URL";
/// Environment variable overriding `network_passphrase`
pub const ENV_NETWORK_PASSPHRASE: &str = "SOROBAN_NETWORK_PASSPHRASE";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// RPC endpoint configuration
    pub rpc: RpcConfig,

    /// Retry/poll timings of the submitter
    #[serde(default)]
    pub submitter: SubmitterConfig,

    /// Network passphrase transactions are bound to
    pub network_passphrase: String,

    /// Default base fee in stroops
    #[serde(default = "default_base_fee")]
    pub base_fee: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Soroban RPC endpoint URL
    pub url: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Extra headers sent with every request (API keys and the like)
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

/// Submitter state machine timings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitterConfig {
    /// Wait between `TRY_AGAIN_LATER` resends
    #[serde(default = "default_send_retry_interval_ms")]
    pub send_retry_interval_ms: u64,

    /// Resends stop once this much time has passed since the first send
    #[serde(default = "default_send_retry_window_ms")]
    pub send_retry_window_ms: u64,

    /// Wait between `NOT_FOUND` polls
    #[serde(default = "default_confirmation_poll_interval_ms")]
    pub confirmation_poll_interval_ms: u64,

    /// Added to the restore preamble's resource fee
    #[serde(default = "default_restore_fee_margin")]
    pub restore_fee_margin: u32,

    /// Give up polling after this long; `None` polls until a record appears
    #[serde(default)]
    pub confirmation_timeout_ms: Option<u64>,
}

fn default_base_fee() -> u32 {
    100
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_send_retry_interval_ms() -> u64 {
    4_000
}

fn default_send_retry_window_ms() -> u64 {
    20_000
}

fn default_confirmation_poll_interval_ms() -> u64 {
    1_000
}

fn default_restore_fee_margin() -> u32 {
    1_000
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            send_retry_interval_ms: default_send_retry_interval_ms(),
            send_retry_window_ms: default_send_retry_window_ms(),
            confirmation_poll_interval_ms: default_confirmation_poll_interval_ms(),
            restore_fee_margin: default_restore_fee_margin(),
            confirmation_timeout_ms: None,
        }
    }
}

impl SubmitterConfig {
    pub fn send_retry_interval(&self) -> Duration {
        Duration::from_millis(self.send_retry_interval_ms)
    }

    pub fn send_retry_window(&self) -> Duration {
        Duration::from_millis(self.send_retry_window_ms)
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_ms.map(Duration::from_millis)
    }

    /// Opt out of unbounded confirmation polling
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.send_retry_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "send_retry_interval_ms must be > 0".to_string(),
            ));
        }
        if self.confirmation_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "confirmation_poll_interval_ms must be > 0".to_string(),
            ));
        }
        if self.confirmation_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "confirmation_timeout_ms must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

impl RpcConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout_ms: default_request_timeout_ms(),
            headers: Vec::new(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl EngineConfig {
    /// Load configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::IoError(format!("Failed to read config file {}: {}", path, e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration with environment variable overrides
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_file_with_env(path: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::IoError(format!("Failed to read config file {}: {}", path, e))
        })?;
        let mut config: EngineConfig = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e)))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc.url = url;
        }
        if let Some(passphrase) = lookup(ENV_NETWORK_PASSPHRASE) {
            self.network_passphrase = passphrase;
        }
    }

    /// Builder options with the configured base fee and network
    pub fn builder_options(&self) -> TxBuilderOptions {
        TxBuilderOptions::new(self.base_fee, self.network_passphrase.clone())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.url.trim().is_empty() {
            return Err(ConfigError::ValidationError("rpc.url is empty".to_string()));
        }
        if self.network_passphrase.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "network_passphrase is empty".to_string(),
            ));
        }
        if self.rpc.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "rpc.request_timeout_ms must be > 0".to_string(),
            ));
        }
        self.submitter.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
network_passphrase = "Test SDF Network ; September 2015"

[rpc]
url = "https://soroban-testnet.stellar.org"
"#;

    #[test]
    fn test_defaults_applied() {
        let config = EngineConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.base_fee, 100);
        assert_eq!(config.rpc.request_timeout_ms, 30_000);
        assert_eq!(config.submitter, SubmitterConfig::default());
        assert_eq!(config.submitter.send_retry_interval(), Duration::from_secs(4));
        assert_eq!(config.submitter.send_retry_window(), Duration::from_secs(20));
        assert_eq!(
            config.submitter.confirmation_poll_interval(),
            Duration::from_secs(1)
        );
        assert_eq!(config.submitter.restore_fee_margin, 1000);
        assert!(config.submitter.confirmation_timeout().is_none());
    }

    #[test]
    fn test_submitter_overrides() {
        let toml = format!(
            "{}\n[submitter]\nsend_retry_interval_ms = 10\nconfirmation_timeout_ms = 60000\n",
            MINIMAL
        );
        let config = EngineConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.submitter.send_retry_interval_ms, 10);
        assert_eq!(config.submitter.send_retry_window_ms, 20_000);
        assert_eq!(
            config.submitter.confirmation_timeout(),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let toml = format!("{}\n[submitter]\nconfirmation_poll_interval_ms = 0\n", MINIMAL);
        let err = EngineConfig::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validation_rejects_empty_passphrase() {
        let toml = r#"
network_passphrase = " "
[rpc]
url = "http://localhost:8000/soroban/rpc"
"#;
        assert!(EngineConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::from_toml_str(MINIMAL).unwrap();
        config.apply_overrides(|key| match key {
            ENV_RPC_URL => Some("http://localhost:8000/soroban/rpc".to_string()),
            _ => None,
        });
        assert_eq!(config.rpc.url, "http://localhost:8000/soroban/rpc");
        assert_eq!(config.network_passphrase, "Test SDF Network ; September 2015");
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = EngineConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.rpc.url, "https://soroban-testnet.stellar.org");

        assert!(matches!(
            EngineConfig::from_toml_file("/nonexistent/submitter.toml"),
            Err(ConfigError::IoError(_))
        ));
    }
}
