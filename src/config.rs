//! Runtime configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CIPHERDIARY_LEDGER_PATH` | `:memory:` |
//! | `CIPHERDIARY_CONTRACT_ADDRESS` | devnet contract address |
//! | `CIPHERDIARY_ACCOUNT` | devnet account |
//! | `CIPHERDIARY_GATEWAY_SEED_B64` | random per run |
//! | `CIPHERDIARY_BLOCK_TIME_MS` | `400` |
//! | `CIPHERDIARY_LOG_MODE` | `auto` (`file` / `stdout`) |
//! | `CIPHERDIARY_LOG_FILE` | `cipherdiary.log` |

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;

use crate::domain::{Address, CryptoError};

/// Sentinel ledger path for an in-memory devnet.
pub const IN_MEMORY: &str = ":memory:";

const DEFAULT_BLOCK_TIME_MS: u64 = 400;
const DEFAULT_LOG_FILE: &str = "cipherdiary.log";

/// Configuration errors that prevent startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: {source}")]
    Address {
        var: &'static str,
        #[source]
        source: CryptoError,
    },

    #[error("CIPHERDIARY_GATEWAY_SEED_B64: {0}")]
    GatewaySeed(String),
}

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when stdout is a terminal, stdout otherwise
    Auto,
    File,
    Stdout,
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ledger_path: String,
    pub contract_address: Address,
    pub account: Address,
    pub gateway_seed: Option<[u8; 32]>,
    pub block_time: Duration,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    /// Ignored settings, logged once the subscriber is installed
    pub warnings: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ledger_path: IN_MEMORY.to_string(),
            contract_address: Address::derive(b"cipher-diary/devnet/contract"),
            account: Address::derive(b"cipher-diary/devnet/account"),
            gateway_seed: None,
            block_time: Duration::from_millis(DEFAULT_BLOCK_TIME_MS),
            log_mode: LogMode::Auto,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            warnings: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns error for malformed addresses or gateway seed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Invalid optional settings fall back to defaults and are recorded in
    /// `warnings`; logging is not set up yet when this runs.
    ///
    /// # Errors
    /// Returns error for malformed addresses or gateway seed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("CIPHERDIARY_LEDGER_PATH").filter(|p| !p.trim().is_empty()) {
            config.ledger_path = path;
        }

        if let Some(raw) = lookup("CIPHERDIARY_CONTRACT_ADDRESS") {
            config.contract_address = raw.parse().map_err(|source| ConfigError::Address {
                var: "CIPHERDIARY_CONTRACT_ADDRESS",
                source,
            })?;
        }

        if let Some(raw) = lookup("CIPHERDIARY_ACCOUNT") {
            config.account = raw.parse().map_err(|source| ConfigError::Address {
                var: "CIPHERDIARY_ACCOUNT",
                source,
            })?;
        }

        if let Some(raw) = lookup("CIPHERDIARY_GATEWAY_SEED_B64") {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(raw.trim())
                .map_err(|e| ConfigError::GatewaySeed(e.to_string()))?;
            let seed: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
                ConfigError::GatewaySeed(format!("expected 32 bytes, got {}", b.len()))
            })?;
            config.gateway_seed = Some(seed);
        }

        if let Some(raw) = lookup("CIPHERDIARY_BLOCK_TIME_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.block_time = Duration::from_millis(ms),
                Err(_) => config.warnings.push(format!(
                    "Ignoring invalid CIPHERDIARY_BLOCK_TIME_MS={raw:?}, using {DEFAULT_BLOCK_TIME_MS}"
                )),
            }
        }

        if let Some(raw) = lookup("CIPHERDIARY_LOG_MODE") {
            config.log_mode = match raw.as_str() {
                "file" => LogMode::File,
                "stdout" => LogMode::Stdout,
                "auto" => LogMode::Auto,
                other => {
                    config
                        .warnings
                        .push(format!("Ignoring unknown CIPHERDIARY_LOG_MODE={other:?}"));
                    LogMode::Auto
                }
            };
        }

        if let Some(path) = lookup("CIPHERDIARY_LOG_FILE") {
            config.log_file = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Whether the ledger lives only in memory.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.ledger_path == IN_MEMORY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(|_| None).expect("defaults are valid");
        assert!(config.is_in_memory());
        assert_eq!(config.block_time, Duration::from_millis(400));
        assert_eq!(config.log_mode, LogMode::Auto);
        assert!(config.gateway_seed.is_none());
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_overrides() {
        let seed = base64::engine::general_purpose::STANDARD.encode([7u8; 32]);
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CIPHERDIARY_LEDGER_PATH", "/tmp/ledger.db"),
            ("CIPHERDIARY_ACCOUNT", "0x00112233445566778899aabbccddeeff00112233"),
            ("CIPHERDIARY_GATEWAY_SEED_B64", seed.as_str()),
            ("CIPHERDIARY_BLOCK_TIME_MS", "0"),
            ("CIPHERDIARY_LOG_MODE", "stdout"),
        ]))
        .expect("valid overrides");

        assert!(!config.is_in_memory());
        assert_eq!(config.account.to_string(), "0x00112233445566778899aabbccddeeff00112233");
        assert_eq!(config.gateway_seed, Some([7u8; 32]));
        assert_eq!(config.block_time, Duration::ZERO);
        assert_eq!(config.log_mode, LogMode::Stdout);
    }

    #[test]
    fn test_invalid_block_time_falls_back() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CIPHERDIARY_BLOCK_TIME_MS", "soon"),
            ("CIPHERDIARY_LOG_MODE", "syslog"),
        ]))
        .expect("still valid");
        assert_eq!(config.block_time, Duration::from_millis(400));
        assert_eq!(config.log_mode, LogMode::Auto);
        assert_eq!(config.warnings.len(), 2);
        assert!(config.warnings[0].contains("CIPHERDIARY_BLOCK_TIME_MS"));
        assert!(config.warnings[1].contains("syslog"));
    }

    #[test]
    fn test_bad_address_is_fatal() {
        let err = AppConfig::from_lookup(lookup_from(&[("CIPHERDIARY_CONTRACT_ADDRESS", "0x12")]))
            .expect_err("must reject");
        assert!(err.to_string().contains("CIPHERDIARY_CONTRACT_ADDRESS"));
    }

    #[test]
    fn test_short_seed_is_fatal() {
        let seed = base64::engine::general_purpose::STANDARD.encode([1u8; 16]);
        let result =
            AppConfig::from_lookup(lookup_from(&[("CIPHERDIARY_GATEWAY_SEED_B64", seed.as_str())]));
        assert!(result.is_err());
    }
}
