//! Client configuration
//!
//! Every setting has a default. A TOML file may override any subset:
//!
//! ```toml
//! confirmation_timeout_secs = 30
//! poll_interval_ms = 250
//! artifact_dir = "keys"
//! ledger_path = "devnet.json"
//!
//! [ledger]
//! auto_mine = true
//! mempool_limit = 1024
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::ledger::LedgerSettings;

pub const DEFAULT_CONFIG_FILE: &str = "zkparity.toml";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// How long to wait for a terminal receipt before reporting a timeout
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    /// Directory holding the circuit source and proving key
    pub artifact_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub ledger: LedgerSettings,
}

impl ClientConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        let candidate = path.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if !candidate.exists() {
            if let Some(explicit) = path {
                info!(path = %explicit.display(), "configuration file not found, using defaults");
            }
            return Ok(config);
        }

        let contents = fs::read_to_string(&candidate)
            .with_context(|| format!("failed to read config at {}", candidate.display()))?;
        config.apply_toml(&contents)
            .with_context(|| format!("failed to parse config at {}", candidate.display()))?;

        info!(path = %candidate.display(), "loaded configuration overrides");
        Ok(config)
    }

    /// Apply overrides from TOML text on top of the current values.
    pub fn apply_toml(&mut self, contents: &str) -> anyhow::Result<()> {
        let raw: RawClientConfig = toml::from_str(contents)?;

        if let Some(secs) = raw.confirmation_timeout_secs {
            self.confirmation_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = raw.poll_interval_ms {
            anyhow::ensure!(ms > 0, "poll_interval_ms must be positive");
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(dir) = raw.artifact_dir {
            self.artifact_dir = dir;
        }
        if let Some(path) = raw.ledger_path {
            self.ledger_path = path;
        }
        if let Some(ledger) = raw.ledger {
            if let Some(auto_mine) = ledger.auto_mine {
                self.ledger.auto_mine = auto_mine;
            }
            if let Some(limit) = ledger.mempool_limit {
                self.ledger.mempool_limit = limit;
            }
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
            artifact_dir: PathBuf::from(".zkparity/keys"),
            ledger_path: PathBuf::from(".zkparity/devnet.json"),
            ledger: LedgerSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClientConfig {
    confirmation_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    artifact_dir: Option<PathBuf>,
    ledger_path: Option<PathBuf>,
    ledger: Option<RawLedgerConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLedgerConfig {
    auto_mine: Option<bool>,
    mempool_limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ClientConfig::load(Some(&temp_dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("zkparity.toml");
        fs::write(&path, "confirmation_timeout_secs = 5\n[ledger]\nauto_mine = false\n").unwrap();

        let config = ClientConfig::load(Some(&path)).unwrap();
        assert_eq!(config.confirmation_timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert!(!config.ledger.auto_mine);
        assert_eq!(config.ledger.mempool_limit, LedgerSettings::default().mempool_limit);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut config = ClientConfig::default();
        assert!(config.apply_toml("retries = 3").is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = ClientConfig::default();
        assert!(config.apply_toml("poll_interval_ms = 0").is_err());
    }
}
