//! # Ledger Configuration
//!
//! Configuration for the ledger database, posting retries and the
//! reconciliation job.
//!
//! ## Configuration Sources (Priority Order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Loading                                │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KHATA_DB_PATH, KHATA_MAX_CONNECTIONS, KHATA_POST_MAX_RETRIES,      │
//! │     KHATA_RETRY_BACKOFF_MS, KHATA_RECONCILE_INTERVAL_SECS              │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  2. Config File (khata.toml)                                           │
//! │     ~/.config/khata/khata.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.khata.ledger/khata.toml (macOS)  │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Config File
//! ```toml
//! [database]
//! path = "/var/lib/khata/ledger.db"
//! max_connections = 8
//!
//! [posting]
//! max_retries = 5
//! retry_backoff_ms = 25
//!
//! [reconciliation]
//! interval_secs = 900
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long a writer waits for the SQLite lock before failing busy.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "khata", "ledger")
        .map(|dirs| dirs.data_dir().join("khata.db"))
        .unwrap_or_else(|| PathBuf::from("khata.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Posting Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingSettings {
    /// Attempts after the first before a conflict is surfaced.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between attempts; grows linearly per attempt.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    20
}

impl Default for PostingSettings {
    fn default() -> Self {
        PostingSettings {
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

impl PostingSettings {
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

// =============================================================================
// Reconciliation Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationSettings {
    #[serde(default = "default_reconcile_interval")]
    pub interval_secs: u64,
}

fn default_reconcile_interval() -> u64 {
    3_600
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        ReconciliationSettings {
            interval_secs: default_reconcile_interval(),
        }
    }
}

impl ReconciliationSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete ledger configuration, built by the process entry point and
/// passed down explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub posting: PostingSettings,

    #[serde(default)]
    pub reconciliation: ReconciliationSettings,
}

impl LedgerConfig {
    /// Loads configuration from file and environment.
    ///
    /// ## Loading Order
    /// 1. Start with defaults
    /// 2. Load from config file (if exists)
    /// 3. Override with environment variables
    /// 4. Validate
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();

        config.validate()?;

        Ok(config)
    }

    /// Loads configuration, falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DbError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| DbError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.min_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(DbError::InvalidConfig(
                "database.min_connections cannot exceed max_connections".into(),
            ));
        }

        if self.reconciliation.interval_secs == 0 {
            return Err(DbError::InvalidConfig(
                "reconciliation.interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("KHATA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("KHATA_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid KHATA_MAX_CONNECTIONS"),
            }
        }

        if let Ok(retries) = std::env::var("KHATA_POST_MAX_RETRIES") {
            match retries.parse::<u32>() {
                Ok(n) => self.posting.max_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring invalid KHATA_POST_MAX_RETRIES"),
            }
        }

        if let Ok(backoff) = std::env::var("KHATA_RETRY_BACKOFF_MS") {
            if let Ok(ms) = backoff.parse::<u64>() {
                self.posting.retry_backoff_ms = ms;
            }
        }

        if let Ok(interval) = std::env::var("KHATA_RECONCILE_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse::<u64>() {
                debug!(secs, "Overriding reconciliation interval from environment");
                self.reconciliation.interval_secs = secs;
            }
        }
    }

    /// Gets the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "khata", "ledger")
            .map(|dirs| dirs.config_dir().join("khata.toml"))
    }

    /// Database pool settings derived from this config.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.posting.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = LedgerConfig::default();

        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(DbError::InvalidConfig(_))));

        config.database.max_connections = 2;
        config.database.min_connections = 3;
        assert!(config.validate().is_err());

        config.database.min_connections = 1;
        config.reconciliation.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [posting]
            max_retries = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.posting.max_retries, 7);
        assert_eq!(config.posting.retry_backoff_ms, 20);
        assert_eq!(config.reconciliation.interval_secs, 3_600);
    }

    #[test]
    fn test_toml_serialization() {
        let config = LedgerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[posting]"));
        assert!(toml_str.contains("[reconciliation]"));
    }

    #[test]
    fn test_backoff_grows_per_attempt() {
        let posting = PostingSettings::default();
        assert_eq!(posting.backoff(1), Duration::from_millis(20));
        assert_eq!(posting.backoff(3), Duration::from_millis(60));
    }

    #[test]
    fn test_db_config_from_settings() {
        let mut config = LedgerConfig::default();
        config.database.path = PathBuf::from("/tmp/ledger.db");
        config.database.busy_timeout_ms = 250;

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
    }
}
