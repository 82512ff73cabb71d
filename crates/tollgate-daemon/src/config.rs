//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Billing settings.
    #[serde(default)]
    pub billing: BillingConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path. Empty = $data_dir/tollgate.db.
    #[serde(default)]
    pub path: String,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run the periodic lifecycle jobs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Grace window in seconds for late job ticks. A tick older than this
    /// is skipped rather than run as a catch-up.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

/// Billing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Base traffic quota in GiB granted per service class on renewal.
    #[serde(default = "default_quota_gib")]
    pub default_quota_gib: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_grace_secs() -> u64 {
    3_600
}

fn default_quota_gib() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grace_secs: default_grace_secs(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_quota_gib: default_quota_gib(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the database file path.
    pub fn db_path(&self) -> PathBuf {
        if self.database.path.is_empty() {
            Self::data_dir().join("tollgate.db")
        } else {
            PathBuf::from(&self.database.path)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Get the data directory path.
    pub fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("TOLLGATE_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".tollgate"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/tollgate"))
    }
}
