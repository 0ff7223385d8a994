//! # Realtime Configuration
//!
//! Configuration for the realtime backend.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ATLAS_PORT=9000                                                    │
//! │     ATLAS_DB_PATH=/var/lib/atlas/atlas.db                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/atlas-pos/realtime.toml (Linux)                          │
//! │     ~/Library/Application Support/com.atlas.pos/realtime.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     0.0.0.0:8780, 100-message buffer, hourly scan                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # realtime.toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8780
//!
//! [database]
//! path = "/var/lib/atlas/atlas.db"
//!
//! [notifications]
//! buffer_capacity = 100
//!
//! [scheduler]
//! enabled = true
//! scan_interval_secs = 3600
//! expiry_window_days = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{RealtimeError, RealtimeResult};

// =============================================================================
// Server Settings
// =============================================================================

/// HTTP/WebSocket server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address (default: 0.0.0.0 for all interfaces).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8780
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// SQLite database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "atlas", "pos")
        .map(|dirs| dirs.data_dir().join("atlas.db"))
        .unwrap_or_else(|| PathBuf::from("atlas.db"))
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
        }
    }
}

// =============================================================================
// Notification Settings
// =============================================================================

/// Notification actor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// History ring buffer capacity (messages kept for replay).
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

fn default_buffer_capacity() -> usize {
    100
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

// =============================================================================
// Scheduler Settings
// =============================================================================

/// Warranty expiry scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Whether the expiry scan runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval between scan ticks (seconds).
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// How far ahead of expiry the reminder fires (days).
    #[serde(default = "default_expiry_window")]
    pub expiry_window_days: i64,
}

fn default_true() -> bool {
    true
}

fn default_scan_interval() -> u64 {
    3600
}

fn default_expiry_window() -> i64 {
    30
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        SchedulerSettings {
            enabled: true,
            scan_interval_secs: default_scan_interval(),
            expiry_window_days: default_expiry_window(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete realtime backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// HTTP/WebSocket server settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Notification actor settings.
    #[serde(default)]
    pub notifications: NotificationSettings,

    /// Warranty expiry scan settings.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

impl RealtimeConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (realtime.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> RealtimeResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading realtime config from file");
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

    /// Loads config or returns defaults if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load realtime config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> RealtimeResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| RealtimeError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RealtimeError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .map_err(|e| RealtimeError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Realtime config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> RealtimeResult<()> {
        if self.server.port == 0 {
            return Err(RealtimeError::InvalidConfig(
                "server.port must be non-zero".into(),
            ));
        }

        if self.notifications.buffer_capacity == 0 {
            return Err(RealtimeError::InvalidConfig(
                "notifications.buffer_capacity must be greater than 0".into(),
            ));
        }

        if self.scheduler.scan_interval_secs == 0 {
            return Err(RealtimeError::InvalidConfig(
                "scheduler.scan_interval_secs must be greater than 0".into(),
            ));
        }

        if self.scheduler.expiry_window_days <= 0 {
            return Err(RealtimeError::InvalidConfig(
                "scheduler.expiry_window_days must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("ATLAS_BIND_ADDR") {
            debug!(addr = %addr, "Overriding bind address from environment");
            self.server.bind_addr = addr;
        }

        if let Ok(port) = std::env::var("ATLAS_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                debug!(port = p, "Overriding port from environment");
                self.server.port = p;
            }
        }

        if let Ok(path) = std::env::var("ATLAS_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Ok(capacity) = std::env::var("ATLAS_BUFFER_CAPACITY") {
            if let Ok(c) = capacity.parse::<usize>() {
                self.notifications.buffer_capacity = c;
            }
        }

        if let Ok(interval) = std::env::var("ATLAS_SCAN_INTERVAL_SECS") {
            if let Ok(i) = interval.parse::<u64>() {
                self.scheduler.scan_interval_secs = i;
            }
        }

        if let Ok(window) = std::env::var("ATLAS_EXPIRY_WINDOW_DAYS") {
            if let Ok(w) = window.parse::<i64>() {
                self.scheduler.expiry_window_days = w;
            }
        }

        if let Ok(enabled) = std::env::var("ATLAS_SCHEDULER_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "true" | "1" | "yes" => self.scheduler.enabled = true,
                "false" | "0" | "no" => self.scheduler.enabled = false,
                other => warn!(value = %other, "Unknown ATLAS_SCHEDULER_ENABLED value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "atlas", "pos")
            .map(|dirs| dirs.config_dir().join("realtime.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RealtimeConfig::default();
        assert_eq!(config.server.port, 8780);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.notifications.buffer_capacity, 100);
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.scan_interval_secs, 3600);
        assert_eq!(config.scheduler.expiry_window_days, 30);
    }

    #[test]
    fn test_config_validation() {
        let mut config = RealtimeConfig::default();
        assert!(config.validate().is_ok());

        config.notifications.buffer_capacity = 0;
        assert!(config.validate().is_err());

        config.notifications.buffer_capacity = 100;
        config.scheduler.expiry_window_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_address() {
        let config = RealtimeConfig::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8780");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RealtimeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[scheduler]"));

        let parsed: RealtimeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: RealtimeConfig = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(parsed.server.port, 9000);
        assert_eq!(parsed.server.bind_addr, "0.0.0.0");
        assert_eq!(parsed.notifications.buffer_capacity, 100);
    }
}
