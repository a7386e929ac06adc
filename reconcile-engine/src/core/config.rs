use std::path::PathBuf;

use crate::ledger::manager::DEFAULT_EVENT_CHANNEL_CAPACITY;
use crate::ledger::sync::DEFAULT_MAX_INCREMENTAL_EVENTS;

/// Engine configuration
///
/// # Environment variables
///
/// Every field can be overridden from the environment (`.env` is loaded first):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | Working directory for the database |
/// | LEDGER_DB_FILE | ledger.redb | Database file name inside WORK_DIR |
/// | LOG_LEVEL | info | Default log filter (RUST_LOG wins when set) |
/// | LOG_JSON | false | Emit JSON log lines |
/// | LOG_DIR | unset | Write logs to a daily rolling file in this directory |
/// | EVENT_CHANNEL_CAPACITY | 1024 | Broadcast buffer for events and transitions |
/// | SYNC_MAX_INCREMENTAL_EVENTS | 1000 | Larger gaps get a full sync |
/// | ENVIRONMENT | development | Runtime environment |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/srv/site-42 LOG_JSON=true reconcile-engine view req-17
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub ledger_db_file: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub event_channel_capacity: usize,
    pub sync_max_incremental_events: usize,
    /// development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            ledger_db_file: std::env::var("LEDGER_DB_FILE")
                .unwrap_or_else(|_| "ledger.redb".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            event_channel_capacity: std::env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EVENT_CHANNEL_CAPACITY),
            sync_max_incremental_events: std::env::var("SYNC_MAX_INCREMENTAL_EVENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_INCREMENTAL_EVENTS),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Override the working directory
    ///
    /// Mostly used by tests
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// Full path of the ledger database
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.ledger_db_file)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_path_joins_work_dir_and_file() {
        let mut config = Config::with_work_dir("/srv/ledger");
        config.ledger_db_file = "site.redb".to_string();
        assert_eq!(config.db_path(), PathBuf::from("/srv/ledger/site.redb"));
    }

    #[test]
    fn test_environment_flags() {
        let mut config = Config::with_work_dir("/tmp");
        config.environment = "production".to_string();
        assert!(config.is_production());
        assert!(!config.is_development());
    }
}
