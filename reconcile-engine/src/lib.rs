//! Material request reconciliation engine
//!
//! Tracks how every requested quantity of a construction material is
//! fulfilled: shipped from the depot, ordered from suppliers, delivered,
//! returned and reordered. The ledger is event-sourced on redb; every
//! derived status is computed on read.
//!
//! # Module structure
//!
//! ```text
//! reconcile-engine/src/
//! ├── core/          # Configuration
//! ├── ledger/        # Event-sourced ledger, views, sync, verification
//! └── utils/         # Logging, validation
//! ```

pub mod core;
pub mod ledger;
pub mod utils;

use std::path::Path;

pub use core::Config;
pub use ledger::{LedgerManager, LedgerStorage, LedgerVerifier, SyncService};
pub use utils::logger::init_logger_with_file;

/// Initialize logging and make sure the work directory exists
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    init_logger_with_file(
        Some(&config.log_level),
        config.log_json,
        config.log_dir.as_deref(),
    );

    let work_dir = Path::new(&config.work_dir);
    if !work_dir.exists() {
        std::fs::create_dir_all(work_dir)?;
        tracing::info!(work_dir = %config.work_dir, "Created work directory");
    }
    Ok(())
}

/// Open the ledger described by `config`
pub fn open_ledger(config: &Config) -> ledger::ManagerResult<LedgerManager> {
    LedgerManager::new(config.db_path(), config.event_channel_capacity)
}
