//! Material request ledger
//!
//! Event-sourced bookkeeping of every quantity movement on a material
//! request line item:
//!
//! - **manager**: Core LedgerManager for command processing and event generation
//! - **storage**: redb-based persistence for events, snapshots and the request index
//! - **reconciliation**: Derived statuses and views, computed on read
//! - **sync**: Reconnection synchronization for client caches
//! - **verify**: Replay-based consistency checks
//!
//! # Architecture
//!
//! ```text
//! Command → LedgerManager → Events → Storage (redb)
//!                 ↓                      ↓
//!         Event broadcast         Snapshot Update
//!         Status transitions
//! ```

pub mod traits;

pub mod actions;
pub mod appliers;
pub mod manager;
pub mod reconciliation;
pub mod storage;
pub mod sync;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use manager::{LedgerManager, ManagerError, ManagerResult};
pub use storage::{LedgerStorage, StorageError};
pub use sync::{ClientSyncState, SyncRequest, SyncResponse, SyncService};
pub use traits::{AggregateSnapshot, LedgerError};
pub use verify::{LedgerVerifier, VerificationReport};

// Re-export shared types for convenience
pub use shared::procurement::{
    CommandError, CommandErrorCode, CommandResponse, LedgerCommand, LedgerCommandPayload,
    LedgerEvent, LedgerEventType, LineItemSnapshot, LineItemStatus, RequestReconciliation,
    SupplierOrderSnapshot,
};
