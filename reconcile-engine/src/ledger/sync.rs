//! Synchronization API for client caches
//!
//! Clients (UI, document exporter) keep a local projection of the ledger.
//! That projection is never authoritative: it is reconciled against the
//! engine by replaying events since its last known sequence, or replaced
//! wholesale when the gap is too large.
//!
//! # Protocol
//!
//! 1. Client reconnects with last known sequence
//! 2. Engine calculates gap
//! 3. If gap is small, return incremental events
//! 4. If gap is large, return full sync with all live snapshots
//!
//! # Guarantees
//!
//! - Events are ordered by sequence
//! - No gaps in sequence (can be validated with [`ClientSyncState`])
//! - Full sync is always available as fallback

use super::manager::{LedgerManager, ManagerError};
use serde::{Deserialize, Serialize};
use shared::procurement::{LedgerEvent, LineItemSnapshot, SupplierOrderSnapshot};

/// Default maximum events returned by an incremental sync
pub const DEFAULT_MAX_INCREMENTAL_EVENTS: usize = 1000;

/// Sync request from client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Client's last known sequence number
    pub since_sequence: u64,
}

/// Sync response to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Events since the requested sequence
    pub events: Vec<LedgerEvent>,
    /// Live line items (full sync only)
    pub line_items: Vec<LineItemSnapshot>,
    /// Supplier orders (full sync only)
    pub orders: Vec<SupplierOrderSnapshot>,
    /// Engine's current sequence number
    pub server_sequence: u64,
    /// Whether the client must replace its cache (gap too large)
    pub requires_full_sync: bool,
    /// Engine instance epoch; a change means the client must full sync
    pub server_epoch: String,
}

impl SyncResponse {
    /// Create a full sync response
    pub fn full_sync(
        line_items: Vec<LineItemSnapshot>,
        orders: Vec<SupplierOrderSnapshot>,
        server_sequence: u64,
        epoch: String,
    ) -> Self {
        Self {
            events: vec![],
            line_items,
            orders,
            server_sequence,
            requires_full_sync: true,
            server_epoch: epoch,
        }
    }

    /// Create an incremental sync response
    pub fn incremental(events: Vec<LedgerEvent>, server_sequence: u64, epoch: String) -> Self {
        Self {
            events,
            line_items: vec![],
            orders: vec![],
            server_sequence,
            requires_full_sync: false,
            server_epoch: epoch,
        }
    }
}

/// Sync service for client cache reconciliation
pub struct SyncService {
    manager: LedgerManager,
    max_incremental_events: usize,
}

impl SyncService {
    pub fn new(manager: LedgerManager, max_incremental_events: usize) -> Self {
        Self {
            manager,
            max_incremental_events,
        }
    }

    /// Handle a sync request
    pub fn sync(&self, request: SyncRequest) -> Result<SyncResponse, ManagerError> {
        let server_sequence = self.manager.current_sequence()?;
        let epoch = self.manager.epoch().to_string();

        // Client is up to date
        if request.since_sequence >= server_sequence {
            return Ok(SyncResponse::incremental(vec![], server_sequence, epoch));
        }

        let gap = server_sequence - request.since_sequence;
        if gap > self.max_incremental_events as u64 {
            return self.full_sync(server_sequence, epoch);
        }

        let events = self.manager.events_since(request.since_sequence)?;

        // Commands may have landed between the two reads
        if events.len() > self.max_incremental_events {
            return self.full_sync(server_sequence, epoch);
        }

        let server_sequence = events
            .last()
            .map(|e| e.sequence)
            .unwrap_or(server_sequence)
            .max(server_sequence);
        Ok(SyncResponse::incremental(events, server_sequence, epoch))
    }

    fn full_sync(&self, server_sequence: u64, epoch: String) -> Result<SyncResponse, ManagerError> {
        tracing::debug!(server_sequence, "Falling back to full sync");
        Ok(SyncResponse::full_sync(
            self.manager.all_line_items()?,
            self.manager.all_orders()?,
            server_sequence,
            epoch,
        ))
    }
}

/// Client-side sync state tracker
#[derive(Debug, Default)]
pub struct ClientSyncState {
    /// Last processed sequence
    pub last_sequence: u64,
    /// Engine epoch seen on the last sync
    pub epoch: Option<String>,
    /// Whether we need full sync
    pub needs_full_sync: bool,
}

impl ClientSyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a sync response
    pub fn on_sync_response(&mut self, response: &SyncResponse) {
        if let Some(last) = response.events.last() {
            self.last_sequence = last.sequence;
        }
        self.last_sequence = self.last_sequence.max(response.server_sequence);
        self.epoch = Some(response.server_epoch.clone());
        self.needs_full_sync = false;
    }

    /// Process a live event
    pub fn on_event(&mut self, event: &LedgerEvent) {
        if event.sequence > self.last_sequence + 1 {
            self.needs_full_sync = true;
        }
        self.last_sequence = self.last_sequence.max(event.sequence);
    }

    /// The engine restarted since our last sync
    pub fn epoch_changed(&self, server_epoch: &str) -> bool {
        self.epoch.as_deref().is_some_and(|e| e != server_epoch)
    }

    /// Create a sync request
    pub fn create_sync_request(&self) -> SyncRequest {
        SyncRequest {
            since_sequence: if self.needs_full_sync {
                0
            } else {
                self.last_sequence
            },
        }
    }
}
