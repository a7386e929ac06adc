//! redb-based storage layer for the procurement ledger
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `events` | `(stream_key, sequence)` | `LedgerEvent` | Event streams (append-only) |
//! | `line_items` | `line_item_id` | `LineItemSnapshot` | Line item state |
//! | `supplier_orders` | `order_id` | `SupplierOrderSnapshot` | Supplier order state |
//! | `request_index` | `(request_id, line_item_id)` | `()` | Line items per request |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `sequence_counter` | `"seq"` | `u64` | Global sequence |
//!
//! The snapshot tables are mutable; their audit trail is the event table.
//!
//! # Concurrency
//!
//! redb admits a single write transaction at a time. Every command runs inside
//! one, so commands against the same line item or order are serialized and a
//! command always validates against the latest committed totals. Readers use
//! MVCC snapshots and never block the writer.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::procurement::{LedgerEvent, LineItemSnapshot, StreamId, SupplierOrderSnapshot};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for storing events: key = (stream_key, sequence), value = JSON-serialized LedgerEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("events");

/// Table for line item snapshots: key = line_item_id, value = JSON-serialized LineItemSnapshot
const LINE_ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("line_items");

/// Table for supplier order snapshots: key = order_id, value = JSON-serialized SupplierOrderSnapshot
const SUPPLIER_ORDERS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("supplier_orders");

/// Table for request membership: key = (request_id, line_item_id), value = empty
const REQUEST_INDEX_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("request_index");

/// Table for tracking processed commands: key = command_id, value = empty (idempotency)
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// Table for sequence counter: key = "seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Line item with the supplier orders placed against it
pub type LineItemRow = (LineItemSnapshot, Vec<SupplierOrderSnapshot>);

/// Ledger storage backed by redb
#[derive(Clone)]
pub struct LedgerStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for LedgerStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStorage").finish_non_exhaustive()
    }
}

impl LedgerStorage {
    /// Open or create the database at the given path
    ///
    /// Parent directories are created as needed. redb commits with
    /// `Durability::Immediate`, so a returned `commit()` survives power loss.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(LINE_ITEMS_TABLE)?;
            let _ = write_txn.open_table(SUPPLIER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(REQUEST_INDEX_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    ///
    /// Blocks while another write transaction is open.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Get current sequence (within transaction)
    pub fn get_current_sequence_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let table = txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Set sequence number (within transaction)
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    // ========== Command Idempotency ==========

    /// Check if a command has been processed
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Mark a command as processed
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Event Operations ==========

    /// Store an event
    pub fn store_event(&self, txn: &WriteTransaction, event: &LedgerEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let stream_key = event.stream.storage_key();
        let value = serde_json::to_vec(event)?;
        table.insert((stream_key.as_str(), event.sequence), value.as_slice())?;
        Ok(())
    }

    /// Get all events of one stream, in sequence order
    pub fn get_events_for_stream(&self, stream: &StreamId) -> StorageResult<Vec<LedgerEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let stream_key = stream.storage_key();
        let range_start = (stream_key.as_str(), 0u64);
        let range_end = (stream_key.as_str(), u64::MAX);

        let mut events = Vec::new();
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let event: LedgerEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Get events since a given sequence (across all streams)
    pub fn get_events_since(&self, since_sequence: u64) -> StorageResult<Vec<LedgerEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let event: LedgerEvent = serde_json::from_slice(value.value())?;
            if event.sequence > since_sequence {
                events.push(event);
            }
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Get the distinct streams that have at least one event
    pub fn get_all_streams(&self) -> StorageResult<Vec<StreamId>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut streams: Vec<StreamId> = Vec::new();
        let mut last_key = String::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let (stream_key, _seq) = key.value();
            if stream_key == last_key {
                continue;
            }
            last_key = stream_key.to_string();
            let event: LedgerEvent = serde_json::from_slice(value.value())?;
            streams.push(event.stream);
        }

        Ok(streams)
    }

    // ========== Line Item Snapshots ==========

    /// Store a line item snapshot
    pub fn store_line_item(
        &self,
        txn: &WriteTransaction,
        snapshot: &LineItemSnapshot,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(LINE_ITEMS_TABLE)?;
        let value = serde_json::to_vec(snapshot)?;
        table.insert(snapshot.line_item_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a line item snapshot by ID
    pub fn get_line_item(&self, line_item_id: &str) -> StorageResult<Option<LineItemSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LINE_ITEMS_TABLE)?;

        match table.get(line_item_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a line item snapshot by ID (within transaction)
    pub fn get_line_item_txn(
        &self,
        txn: &WriteTransaction,
        line_item_id: &str,
    ) -> StorageResult<Option<LineItemSnapshot>> {
        let table = txn.open_table(LINE_ITEMS_TABLE)?;

        match table.get(line_item_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get all line item snapshots, including deleted ones
    pub fn get_all_line_items(&self) -> StorageResult<Vec<LineItemSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LINE_ITEMS_TABLE)?;

        let mut snapshots = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            snapshots.push(serde_json::from_slice(value.value())?);
        }

        Ok(snapshots)
    }

    // ========== Supplier Order Snapshots ==========

    /// Store a supplier order snapshot
    pub fn store_order(
        &self,
        txn: &WriteTransaction,
        snapshot: &SupplierOrderSnapshot,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SUPPLIER_ORDERS_TABLE)?;
        let value = serde_json::to_vec(snapshot)?;
        table.insert(snapshot.order_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a supplier order snapshot by ID
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<SupplierOrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SUPPLIER_ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a supplier order snapshot by ID (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<SupplierOrderSnapshot>> {
        let table = txn.open_table(SUPPLIER_ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get all supplier order snapshots
    pub fn get_all_orders(&self) -> StorageResult<Vec<SupplierOrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SUPPLIER_ORDERS_TABLE)?;

        let mut snapshots = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            snapshots.push(serde_json::from_slice(value.value())?);
        }

        Ok(snapshots)
    }

    // ========== Request Index ==========

    /// Add a line item to its request
    pub fn index_line_item(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
        line_item_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(REQUEST_INDEX_TABLE)?;
        table.insert((request_id, line_item_id), ())?;
        Ok(())
    }

    /// Remove a line item from its request
    pub fn unindex_line_item(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
        line_item_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(REQUEST_INDEX_TABLE)?;
        table.remove((request_id, line_item_id))?;
        Ok(())
    }

    /// Get the line item IDs of a request
    pub fn get_line_item_ids_for_request(&self, request_id: &str) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REQUEST_INDEX_TABLE)?;

        let mut ids = Vec::new();
        for result in table.range((request_id, "")..)? {
            let (key, _value) = result?;
            let (req, line_item_id) = key.value();
            if req != request_id {
                break;
            }
            ids.push(line_item_id.to_string());
        }

        Ok(ids)
    }

    /// Get the line item IDs of a request (within transaction)
    pub fn get_line_item_ids_for_request_txn(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
    ) -> StorageResult<Vec<String>> {
        let table = txn.open_table(REQUEST_INDEX_TABLE)?;

        let mut ids = Vec::new();
        for result in table.range((request_id, "")..)? {
            let (key, _value) = result?;
            let (req, line_item_id) = key.value();
            if req != request_id {
                break;
            }
            ids.push(line_item_id.to_string());
        }

        Ok(ids)
    }

    // ========== Consistent Reads ==========

    /// Load a line item and its supplier orders from one read snapshot
    ///
    /// Returns the rows together with the sequence they reflect.
    pub fn get_line_item_row(&self, line_item_id: &str) -> StorageResult<Option<(LineItemRow, u64)>> {
        let read_txn = self.db.begin_read()?;
        let line_items = read_txn.open_table(LINE_ITEMS_TABLE)?;
        let orders = read_txn.open_table(SUPPLIER_ORDERS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        let sequence = seq_table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);

        let line_item: LineItemSnapshot = match line_items.get(line_item_id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Ok(None),
        };

        let mut linked = Vec::with_capacity(line_item.orders.len());
        for reference in &line_item.orders {
            if let Some(value) = orders.get(reference.order_id.as_str())? {
                linked.push(serde_json::from_slice(value.value())?);
            }
        }

        Ok(Some(((line_item, linked), sequence)))
    }

    /// Load every live line item of a request with its supplier orders,
    /// from one read snapshot
    pub fn get_request_rows(&self, request_id: &str) -> StorageResult<(Vec<LineItemRow>, u64)> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(REQUEST_INDEX_TABLE)?;
        let line_items = read_txn.open_table(LINE_ITEMS_TABLE)?;
        let orders = read_txn.open_table(SUPPLIER_ORDERS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        let sequence = seq_table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);

        let mut rows = Vec::new();
        for result in index.range((request_id, "")..)? {
            let (key, _value) = result?;
            let (req, line_item_id) = key.value();
            if req != request_id {
                break;
            }
            let Some(value) = line_items.get(line_item_id)? else {
                continue;
            };
            let line_item: LineItemSnapshot = serde_json::from_slice(value.value())?;
            if line_item.deleted {
                continue;
            }

            let mut linked = Vec::with_capacity(line_item.orders.len());
            for reference in &line_item.orders {
                if let Some(value) = orders.get(reference.order_id.as_str())? {
                    linked.push(serde_json::from_slice(value.value())?);
                }
            }
            rows.push((line_item, linked));
        }

        Ok((rows, sequence))
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let events_table = read_txn.open_table(EVENTS_TABLE)?;
        let line_items_table = read_txn.open_table(LINE_ITEMS_TABLE)?;
        let orders_table = read_txn.open_table(SUPPLIER_ORDERS_TABLE)?;
        let commands_table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            event_count: events_table.len()?,
            line_item_count: line_items_table.len()?,
            order_count: orders_table.len()?,
            processed_command_count: commands_table.len()?,
            current_sequence: seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    pub event_count: u64,
    pub line_item_count: u64,
    pub order_count: u64,
    pub processed_command_count: u64,
    pub current_sequence: u64,
}
