//! LedgerManager - Core command processing and event generation
//!
//! This module handles:
//! - Command validation and processing
//! - Event generation with global sequence numbers
//! - Persistence to redb (transactional)
//! - Snapshot and request index updates
//! - Event and request status broadcasting
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Create CommandContext
//!     ├─ 4. Convert command to action and execute
//!     ├─ 5. Apply events to snapshots via EventApplier
//!     ├─ 6. Persist events, snapshots and request index
//!     ├─ 7. Mark command processed
//!     ├─ 8. Commit transaction
//!     ├─ 9. Broadcast events and request status transitions
//!     └─ 10. Return response
//! ```
//!
//! Any error before step 8 drops the transaction, so an event is never
//! written without the totals it implies and vice versa.

mod error;
pub use error::*;

use super::actions::CommandAction;
use super::appliers::EventAction;
use super::reconciliation;
use super::storage::{LedgerStorage, LineItemRow, StorageError, StorageResult};
use super::traits::{AggregateSnapshot, CommandContext, CommandHandler, CommandMetadata, EventApplier};
use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::procurement::{
    BatchLineResult, BatchOrderRequest, BatchOrderResult, CommandResponse, LedgerCommand,
    LedgerCommandPayload, LedgerEvent, LedgerEventType, LineItemReconciliation, LineItemSnapshot,
    LineItemStatus, RequestReconciliation, RequestStatusTransition, StreamId,
    SupplierOrderSnapshot,
};
use std::collections::BTreeSet;
use std::path::Path;
use tokio::sync::broadcast;

/// Default event broadcast channel capacity
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Outcome of a committed command
struct Processed {
    response: CommandResponse,
    events: Vec<LedgerEvent>,
    transitions: Vec<RequestStatusTransition>,
}

/// LedgerManager for command processing
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Clients use it to detect engine restarts and trigger a full resync.
pub struct LedgerManager {
    storage: LedgerStorage,
    event_tx: broadcast::Sender<LedgerEvent>,
    transition_tx: broadcast::Sender<RequestStatusTransition>,
    /// Engine instance epoch - unique ID generated on startup
    epoch: String,
}

impl std::fmt::Debug for LedgerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerManager")
            .field("storage", &"<LedgerStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl LedgerManager {
    /// Create a new LedgerManager with the given database path
    pub fn new(db_path: impl AsRef<Path>, channel_capacity: usize) -> ManagerResult<Self> {
        let storage = LedgerStorage::open(db_path)?;
        let manager = Self::from_storage(storage, channel_capacity);
        tracing::info!(epoch = %manager.epoch, "LedgerManager started with new epoch");
        Ok(manager)
    }

    /// Create a LedgerManager with existing storage (for testing)
    #[cfg(test)]
    pub fn with_storage(storage: LedgerStorage) -> Self {
        Self::from_storage(storage, DEFAULT_EVENT_CHANNEL_CAPACITY)
    }

    fn from_storage(storage: LedgerStorage, channel_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(channel_capacity.max(1));
        let (transition_tx, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            storage,
            event_tx,
            transition_tx,
            epoch: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Get the engine epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.event_tx.subscribe()
    }

    /// Subscribe to request-level status changes (notifier feed)
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<RequestStatusTransition> {
        self.transition_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &LedgerStorage {
        &self.storage
    }

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: LedgerCommand) -> CommandResponse {
        self.execute_command_with_events(cmd).0
    }

    /// Execute a command and return both the response and generated events
    ///
    /// The events are broadcast internally as well.
    pub fn execute_command_with_events(
        &self,
        cmd: LedgerCommand,
    ) -> (CommandResponse, Vec<LedgerEvent>) {
        let command_id = cmd.command_id.clone();
        match self.process_command(cmd) {
            Ok(processed) => {
                // Broadcast after successful commit
                for event in &processed.events {
                    if self.event_tx.send(event.clone()).is_err() {
                        tracing::trace!("Event broadcast skipped: no active receivers");
                        break;
                    }
                }
                for transition in processed.transitions {
                    tracing::info!(
                        request_id = %transition.request_id,
                        previous = ?transition.previous,
                        current = ?transition.current,
                        "Request status changed"
                    );
                    let _ = self.transition_tx.send(transition);
                }
                (processed.response, processed.events)
            }
            Err(err) => {
                tracing::debug!(command_id = %command_id, error = %err, "Command rejected");
                (CommandResponse::error(command_id, err.into()), vec![])
            }
        }
    }

    /// Place orders for several line items with one supplier and one delivery date
    ///
    /// Each line runs as its own command with id `"{batch_id}:{line_item_id}"`,
    /// so a failing line aborts only its own order and a retried batch skips
    /// the lines that already went through.
    pub fn place_orders_batch(&self, request: BatchOrderRequest) -> BatchOrderResult {
        let mut results = Vec::with_capacity(request.lines.len());

        for line in &request.lines {
            let cmd = LedgerCommand::with_command_id(
                format!("{}:{}", request.batch_id, line.line_item_id),
                request.operator_id.clone(),
                request.operator_name.clone(),
                LedgerCommandPayload::PlaceOrder {
                    line_item_id: line.line_item_id.clone(),
                    supplier_id: request.supplier_id.clone(),
                    quantity: line.quantity,
                    delivery_date: request.delivery_date,
                    is_return_reorder: false,
                    return_source_order_ids: None,
                },
            );
            let response = self.execute_command(cmd);
            results.push(BatchLineResult {
                line_item_id: line.line_item_id.clone(),
                order_id: response.order_id,
                error: response.error,
            });
        }

        let failed = results.iter().filter(|r| !r.is_placed()).count();
        tracing::info!(
            batch_id = %request.batch_id,
            lines = results.len(),
            failed,
            "Batch order placement finished"
        );

        BatchOrderResult {
            batch_id: request.batch_id,
            results,
        }
    }

    /// Process command and return response with events
    ///
    /// Uses the action-based architecture:
    /// 1. Convert command to CommandAction
    /// 2. Execute action to generate events
    /// 3. Apply events to snapshots via EventApplier
    /// 4. Persist everything atomically
    fn process_command(&self, cmd: LedgerCommand) -> ManagerResult<Processed> {
        tracing::debug!(command_id = %cmd.command_id, payload = ?cmd.payload, "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Err(ManagerError::Duplicate(cmd.command_id));
        }

        // 2. Begin write transaction (serializes against every other command)
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within transaction
        if self
            .storage
            .is_command_processed_txn(&txn, &cmd.command_id)?
        {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Err(ManagerError::Duplicate(cmd.command_id));
        }

        let current_sequence = self.storage.get_current_sequence_txn(&txn)?;

        // 3. Create context and metadata
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            operator_id: cmd.operator_id.clone(),
            operator_name: cmd.operator_name.clone(),
            timestamp: cmd.timestamp,
        };

        // 4. Convert to action and execute
        let action = CommandAction::from(&cmd);
        let events = action.execute(&mut ctx, &metadata)?;

        // 5. Apply events to snapshots
        for event in &events {
            let mut snapshot = ctx.load_aggregate(&event.stream)?;
            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);
            ctx.save_aggregate(snapshot);
        }

        // Request statuses before this command touched anything
        let affected_requests: BTreeSet<String> = ctx
            .modified_line_items()
            .map(|li| li.request_id.clone())
            .chain(ctx.modified_orders().map(|o| o.request_id.clone()))
            .filter(|id| !id.is_empty())
            .collect();
        let mut previous_statuses = Vec::with_capacity(affected_requests.len());
        for request_id in &affected_requests {
            previous_statuses.push(self.request_status_txn(&txn, request_id)?);
        }

        // 6. Persist events, snapshots and request index
        for event in &events {
            self.storage.store_event(&txn, event)?;
        }
        for snapshot in ctx.modified_line_items() {
            self.storage.store_line_item(&txn, snapshot)?;
            if snapshot.deleted {
                self.storage
                    .unindex_line_item(&txn, &snapshot.request_id, &snapshot.line_item_id)?;
            } else {
                self.storage
                    .index_line_item(&txn, &snapshot.request_id, &snapshot.line_item_id)?;
            }
        }
        for snapshot in ctx.modified_orders() {
            self.storage.store_order(&txn, snapshot)?;
        }

        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }

        // Response identifiers and the refreshed line view
        let line_item_id = cmd
            .payload
            .line_item_id()
            .map(str::to_string)
            .or_else(|| first_stream_id(&events, LedgerEventType::LineItemCreated))
            .or_else(|| {
                ctx.modified_orders()
                    .next()
                    .map(|o| o.line_item_id.clone())
            });
        let order_id = cmd
            .payload
            .order_id()
            .map(str::to_string)
            .or_else(|| first_stream_id(&events, LedgerEventType::OrderPlaced));
        let line_view = match &line_item_id {
            Some(id) => self
                .line_item_row_txn(&txn, id)?
                .filter(|(li, _)| !li.deleted)
                .map(|(li, orders)| reconciliation::line_item_view(&li, &orders)),
            None => None,
        };

        let mut transitions = Vec::new();
        for (request_id, previous) in affected_requests.into_iter().zip(previous_statuses) {
            let current = self.request_status_txn(&txn, &request_id)?;
            if current != previous {
                transitions.push(RequestStatusTransition {
                    request_id,
                    previous,
                    current,
                    command_id: cmd.command_id.clone(),
                    sequence: max_sequence,
                });
            }
        }

        // 7. Mark command processed
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;

        // 8. Commit transaction
        drop(ctx);
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            command_id = %cmd.command_id,
            line_item_id = ?line_item_id,
            order_id = ?order_id,
            event_count = events.len(),
            "Command processed successfully"
        );

        Ok(Processed {
            response: CommandResponse::success(cmd.command_id, line_item_id, order_id, line_view),
            events,
            transitions,
        })
    }

    fn line_item_row_txn(
        &self,
        txn: &WriteTransaction,
        line_item_id: &str,
    ) -> StorageResult<Option<LineItemRow>> {
        let Some(line_item) = self.storage.get_line_item_txn(txn, line_item_id)? else {
            return Ok(None);
        };
        let mut orders = Vec::with_capacity(line_item.orders.len());
        for reference in &line_item.orders {
            if let Some(order) = self.storage.get_order_txn(txn, &reference.order_id)? {
                orders.push(order);
            }
        }
        Ok(Some((line_item, orders)))
    }

    fn request_status_txn(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
    ) -> StorageResult<Option<LineItemStatus>> {
        let mut rows = Vec::new();
        for line_item_id in self
            .storage
            .get_line_item_ids_for_request_txn(txn, request_id)?
        {
            if let Some(row) = self.line_item_row_txn(txn, &line_item_id)? {
                rows.push(row);
            }
        }
        Ok(reconciliation::request_view(request_id, &rows, 0).status)
    }

    // ========== Public Query Methods ==========

    /// Get a line item snapshot (deleted line items included)
    pub fn get_line_item(&self, line_item_id: &str) -> ManagerResult<Option<LineItemSnapshot>> {
        Ok(self.storage.get_line_item(line_item_id)?)
    }

    /// Get a supplier order snapshot
    pub fn get_order(&self, order_id: &str) -> ManagerResult<Option<SupplierOrderSnapshot>> {
        Ok(self.storage.get_order(order_id)?)
    }

    /// Every live line item
    pub fn all_line_items(&self) -> ManagerResult<Vec<LineItemSnapshot>> {
        let mut line_items = self.storage.get_all_line_items()?;
        line_items.retain(|li| !li.deleted);
        Ok(line_items)
    }

    /// Every supplier order
    pub fn all_orders(&self) -> ManagerResult<Vec<SupplierOrderSnapshot>> {
        Ok(self.storage.get_all_orders()?)
    }

    /// Quantity of a live line item not yet routed to depot or supplier
    pub fn get_remaining(&self, line_item_id: &str) -> ManagerResult<Decimal> {
        match self.storage.get_line_item(line_item_id)? {
            Some(li) if !li.deleted => Ok(li.remaining_quantity),
            _ => Err(ManagerError::LineItemNotFound(line_item_id.to_string())),
        }
    }

    /// Live line items of a request
    pub fn line_items_for_request(&self, request_id: &str) -> ManagerResult<Vec<LineItemSnapshot>> {
        let (rows, _) = self.storage.get_request_rows(request_id)?;
        Ok(rows.into_iter().map(|(li, _)| li).collect())
    }

    /// Supplier orders placed against a line item, in placement order
    pub fn orders_for_line_item(
        &self,
        line_item_id: &str,
    ) -> ManagerResult<Vec<SupplierOrderSnapshot>> {
        match self.storage.get_line_item_row(line_item_id)? {
            Some(((_, orders), _)) => Ok(orders),
            None => Err(ManagerError::LineItemNotFound(line_item_id.to_string())),
        }
    }

    /// Get current sequence number
    pub fn current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Get events since a given sequence
    pub fn events_since(&self, since_sequence: u64) -> ManagerResult<Vec<LedgerEvent>> {
        Ok(self.storage.get_events_since(since_sequence)?)
    }

    /// Get all events of a line item
    pub fn events_for_line_item(&self, line_item_id: &str) -> ManagerResult<Vec<LedgerEvent>> {
        Ok(self
            .storage
            .get_events_for_stream(&StreamId::LineItem(line_item_id.to_string()))?)
    }

    /// Get all events of a supplier order
    pub fn events_for_order(&self, order_id: &str) -> ManagerResult<Vec<LedgerEvent>> {
        Ok(self
            .storage
            .get_events_for_stream(&StreamId::SupplierOrder(order_id.to_string()))?)
    }

    /// Reconciliation view of a request, read from one consistent snapshot
    pub fn request_view(&self, request_id: &str) -> ManagerResult<RequestReconciliation> {
        let (rows, sequence) = self.storage.get_request_rows(request_id)?;
        Ok(reconciliation::request_view(request_id, &rows, sequence))
    }

    /// Reconciliation row of a single live line item
    pub fn line_item_view(&self, line_item_id: &str) -> ManagerResult<LineItemReconciliation> {
        match self.storage.get_line_item_row(line_item_id)? {
            Some(((li, orders), _)) if !li.deleted => {
                Ok(reconciliation::line_item_view(&li, &orders))
            }
            _ => Err(ManagerError::LineItemNotFound(line_item_id.to_string())),
        }
    }

    /// Rebuild an aggregate from its event stream (for verification)
    ///
    /// Uses EventApplier to apply each event to an empty snapshot.
    pub fn rebuild_aggregate(&self, stream: &StreamId) -> ManagerResult<AggregateSnapshot> {
        let events = self.storage.get_events_for_stream(stream)?;
        if events.is_empty() {
            return Err(match stream {
                StreamId::LineItem(id) => ManagerError::LineItemNotFound(id.clone()),
                StreamId::SupplierOrder(id) => ManagerError::OrderNotFound(id.clone()),
            });
        }

        let mut snapshot = AggregateSnapshot::empty(stream);
        for event in &events {
            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);
        }

        Ok(snapshot)
    }

    /// Rebuild a line item snapshot from its events
    pub fn rebuild_line_item(&self, line_item_id: &str) -> ManagerResult<LineItemSnapshot> {
        match self.rebuild_aggregate(&StreamId::LineItem(line_item_id.to_string()))? {
            AggregateSnapshot::LineItem(snapshot) => Ok(snapshot),
            AggregateSnapshot::SupplierOrder(_) => Err(ManagerError::Internal(format!(
                "stream of line item {line_item_id} rebuilt into a supplier order"
            ))),
        }
    }

    /// Rebuild a supplier order snapshot from its events
    pub fn rebuild_order(&self, order_id: &str) -> ManagerResult<SupplierOrderSnapshot> {
        match self.rebuild_aggregate(&StreamId::SupplierOrder(order_id.to_string()))? {
            AggregateSnapshot::SupplierOrder(snapshot) => Ok(snapshot),
            AggregateSnapshot::LineItem(_) => Err(ManagerError::Internal(format!(
                "stream of order {order_id} rebuilt into a line item"
            ))),
        }
    }
}

fn first_stream_id(events: &[LedgerEvent], event_type: LedgerEventType) -> Option<String> {
    events
        .iter()
        .find(|e| e.event_type == event_type)
        .map(|e| e.stream.id().to_string())
}

// Make LedgerManager Clone-able (storage is Arc-backed, senders are shared)
impl Clone for LedgerManager {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            event_tx: self.event_tx.clone(),
            transition_tx: self.transition_tx.clone(),
            epoch: self.epoch.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
