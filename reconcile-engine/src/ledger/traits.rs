//! Command and event traits for the ledger
//!
//! - [`CommandHandler`]: validates a command against current state and emits events
//! - [`EventApplier`]: folds one event into an aggregate snapshot (pure)
//! - [`CommandContext`]: transactional view of the ledger handed to actions

use super::storage::{LedgerStorage, StorageError};
use enum_dispatch::enum_dispatch;
use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::procurement::{
    CommandErrorCode, EventPayload, LedgerEvent, LedgerEventType, LineItemSnapshot, StreamId,
    SupplierOrderSnapshot,
};
use std::collections::HashMap;
use thiserror::Error;

/// Domain rejections raised by actions
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("Line item not found: {0}")]
    LineItemNotFound(String),

    #[error("Supplier order not found: {0}")]
    OrderNotFound(String),

    #[error("Insufficient quantity: {0}")]
    InsufficientQuantity(String),

    #[error("Requested {requested} exceeds remaining quantity {remaining}")]
    ExceedsRemainingQuantity { requested: Decimal, remaining: Decimal },

    #[error("Requested {requested} exceeds open returned quantity {available}")]
    ExceedsReturnedQuantity { requested: Decimal, available: Decimal },

    #[error("Requested {requested} exceeds returnable quantity {returnable}")]
    ExceedsReturnableQuantity { requested: Decimal, returnable: Decimal },

    #[error("Delivery of {requested} exceeds outstanding quantity {outstanding}")]
    OverDelivery { requested: Decimal, outstanding: Decimal },

    #[error("Line item already declared unavailable in depot: {0}")]
    AlreadyDeclaredUnavailable(String),

    #[error("Invalid shipment state: {0}")]
    InvalidShipmentState(String),

    #[error("Line item is locked by dependent records: {0}")]
    LineItemLocked(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("{1}")]
    InvalidOperation(CommandErrorCode, String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Error code reported to the caller
    pub fn code(&self) -> CommandErrorCode {
        match self {
            LedgerError::LineItemNotFound(_) => CommandErrorCode::LineItemNotFound,
            LedgerError::OrderNotFound(_) => CommandErrorCode::OrderNotFound,
            LedgerError::InsufficientQuantity(_) => CommandErrorCode::InsufficientQuantity,
            LedgerError::ExceedsRemainingQuantity { .. } => {
                CommandErrorCode::ExceedsRemainingQuantity
            }
            LedgerError::ExceedsReturnedQuantity { .. } => {
                CommandErrorCode::ExceedsReturnedQuantity
            }
            LedgerError::ExceedsReturnableQuantity { .. } => {
                CommandErrorCode::ExceedsReturnableQuantity
            }
            LedgerError::OverDelivery { .. } => CommandErrorCode::OverDelivery,
            LedgerError::AlreadyDeclaredUnavailable(_) => {
                CommandErrorCode::AlreadyDeclaredUnavailable
            }
            LedgerError::InvalidShipmentState(_) => CommandErrorCode::InvalidShipmentState,
            LedgerError::LineItemLocked(_) => CommandErrorCode::LineItemLocked,
            LedgerError::InvalidQuantity(_) => CommandErrorCode::InvalidQuantity,
            LedgerError::InvalidOperation(code, _) => *code,
            LedgerError::Storage(_) => CommandErrorCode::InternalError,
        }
    }
}

impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

/// Command metadata carried into every action
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub operator_id: String,
    pub operator_name: String,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
}

impl CommandMetadata {
    /// Build an event stamped with this command's metadata
    pub fn event(
        &self,
        sequence: u64,
        stream: StreamId,
        event_type: LedgerEventType,
        payload: EventPayload,
    ) -> LedgerEvent {
        LedgerEvent::new(
            sequence,
            stream,
            self.operator_id.clone(),
            self.operator_name.clone(),
            self.command_id.clone(),
            Some(self.timestamp),
            event_type,
            payload,
        )
    }
}

/// Either aggregate of the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateSnapshot {
    LineItem(LineItemSnapshot),
    SupplierOrder(SupplierOrderSnapshot),
}

impl AggregateSnapshot {
    /// Empty aggregate for a stream that has no state yet
    pub fn empty(stream: &StreamId) -> Self {
        match stream {
            StreamId::LineItem(id) => AggregateSnapshot::LineItem(LineItemSnapshot::new(id.clone())),
            StreamId::SupplierOrder(id) => {
                AggregateSnapshot::SupplierOrder(SupplierOrderSnapshot::new(id.clone()))
            }
        }
    }

    pub fn last_sequence(&self) -> u64 {
        match self {
            AggregateSnapshot::LineItem(s) => s.last_sequence,
            AggregateSnapshot::SupplierOrder(s) => s.last_sequence,
        }
    }

    pub fn verify_checksum(&self) -> bool {
        match self {
            AggregateSnapshot::LineItem(s) => s.verify_checksum(),
            AggregateSnapshot::SupplierOrder(s) => s.verify_checksum(),
        }
    }

    pub fn state_checksum(&self) -> &str {
        match self {
            AggregateSnapshot::LineItem(s) => &s.state_checksum,
            AggregateSnapshot::SupplierOrder(s) => &s.state_checksum,
        }
    }
}

/// Command handler: validate against current state, emit events
///
/// Handlers never mutate snapshots. The manager applies the returned
/// events through [`EventApplier`] before anything is persisted.
pub trait CommandHandler {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError>;
}

/// Event applier: fold one event into its aggregate (pure)
#[enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent);
}

/// Transactional view of the ledger for one command
///
/// Reads go through the open write transaction, so they observe the latest
/// committed state and nothing can change underneath until commit. Snapshots
/// saved here shadow the stored ones for the rest of the command.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a LedgerStorage,
    sequence: u64,
    line_items: HashMap<String, LineItemSnapshot>,
    orders: HashMap<String, SupplierOrderSnapshot>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a LedgerStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            sequence: current_sequence,
            line_items: HashMap::new(),
            orders: HashMap::new(),
        }
    }

    /// Allocate the next global sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Last allocated sequence number
    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }

    /// Load a live line item (deleted line items are reported as not found)
    pub fn load_line_item(&self, line_item_id: &str) -> Result<LineItemSnapshot, LedgerError> {
        match self.find_line_item(line_item_id)? {
            Some(snapshot) if !snapshot.deleted => Ok(snapshot),
            _ => Err(LedgerError::LineItemNotFound(line_item_id.to_string())),
        }
    }

    /// Load a line item regardless of deletion
    pub fn find_line_item(
        &self,
        line_item_id: &str,
    ) -> Result<Option<LineItemSnapshot>, LedgerError> {
        if let Some(snapshot) = self.line_items.get(line_item_id) {
            return Ok(Some(snapshot.clone()));
        }
        Ok(self.storage.get_line_item_txn(self.txn, line_item_id)?)
    }

    pub fn load_order(&self, order_id: &str) -> Result<SupplierOrderSnapshot, LedgerError> {
        self.find_order(order_id)?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))
    }

    pub fn find_order(&self, order_id: &str) -> Result<Option<SupplierOrderSnapshot>, LedgerError> {
        if let Some(snapshot) = self.orders.get(order_id) {
            return Ok(Some(snapshot.clone()));
        }
        Ok(self.storage.get_order_txn(self.txn, order_id)?)
    }

    /// Load the aggregate an event stream refers to, or an empty one
    pub fn load_aggregate(&self, stream: &StreamId) -> Result<AggregateSnapshot, LedgerError> {
        let found = match stream {
            StreamId::LineItem(id) => self.find_line_item(id)?.map(AggregateSnapshot::LineItem),
            StreamId::SupplierOrder(id) => {
                self.find_order(id)?.map(AggregateSnapshot::SupplierOrder)
            }
        };
        Ok(found.unwrap_or_else(|| AggregateSnapshot::empty(stream)))
    }

    pub fn save_aggregate(&mut self, snapshot: AggregateSnapshot) {
        match snapshot {
            AggregateSnapshot::LineItem(s) => self.save_line_item(s),
            AggregateSnapshot::SupplierOrder(s) => self.save_order(s),
        }
    }

    pub fn save_line_item(&mut self, snapshot: LineItemSnapshot) {
        self.line_items.insert(snapshot.line_item_id.clone(), snapshot);
    }

    pub fn save_order(&mut self, snapshot: SupplierOrderSnapshot) {
        self.orders.insert(snapshot.order_id.clone(), snapshot);
    }

    pub fn modified_line_items(&self) -> impl Iterator<Item = &LineItemSnapshot> {
        self.line_items.values()
    }

    pub fn modified_orders(&self) -> impl Iterator<Item = &SupplierOrderSnapshot> {
        self.orders.values()
    }
}
