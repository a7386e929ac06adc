//! Reconciliation read models
//!
//! Produced by the engine for UI, document export and notification
//! collaborators. Statuses are closed enums computed on read, never stored.

use super::snapshot::SupplierOrderStatus;
use super::types::ReorderDecision;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived status of a material line item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemStatus {
    /// Depot declared the material unavailable and nothing else happened yet
    UnavailableInDepot,
    /// Returned quantity is waiting for a return-reorder or abandonment
    PendingReorder,
    /// Every order came back and none will be replaced
    FullyReturnedNoReorder,
    FullyDelivered,
    /// Fully routed but some order is still outstanding
    PartiallyFulfilled,
    AwaitingFulfillment,
}

impl LineItemStatus {
    /// Roll-up weight: the request shows its most demanding line
    pub fn severity(&self) -> u8 {
        match self {
            LineItemStatus::AwaitingFulfillment => 5,
            LineItemStatus::UnavailableInDepot => 4,
            LineItemStatus::PendingReorder => 3,
            LineItemStatus::PartiallyFulfilled => 2,
            LineItemStatus::FullyReturnedNoReorder => 1,
            LineItemStatus::FullyDelivered => 0,
        }
    }

    /// Nothing further can happen to the line without a new command from outside
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LineItemStatus::FullyDelivered | LineItemStatus::FullyReturnedNoReorder
        )
    }
}

/// Per-order row of the reconciliation view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReconciliation {
    pub order_id: String,
    pub supplier_id: String,
    pub ordered_quantity: Decimal,
    pub delivered_quantity: Decimal,
    pub returned_quantity: Decimal,
    /// ordered - delivered - returned
    pub remaining: Decimal,
    pub status: SupplierOrderStatus,
    pub is_return_reorder: bool,
    pub reorder_requested: ReorderDecision,
    /// Returned quantity still eligible for a return-reorder
    pub open_reorder_pool: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date_requested: Option<chrono::NaiveDate>,
}

/// Per-line-item row of the reconciliation view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemReconciliation {
    pub line_item_id: String,
    pub request_id: String,
    pub material_name: String,
    pub unit: String,
    pub original_quantity: Decimal,
    pub shipped_total: Decimal,
    /// Orders drawn from the requested pool
    pub ordered_total: Decimal,
    /// Orders drawn from returned quantity
    pub reordered_total: Decimal,
    pub delivered_total: Decimal,
    pub returned_total: Decimal,
    /// Returned quantity waiting for a reorder decision to be acted on
    pub pending_reorder_total: Decimal,
    pub remaining_quantity: Decimal,
    pub status: LineItemStatus,
    pub orders: Vec<OrderReconciliation>,
}

/// Reconciliation view of a whole request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestReconciliation {
    pub request_id: String,
    pub line_items: Vec<LineItemReconciliation>,
    /// Worst-case roll-up, `None` for a request without line items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LineItemStatus>,
    /// Ledger sequence the view was computed at
    pub as_of_sequence: u64,
}

/// Request-level status change, published for the notifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestStatusTransition {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<LineItemStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<LineItemStatus>,
    pub command_id: String,
    pub sequence: u64,
}
