//! Ledger snapshots - computed state from the event stream
//!
//! Both snapshots carry a `state_checksum` for drift detection. A client (or
//! the verifier) that replays the same events must arrive at the same value.

use super::types::{
    DeliveryRecord, LinkedOrder, ReorderDecision, ReturnAllocation, ReturnRecord, ShipmentRecord,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

// ============================================================================
// Material Line Item
// ============================================================================

/// Material line item of a procurement request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemSnapshot {
    pub line_item_id: String,
    pub request_id: String,
    pub material_name: String,
    pub unit: String,
    /// Baseline quantity, changed only by an explicit edit
    pub original_quantity: Decimal,
    /// Quantity not yet routed to a depot shipment or supplier order
    pub remaining_quantity: Decimal,
    /// Depot fulfillment journal (append-only)
    #[serde(default)]
    pub shipments: Vec<ShipmentRecord>,
    /// Supplier orders placed against this line item
    #[serde(default)]
    pub orders: Vec<LinkedOrder>,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
    /// Last applied event sequence
    pub last_sequence: u64,
    #[serde(default)]
    pub state_checksum: String,
}

impl LineItemSnapshot {
    /// Create an empty line item, populated by `LineItemCreated`
    pub fn new(line_item_id: String) -> Self {
        let now = crate::util::now_millis();
        let mut snapshot = Self {
            line_item_id,
            request_id: String::new(),
            material_name: String::new(),
            unit: String::new(),
            original_quantity: Decimal::ZERO,
            remaining_quantity: Decimal::ZERO,
            shipments: Vec::new(),
            orders: Vec::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
            last_sequence: 0,
            state_checksum: String::new(),
        };
        snapshot.update_checksum();
        snapshot
    }

    /// Sum of depot shipments
    pub fn shipped_total(&self) -> Decimal {
        self.shipments.iter().map(|s| s.shipped_quantity).sum()
    }

    /// Sum of orders drawn from the requested pool (return-reorders excluded)
    pub fn supplier_ordered_total(&self) -> Decimal {
        self.orders
            .iter()
            .filter(|o| !o.is_return_reorder)
            .map(|o| o.quantity)
            .sum()
    }

    /// Sum of orders drawn from returned quantity
    pub fn reorder_total(&self) -> Decimal {
        self.orders
            .iter()
            .filter(|o| o.is_return_reorder)
            .map(|o| o.quantity)
            .sum()
    }

    /// A zero-quantity "not available in depot" marker exists
    pub fn is_declared_unavailable(&self) -> bool {
        self.shipments.iter().any(ShipmentRecord::is_unavailable_marker)
    }

    pub fn has_positive_shipment(&self) -> bool {
        self.shipments.iter().any(|s| s.shipped_quantity > Decimal::ZERO)
    }

    /// Any shipment or order references this line item
    pub fn has_dependents(&self) -> bool {
        !self.shipments.is_empty() || !self.orders.is_empty()
    }

    /// Nothing has been routed out of the requested pool yet
    pub fn is_fully_unshipped(&self) -> bool {
        self.remaining_quantity == self.original_quantity
    }

    /// `remaining + shipped + ordered == original` and `0 <= remaining <= original`
    pub fn conservation_holds(&self) -> bool {
        self.remaining_quantity >= Decimal::ZERO
            && self.remaining_quantity <= self.original_quantity
            && self.remaining_quantity + self.shipped_total() + self.supplier_ordered_total()
                == self.original_quantity
    }

    pub fn compute_checksum(&self) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.shipments.len().hash(&mut hasher);
        self.orders.len().hash(&mut hasher);
        self.original_quantity.normalize().hash(&mut hasher);
        self.remaining_quantity.normalize().hash(&mut hasher);
        self.deleted.hash(&mut hasher);
        self.last_sequence.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    pub fn update_checksum(&mut self) {
        self.state_checksum = self.compute_checksum();
    }

    pub fn verify_checksum(&self) -> bool {
        self.state_checksum == self.compute_checksum()
    }
}

// ============================================================================
// Supplier Order
// ============================================================================

/// Lifecycle state of a supplier order, derived from its quantities
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierOrderStatus {
    Placed,
    PartiallyDelivered,
    FullyDelivered,
    FullyReturned,
}

/// Purchase order placed with a supplier for part of a line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplierOrderSnapshot {
    pub order_id: String,
    pub line_item_id: String,
    pub request_id: String,
    pub supplier_id: String,
    pub ordered_quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date_requested: Option<chrono::NaiveDate>,
    /// Running total of effective deliveries
    pub delivered_quantity: Decimal,
    /// Running total of returns
    pub returned_quantity: Decimal,
    /// Order replaces quantity returned on earlier orders
    #[serde(default)]
    pub is_return_reorder: bool,
    /// Returned-pool portions this order consumes (return-reorders only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub return_sources: Vec<ReturnAllocation>,
    /// Latest return decision (latest event wins)
    #[serde(default)]
    pub reorder_requested: ReorderDecision,
    /// Returned quantity already replaced by return-reorder orders
    #[serde(default)]
    pub reordered_quantity: Decimal,
    /// Returned quantity explicitly given up
    #[serde(default)]
    pub abandoned_quantity: Decimal,
    #[serde(default)]
    pub deliveries: Vec<DeliveryRecord>,
    #[serde(default)]
    pub returns: Vec<ReturnRecord>,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_sequence: u64,
    #[serde(default)]
    pub state_checksum: String,
}

impl SupplierOrderSnapshot {
    /// Create an empty order, populated by `OrderPlaced`
    pub fn new(order_id: String) -> Self {
        let now = crate::util::now_millis();
        let mut snapshot = Self {
            order_id,
            line_item_id: String::new(),
            request_id: String::new(),
            supplier_id: String::new(),
            ordered_quantity: Decimal::ZERO,
            delivery_date_requested: None,
            delivered_quantity: Decimal::ZERO,
            returned_quantity: Decimal::ZERO,
            is_return_reorder: false,
            return_sources: Vec::new(),
            reorder_requested: ReorderDecision::Undecided,
            reordered_quantity: Decimal::ZERO,
            abandoned_quantity: Decimal::ZERO,
            deliveries: Vec::new(),
            returns: Vec::new(),
            created_at: now,
            updated_at: now,
            last_sequence: 0,
            state_checksum: String::new(),
        };
        snapshot.update_checksum();
        snapshot
    }

    /// Quantity neither delivered nor returned
    pub fn remaining(&self) -> Decimal {
        self.ordered_quantity - self.delivered_quantity - self.returned_quantity
    }

    /// Returned wins over delivered for display
    pub fn status(&self) -> SupplierOrderStatus {
        if self.returned_quantity >= self.ordered_quantity {
            SupplierOrderStatus::FullyReturned
        } else if self.delivered_quantity >= self.ordered_quantity {
            SupplierOrderStatus::FullyDelivered
        } else if self.delivered_quantity > Decimal::ZERO
            || self.returned_quantity > Decimal::ZERO
        {
            SupplierOrderStatus::PartiallyDelivered
        } else {
            SupplierOrderStatus::Placed
        }
    }

    /// Returned quantity whose return asked for a replacement
    pub fn requested_returned(&self) -> Decimal {
        self.returns
            .iter()
            .filter(|r| r.reorder_requested)
            .map(|r| r.quantity)
            .sum()
    }

    /// Returned quantity declined at return time
    pub fn declined_returned(&self) -> Decimal {
        self.returns
            .iter()
            .filter(|r| !r.reorder_requested)
            .map(|r| r.quantity)
            .sum()
    }

    /// Returned quantity still eligible for a return-reorder
    ///
    /// Each return keeps its own decision. A later return never reopens
    /// declined quantity nor closes a requested one.
    pub fn open_reorder_pool(&self) -> Decimal {
        (self.requested_returned() - self.reordered_quantity - self.abandoned_quantity)
            .max(Decimal::ZERO)
    }

    /// Returned quantity that will never be replaced
    pub fn terminal_returned(&self) -> Decimal {
        self.declined_returned() + self.abandoned_quantity
    }

    /// Nothing outstanding with the supplier and no reorder decision pending
    pub fn is_settled(&self) -> bool {
        self.remaining().is_zero() && self.open_reorder_pool().is_zero()
    }

    /// Every unit ordered came back and none of it will be replaced,
    /// whether declined at return time or abandoned afterwards
    pub fn is_fully_returned_without_reorder(&self) -> bool {
        self.status() == SupplierOrderStatus::FullyReturned
            && self.terminal_returned() >= self.returned_quantity
    }

    /// Sum of effective delivery quantities (authoritative running total)
    pub fn delivery_history_total(&self) -> Decimal {
        self.deliveries.iter().map(|d| d.quantity).sum()
    }

    pub fn find_delivery(&self, delivery_id: &str) -> Option<&DeliveryRecord> {
        self.deliveries.iter().find(|d| d.delivery_id == delivery_id)
    }

    /// `delivered + returned <= ordered`, totals agree with their records
    pub fn bounds_hold(&self) -> bool {
        let returns_total: Decimal = self.returns.iter().map(|r| r.quantity).sum();
        self.delivered_quantity >= Decimal::ZERO
            && self.returned_quantity >= Decimal::ZERO
            && self.delivered_quantity + self.returned_quantity <= self.ordered_quantity
            && self.delivered_quantity == self.delivery_history_total()
            && self.returned_quantity == returns_total
    }

    pub fn compute_checksum(&self) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.deliveries.len().hash(&mut hasher);
        self.returns.len().hash(&mut hasher);
        self.ordered_quantity.normalize().hash(&mut hasher);
        self.delivered_quantity.normalize().hash(&mut hasher);
        self.returned_quantity.normalize().hash(&mut hasher);
        self.reordered_quantity.normalize().hash(&mut hasher);
        self.abandoned_quantity.normalize().hash(&mut hasher);
        (self.reorder_requested as u8).hash(&mut hasher);
        self.last_sequence.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    pub fn update_checksum(&mut self) {
        self.state_checksum = self.compute_checksum();
    }

    pub fn verify_checksum(&self) -> bool {
        self.state_checksum == self.compute_checksum()
    }
}
