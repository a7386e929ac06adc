//! OrderLinked event applier
//!
//! Line-item side of an order placement. Return-reorders draw from the
//! returned pool of the source orders, not from the remaining quantity.

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{EventPayload, LedgerEvent, LinkedOrder};

/// OrderLinked applier
pub struct OrderLinkedApplier;

impl EventApplier for OrderLinkedApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (
            AggregateSnapshot::LineItem(snapshot),
            EventPayload::OrderLinked {
                order_id,
                supplier_id,
                quantity,
                is_return_reorder,
                ..
            },
        ) = (snapshot, &event.payload)
        {
            snapshot.orders.push(LinkedOrder {
                order_id: order_id.clone(),
                supplier_id: supplier_id.clone(),
                quantity: *quantity,
                is_return_reorder: *is_return_reorder,
            });
            if !*is_return_reorder {
                snapshot.remaining_quantity -= *quantity;
            }

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
