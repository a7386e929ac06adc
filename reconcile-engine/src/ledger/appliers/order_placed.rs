//! OrderPlaced event applier

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{EventPayload, LedgerEvent};

/// OrderPlaced applier
pub struct OrderPlacedApplier;

impl EventApplier for OrderPlacedApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (
            AggregateSnapshot::SupplierOrder(snapshot),
            EventPayload::OrderPlaced {
                line_item_id,
                request_id,
                supplier_id,
                quantity,
                delivery_date,
                is_return_reorder,
                return_sources,
            },
        ) = (snapshot, &event.payload)
        {
            snapshot.line_item_id = line_item_id.clone();
            snapshot.request_id = request_id.clone();
            snapshot.supplier_id = supplier_id.clone();
            snapshot.ordered_quantity = *quantity;
            snapshot.delivery_date_requested = *delivery_date;
            snapshot.is_return_reorder = *is_return_reorder;
            snapshot.return_sources = return_sources.clone();
            snapshot.created_at = event.timestamp;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
