//! LineItemCreated event applier

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{EventPayload, LedgerEvent};

/// LineItemCreated applier
pub struct LineItemCreatedApplier;

impl EventApplier for LineItemCreatedApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (
            AggregateSnapshot::LineItem(snapshot),
            EventPayload::LineItemCreated {
                request_id,
                material_name,
                unit,
                quantity,
            },
        ) = (snapshot, &event.payload)
        {
            snapshot.request_id = request_id.clone();
            snapshot.material_name = material_name.clone();
            snapshot.unit = unit.clone();
            snapshot.original_quantity = *quantity;
            snapshot.remaining_quantity = *quantity;
            snapshot.created_at = event.timestamp;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
