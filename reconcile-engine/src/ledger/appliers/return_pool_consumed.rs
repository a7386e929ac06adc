//! ReturnPoolConsumed event applier

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{EventPayload, LedgerEvent};

/// ReturnPoolConsumed applier
pub struct ReturnPoolConsumedApplier;

impl EventApplier for ReturnPoolConsumedApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (
            AggregateSnapshot::SupplierOrder(snapshot),
            EventPayload::ReturnPoolConsumed { quantity, .. },
        ) = (snapshot, &event.payload)
        {
            snapshot.reordered_quantity += *quantity;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
