//! BaselineReset event applier

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{EventPayload, LedgerEvent};

/// BaselineReset applier
pub struct BaselineResetApplier;

impl EventApplier for BaselineResetApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (
            AggregateSnapshot::LineItem(snapshot),
            EventPayload::BaselineReset {
                new_quantity,
                material_name,
                unit,
                ..
            },
        ) = (snapshot, &event.payload)
        {
            // Only accepted while nothing is routed, so remaining resets too
            snapshot.original_quantity = *new_quantity;
            snapshot.remaining_quantity = *new_quantity;
            if let Some(name) = material_name {
                snapshot.material_name = name.clone();
            }
            if let Some(unit) = unit {
                snapshot.unit = unit.clone();
            }

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
