//! ShipmentRecorded event applier

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{EventPayload, LedgerEvent, ShipmentRecord};

/// ShipmentRecorded applier
pub struct ShipmentRecordedApplier;

impl EventApplier for ShipmentRecordedApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (
            AggregateSnapshot::LineItem(snapshot),
            EventPayload::ShipmentRecorded {
                shipment_id,
                shipped_quantity,
                ..
            },
        ) = (snapshot, &event.payload)
        {
            snapshot.shipments.push(ShipmentRecord {
                shipment_id: shipment_id.clone(),
                shipped_quantity: *shipped_quantity,
                performed_by: event.operator_id.clone(),
                timestamp: event.timestamp,
            });
            snapshot.remaining_quantity -= *shipped_quantity;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
