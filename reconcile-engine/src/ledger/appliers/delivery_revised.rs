//! DeliveryRevised event applier
//!
//! The record keeps its id; the replaced value is pushed onto its history.

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{DeliveryRevision, EventPayload, LedgerEvent};

/// DeliveryRevised applier
pub struct DeliveryRevisedApplier;

impl EventApplier for DeliveryRevisedApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (
            AggregateSnapshot::SupplierOrder(snapshot),
            EventPayload::DeliveryRevised {
                delivery_id,
                new_quantity,
                ..
            },
        ) = (snapshot, &event.payload)
        {
            if let Some(record) = snapshot
                .deliveries
                .iter_mut()
                .find(|d| &d.delivery_id == delivery_id)
            {
                record.history.push(DeliveryRevision {
                    previous_quantity: record.quantity,
                    revised_by: event.operator_id.clone(),
                    revised_at: event.timestamp,
                });
                record.quantity = *new_quantity;
            }
            snapshot.delivered_quantity = snapshot.delivery_history_total();

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::{dec, order, test_event};
    use shared::procurement::{DeliveryRecord, LedgerEventType, StreamId};

    #[test]
    fn test_revision_keeps_history() {
        let mut base = order("po-1", "li-1", 50);
        base.deliveries.push(DeliveryRecord {
            delivery_id: "d-1".to_string(),
            quantity: dec(30),
            confirmed_by: "op-1".to_string(),
            timestamp: 0,
            history: vec![],
        });
        base.delivered_quantity = dec(30);
        let mut snapshot = AggregateSnapshot::SupplierOrder(base);

        let event = test_event(
            StreamId::SupplierOrder("po-1".to_string()),
            7,
            LedgerEventType::DeliveryRevised,
            EventPayload::DeliveryRevised {
                delivery_id: "d-1".to_string(),
                previous_quantity: dec(30),
                new_quantity: dec(25),
                delivered_total: dec(25),
            },
        );
        DeliveryRevisedApplier.apply(&mut snapshot, &event);

        let AggregateSnapshot::SupplierOrder(order) = snapshot else {
            panic!("Expected supplier order");
        };
        assert_eq!(order.delivered_quantity, dec(25));
        let record = order.find_delivery("d-1").unwrap();
        assert_eq!(record.quantity, dec(25));
        assert_eq!(record.history.len(), 1);
        assert_eq!(record.history[0].previous_quantity, dec(30));
        assert_eq!(record.history[0].revised_by, "op-1");
    }
}
