//! DeliveryConfirmed event applier

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{DeliveryRecord, EventPayload, LedgerEvent};

/// DeliveryConfirmed applier
pub struct DeliveryConfirmedApplier;

impl EventApplier for DeliveryConfirmedApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (
            AggregateSnapshot::SupplierOrder(snapshot),
            EventPayload::DeliveryConfirmed {
                delivery_id,
                quantity,
                ..
            },
        ) = (snapshot, &event.payload)
        {
            snapshot.deliveries.push(DeliveryRecord {
                delivery_id: delivery_id.clone(),
                quantity: *quantity,
                confirmed_by: event.operator_id.clone(),
                timestamp: event.timestamp,
                history: Vec::new(),
            });
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
    use shared::procurement::{LedgerEventType, StreamId, SupplierOrderStatus};

    fn confirmed(seq: u64, quantity: i64) -> LedgerEvent {
        test_event(
            StreamId::SupplierOrder("po-1".to_string()),
            seq,
            LedgerEventType::DeliveryConfirmed,
            EventPayload::DeliveryConfirmed {
                delivery_id: format!("d-{seq}"),
                quantity: dec(quantity),
                delivered_total: dec(0),
            },
        )
    }

    #[test]
    fn test_deliveries_accumulate() {
        let mut snapshot = AggregateSnapshot::SupplierOrder(order("po-1", "li-1", 50));

        DeliveryConfirmedApplier.apply(&mut snapshot, &confirmed(3, 30));
        DeliveryConfirmedApplier.apply(&mut snapshot, &confirmed(4, 20));

        let AggregateSnapshot::SupplierOrder(order) = snapshot else {
            panic!("Expected supplier order");
        };
        assert_eq!(order.delivered_quantity, dec(50));
        assert_eq!(order.deliveries.len(), 2);
        assert_eq!(order.status(), SupplierOrderStatus::FullyDelivered);
        assert_eq!(order.last_sequence, 4);
        assert!(order.bounds_hold());
    }
}
