//! ReorderAbandoned event applier

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{EventPayload, LedgerEvent};

/// ReorderAbandoned applier
pub struct ReorderAbandonedApplier;

impl EventApplier for ReorderAbandonedApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (
            AggregateSnapshot::SupplierOrder(snapshot),
            EventPayload::ReorderAbandoned { quantity, .. },
        ) = (snapshot, &event.payload)
        {
            snapshot.abandoned_quantity += *quantity;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::{dec, order, test_event, with_return};
    use shared::procurement::{LedgerEventType, StreamId};

    #[test]
    fn test_abandon_shrinks_pool_and_counts_as_terminal() {
        let mut snapshot =
            AggregateSnapshot::SupplierOrder(with_return(order("po-1", "li-1", 50), 20, true));
        let event = test_event(
            StreamId::SupplierOrder("po-1".to_string()),
            9,
            LedgerEventType::ReorderAbandoned,
            EventPayload::ReorderAbandoned {
                quantity: dec(8),
                reason: None,
            },
        );

        ReorderAbandonedApplier.apply(&mut snapshot, &event);

        let AggregateSnapshot::SupplierOrder(order) = snapshot else {
            panic!("Expected supplier order");
        };
        assert_eq!(order.open_reorder_pool(), dec(12));
        assert_eq!(order.terminal_returned(), dec(8));
        assert!(order.verify_checksum());
    }
}
