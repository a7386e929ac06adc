//! ReturnRecorded event applier
//!
//! The order's displayed reorder decision follows the latest return. The
//! reorder pool is derived from the decision stored on each return record.

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{EventPayload, LedgerEvent, ReorderDecision, ReturnRecord};

/// ReturnRecorded applier
pub struct ReturnRecordedApplier;

impl EventApplier for ReturnRecordedApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (
            AggregateSnapshot::SupplierOrder(snapshot),
            EventPayload::ReturnRecorded {
                return_id,
                quantity,
                reason,
                reorder_requested,
                ..
            },
        ) = (snapshot, &event.payload)
        {
            snapshot.returns.push(ReturnRecord {
                return_id: return_id.clone(),
                quantity: *quantity,
                reason: reason.clone(),
                reorder_requested: *reorder_requested,
                recorded_by: event.operator_id.clone(),
                timestamp: event.timestamp,
            });
            snapshot.returned_quantity += *quantity;
            snapshot.reorder_requested = ReorderDecision::from_flag(*reorder_requested);

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

    fn returned(seq: u64, quantity: i64, reorder_requested: bool) -> LedgerEvent {
        test_event(
            StreamId::SupplierOrder("po-1".to_string()),
            seq,
            LedgerEventType::ReturnRecorded,
            EventPayload::ReturnRecorded {
                return_id: format!("r-{seq}"),
                quantity: dec(quantity),
                reason: "damaged".to_string(),
                reorder_requested,
                returned_total: dec(0),
            },
        )
    }

    #[test]
    fn test_return_opens_reorder_pool() {
        let mut snapshot = AggregateSnapshot::SupplierOrder(order("po-1", "li-1", 50));

        ReturnRecordedApplier.apply(&mut snapshot, &returned(3, 20, true));

        let AggregateSnapshot::SupplierOrder(order) = snapshot else {
            panic!("Expected supplier order");
        };
        assert_eq!(order.returned_quantity, dec(20));
        assert_eq!(order.open_reorder_pool(), dec(20));
        assert_eq!(order.status(), SupplierOrderStatus::PartiallyDelivered);
    }

    #[test]
    fn test_latest_decision_is_displayed_but_pool_follows_records() {
        let mut snapshot = AggregateSnapshot::SupplierOrder(order("po-1", "li-1", 50));

        ReturnRecordedApplier.apply(&mut snapshot, &returned(3, 20, true));
        ReturnRecordedApplier.apply(&mut snapshot, &returned(4, 30, false));

        let AggregateSnapshot::SupplierOrder(order) = snapshot else {
            panic!("Expected supplier order");
        };
        assert_eq!(order.reorder_requested, ReorderDecision::Declined);
        assert_eq!(order.open_reorder_pool(), dec(20));
        assert_eq!(order.terminal_returned(), dec(30));
        assert!(!order.is_fully_returned_without_reorder());
    }

    #[test]
    fn test_declined_full_return_is_terminal() {
        let mut snapshot = AggregateSnapshot::SupplierOrder(order("po-1", "li-1", 50));

        ReturnRecordedApplier.apply(&mut snapshot, &returned(3, 50, false));

        let AggregateSnapshot::SupplierOrder(order) = snapshot else {
            panic!("Expected supplier order");
        };
        assert_eq!(order.open_reorder_pool(), dec(0));
        assert!(order.is_fully_returned_without_reorder());
    }
}
