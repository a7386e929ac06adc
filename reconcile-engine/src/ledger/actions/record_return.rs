//! RecordReturn command handler
//!
//! Returns are taken against the order's outstanding quantity. The
//! reorder flag decides whether the returned quantity opens a pool for a
//! later return-reorder or becomes terminal.

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use crate::utils::validation::{MAX_NOTE_LEN, require_positive, validate_text};
use rust_decimal::Decimal;
use shared::procurement::{EventPayload, LedgerEvent, LedgerEventType, StreamId};

/// RecordReturn action
#[derive(Debug, Clone)]
pub struct RecordReturnAction {
    pub order_id: String,
    pub quantity: Decimal,
    pub reason: String,
    pub reorder_requested: bool,
}

impl CommandHandler for RecordReturnAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        require_positive(self.quantity, "quantity")?;
        validate_text(&self.reason, "reason", MAX_NOTE_LEN)?;

        let order = ctx.load_order(&self.order_id)?;
        let returnable = order.remaining();
        if self.quantity > returnable {
            return Err(LedgerError::ExceedsReturnableQuantity {
                requested: self.quantity,
                returnable,
            });
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            StreamId::SupplierOrder(self.order_id.clone()),
            LedgerEventType::ReturnRecorded,
            EventPayload::ReturnRecorded {
                return_id: shared::util::new_id(),
                quantity: self.quantity,
                reason: self.reason.trim().to_string(),
                reorder_requested: self.reorder_requested,
                returned_total: order.returned_quantity + self.quantity,
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::storage::LedgerStorage;
    use crate::ledger::test_support::{create_test_metadata, dec, order, with_return};

    fn record(quantity: i64, reorder_requested: bool) -> RecordReturnAction {
        RecordReturnAction {
            order_id: "po-1".to_string(),
            quantity: dec(quantity),
            reason: " wrong grade ".to_string(),
            reorder_requested,
        }
    }

    #[test]
    fn test_record_return_generates_event() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_order(&txn, &order("po-1", "li-1", 50)).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = record(20, true).execute(&mut ctx, &create_test_metadata()).unwrap();

        assert_eq!(events[0].event_type, LedgerEventType::ReturnRecorded);
        if let EventPayload::ReturnRecorded {
            reason,
            reorder_requested,
            returned_total,
            ..
        } = &events[0].payload
        {
            assert_eq!(reason, "wrong grade");
            assert!(*reorder_requested);
            assert_eq!(*returned_total, dec(20));
        } else {
            panic!("Expected ReturnRecorded payload");
        }
    }

    #[test]
    fn test_return_beyond_outstanding_is_rejected() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_order(&txn, &with_return(order("po-1", "li-1", 50), 45, true))
            .unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = record(6, false).execute(&mut ctx, &create_test_metadata());
        assert_eq!(
            result.unwrap_err(),
            LedgerError::ExceedsReturnableQuantity {
                requested: dec(6),
                returnable: dec(5),
            }
        );
    }

    #[test]
    fn test_negative_return_is_rejected() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_order(&txn, &order("po-1", "li-1", 50)).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = record(-1, false).execute(&mut ctx, &create_test_metadata());
        assert!(matches!(result, Err(LedgerError::InvalidQuantity(_))));
    }
}
