//! AbandonReorder command handler
//!
//! Closes some or all of an order's open reorder pool without placing a
//! replacement. The returned quantity stays on record.

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use crate::utils::validation::{MAX_NOTE_LEN, require_positive, validate_optional_text};
use rust_decimal::Decimal;
use shared::procurement::{CommandErrorCode, EventPayload, LedgerEvent, LedgerEventType, StreamId};

/// AbandonReorder action
#[derive(Debug, Clone)]
pub struct AbandonReorderAction {
    pub order_id: String,
    /// None = the whole open pool
    pub quantity: Option<Decimal>,
    pub reason: Option<String>,
}

impl CommandHandler for AbandonReorderAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        validate_optional_text(&self.reason, "reason", MAX_NOTE_LEN)?;

        let order = ctx.load_order(&self.order_id)?;
        let open = order.open_reorder_pool();
        if open.is_zero() {
            return Err(LedgerError::InvalidOperation(
                CommandErrorCode::InvalidOperation,
                format!("Order {} has no returned quantity awaiting reorder", self.order_id),
            ));
        }

        let quantity = self.quantity.unwrap_or(open);
        require_positive(quantity, "quantity")?;
        if quantity > open {
            return Err(LedgerError::ExceedsReturnedQuantity {
                requested: quantity,
                available: open,
            });
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            StreamId::SupplierOrder(self.order_id.clone()),
            LedgerEventType::ReorderAbandoned,
            EventPayload::ReorderAbandoned {
                quantity,
                reason: self
                    .reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string),
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

    #[test]
    fn test_abandon_whole_pool_by_default() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut source = with_return(order("po-1", "li-1", 50), 20, true);
        source.reordered_quantity = dec(5);
        storage.store_order(&txn, &source).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = AbandonReorderAction {
            order_id: "po-1".to_string(),
            quantity: None,
            reason: Some("site closed".to_string()),
        };
        let events = action.execute(&mut ctx, &create_test_metadata()).unwrap();

        if let EventPayload::ReorderAbandoned { quantity, reason } = &events[0].payload {
            assert_eq!(*quantity, dec(15));
            assert_eq!(reason.as_deref(), Some("site closed"));
        } else {
            panic!("Expected ReorderAbandoned payload");
        }
    }

    #[test]
    fn test_abandon_more_than_open_is_rejected() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_order(&txn, &with_return(order("po-1", "li-1", 50), 20, true))
            .unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = AbandonReorderAction {
            order_id: "po-1".to_string(),
            quantity: Some(dec(21)),
            reason: None,
        };
        assert!(matches!(
            action.execute(&mut ctx, &create_test_metadata()),
            Err(LedgerError::ExceedsReturnedQuantity { .. })
        ));
    }

    #[test]
    fn test_abandon_without_pool_is_rejected() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .store_order(&txn, &with_return(order("po-1", "li-1", 50), 20, false))
            .unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let action = AbandonReorderAction {
            order_id: "po-1".to_string(),
            quantity: None,
            reason: None,
        };
        assert!(matches!(
            action.execute(&mut ctx, &create_test_metadata()),
            Err(LedgerError::InvalidOperation(CommandErrorCode::InvalidOperation, _))
        ));
    }
}
