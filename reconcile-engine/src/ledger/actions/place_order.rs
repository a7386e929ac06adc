//! PlaceOrder command handler
//!
//! A normal order draws from the line item's remaining pool. A return-reorder
//! draws from the open returned quantity of earlier orders of the same line
//! item and leaves the remaining pool untouched.
//!
//! Events, in sequence order:
//! 1. `OrderPlaced` on the new order stream
//! 2. `OrderLinked` on the line item stream
//! 3. `ReturnPoolConsumed` on every source order (return-reorders only)

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use crate::utils::validation::{MAX_SHORT_TEXT_LEN, require_positive, validate_required_text};
use rust_decimal::Decimal;
use shared::procurement::{
    CommandErrorCode, EventPayload, LedgerEvent, LedgerEventType, LineItemSnapshot,
    ReturnAllocation, StreamId, SupplierOrderSnapshot,
};

/// PlaceOrder action
#[derive(Debug, Clone)]
pub struct PlaceOrderAction {
    pub line_item_id: String,
    pub supplier_id: String,
    pub quantity: Decimal,
    pub delivery_date: Option<chrono::NaiveDate>,
    pub is_return_reorder: bool,
    /// None = every order of the line item with an open reorder pool
    pub return_source_order_ids: Option<Vec<String>>,
}

impl CommandHandler for PlaceOrderAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        validate_required_text(&self.supplier_id, "supplier_id", MAX_SHORT_TEXT_LEN)?;
        require_positive(self.quantity, "quantity")?;

        let line_item = ctx.load_line_item(&self.line_item_id)?;

        let (return_sources, remaining_after) = if self.is_return_reorder {
            let sources = self.resolve_sources(ctx, &line_item)?;
            (allocate(&sources, self.quantity)?, line_item.remaining_quantity)
        } else {
            if self.quantity > line_item.remaining_quantity {
                return Err(LedgerError::ExceedsRemainingQuantity {
                    requested: self.quantity,
                    remaining: line_item.remaining_quantity,
                });
            }
            (Vec::new(), line_item.remaining_quantity - self.quantity)
        };

        let order_id = shared::util::new_id();
        tracing::debug!(
            order_id = %order_id,
            line_item_id = %self.line_item_id,
            quantity = %self.quantity,
            is_return_reorder = self.is_return_reorder,
            "Placing supplier order"
        );

        let mut events = Vec::with_capacity(2 + return_sources.len());

        let seq = ctx.next_sequence();
        events.push(metadata.event(
            seq,
            StreamId::SupplierOrder(order_id.clone()),
            LedgerEventType::OrderPlaced,
            EventPayload::OrderPlaced {
                line_item_id: self.line_item_id.clone(),
                request_id: line_item.request_id.clone(),
                supplier_id: self.supplier_id.clone(),
                quantity: self.quantity,
                delivery_date: self.delivery_date,
                is_return_reorder: self.is_return_reorder,
                return_sources: return_sources.clone(),
            },
        ));

        let seq = ctx.next_sequence();
        events.push(metadata.event(
            seq,
            StreamId::LineItem(self.line_item_id.clone()),
            LedgerEventType::OrderLinked,
            EventPayload::OrderLinked {
                order_id: order_id.clone(),
                supplier_id: self.supplier_id.clone(),
                quantity: self.quantity,
                is_return_reorder: self.is_return_reorder,
                remaining_after,
            },
        ));

        for allocation in return_sources {
            let seq = ctx.next_sequence();
            events.push(metadata.event(
                seq,
                StreamId::SupplierOrder(allocation.source_order_id),
                LedgerEventType::ReturnPoolConsumed,
                EventPayload::ReturnPoolConsumed {
                    reorder_order_id: order_id.clone(),
                    quantity: allocation.quantity,
                },
            ));
        }

        Ok(events)
    }
}

impl PlaceOrderAction {
    /// Source orders for a return-reorder, in placement order
    fn resolve_sources(
        &self,
        ctx: &CommandContext<'_>,
        line_item: &LineItemSnapshot,
    ) -> Result<Vec<SupplierOrderSnapshot>, LedgerError> {
        match &self.return_source_order_ids {
            Some(ids) => {
                let mut sources: Vec<SupplierOrderSnapshot> = Vec::with_capacity(ids.len());
                for id in ids {
                    if sources.iter().any(|s| &s.order_id == id) {
                        continue;
                    }
                    let source = ctx.load_order(id)?;
                    if source.line_item_id != self.line_item_id {
                        return Err(LedgerError::InvalidOperation(
                            CommandErrorCode::InvalidOperation,
                            format!(
                                "Order {} belongs to line item {}, not {}",
                                id, source.line_item_id, self.line_item_id
                            ),
                        ));
                    }
                    if source.requested_returned().is_zero() {
                        return Err(LedgerError::InvalidOperation(
                            CommandErrorCode::InvalidOperation,
                            format!("Order {id} has no return marked for reorder"),
                        ));
                    }
                    sources.push(source);
                }
                Ok(sources)
            }
            None => {
                let mut sources = Vec::new();
                for linked in &line_item.orders {
                    let source = ctx.load_order(&linked.order_id)?;
                    if source.open_reorder_pool() > Decimal::ZERO {
                        sources.push(source);
                    }
                }
                Ok(sources)
            }
        }
    }
}

/// Spread `quantity` greedily over the sources' open reorder pools
fn allocate(
    sources: &[SupplierOrderSnapshot],
    quantity: Decimal,
) -> Result<Vec<ReturnAllocation>, LedgerError> {
    let available: Decimal = sources.iter().map(|s| s.open_reorder_pool()).sum();
    if quantity > available {
        return Err(LedgerError::ExceedsReturnedQuantity {
            requested: quantity,
            available,
        });
    }

    let mut left = quantity;
    let mut allocations = Vec::new();
    for source in sources {
        if left.is_zero() {
            break;
        }
        let take = source.open_reorder_pool().min(left);
        if take > Decimal::ZERO {
            allocations.push(ReturnAllocation {
                source_order_id: source.order_id.clone(),
                quantity: take,
            });
            left -= take;
        }
    }

    Ok(allocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::storage::LedgerStorage;
    use crate::ledger::test_support::{
        create_test_metadata, dec, line_item, linked, order, with_return,
    };

    fn normal(quantity: i64) -> PlaceOrderAction {
        PlaceOrderAction {
            line_item_id: "li-1".to_string(),
            supplier_id: "sup-1".to_string(),
            quantity: dec(quantity),
            delivery_date: chrono::NaiveDate::from_ymd_opt(2026, 11, 2),
            is_return_reorder: false,
            return_source_order_ids: None,
        }
    }

    fn reorder(quantity: i64, sources: Option<Vec<&str>>) -> PlaceOrderAction {
        PlaceOrderAction {
            is_return_reorder: true,
            return_source_order_ids: sources
                .map(|ids| ids.into_iter().map(str::to_string).collect()),
            ..normal(quantity)
        }
    }

    #[test]
    fn test_normal_order_draws_from_remaining() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_line_item(&txn, &line_item("li-1", 100, 40)).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = normal(40).execute(&mut ctx, &create_test_metadata()).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, LedgerEventType::OrderPlaced);
        assert_eq!(events[1].event_type, LedgerEventType::OrderLinked);
        assert_eq!(events[0].sequence + 1, events[1].sequence);
        if let EventPayload::OrderLinked {
            order_id,
            remaining_after,
            ..
        } = &events[1].payload
        {
            assert_eq!(order_id, events[0].stream.id());
            assert_eq!(*remaining_after, Decimal::ZERO);
        } else {
            panic!("Expected OrderLinked payload");
        }
    }

    #[test]
    fn test_normal_order_over_remaining_fails() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_line_item(&txn, &line_item("li-1", 100, 40)).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = normal(41).execute(&mut ctx, &create_test_metadata());
        assert_eq!(
            result.unwrap_err(),
            LedgerError::ExceedsRemainingQuantity {
                requested: dec(41),
                remaining: dec(40),
            }
        );
    }

    #[test]
    fn test_reorder_consumes_returned_pool() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut li = line_item("li-1", 50, 0);
        li.orders.push(linked("po-1", 50, false));
        storage.store_line_item(&txn, &li).unwrap();
        storage
            .store_order(&txn, &with_return(order("po-1", "li-1", 50), 20, true))
            .unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = reorder(20, Some(vec!["po-1"]))
            .execute(&mut ctx, &create_test_metadata())
            .unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[2].event_type, LedgerEventType::ReturnPoolConsumed);
        assert_eq!(events[2].stream, StreamId::SupplierOrder("po-1".to_string()));
        if let EventPayload::OrderLinked {
            remaining_after, ..
        } = &events[1].payload
        {
            assert_eq!(*remaining_after, Decimal::ZERO);
        } else {
            panic!("Expected OrderLinked payload");
        }
    }

    #[test]
    fn test_reorder_beyond_returned_fails() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut li = line_item("li-1", 50, 0);
        li.orders.push(linked("po-1", 50, false));
        storage.store_line_item(&txn, &li).unwrap();
        storage
            .store_order(&txn, &with_return(order("po-1", "li-1", 50), 20, true))
            .unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = reorder(21, Some(vec!["po-1"])).execute(&mut ctx, &create_test_metadata());
        assert!(matches!(
            result,
            Err(LedgerError::ExceedsReturnedQuantity { .. })
        ));
    }

    #[test]
    fn test_reorder_subtracts_already_reordered() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut li = line_item("li-1", 50, 0);
        li.orders.push(linked("po-1", 50, false));
        storage.store_line_item(&txn, &li).unwrap();
        let mut source = with_return(order("po-1", "li-1", 50), 20, true);
        source.reordered_quantity = dec(15);
        storage.store_order(&txn, &source).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = reorder(6, None).execute(&mut ctx, &create_test_metadata());
        assert_eq!(
            result.unwrap_err(),
            LedgerError::ExceedsReturnedQuantity {
                requested: dec(6),
                available: dec(5),
            }
        );
    }

    #[test]
    fn test_reorder_default_sources_spread_greedily() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut li = line_item("li-1", 60, 0);
        li.orders.push(linked("po-1", 30, false));
        li.orders.push(linked("po-2", 30, false));
        storage.store_line_item(&txn, &li).unwrap();
        storage
            .store_order(&txn, &with_return(order("po-1", "li-1", 30), 4, true))
            .unwrap();
        storage
            .store_order(&txn, &with_return(order("po-2", "li-1", 30), 10, true))
            .unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = reorder(9, None).execute(&mut ctx, &create_test_metadata()).unwrap();

        if let EventPayload::OrderPlaced { return_sources, .. } = &events[0].payload {
            assert_eq!(
                return_sources,
                &vec![
                    ReturnAllocation {
                        source_order_id: "po-1".to_string(),
                        quantity: dec(4),
                    },
                    ReturnAllocation {
                        source_order_id: "po-2".to_string(),
                        quantity: dec(5),
                    },
                ]
            );
        } else {
            panic!("Expected OrderPlaced payload");
        }
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_reorder_from_declined_return_is_rejected() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut li = line_item("li-1", 50, 0);
        li.orders.push(linked("po-1", 50, false));
        storage.store_line_item(&txn, &li).unwrap();
        storage
            .store_order(&txn, &with_return(order("po-1", "li-1", 50), 20, false))
            .unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let metadata = create_test_metadata();

        let explicit = reorder(5, Some(vec!["po-1"])).execute(&mut ctx, &metadata);
        assert!(matches!(
            explicit,
            Err(LedgerError::InvalidOperation(CommandErrorCode::InvalidOperation, _))
        ));

        // Without explicit sources a declined return simply contributes nothing
        let implicit = reorder(5, None).execute(&mut ctx, &metadata);
        assert!(matches!(
            implicit,
            Err(LedgerError::ExceedsReturnedQuantity { .. })
        ));
    }

    #[test]
    fn test_reorder_source_from_other_line_item_is_rejected() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_line_item(&txn, &line_item("li-1", 50, 50)).unwrap();
        storage
            .store_order(&txn, &with_return(order("po-9", "li-2", 50), 20, true))
            .unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = reorder(5, Some(vec!["po-9"])).execute(&mut ctx, &create_test_metadata());
        assert!(matches!(result, Err(LedgerError::InvalidOperation(_, _))));
    }
}
