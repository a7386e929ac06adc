//! Command pipeline: idempotency, atomicity, broadcasting, queries, replay

use super::*;

#[test]
fn test_duplicate_command_is_rejected_without_effect() {
    let manager = create_test_manager();
    let li = create_line_item(&manager, "req-1", 50);

    let command = LedgerCommand::with_command_id(
        "client-key-1",
        "op-1",
        "Test Operator",
        LedgerCommandPayload::PlaceOrder {
            line_item_id: li.clone(),
            supplier_id: "sup-1".to_string(),
            quantity: dec(20),
            delivery_date: None,
            is_return_reorder: false,
            return_source_order_ids: None,
        },
    );

    let first = manager.execute_command(command.clone());
    assert!(first.success);
    let sequence = manager.current_sequence().unwrap();

    let second = manager.execute_command(command);
    assert_rejected(&second, CommandErrorCode::DuplicateOperation);
    assert_eq!(manager.current_sequence().unwrap(), sequence);
    assert_eq!(manager.get_remaining(&li).unwrap(), dec(30));
    assert_eq!(manager.orders_for_line_item(&li).unwrap().len(), 1);
}

#[test]
fn test_rejected_command_writes_nothing() {
    let manager = create_test_manager();
    let li = create_line_item(&manager, "req-1", 10);
    let before = manager.storage().get_stats().unwrap();

    let command = LedgerCommand::with_command_id(
        "client-key-2",
        "op-1",
        "Test Operator",
        LedgerCommandPayload::PlaceOrder {
            line_item_id: li.clone(),
            supplier_id: "sup-1".to_string(),
            quantity: dec(11),
            delivery_date: None,
            is_return_reorder: false,
            return_source_order_ids: None,
        },
    );
    let resp = manager.execute_command(command.clone());
    assert_rejected(&resp, CommandErrorCode::ExceedsRemainingQuantity);

    let after = manager.storage().get_stats().unwrap();
    assert_eq!(after.event_count, before.event_count);
    assert_eq!(after.order_count, before.order_count);
    assert_eq!(after.current_sequence, before.current_sequence);

    // A rejected key is not burned: the corrected retry may reuse it
    assert!(!manager.storage().is_command_processed("client-key-2").unwrap());
}

#[test]
fn test_unknown_targets() {
    let manager = create_test_manager();

    assert_rejected(&ship(&manager, "li-404", 1), CommandErrorCode::LineItemNotFound);
    assert_rejected(&deliver(&manager, "po-404", 1), CommandErrorCode::OrderNotFound);
    assert!(matches!(
        manager.get_remaining("li-404"),
        Err(ManagerError::LineItemNotFound(_))
    ));
    assert!(matches!(
        manager.rebuild_order("po-404"),
        Err(ManagerError::OrderNotFound(_))
    ));
}

#[test]
fn test_create_line_item_validation() {
    let manager = create_test_manager();

    let resp = manager.execute_command(cmd(LedgerCommandPayload::CreateLineItem {
        request_id: "req-1".to_string(),
        material_name: "  ".to_string(),
        unit: "bag".to_string(),
        quantity: dec(5),
    }));
    assert_rejected(&resp, CommandErrorCode::ValidationFailed);

    let resp = manager.execute_command(cmd(LedgerCommandPayload::CreateLineItem {
        request_id: "req-1".to_string(),
        material_name: "Gravel".to_string(),
        unit: "m3".to_string(),
        quantity: dec(0),
    }));
    assert_rejected(&resp, CommandErrorCode::InvalidQuantity);

    assert!(manager.line_items_for_request("req-1").unwrap().is_empty());
}

#[test]
fn test_events_are_broadcast_after_commit() {
    let manager = create_test_manager();
    let mut rx = manager.subscribe();

    let li = create_line_item(&manager, "req-1", 10);
    let (resp, events) = manager.execute_command_with_events(cmd(
        LedgerCommandPayload::PlaceOrder {
            line_item_id: li.clone(),
            supplier_id: "sup-1".to_string(),
            quantity: dec(4),
            delivery_date: None,
            is_return_reorder: false,
            return_source_order_ids: None,
        },
    ));
    assert!(resp.success);
    assert_eq!(events.len(), 2);

    let created = rx.try_recv().unwrap();
    assert_eq!(created.event_type, LedgerEventType::LineItemCreated);
    let placed = rx.try_recv().unwrap();
    assert_eq!(placed.event_type, LedgerEventType::OrderPlaced);
    let linked = rx.try_recv().unwrap();
    assert_eq!(linked.event_type, LedgerEventType::OrderLinked);
    assert_eq!(linked.sequence, placed.sequence + 1);

    // Rejections broadcast nothing
    assert_rejected(&place_order(&manager, &li, 7), CommandErrorCode::ExceedsRemainingQuantity);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_request_status_transitions_are_published() {
    let manager = create_test_manager();
    let mut rx = manager.subscribe_transitions();

    let li = create_line_item(&manager, "req-1", 10);
    let t = rx.try_recv().unwrap();
    assert_eq!(t.request_id, "req-1");
    assert_eq!(t.previous, None);
    assert_eq!(t.current, Some(LineItemStatus::AwaitingFulfillment));

    // Partial shipment keeps the request awaiting: no transition
    assert!(ship(&manager, &li, 4).success);
    assert!(rx.try_recv().is_err());

    let order_id = placed_order(&manager, &li, 6);
    let t = rx.try_recv().unwrap();
    assert_eq!(t.current, Some(LineItemStatus::PartiallyFulfilled));

    assert!(deliver(&manager, &order_id, 6).success);
    let t = rx.try_recv().unwrap();
    assert_eq!(t.previous, Some(LineItemStatus::PartiallyFulfilled));
    assert_eq!(t.current, Some(LineItemStatus::FullyDelivered));
    assert_eq!(t.sequence, manager.current_sequence().unwrap());
}

#[test]
fn test_request_view_rolls_up_worst_line() {
    let manager = create_test_manager();
    let done = create_line_item(&manager, "req-1", 5);
    assert!(ship(&manager, &done, 5).success);
    let pending = create_line_item(&manager, "req-1", 5);
    let order_id = placed_order(&manager, &pending, 5);
    assert!(record_return(&manager, &order_id, 5, true).success);
    create_line_item(&manager, "req-2", 5);

    let view = manager.request_view("req-1").unwrap();
    assert_eq!(view.line_items.len(), 2);
    assert_eq!(view.status, Some(LineItemStatus::PendingReorder));
    assert_eq!(view.as_of_sequence, manager.current_sequence().unwrap());

    let empty = manager.request_view("req-404").unwrap();
    assert!(empty.line_items.is_empty());
    assert_eq!(empty.status, None);
}

#[test]
fn test_rebuild_matches_stored_snapshots() {
    let manager = create_test_manager();
    let li = create_line_item(&manager, "req-1", 50);
    assert!(ship(&manager, &li, 10).success);
    let order_id = placed_order(&manager, &li, 40);
    assert!(deliver(&manager, &order_id, 15).success);
    assert!(record_return(&manager, &order_id, 5, true).success);
    let reorder = place_reorder(&manager, &li, 5, None);
    assert!(reorder.success);

    let stored = manager.get_line_item(&li).unwrap().unwrap();
    let rebuilt = manager.rebuild_line_item(&li).unwrap();
    assert_eq!(rebuilt, stored);
    assert!(rebuilt.verify_checksum());

    let stored = manager.get_order(&order_id).unwrap().unwrap();
    let rebuilt = manager.rebuild_order(&order_id).unwrap();
    assert_eq!(rebuilt, stored);
    assert_eq!(rebuilt.reordered_quantity, dec(5));

    let line_events = manager.events_for_line_item(&li).unwrap();
    let kinds: Vec<_> = line_events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            LedgerEventType::LineItemCreated,
            LedgerEventType::ShipmentRecorded,
            LedgerEventType::OrderLinked,
            LedgerEventType::OrderLinked,
        ]
    );
    assert_eq!(manager.events_for_order(&order_id).unwrap().len(), 4);
    assert_eq!(manager.events_since(0).unwrap().len() as u64, manager.current_sequence().unwrap());
}

#[test]
fn test_fractional_quantities() {
    let manager = create_test_manager();
    let li = create_line_item(&manager, "req-1", 3);

    let resp = manager.execute_command(cmd(LedgerCommandPayload::RecordShipment {
        line_item_id: li.clone(),
        quantity: Decimal::new(125, 2),
    }));
    assert!(resp.success);
    assert_eq!(manager.get_remaining(&li).unwrap(), Decimal::new(175, 2));

    let resp = manager.execute_command(cmd(LedgerCommandPayload::PlaceOrder {
        line_item_id: li.clone(),
        supplier_id: "sup-1".to_string(),
        quantity: Decimal::new(175, 2),
        delivery_date: None,
        is_return_reorder: false,
        return_source_order_ids: None,
    }));
    assert!(resp.success);
    assert!(manager.get_remaining(&li).unwrap().is_zero());
}
