use super::*;
use shared::procurement::{CommandErrorCode, SupplierOrderStatus};

fn create_test_manager() -> LedgerManager {
    let storage = LedgerStorage::open_in_memory().unwrap();
    LedgerManager::with_storage(storage)
}

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

fn cmd(payload: LedgerCommandPayload) -> LedgerCommand {
    LedgerCommand::new("op-1", "Test Operator", payload)
}

fn assert_rejected(response: &CommandResponse, code: CommandErrorCode) {
    assert!(!response.success, "expected {code:?}, command succeeded");
    assert_eq!(response.error_code(), Some(&code), "{:?}", response.error);
}

// ========================================================================
// Helpers: one command each, asserting success where an id is returned
// ========================================================================

fn create_line_item(manager: &LedgerManager, request_id: &str, quantity: i64) -> String {
    let resp = manager.execute_command(cmd(LedgerCommandPayload::CreateLineItem {
        request_id: request_id.to_string(),
        material_name: "Portland cement".to_string(),
        unit: "bag".to_string(),
        quantity: dec(quantity),
    }));
    assert!(resp.success, "Failed to create line item: {:?}", resp.error);
    resp.line_item_id.unwrap()
}

fn ship(manager: &LedgerManager, line_item_id: &str, quantity: i64) -> CommandResponse {
    manager.execute_command(cmd(LedgerCommandPayload::RecordShipment {
        line_item_id: line_item_id.to_string(),
        quantity: dec(quantity),
    }))
}

fn place_order(manager: &LedgerManager, line_item_id: &str, quantity: i64) -> CommandResponse {
    manager.execute_command(cmd(LedgerCommandPayload::PlaceOrder {
        line_item_id: line_item_id.to_string(),
        supplier_id: "sup-1".to_string(),
        quantity: dec(quantity),
        delivery_date: chrono::NaiveDate::from_ymd_opt(2026, 11, 2),
        is_return_reorder: false,
        return_source_order_ids: None,
    }))
}

fn placed_order(manager: &LedgerManager, line_item_id: &str, quantity: i64) -> String {
    let resp = place_order(manager, line_item_id, quantity);
    assert!(resp.success, "Failed to place order: {:?}", resp.error);
    resp.order_id.unwrap()
}

fn place_reorder(
    manager: &LedgerManager,
    line_item_id: &str,
    quantity: i64,
    sources: Option<Vec<String>>,
) -> CommandResponse {
    manager.execute_command(cmd(LedgerCommandPayload::PlaceOrder {
        line_item_id: line_item_id.to_string(),
        supplier_id: "sup-2".to_string(),
        quantity: dec(quantity),
        delivery_date: None,
        is_return_reorder: true,
        return_source_order_ids: sources,
    }))
}

fn deliver(manager: &LedgerManager, order_id: &str, quantity: i64) -> CommandResponse {
    manager.execute_command(cmd(LedgerCommandPayload::ConfirmDelivery {
        order_id: order_id.to_string(),
        quantity: dec(quantity),
    }))
}

fn record_return(
    manager: &LedgerManager,
    order_id: &str,
    quantity: i64,
    reorder_requested: bool,
) -> CommandResponse {
    manager.execute_command(cmd(LedgerCommandPayload::RecordReturn {
        order_id: order_id.to_string(),
        quantity: dec(quantity),
        reason: "damaged on arrival".to_string(),
        reorder_requested,
    }))
}

fn order_status(manager: &LedgerManager, order_id: &str) -> SupplierOrderStatus {
    manager.get_order(order_id).unwrap().unwrap().status()
}

fn line_status(manager: &LedgerManager, line_item_id: &str) -> LineItemStatus {
    manager.line_item_view(line_item_id).unwrap().status
}

mod test_core;
