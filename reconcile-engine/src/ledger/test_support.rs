//! Fixtures shared by action and applier tests

use super::traits::CommandMetadata;
use rust_decimal::Decimal;
use shared::procurement::{
    LineItemSnapshot, LinkedOrder, ReorderDecision, ReturnRecord, ShipmentRecord,
    SupplierOrderSnapshot,
};

pub fn create_test_metadata() -> CommandMetadata {
    CommandMetadata {
        command_id: "cmd-1".to_string(),
        operator_id: "op-1".to_string(),
        operator_name: "Test User".to_string(),
        timestamp: 1234567890,
    }
}

pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

/// Line item of request `req-1` with the given baseline and remaining quantity
pub fn line_item(line_item_id: &str, original: i64, remaining: i64) -> LineItemSnapshot {
    let mut snapshot = LineItemSnapshot::new(line_item_id.to_string());
    snapshot.request_id = "req-1".to_string();
    snapshot.material_name = "Portland cement".to_string();
    snapshot.unit = "bag".to_string();
    snapshot.original_quantity = dec(original);
    snapshot.remaining_quantity = dec(remaining);
    snapshot.update_checksum();
    snapshot
}

pub fn shipment(quantity: i64) -> ShipmentRecord {
    ShipmentRecord {
        shipment_id: uuid::Uuid::new_v4().to_string(),
        shipped_quantity: dec(quantity),
        performed_by: "op-1".to_string(),
        timestamp: 0,
    }
}

pub fn linked(order_id: &str, quantity: i64, is_return_reorder: bool) -> LinkedOrder {
    LinkedOrder {
        order_id: order_id.to_string(),
        supplier_id: "sup-1".to_string(),
        quantity: dec(quantity),
        is_return_reorder,
    }
}

/// Supplier order against `line_item_id` with nothing delivered or returned
pub fn order(order_id: &str, line_item_id: &str, ordered: i64) -> SupplierOrderSnapshot {
    let mut snapshot = SupplierOrderSnapshot::new(order_id.to_string());
    snapshot.line_item_id = line_item_id.to_string();
    snapshot.request_id = "req-1".to_string();
    snapshot.supplier_id = "sup-1".to_string();
    snapshot.ordered_quantity = dec(ordered);
    snapshot.update_checksum();
    snapshot
}

/// Record a return directly on a snapshot (fixture shortcut)
pub fn with_return(
    mut snapshot: SupplierOrderSnapshot,
    quantity: i64,
    reorder_requested: bool,
) -> SupplierOrderSnapshot {
    snapshot.returns.push(ReturnRecord {
        return_id: uuid::Uuid::new_v4().to_string(),
        quantity: dec(quantity),
        reason: "damaged".to_string(),
        reorder_requested,
        recorded_by: "op-1".to_string(),
        timestamp: 0,
    });
    snapshot.returned_quantity += dec(quantity);
    snapshot.reorder_requested = ReorderDecision::from_flag(reorder_requested);
    snapshot.update_checksum();
    snapshot
}

/// Event on `stream` as an action would have emitted it
pub fn test_event(
    stream: shared::procurement::StreamId,
    sequence: u64,
    event_type: shared::procurement::LedgerEventType,
    payload: shared::procurement::EventPayload,
) -> shared::procurement::LedgerEvent {
    create_test_metadata().event(sequence, stream, event_type, payload)
}
