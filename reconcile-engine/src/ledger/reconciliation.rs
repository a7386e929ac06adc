//! Reconciliation view
//!
//! Pure functions over snapshots. Nothing here reads storage or mutates
//! state; the manager loads the snapshots and hands them in, so every
//! consumer (UI, document export, notifier) sees the same derived truth.

use rust_decimal::Decimal;
use shared::procurement::{
    LineItemReconciliation, LineItemSnapshot, LineItemStatus, OrderReconciliation,
    RequestReconciliation, StreamId, SupplierOrderSnapshot,
};

/// Per-order row
pub fn order_view(order: &SupplierOrderSnapshot) -> OrderReconciliation {
    OrderReconciliation {
        order_id: order.order_id.clone(),
        supplier_id: order.supplier_id.clone(),
        ordered_quantity: order.ordered_quantity,
        delivered_quantity: order.delivered_quantity,
        returned_quantity: order.returned_quantity,
        remaining: order.remaining(),
        status: order.status(),
        is_return_reorder: order.is_return_reorder,
        reorder_requested: order.reorder_requested,
        open_reorder_pool: order.open_reorder_pool(),
        delivery_date_requested: order.delivery_date_requested,
    }
}

/// Derived line status, first match wins
///
/// `orders` are the supplier orders placed against the line item.
pub fn line_item_status(
    line_item: &LineItemSnapshot,
    orders: &[SupplierOrderSnapshot],
) -> LineItemStatus {
    if line_item.is_declared_unavailable()
        && !line_item.has_positive_shipment()
        && orders.is_empty()
    {
        return LineItemStatus::UnavailableInDepot;
    }

    if orders.iter().any(|o| o.open_reorder_pool() > Decimal::ZERO) {
        return LineItemStatus::PendingReorder;
    }

    if !orders.is_empty() && orders.iter().all(|o| o.is_fully_returned_without_reorder()) {
        return LineItemStatus::FullyReturnedNoReorder;
    }

    let fully_routed = line_item.remaining_quantity.is_zero();

    // Declined return quantity is out of active reconciliation
    if fully_routed && orders.iter().all(|o| o.is_settled()) {
        return LineItemStatus::FullyDelivered;
    }

    if fully_routed {
        return LineItemStatus::PartiallyFulfilled;
    }

    LineItemStatus::AwaitingFulfillment
}

/// Per-line-item row with its order rows in placement order
pub fn line_item_view(
    line_item: &LineItemSnapshot,
    orders: &[SupplierOrderSnapshot],
) -> LineItemReconciliation {
    let ordered = in_placement_order(line_item, orders);

    LineItemReconciliation {
        line_item_id: line_item.line_item_id.clone(),
        request_id: line_item.request_id.clone(),
        material_name: line_item.material_name.clone(),
        unit: line_item.unit.clone(),
        original_quantity: line_item.original_quantity,
        shipped_total: line_item.shipped_total(),
        ordered_total: line_item.supplier_ordered_total(),
        reordered_total: line_item.reorder_total(),
        delivered_total: orders.iter().map(|o| o.delivered_quantity).sum(),
        returned_total: orders.iter().map(|o| o.returned_quantity).sum(),
        pending_reorder_total: orders.iter().map(|o| o.open_reorder_pool()).sum(),
        remaining_quantity: line_item.remaining_quantity,
        status: line_item_status(line_item, orders),
        orders: ordered.into_iter().map(order_view).collect(),
    }
}

/// Worst-case roll-up across line items
pub fn request_status(
    line_items: &[LineItemReconciliation],
) -> Option<LineItemStatus> {
    line_items
        .iter()
        .map(|li| li.status)
        .max_by_key(LineItemStatus::severity)
}

/// Reconciliation view of one request
///
/// Deleted line items are skipped.
pub fn request_view(
    request_id: &str,
    line_items: &[(LineItemSnapshot, Vec<SupplierOrderSnapshot>)],
    as_of_sequence: u64,
) -> RequestReconciliation {
    let rows: Vec<LineItemReconciliation> = line_items
        .iter()
        .filter(|(li, _)| !li.deleted)
        .map(|(li, orders)| line_item_view(li, orders))
        .collect();

    RequestReconciliation {
        request_id: request_id.to_string(),
        status: request_status(&rows),
        line_items: rows,
        as_of_sequence,
    }
}

fn in_placement_order<'a>(
    line_item: &LineItemSnapshot,
    orders: &'a [SupplierOrderSnapshot],
) -> Vec<&'a SupplierOrderSnapshot> {
    let mut sorted: Vec<&SupplierOrderSnapshot> = orders.iter().collect();
    sorted.sort_by_key(|o| {
        line_item
            .orders
            .iter()
            .position(|l| l.order_id == o.order_id)
            .unwrap_or(usize::MAX)
    });
    sorted
}

// ============================================================================
// Invariants
// ============================================================================

/// A broken ledger invariant
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InvariantViolation {
    pub subject: StreamId,
    pub message: String,
}

/// `remaining + shipped + ordered == original`, `0 <= remaining <= original`
pub fn check_line_item(line_item: &LineItemSnapshot) -> Option<InvariantViolation> {
    if line_item.conservation_holds() {
        return None;
    }
    Some(InvariantViolation {
        subject: StreamId::LineItem(line_item.line_item_id.clone()),
        message: format!(
            "remaining {} + shipped {} + ordered {} != original {}",
            line_item.remaining_quantity,
            line_item.shipped_total(),
            line_item.supplier_ordered_total(),
            line_item.original_quantity
        ),
    })
}

/// `delivered + returned <= ordered`, totals agree with records
pub fn check_order(order: &SupplierOrderSnapshot) -> Option<InvariantViolation> {
    if order.bounds_hold() {
        return None;
    }
    Some(InvariantViolation {
        subject: StreamId::SupplierOrder(order.order_id.clone()),
        message: format!(
            "delivered {} + returned {} exceeds ordered {} or disagrees with records",
            order.delivered_quantity, order.returned_quantity, order.ordered_quantity
        ),
    })
}

/// Return-reorder accounting for the orders of one line item
///
/// Every source must have consumed no more than it returned for reorder, and the
/// reorder orders must account for exactly what their sources gave up.
pub fn check_reorder_group(
    line_item_id: &str,
    orders: &[SupplierOrderSnapshot],
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for order in orders {
        let requested = order.requested_returned();
        if order.reordered_quantity + order.abandoned_quantity > requested {
            violations.push(InvariantViolation {
                subject: StreamId::SupplierOrder(order.order_id.clone()),
                message: format!(
                    "reordered {} + abandoned {} exceeds returned-for-reorder {}",
                    order.reordered_quantity, order.abandoned_quantity, requested
                ),
            });
        }
    }

    let reorder_total: Decimal = orders
        .iter()
        .filter(|o| o.is_return_reorder)
        .map(|o| o.ordered_quantity)
        .sum();
    let consumed_total: Decimal = orders.iter().map(|o| o.reordered_quantity).sum();
    if reorder_total != consumed_total {
        violations.push(InvariantViolation {
            subject: StreamId::LineItem(line_item_id.to_string()),
            message: format!(
                "return-reorders total {reorder_total} but sources report {consumed_total} consumed"
            ),
        });
    }

    violations
}
