//! Ledger events - immutable facts recorded after command processing

use super::command::LedgerCommand;
use super::types::ReturnAllocation;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate stream an event belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamId {
    LineItem(String),
    SupplierOrder(String),
}

impl StreamId {
    /// Storage key, prefixed so both aggregate kinds share one event table
    pub fn storage_key(&self) -> String {
        match self {
            StreamId::LineItem(id) => format!("li:{id}"),
            StreamId::SupplierOrder(id) => format!("po:{id}"),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            StreamId::LineItem(id) | StreamId::SupplierOrder(id) => id,
        }
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Ledger event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number (authoritative ordering for replay)
    pub sequence: u64,
    /// Aggregate this event belongs to
    pub stream: StreamId,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Client timestamp, preserved for audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    pub operator_id: String,
    pub operator_name: String,
    /// Command that triggered this event
    pub command_id: String,
    pub event_type: LedgerEventType,
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEventType {
    // Line item
    LineItemCreated,
    BaselineReset,
    LineItemDeleted,
    ShipmentRecorded,
    OrderLinked,

    // Supplier order
    OrderPlaced,
    DeliveryConfirmed,
    DeliveryRevised,
    ReturnRecorded,
    ReturnPoolConsumed,
    ReorderAbandoned,
}

impl std::fmt::Display for LedgerEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LedgerEventType::LineItemCreated => "LINE_ITEM_CREATED",
            LedgerEventType::BaselineReset => "BASELINE_RESET",
            LedgerEventType::LineItemDeleted => "LINE_ITEM_DELETED",
            LedgerEventType::ShipmentRecorded => "SHIPMENT_RECORDED",
            LedgerEventType::OrderLinked => "ORDER_LINKED",
            LedgerEventType::OrderPlaced => "ORDER_PLACED",
            LedgerEventType::DeliveryConfirmed => "DELIVERY_CONFIRMED",
            LedgerEventType::DeliveryRevised => "DELIVERY_REVISED",
            LedgerEventType::ReturnRecorded => "RETURN_RECORDED",
            LedgerEventType::ReturnPoolConsumed => "RETURN_POOL_CONSUMED",
            LedgerEventType::ReorderAbandoned => "REORDER_ABANDONED",
        };
        f.write_str(name)
    }
}

/// Event payload variants
///
/// Running totals (`remaining_after`, `delivered_total`, ...) are recorded
/// alongside the increment so the log alone explains every snapshot value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    // ========== Line Item ==========
    LineItemCreated {
        request_id: String,
        material_name: String,
        unit: String,
        quantity: Decimal,
    },

    BaselineReset {
        previous_quantity: Decimal,
        new_quantity: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        material_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },

    LineItemDeleted {
        request_id: String,
    },

    ShipmentRecorded {
        shipment_id: String,
        shipped_quantity: Decimal,
        remaining_after: Decimal,
    },

    /// Line-item side of an order placement
    OrderLinked {
        order_id: String,
        supplier_id: String,
        quantity: Decimal,
        is_return_reorder: bool,
        remaining_after: Decimal,
    },

    // ========== Supplier Order ==========
    OrderPlaced {
        line_item_id: String,
        request_id: String,
        supplier_id: String,
        quantity: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        delivery_date: Option<chrono::NaiveDate>,
        is_return_reorder: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        return_sources: Vec<ReturnAllocation>,
    },

    DeliveryConfirmed {
        delivery_id: String,
        quantity: Decimal,
        delivered_total: Decimal,
    },

    DeliveryRevised {
        delivery_id: String,
        previous_quantity: Decimal,
        new_quantity: Decimal,
        delivered_total: Decimal,
    },

    ReturnRecorded {
        return_id: String,
        quantity: Decimal,
        reason: String,
        reorder_requested: bool,
        returned_total: Decimal,
    },

    /// Source-order side of a return-reorder placement
    ReturnPoolConsumed {
        reorder_order_id: String,
        quantity: Decimal,
    },

    ReorderAbandoned {
        quantity: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl LedgerEvent {
    /// Create a new event
    ///
    /// The server timestamp is always taken here; the client timestamp is
    /// kept for audit only.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        stream: StreamId,
        operator_id: String,
        operator_name: String,
        command_id: String,
        client_timestamp: Option<i64>,
        event_type: LedgerEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            stream,
            timestamp: crate::util::now_millis(),
            client_timestamp,
            operator_id,
            operator_name,
            command_id,
            event_type,
            payload,
        }
    }

    /// Create event from command (extracts metadata including client timestamp)
    pub fn from_command(
        sequence: u64,
        stream: StreamId,
        command: &LedgerCommand,
        event_type: LedgerEventType,
        payload: EventPayload,
    ) -> Self {
        Self::new(
            sequence,
            stream,
            command.operator_id.clone(),
            command.operator_name.clone(),
            command.command_id.clone(),
            Some(command.timestamp),
            event_type,
            payload,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_keys_do_not_collide() {
        let li = StreamId::LineItem("abc".to_string());
        let po = StreamId::SupplierOrder("abc".to_string());
        assert_ne!(li.storage_key(), po.storage_key());
        assert_eq!(li.id(), po.id());
    }

    #[test]
    fn test_event_type_display() {
        assert_eq!(
            LedgerEventType::ReturnPoolConsumed.to_string(),
            "RETURN_POOL_CONSUMED"
        );
    }

    #[test]
    fn test_event_json_roundtrip_keeps_stream() {
        let event = LedgerEvent::new(
            7,
            StreamId::SupplierOrder("po-1".to_string()),
            "u-1".to_string(),
            "Mehmet".to_string(),
            "cmd-1".to_string(),
            Some(1),
            LedgerEventType::DeliveryConfirmed,
            EventPayload::DeliveryConfirmed {
                delivery_id: "d-1".to_string(),
                quantity: Decimal::from(30),
                delivered_total: Decimal::from(30),
            },
        );
        let json = serde_json::to_vec(&event).unwrap();
        let back: LedgerEvent = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.stream, StreamId::SupplierOrder("po-1".to_string()));
        assert_eq!(back.sequence, 7);
        assert_eq!(back.event_type, LedgerEventType::DeliveryConfirmed);
    }
}
