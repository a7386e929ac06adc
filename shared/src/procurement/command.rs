//! Ledger commands - requests from collaborators to change ledger state

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger command envelope
///
/// `command_id` doubles as the idempotency key: the engine refuses to apply
/// the same id twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerCommand {
    /// Client-generated idempotency key
    pub command_id: String,
    /// Operator who issued the command
    pub operator_id: String,
    /// Operator name (snapshot for audit)
    pub operator_name: String,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Command payload
    pub payload: LedgerCommandPayload,
}

impl LedgerCommand {
    /// Create a command with a fresh idempotency key
    pub fn new(
        operator_id: impl Into<String>,
        operator_name: impl Into<String>,
        payload: LedgerCommandPayload,
    ) -> Self {
        Self::with_command_id(
            uuid::Uuid::new_v4().to_string(),
            operator_id,
            operator_name,
            payload,
        )
    }

    /// Create a command with a caller-supplied idempotency key (retries reuse it)
    pub fn with_command_id(
        command_id: impl Into<String>,
        operator_id: impl Into<String>,
        operator_name: impl Into<String>,
        payload: LedgerCommandPayload,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            operator_id: operator_id.into(),
            operator_name: operator_name.into(),
            timestamp: crate::util::now_millis(),
            payload,
        }
    }
}

/// Command payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerCommandPayload {
    // ========== Line Items ==========
    CreateLineItem {
        request_id: String,
        material_name: String,
        unit: String,
        quantity: Decimal,
    },

    /// Reset the baseline of a line item that nothing references yet
    EditLineItem {
        line_item_id: String,
        quantity: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        material_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },

    DeleteLineItem {
        line_item_id: String,
    },

    // ========== Depot ==========
    /// Ship from depot stock. Zero declares the material unavailable.
    RecordShipment {
        line_item_id: String,
        quantity: Decimal,
    },

    DeclareUnavailable {
        line_item_id: String,
    },

    // ========== Supplier Orders ==========
    PlaceOrder {
        line_item_id: String,
        supplier_id: String,
        quantity: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delivery_date: Option<chrono::NaiveDate>,
        #[serde(default)]
        is_return_reorder: bool,
        /// Source orders whose returned quantity a reorder consumes
        /// (None = every eligible order of the line item)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        return_source_order_ids: Option<Vec<String>>,
    },

    ConfirmDelivery {
        order_id: String,
        quantity: Decimal,
    },

    /// Correct the amount of an earlier delivery
    ReviseDelivery {
        order_id: String,
        delivery_id: String,
        quantity: Decimal,
    },

    RecordReturn {
        order_id: String,
        quantity: Decimal,
        reason: String,
        reorder_requested: bool,
    },

    /// Give up on replacing returned quantity (None = everything still open)
    AbandonReorder {
        order_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantity: Option<Decimal>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl LedgerCommandPayload {
    /// Line item this command targets directly, if any
    pub fn line_item_id(&self) -> Option<&str> {
        match self {
            Self::EditLineItem { line_item_id, .. }
            | Self::DeleteLineItem { line_item_id }
            | Self::RecordShipment { line_item_id, .. }
            | Self::DeclareUnavailable { line_item_id }
            | Self::PlaceOrder { line_item_id, .. } => Some(line_item_id),
            _ => None,
        }
    }

    /// Supplier order this command targets directly, if any
    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::ConfirmDelivery { order_id, .. }
            | Self::ReviseDelivery { order_id, .. }
            | Self::RecordReturn { order_id, .. }
            | Self::AbandonReorder { order_id, .. } => Some(order_id),
            _ => None,
        }
    }
}
