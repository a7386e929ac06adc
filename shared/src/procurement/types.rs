//! Shared types for the procurement ledger

use super::view::LineItemReconciliation;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Reorder Decision
// ============================================================================

/// Decision recorded at return time on whether returned quantity is replaced
///
/// `Undecided` is the state of an order that has never seen a return. It is
/// neither eligible for the reorder flow nor terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReorderDecision {
    #[default]
    Undecided,
    /// Returned quantity may be replaced by a return-reorder order
    Requested,
    /// Returned quantity is terminal, kept for audit only
    Declined,
}

impl ReorderDecision {
    pub fn from_flag(reorder_requested: bool) -> Self {
        if reorder_requested {
            Self::Requested
        } else {
            Self::Declined
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Depot fulfillment record. A zero quantity is the "not available in depot" marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentRecord {
    pub shipment_id: String,
    pub shipped_quantity: Decimal,
    pub performed_by: String,
    pub timestamp: i64,
}

impl ShipmentRecord {
    pub fn is_unavailable_marker(&self) -> bool {
        self.shipped_quantity.is_zero()
    }
}

/// Supplier order reference kept on the line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkedOrder {
    pub order_id: String,
    pub supplier_id: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub is_return_reorder: bool,
}

/// Delivery record on a supplier order
///
/// `quantity` is the effective amount. Earlier values survive in `history`
/// so a revision never destroys the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryRecord {
    pub delivery_id: String,
    pub quantity: Decimal,
    pub confirmed_by: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<DeliveryRevision>,
}

/// Previous value of a revised delivery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryRevision {
    pub previous_quantity: Decimal,
    pub revised_by: String,
    pub revised_at: i64,
}

/// Return record on a supplier order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnRecord {
    pub return_id: String,
    pub quantity: Decimal,
    pub reason: String,
    pub reorder_requested: bool,
    pub recorded_by: String,
    pub timestamp: i64,
}

/// Portion of a return-reorder order drawn from one source order's returned pool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnAllocation {
    pub source_order_id: String,
    pub quantity: Decimal,
}

// ============================================================================
// Batch Placement
// ============================================================================

/// Place orders for several line items with one supplier and one delivery date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOrderRequest {
    /// Idempotency base; each line runs as `"{batch_id}:{line_item_id}"`
    pub batch_id: String,
    pub operator_id: String,
    pub operator_name: String,
    pub supplier_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<chrono::NaiveDate>,
    pub lines: Vec<BatchOrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOrderLine {
    pub line_item_id: String,
    pub quantity: Decimal,
}

/// Per-line outcome of a batch placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLineResult {
    pub line_item_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl BatchLineResult {
    pub fn is_placed(&self) -> bool {
        self.error.is_none() && self.order_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOrderResult {
    pub batch_id: String,
    pub results: Vec<BatchLineResult>,
}

impl BatchOrderResult {
    pub fn placed(&self) -> impl Iterator<Item = &BatchLineResult> {
        self.results.iter().filter(|r| r.is_placed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchLineResult> {
        self.results.iter().filter(|r| !r.is_placed())
    }
}

// ============================================================================
// Command Response
// ============================================================================

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    /// Line item touched (or created) by the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_item_id: Option<String>,
    /// Supplier order touched (or created) by the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Updated reconciliation row of the affected line item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_view: Option<LineItemReconciliation>,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(
        command_id: String,
        line_item_id: Option<String>,
        order_id: Option<String>,
        line_view: Option<LineItemReconciliation>,
    ) -> Self {
        Self {
            command_id,
            success: true,
            line_item_id,
            order_id,
            line_view,
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            line_item_id: None,
            order_id: None,
            line_view: None,
            error: Some(error),
        }
    }

    /// Error code if the command failed
    pub fn error_code(&self) -> Option<&CommandErrorCode> {
        self.error.as_ref().map(|e| &e.code)
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Command error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    LineItemNotFound,
    OrderNotFound,
    InsufficientQuantity,
    ExceedsRemainingQuantity,
    ExceedsReturnedQuantity,
    ExceedsReturnableQuantity,
    OverDelivery,
    AlreadyDeclaredUnavailable,
    InvalidShipmentState,
    LineItemLocked,
    DuplicateOperation,
    InvalidQuantity,
    InvalidOperation,
    ValidationFailed,
    InternalError,
    // Storage faults
    StorageFull,
    OutOfMemory,
    StorageCorrupted,
    SystemBusy,
}

impl CommandErrorCode {
    /// Storage-layer fault, as opposed to a domain rule rejection
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::InternalError
                | Self::StorageFull
                | Self::OutOfMemory
                | Self::StorageCorrupted
                | Self::SystemBusy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorder_decision_from_flag() {
        assert_eq!(ReorderDecision::from_flag(true), ReorderDecision::Requested);
        assert_eq!(ReorderDecision::from_flag(false), ReorderDecision::Declined);
        assert_eq!(ReorderDecision::default(), ReorderDecision::Undecided);
    }

    #[test]
    fn test_error_code_classification() {
        assert!(CommandErrorCode::SystemBusy.is_infrastructure());
        assert!(CommandErrorCode::StorageCorrupted.is_infrastructure());
        assert!(!CommandErrorCode::OverDelivery.is_infrastructure());
        assert!(!CommandErrorCode::DuplicateOperation.is_infrastructure());
    }

    #[test]
    fn test_error_code_wire_format() {
        let json = serde_json::to_string(&CommandErrorCode::ExceedsReturnedQuantity).unwrap();
        assert_eq!(json, "\"EXCEEDS_RETURNED_QUANTITY\"");
    }

    #[test]
    fn test_batch_result_partitions() {
        let result = BatchOrderResult {
            batch_id: "b-1".to_string(),
            results: vec![
                BatchLineResult {
                    line_item_id: "li-1".to_string(),
                    order_id: Some("po-1".to_string()),
                    error: None,
                },
                BatchLineResult {
                    line_item_id: "li-2".to_string(),
                    order_id: None,
                    error: Some(CommandError::new(
                        CommandErrorCode::ExceedsRemainingQuantity,
                        "too much",
                    )),
                },
            ],
        };
        assert_eq!(result.placed().count(), 1);
        assert_eq!(result.failed().next().unwrap().line_item_id, "li-2");
    }
}
