//! RecordShipment command handler
//!
//! Depot fulfillment. A positive quantity is drawn from the line item's
//! remaining pool. Zero is the "not available in depot" declaration, accepted
//! once and only while nothing has been routed yet. After that declaration
//! the depot path is closed for the line item.

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use crate::utils::validation::require_non_negative;
use rust_decimal::Decimal;
use shared::procurement::{EventPayload, LedgerEvent, LedgerEventType, StreamId};

/// RecordShipment action
#[derive(Debug, Clone)]
pub struct RecordShipmentAction {
    pub line_item_id: String,
    pub quantity: Decimal,
}

impl RecordShipmentAction {
    /// Zero-quantity declaration: the depot does not stock this material
    pub fn unavailable(line_item_id: &str) -> Self {
        Self {
            line_item_id: line_item_id.to_string(),
            quantity: Decimal::ZERO,
        }
    }
}

impl CommandHandler for RecordShipmentAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        require_non_negative(self.quantity, "quantity")?;

        let snapshot = ctx.load_line_item(&self.line_item_id)?;

        if self.quantity.is_zero() {
            if snapshot.is_declared_unavailable() {
                return Err(LedgerError::AlreadyDeclaredUnavailable(
                    self.line_item_id.clone(),
                ));
            }
            if !snapshot.is_fully_unshipped() {
                return Err(LedgerError::InvalidShipmentState(format!(
                    "{} is already partially routed ({} of {} remaining)",
                    self.line_item_id, snapshot.remaining_quantity, snapshot.original_quantity
                )));
            }
        } else {
            if snapshot.is_declared_unavailable() {
                return Err(LedgerError::InvalidShipmentState(format!(
                    "{} was declared unavailable in depot",
                    self.line_item_id
                )));
            }
            if snapshot.remaining_quantity.is_zero() {
                return Err(LedgerError::InsufficientQuantity(format!(
                    "{} is fully consumed",
                    self.line_item_id
                )));
            }
            if self.quantity > snapshot.remaining_quantity {
                return Err(LedgerError::InsufficientQuantity(format!(
                    "shipping {} exceeds remaining {}",
                    self.quantity, snapshot.remaining_quantity
                )));
            }
        }

        let remaining_after = snapshot.remaining_quantity - self.quantity;
        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            StreamId::LineItem(self.line_item_id.clone()),
            LedgerEventType::ShipmentRecorded,
            EventPayload::ShipmentRecorded {
                shipment_id: shared::util::new_id(),
                shipped_quantity: self.quantity,
                remaining_after,
            },
        );

        Ok(vec![event])
    }
}
