//! EditLineItem command handler
//!
//! Resets the baseline of a line item. Original and remaining quantity move
//! together, so this is only legal while no shipment or order references the
//! line item.

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, require_positive, validate_required_text,
};
use rust_decimal::Decimal;
use shared::procurement::{EventPayload, LedgerEvent, LedgerEventType, StreamId};

/// EditLineItem action
#[derive(Debug, Clone)]
pub struct EditLineItemAction {
    pub line_item_id: String,
    pub quantity: Decimal,
    pub material_name: Option<String>,
    pub unit: Option<String>,
}

impl CommandHandler for EditLineItemAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        require_positive(self.quantity, "quantity")?;
        if let Some(name) = &self.material_name {
            validate_required_text(name, "material_name", MAX_NAME_LEN)?;
        }
        if let Some(unit) = &self.unit {
            validate_required_text(unit, "unit", MAX_SHORT_TEXT_LEN)?;
        }

        let snapshot = ctx.load_line_item(&self.line_item_id)?;
        if snapshot.has_dependents() {
            return Err(LedgerError::LineItemLocked(format!(
                "{} has {} shipment(s) and {} order(s)",
                self.line_item_id,
                snapshot.shipments.len(),
                snapshot.orders.len()
            )));
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            StreamId::LineItem(self.line_item_id.clone()),
            LedgerEventType::BaselineReset,
            EventPayload::BaselineReset {
                previous_quantity: snapshot.original_quantity,
                new_quantity: self.quantity,
                material_name: self.material_name.as_ref().map(|s| s.trim().to_string()),
                unit: self.unit.as_ref().map(|s| s.trim().to_string()),
            },
        );

        Ok(vec![event])
    }
}
