//! CreateLineItem command handler
//!
//! Opens a new material line item on a request. The requested quantity becomes
//! both the baseline and the remaining pool.

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, require_positive, validate_required_text,
};
use rust_decimal::Decimal;
use shared::procurement::{EventPayload, LedgerEvent, LedgerEventType, StreamId};

/// CreateLineItem action
#[derive(Debug, Clone)]
pub struct CreateLineItemAction {
    pub request_id: String,
    pub material_name: String,
    pub unit: String,
    pub quantity: Decimal,
}

impl CommandHandler for CreateLineItemAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        validate_required_text(&self.request_id, "request_id", MAX_SHORT_TEXT_LEN)?;
        validate_required_text(&self.material_name, "material_name", MAX_NAME_LEN)?;
        validate_required_text(&self.unit, "unit", MAX_SHORT_TEXT_LEN)?;
        require_positive(self.quantity, "quantity")?;

        let line_item_id = shared::util::new_id();
        tracing::debug!(line_item_id = %line_item_id, request_id = %self.request_id, quantity = %self.quantity, "Creating line item");

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            StreamId::LineItem(line_item_id),
            LedgerEventType::LineItemCreated,
            EventPayload::LineItemCreated {
                request_id: self.request_id.clone(),
                material_name: self.material_name.trim().to_string(),
                unit: self.unit.trim().to_string(),
                quantity: self.quantity,
            },
        );

        Ok(vec![event])
    }
}
