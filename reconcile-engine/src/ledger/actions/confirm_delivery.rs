//! ConfirmDelivery command handler

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use crate::utils::validation::require_positive;
use rust_decimal::Decimal;
use shared::procurement::{EventPayload, LedgerEvent, LedgerEventType, StreamId};

/// ConfirmDelivery action
#[derive(Debug, Clone)]
pub struct ConfirmDeliveryAction {
    pub order_id: String,
    pub quantity: Decimal,
}

impl CommandHandler for ConfirmDeliveryAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        require_positive(self.quantity, "quantity")?;

        let order = ctx.load_order(&self.order_id)?;
        let outstanding = order.remaining();
        if self.quantity > outstanding {
            return Err(LedgerError::OverDelivery {
                requested: self.quantity,
                outstanding,
            });
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            StreamId::SupplierOrder(self.order_id.clone()),
            LedgerEventType::DeliveryConfirmed,
            EventPayload::DeliveryConfirmed {
                delivery_id: shared::util::new_id(),
                quantity: self.quantity,
                delivered_total: order.delivered_quantity + self.quantity,
            },
        );

        Ok(vec![event])
    }
}
