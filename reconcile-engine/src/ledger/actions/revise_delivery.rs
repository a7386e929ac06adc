//! ReviseDelivery command handler
//!
//! Corrects the amount of an earlier delivery. The previous value is kept in
//! the delivery's history by the applier.

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use crate::utils::validation::require_non_negative;
use rust_decimal::Decimal;
use shared::procurement::{CommandErrorCode, EventPayload, LedgerEvent, LedgerEventType, StreamId};

/// ReviseDelivery action
#[derive(Debug, Clone)]
pub struct ReviseDeliveryAction {
    pub order_id: String,
    pub delivery_id: String,
    pub quantity: Decimal,
}

impl CommandHandler for ReviseDeliveryAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        require_non_negative(self.quantity, "quantity")?;

        let order = ctx.load_order(&self.order_id)?;
        let previous = order
            .find_delivery(&self.delivery_id)
            .map(|d| d.quantity)
            .ok_or_else(|| {
                LedgerError::InvalidOperation(
                    CommandErrorCode::InvalidOperation,
                    format!(
                        "Delivery {} not found on order {}",
                        self.delivery_id, self.order_id
                    ),
                )
            })?;

        if previous == self.quantity {
            return Err(LedgerError::InvalidOperation(
                CommandErrorCode::InvalidOperation,
                format!("Delivery {} already has quantity {}", self.delivery_id, previous),
            ));
        }

        let delivered_total = order.delivered_quantity - previous + self.quantity;
        if delivered_total + order.returned_quantity > order.ordered_quantity {
            return Err(LedgerError::OverDelivery {
                requested: self.quantity,
                outstanding: order.remaining() + previous,
            });
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            StreamId::SupplierOrder(self.order_id.clone()),
            LedgerEventType::DeliveryRevised,
            EventPayload::DeliveryRevised {
                delivery_id: self.delivery_id.clone(),
                previous_quantity: previous,
                new_quantity: self.quantity,
                delivered_total,
            },
        );

        Ok(vec![event])
    }
}
