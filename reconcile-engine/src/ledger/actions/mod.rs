//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use shared::procurement::{LedgerCommand, LedgerCommandPayload, LedgerEvent};

mod abandon_reorder;
mod confirm_delivery;
mod create_line_item;
mod delete_line_item;
mod edit_line_item;
mod place_order;
mod record_return;
mod record_shipment;
mod revise_delivery;

pub use abandon_reorder::AbandonReorderAction;
pub use confirm_delivery::ConfirmDeliveryAction;
pub use create_line_item::CreateLineItemAction;
pub use delete_line_item::DeleteLineItemAction;
pub use edit_line_item::EditLineItemAction;
pub use place_order::PlaceOrderAction;
pub use record_return::RecordReturnAction;
pub use record_shipment::RecordShipmentAction;
pub use revise_delivery::ReviseDeliveryAction;

/// CommandAction enum - dispatches to concrete action implementations
#[derive(Debug, Clone)]
pub enum CommandAction {
    CreateLineItem(CreateLineItemAction),
    EditLineItem(EditLineItemAction),
    DeleteLineItem(DeleteLineItemAction),
    RecordShipment(RecordShipmentAction),
    PlaceOrder(PlaceOrderAction),
    ConfirmDelivery(ConfirmDeliveryAction),
    ReviseDelivery(ReviseDeliveryAction),
    RecordReturn(RecordReturnAction),
    AbandonReorder(AbandonReorderAction),
}

impl CommandHandler for CommandAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        match self {
            CommandAction::CreateLineItem(action) => action.execute(ctx, metadata),
            CommandAction::EditLineItem(action) => action.execute(ctx, metadata),
            CommandAction::DeleteLineItem(action) => action.execute(ctx, metadata),
            CommandAction::RecordShipment(action) => action.execute(ctx, metadata),
            CommandAction::PlaceOrder(action) => action.execute(ctx, metadata),
            CommandAction::ConfirmDelivery(action) => action.execute(ctx, metadata),
            CommandAction::ReviseDelivery(action) => action.execute(ctx, metadata),
            CommandAction::RecordReturn(action) => action.execute(ctx, metadata),
            CommandAction::AbandonReorder(action) => action.execute(ctx, metadata),
        }
    }
}

/// Convert LedgerCommand to CommandAction
///
/// This is the ONLY place with a match on LedgerCommandPayload.
impl From<&LedgerCommand> for CommandAction {
    fn from(cmd: &LedgerCommand) -> Self {
        match &cmd.payload {
            LedgerCommandPayload::CreateLineItem {
                request_id,
                material_name,
                unit,
                quantity,
            } => CommandAction::CreateLineItem(CreateLineItemAction {
                request_id: request_id.clone(),
                material_name: material_name.clone(),
                unit: unit.clone(),
                quantity: *quantity,
            }),
            LedgerCommandPayload::EditLineItem {
                line_item_id,
                quantity,
                material_name,
                unit,
            } => CommandAction::EditLineItem(EditLineItemAction {
                line_item_id: line_item_id.clone(),
                quantity: *quantity,
                material_name: material_name.clone(),
                unit: unit.clone(),
            }),
            LedgerCommandPayload::DeleteLineItem { line_item_id } => {
                CommandAction::DeleteLineItem(DeleteLineItemAction {
                    line_item_id: line_item_id.clone(),
                })
            }
            LedgerCommandPayload::RecordShipment {
                line_item_id,
                quantity,
            } => CommandAction::RecordShipment(RecordShipmentAction {
                line_item_id: line_item_id.clone(),
                quantity: *quantity,
            }),
            LedgerCommandPayload::DeclareUnavailable { line_item_id } => {
                CommandAction::RecordShipment(RecordShipmentAction::unavailable(line_item_id))
            }
            LedgerCommandPayload::PlaceOrder {
                line_item_id,
                supplier_id,
                quantity,
                delivery_date,
                is_return_reorder,
                return_source_order_ids,
            } => CommandAction::PlaceOrder(PlaceOrderAction {
                line_item_id: line_item_id.clone(),
                supplier_id: supplier_id.clone(),
                quantity: *quantity,
                delivery_date: *delivery_date,
                is_return_reorder: *is_return_reorder,
                return_source_order_ids: return_source_order_ids.clone(),
            }),
            LedgerCommandPayload::ConfirmDelivery { order_id, quantity } => {
                CommandAction::ConfirmDelivery(ConfirmDeliveryAction {
                    order_id: order_id.clone(),
                    quantity: *quantity,
                })
            }
            LedgerCommandPayload::ReviseDelivery {
                order_id,
                delivery_id,
                quantity,
            } => CommandAction::ReviseDelivery(ReviseDeliveryAction {
                order_id: order_id.clone(),
                delivery_id: delivery_id.clone(),
                quantity: *quantity,
            }),
            LedgerCommandPayload::RecordReturn {
                order_id,
                quantity,
                reason,
                reorder_requested,
            } => CommandAction::RecordReturn(RecordReturnAction {
                order_id: order_id.clone(),
                quantity: *quantity,
                reason: reason.clone(),
                reorder_requested: *reorder_requested,
            }),
            LedgerCommandPayload::AbandonReorder {
                order_id,
                quantity,
                reason,
            } => CommandAction::AbandonReorder(AbandonReorderAction {
                order_id: order_id.clone(),
                quantity: *quantity,
                reason: reason.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_declare_unavailable_maps_to_zero_shipment() {
        let cmd = LedgerCommand::new(
            "u-1",
            "Depot",
            LedgerCommandPayload::DeclareUnavailable {
                line_item_id: "li-1".to_string(),
            },
        );
        match CommandAction::from(&cmd) {
            CommandAction::RecordShipment(action) => {
                assert_eq!(action.line_item_id, "li-1");
                assert_eq!(action.quantity, Decimal::ZERO);
            }
            other => panic!("Unexpected action: {other:?}"),
        }
    }
}
