//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles
//! one specific event type. Appliers are PURE functions: the same event
//! applied to the same snapshot always yields the same state, which is what
//! makes replay and checksum verification possible.

use enum_dispatch::enum_dispatch;

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{EventPayload, LedgerEvent};

mod baseline_reset;
mod delivery_confirmed;
mod delivery_revised;
mod line_item_created;
mod line_item_deleted;
mod order_linked;
mod order_placed;
mod reorder_abandoned;
mod return_pool_consumed;
mod return_recorded;
mod shipment_recorded;

pub use baseline_reset::BaselineResetApplier;
pub use delivery_confirmed::DeliveryConfirmedApplier;
pub use delivery_revised::DeliveryRevisedApplier;
pub use line_item_created::LineItemCreatedApplier;
pub use line_item_deleted::LineItemDeletedApplier;
pub use order_linked::OrderLinkedApplier;
pub use order_placed::OrderPlacedApplier;
pub use reorder_abandoned::ReorderAbandonedApplier;
pub use return_pool_consumed::ReturnPoolConsumedApplier;
pub use return_recorded::ReturnRecordedApplier;
pub use shipment_recorded::ShipmentRecordedApplier;

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    LineItemCreated(LineItemCreatedApplier),
    BaselineReset(BaselineResetApplier),
    LineItemDeleted(LineItemDeletedApplier),
    ShipmentRecorded(ShipmentRecordedApplier),
    OrderLinked(OrderLinkedApplier),
    OrderPlaced(OrderPlacedApplier),
    DeliveryConfirmed(DeliveryConfirmedApplier),
    DeliveryRevised(DeliveryRevisedApplier),
    ReturnRecorded(ReturnRecordedApplier),
    ReturnPoolConsumed(ReturnPoolConsumedApplier),
    ReorderAbandoned(ReorderAbandonedApplier),
}

/// Convert LedgerEvent reference to EventAction
///
/// This is the ONLY place with a match on EventPayload.
impl From<&LedgerEvent> for EventAction {
    fn from(event: &LedgerEvent) -> Self {
        match &event.payload {
            EventPayload::LineItemCreated { .. } => {
                EventAction::LineItemCreated(LineItemCreatedApplier)
            }
            EventPayload::BaselineReset { .. } => EventAction::BaselineReset(BaselineResetApplier),
            EventPayload::LineItemDeleted { .. } => {
                EventAction::LineItemDeleted(LineItemDeletedApplier)
            }
            EventPayload::ShipmentRecorded { .. } => {
                EventAction::ShipmentRecorded(ShipmentRecordedApplier)
            }
            EventPayload::OrderLinked { .. } => EventAction::OrderLinked(OrderLinkedApplier),
            EventPayload::OrderPlaced { .. } => EventAction::OrderPlaced(OrderPlacedApplier),
            EventPayload::DeliveryConfirmed { .. } => {
                EventAction::DeliveryConfirmed(DeliveryConfirmedApplier)
            }
            EventPayload::DeliveryRevised { .. } => {
                EventAction::DeliveryRevised(DeliveryRevisedApplier)
            }
            EventPayload::ReturnRecorded { .. } => {
                EventAction::ReturnRecorded(ReturnRecordedApplier)
            }
            EventPayload::ReturnPoolConsumed { .. } => {
                EventAction::ReturnPoolConsumed(ReturnPoolConsumedApplier)
            }
            EventPayload::ReorderAbandoned { .. } => {
                EventAction::ReorderAbandoned(ReorderAbandonedApplier)
            }
        }
    }
}
