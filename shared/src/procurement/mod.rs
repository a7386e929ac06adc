//! Procurement Ledger Module
//!
//! Types for the quantity reconciliation ledger:
//! - Commands: Requests from collaborators to change ledger state
//! - Events: Immutable facts recorded after command processing
//! - Snapshots: Line item and supplier order state computed from events
//! - Views: Reconciliation read models for display, export and notification

pub mod command;
pub mod event;
pub mod snapshot;
pub mod types;
pub mod view;

// Re-exports
pub use command::{LedgerCommand, LedgerCommandPayload};
pub use event::{EventPayload, LedgerEvent, LedgerEventType, StreamId};
pub use snapshot::{LineItemSnapshot, SupplierOrderSnapshot, SupplierOrderStatus};
pub use types::*;
pub use view::{
    LineItemReconciliation, LineItemStatus, OrderReconciliation, RequestReconciliation,
    RequestStatusTransition,
};
