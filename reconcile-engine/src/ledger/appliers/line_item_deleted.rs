//! LineItemDeleted event applier
//!
//! Deletion is a tombstone. The snapshot and its event stream stay for audit.

use crate::ledger::traits::{AggregateSnapshot, EventApplier};
use shared::procurement::{EventPayload, LedgerEvent};

/// LineItemDeleted applier
pub struct LineItemDeletedApplier;

impl EventApplier for LineItemDeletedApplier {
    fn apply(&self, snapshot: &mut AggregateSnapshot, event: &LedgerEvent) {
        if let (AggregateSnapshot::LineItem(snapshot), EventPayload::LineItemDeleted { .. }) =
            (snapshot, &event.payload)
        {
            snapshot.deleted = true;

            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.update_checksum();
        }
    }
}
