//! DeleteLineItem command handler
//!
//! Tombstones a line item that nothing references. Its events stay in the
//! log; the snapshot is flagged and dropped from the request index.

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use shared::procurement::{EventPayload, LedgerEvent, LedgerEventType, StreamId};

/// DeleteLineItem action
#[derive(Debug, Clone)]
pub struct DeleteLineItemAction {
    pub line_item_id: String,
}

impl CommandHandler for DeleteLineItemAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let snapshot = ctx.load_line_item(&self.line_item_id)?;
        if snapshot.has_dependents() {
            return Err(LedgerError::LineItemLocked(format!(
                "{} is referenced by shipments or supplier orders",
                self.line_item_id
            )));
        }

        let seq = ctx.next_sequence();
        let event = metadata.event(
            seq,
            StreamId::LineItem(self.line_item_id.clone()),
            LedgerEventType::LineItemDeleted,
            EventPayload::LineItemDeleted {
                request_id: snapshot.request_id,
            },
        );

        Ok(vec![event])
    }
}
