//! Ledger verification
//!
//! Replays every event stream from scratch and compares the result with
//! the stored snapshot, then checks the conservation and reorder
//! invariants over the stored state. A clean report means the snapshots
//! are exactly what the event log implies.

use super::manager::{LedgerManager, ManagerResult};
use super::reconciliation::{self, InvariantViolation};
use super::traits::AggregateSnapshot;
use serde::Serialize;
use shared::procurement::{StreamId, SupplierOrderSnapshot};
use std::collections::BTreeMap;

/// A stored snapshot that disagrees with its event stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotDrift {
    pub stream: StreamId,
    pub reason: String,
}

/// Result of a full verification pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub streams_checked: usize,
    pub events_checked: usize,
    /// Ledger sequence at the start of the pass
    pub as_of_sequence: u64,
    /// Missing global sequence numbers
    pub sequence_gaps: Vec<u64>,
    pub drift: Vec<SnapshotDrift>,
    pub violations: Vec<InvariantViolation>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.sequence_gaps.is_empty() && self.drift.is_empty() && self.violations.is_empty()
    }
}

pub struct LedgerVerifier {
    manager: LedgerManager,
}

impl LedgerVerifier {
    pub fn new(manager: LedgerManager) -> Self {
        Self { manager }
    }

    /// Run every check and collect the findings
    pub fn verify(&self) -> ManagerResult<VerificationReport> {
        let mut report = VerificationReport {
            as_of_sequence: self.manager.current_sequence()?,
            ..Default::default()
        };

        self.check_sequence(&mut report)?;
        self.check_snapshots(&mut report)?;
        self.check_invariants(&mut report)?;

        if report.is_clean() {
            tracing::info!(
                streams = report.streams_checked,
                events = report.events_checked,
                sequence = report.as_of_sequence,
                "Ledger verification passed"
            );
        } else {
            tracing::warn!(
                gaps = report.sequence_gaps.len(),
                drift = report.drift.len(),
                violations = report.violations.len(),
                "Ledger verification found problems"
            );
        }

        Ok(report)
    }

    /// Sequence numbers are allocated contiguously from 1
    fn check_sequence(&self, report: &mut VerificationReport) -> ManagerResult<()> {
        let events = self.manager.events_since(0)?;
        report.events_checked = events.len();

        let as_of = report.as_of_sequence;
        let mut expected = 1;
        for event in events.iter().filter(|e| e.sequence <= as_of) {
            while expected < event.sequence {
                report.sequence_gaps.push(expected);
                expected += 1;
            }
            expected = event.sequence + 1;
        }
        while expected <= as_of {
            report.sequence_gaps.push(expected);
            expected += 1;
        }
        Ok(())
    }

    fn check_snapshots(&self, report: &mut VerificationReport) -> ManagerResult<()> {
        let storage = self.manager.storage();

        for stream in storage.get_all_streams()? {
            report.streams_checked += 1;
            let rebuilt = self.manager.rebuild_aggregate(&stream)?;
            let stored = match &stream {
                StreamId::LineItem(id) => storage.get_line_item(id)?.map(AggregateSnapshot::LineItem),
                StreamId::SupplierOrder(id) => {
                    storage.get_order(id)?.map(AggregateSnapshot::SupplierOrder)
                }
            };

            let reason = match stored {
                None => Some("snapshot missing".to_string()),
                Some(stored) if !stored.verify_checksum() => Some(format!(
                    "stored checksum {} does not match stored state",
                    stored.state_checksum()
                )),
                Some(stored) if stored != rebuilt => Some(format!(
                    "stored state (seq {}, checksum {}) differs from replay (seq {}, checksum {})",
                    stored.last_sequence(),
                    stored.state_checksum(),
                    rebuilt.last_sequence(),
                    rebuilt.state_checksum()
                )),
                Some(_) => None,
            };

            if let Some(reason) = reason {
                tracing::warn!(stream = %stream, reason = %reason, "Snapshot drift detected");
                report.drift.push(SnapshotDrift { stream, reason });
            }
        }
        Ok(())
    }

    fn check_invariants(&self, report: &mut VerificationReport) -> ManagerResult<()> {
        let storage = self.manager.storage();

        for line_item in storage.get_all_line_items()? {
            if line_item.deleted {
                continue;
            }
            report.violations.extend(reconciliation::check_line_item(&line_item));
        }

        let mut by_line_item: BTreeMap<String, Vec<SupplierOrderSnapshot>> = BTreeMap::new();
        for order in storage.get_all_orders()? {
            report.violations.extend(reconciliation::check_order(&order));
            by_line_item
                .entry(order.line_item_id.clone())
                .or_default()
                .push(order);
        }
        for (line_item_id, orders) in &by_line_item {
            report
                .violations
                .extend(reconciliation::check_reorder_group(line_item_id, orders));
        }
        Ok(())
    }
}
