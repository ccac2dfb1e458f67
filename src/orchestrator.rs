//! Drives events through block resolution, snapshot reads and allocation.

use num_bigint::BigUint;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

use crate::blocks::{BlockIndexSource, BlockResolver};
use crate::config::PagingConfig;
use crate::error::{ReimburseError, Result};
use crate::reimburse::{Allocator, Reimbursement, ReportWriter};
use crate::staking::{EventPaginator, SlashingEvent, SnapshotReader, StakingRegistrySource};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events: usize,
    pub reimbursements: usize,
    pub total_reimbursed: BigUint,
}

pub struct Orchestrator<B: ?Sized, S: ?Sized> {
    blocks: BlockResolver<B>,
    snapshots: SnapshotReader<S>,
    events: EventPaginator<S>,
    allocator: Allocator,
}

impl<B, S> Orchestrator<B, S>
where
    B: BlockIndexSource + ?Sized,
    S: StakingRegistrySource + ?Sized,
{
    pub fn new(block_index: Arc<B>, registry: Arc<S>, paging: &PagingConfig, allocator: Allocator) -> Self {
        Self {
            blocks: BlockResolver::new(block_index),
            snapshots: SnapshotReader::new(registry.clone()),
            events: EventPaginator::new(registry, paging.page_size, paging.cursor),
            allocator,
        }
    }

    /// Reimbursements for one event, from the operator's state in the block
    /// right before the one the event landed in.
    pub async fn process_event(&self, event: &SlashingEvent) -> Result<Vec<Reimbursement>> {
        let block = self.blocks.resolve(event.date).await?;
        let before = block.checked_sub(1).ok_or_else(|| {
            ReimburseError::InvalidData(format!("slashing event {} landed in block 0", event.id))
        })?;
        let snapshot = self.snapshots.read_snapshot(&event.operator_id, before).await?;
        self.allocator.allocate(event, &snapshot)
    }

    /// Processes every event in `[start, end]` in date order, writing each
    /// event's lines as soon as they are computed. The first failure ends
    /// the run.
    pub async fn run<W: Write>(
        &self,
        start: u64,
        end: u64,
        min_amount: &BigUint,
        report: &mut ReportWriter<W>,
    ) -> Result<RunSummary> {
        let events = self.events.fetch_events(start, end, min_amount).await?;
        info!(
            count = events.len(),
            from = %format_timestamp(start),
            to = %format_timestamp(end),
            "Processing slashing events"
        );

        let mut summary = RunSummary::default();
        for event in &events {
            let reimbursements = self.process_event(event).await?;
            report.write_event(&reimbursements)?;

            let total: BigUint = reimbursements.iter().map(|r| &r.amount).sum();
            info!(
                event = %event.id,
                operator = %event.operator_id,
                date = %format_timestamp(event.date),
                slashed = %event.amount,
                recipients = reimbursements.len(),
                reimbursed = %total,
                "Allocated slashing event"
            );
            summary.events += 1;
            summary.reimbursements += reimbursements.len();
            summary.total_reimbursed += total;
        }
        Ok(summary)
    }
}

/// RFC 3339 rendering of a Unix timestamp, for logs.
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}
