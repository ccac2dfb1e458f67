//! Access to the staking registry: slashing events and operator state.

pub mod events;
pub mod snapshot;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use events::{CursorMode, EventPaginator, EventWindow};
pub use snapshot::SnapshotReader;
pub use types::{
    Delegation, DelegationRecord, EntityRef, OperatorRecord, OperatorSnapshot, SlashingEvent,
    SlashingEventRecord,
};

/// Query surface of the staking registry.
#[async_trait]
pub trait StakingRegistrySource: Send + Sync {
    /// The operator `operator_id` as of `block` with every delegation it
    /// had there, or `None` if it did not exist.
    async fn operator_at_block(&self, operator_id: &str, block: u64)
        -> Result<Option<OperatorRecord>>;

    /// At most `page_size` events inside `window`, ordered by date then id.
    ///
    /// Keyset paging depends on the id order within one date: once a page
    /// ends on `(date, id)`, no unreturned event of that date may have a
    /// smaller id.
    async fn slashing_events_page(
        &self,
        window: &EventWindow,
        page_size: usize,
    ) -> Result<Vec<SlashingEvent>>;
}
