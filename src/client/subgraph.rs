//! Subgraph-backed implementations of the block index and staking registry.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::graph_client::{fetch, GraphClient, GraphTransport};
use crate::blocks::{BlockIndexSource, BlockRecord};
use crate::error::{ReimburseError, Result};
use crate::staking::{
    DelegationRecord, EventWindow, OperatorRecord, SlashingEvent, SlashingEventRecord,
    StakingRegistrySource,
};

/// Largest page graph-node serves for a collection field.
const DELEGATION_PAGE_SIZE: usize = 1000;

const BLOCKS_AT_TIMESTAMP: &str = r#"
query BlocksAtTimestamp($timestamp: BigInt!) {
  blocks(where: { timestamp: $timestamp }) {
    id
    number
    timestamp
  }
}"#;

const OPERATOR_AT_BLOCK: &str = r#"
query OperatorAtBlock($id: ID!, $block: Int!, $first: Int!) {
  operator(id: $id, block: { number: $block }) {
    id
    owner
    operatorTokenTotalSupply
    exchangeRate
    valueWithoutEarnings
    delegations(first: $first, orderBy: id, orderDirection: asc) {
      id
      delegator { id }
      operatorTokenBalance
    }
  }
}"#;

const DELEGATIONS_PAGE: &str = r#"
query DelegationsPage($operator: String!, $block: Int!, $first: Int!, $last: ID!) {
  delegations(
    first: $first
    block: { number: $block }
    orderBy: id
    orderDirection: asc
    where: { operator: $operator, id_gt: $last }
  ) {
    id
    delegator { id }
    operatorTokenBalance
  }
}"#;

const SLASHING_EVENTS: &str = r#"
query SlashingEvents($first: Int!, $orderBy: SlashingEvent_orderBy!, $where: SlashingEvent_filter!) {
  slashingEvents(first: $first, orderBy: $orderBy, orderDirection: asc, where: $where) {
    id
    amount
    date
    operator { id }
  }
}"#;

#[derive(Deserialize)]
struct BlocksData {
    blocks: Vec<RawBlock>,
}

#[derive(Deserialize)]
struct RawBlock {
    id: String,
    number: String,
    timestamp: String,
}

impl TryFrom<RawBlock> for BlockRecord {
    type Error = ReimburseError;

    fn try_from(raw: RawBlock) -> Result<Self> {
        let parse = |field: &str, s: &str| {
            s.parse::<u64>().map_err(|e| {
                ReimburseError::InvalidData(format!("block {} has invalid {} {:?}: {}", raw.id, field, s, e))
            })
        };
        Ok(BlockRecord {
            number: parse("number", &raw.number)?,
            timestamp: parse("timestamp", &raw.timestamp)?,
            id: raw.id.clone(),
        })
    }
}

#[derive(Deserialize)]
struct OperatorData {
    operator: Option<OperatorRecord>,
}

#[derive(Deserialize)]
struct DelegationsData {
    delegations: Vec<DelegationRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlashingEventsData {
    slashing_events: Vec<SlashingEventRecord>,
}

pub struct SubgraphBlockIndex<C = GraphClient> {
    client: C,
}

impl<C> SubgraphBlockIndex<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: GraphTransport> BlockIndexSource for SubgraphBlockIndex<C> {
    async fn blocks_at_timestamp(&self, timestamp: u64) -> Result<Vec<BlockRecord>> {
        let data: BlocksData = fetch(
            &self.client,
            BLOCKS_AT_TIMESTAMP,
            json!({ "timestamp": timestamp.to_string() }),
        )
        .await?;
        data.blocks.into_iter().map(BlockRecord::try_from).collect()
    }
}

pub struct SubgraphStakingRegistry<C = GraphClient> {
    client: C,
}

impl<C: GraphTransport> SubgraphStakingRegistry<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Delegations of `operator_id` at `block` with ids past `last`.
    async fn delegations_after(&self, operator_id: &str, block: u64, last: &str) -> Result<Vec<DelegationRecord>> {
        let data: DelegationsData = fetch(
            &self.client,
            DELEGATIONS_PAGE,
            json!({
                "operator": operator_id,
                "block": block,
                "first": DELEGATION_PAGE_SIZE,
                "last": last,
            }),
        )
        .await?;
        Ok(data.delegations)
    }

    async fn events(&self, filter: Value, order_by: &str, first: usize) -> Result<Vec<SlashingEvent>> {
        if first == 0 {
            return Ok(Vec::new());
        }
        let data: SlashingEventsData = fetch(
            &self.client,
            SLASHING_EVENTS,
            json!({ "first": first, "orderBy": order_by, "where": filter }),
        )
        .await?;
        data.slashing_events.into_iter().map(SlashingEvent::try_from).collect()
    }
}

#[async_trait]
impl<C: GraphTransport> StakingRegistrySource for SubgraphStakingRegistry<C> {
    /// Reads the operator and then pages its delegations by id at the same
    /// block until a short page comes back.
    async fn operator_at_block(&self, operator_id: &str, block: u64) -> Result<Option<OperatorRecord>> {
        let data: OperatorData = fetch(
            &self.client,
            OPERATOR_AT_BLOCK,
            json!({ "id": operator_id, "block": block, "first": DELEGATION_PAGE_SIZE }),
        )
        .await?;
        let Some(mut operator) = data.operator else {
            return Ok(None);
        };

        let mut page_len = operator.delegations.len();
        let mut pages = 1usize;
        while page_len >= DELEGATION_PAGE_SIZE {
            let last = match operator.delegations.last() {
                Some(d) => d.id.clone(),
                None => break,
            };
            let page = self.delegations_after(operator_id, block, &last).await?;
            if page.first().is_some_and(|d| d.id <= last) {
                return Err(ReimburseError::InvalidData(format!(
                    "delegation page for operator {} did not advance past {}",
                    operator_id, last
                )));
            }
            page_len = page.len();
            pages += 1;
            operator.delegations.extend(page);
        }
        debug!(
            operator = operator_id,
            block,
            pages,
            delegations = operator.delegations.len(),
            "Read operator delegations"
        );
        Ok(Some(operator))
    }

    /// The subgraph orders by a single field, so ties on `date` come back
    /// in an unspecified order. Keyset paging needs `(date, id)` order, so
    /// the cursor's own second and any second a full page ends on are
    /// re-read ordered by id.
    async fn slashing_events_page(&self, window: &EventWindow, page_size: usize) -> Result<Vec<SlashingEvent>> {
        let mut page = Vec::with_capacity(page_size);
        if let Some(after_id) = &window.after_id {
            page = self.events(tie_filter(window.start, Some(after_id.as_str())), "id", page_size).await?;
            if page.len() >= page_size {
                return Ok(page);
            }
        }

        let room = page_size - page.len();
        let range = self.events(range_filter(window), "date", room).await?;
        if range.len() < room {
            page.extend(range);
            return Ok(page);
        }
        let Some(last_date) = range.last().map(|e| e.date) else {
            return Ok(page);
        };

        page.extend(range.into_iter().filter(|e| e.date < last_date));
        let room = page_size - page.len();
        page.extend(self.events(tie_filter(last_date, None), "id", room).await?);
        Ok(page)
    }
}

/// Events dated inside `window`, excluding its start second when a keyset
/// cursor already covers it.
fn range_filter(window: &EventWindow) -> Value {
    let start = window.start.to_string();
    let end = window.end.to_string();
    match &window.after_id {
        None => json!({ "date_gte": start, "date_lte": end }),
        Some(_) => json!({ "date_gt": start, "date_lte": end }),
    }
}

/// Events dated exactly `date`, optionally past the id `after_id`.
fn tie_filter(date: u64, after_id: Option<&str>) -> Value {
    match after_id {
        None => json!({ "date": date.to_string() }),
        Some(after_id) => json!({ "date": date.to_string(), "id_gt": after_id }),
    }
}
