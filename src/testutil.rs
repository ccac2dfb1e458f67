//! In-memory stand-ins for the block index and staking registry.

use async_trait::async_trait;
use num_bigint::BigUint;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use crate::blocks::{BlockIndexSource, BlockRecord};
use crate::error::Result;
use crate::staking::{
    DelegationRecord, EntityRef, EventWindow, OperatorRecord, SlashingEvent, StakingRegistrySource,
};

#[derive(Default)]
pub struct InMemoryRegistry {
    pub operators: HashMap<(String, u64), OperatorRecord>,
    pub events: Vec<SlashingEvent>,
    requests: Mutex<Vec<EventWindow>>,
}

impl InMemoryRegistry {
    pub fn insert_operator(&mut self, block: u64, record: OperatorRecord) {
        self.operators.insert((record.id.to_lowercase(), block), record);
    }

    pub fn page_requests(&self) -> Vec<EventWindow> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StakingRegistrySource for InMemoryRegistry {
    async fn operator_at_block(&self, operator_id: &str, block: u64) -> Result<Option<OperatorRecord>> {
        Ok(self.operators.get(&(operator_id.to_string(), block)).cloned())
    }

    async fn slashing_events_page(
        &self,
        window: &EventWindow,
        page_size: usize,
    ) -> Result<Vec<SlashingEvent>> {
        self.requests.lock().unwrap().push(window.clone());
        let mut matching: Vec<SlashingEvent> =
            self.events.iter().filter(|e| window.contains(e)).cloned().collect();
        matching.sort_by(|a, b| (a.date, &a.id).cmp(&(b.date, &b.id)));
        matching.truncate(page_size);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryBlocks {
    pub blocks: Vec<BlockRecord>,
}

impl InMemoryBlocks {
    /// One block per `(timestamp, number)` pair.
    pub fn with(pairs: &[(u64, u64)]) -> Self {
        Self {
            blocks: pairs
                .iter()
                .map(|&(timestamp, number)| BlockRecord {
                    id: format!("0x{:x}", number),
                    number,
                    timestamp,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl BlockIndexSource for InMemoryBlocks {
    async fn blocks_at_timestamp(&self, timestamp: u64) -> Result<Vec<BlockRecord>> {
        Ok(self.blocks.iter().filter(|b| b.timestamp == timestamp).cloned().collect())
    }
}

/// Operator record whose reported rate is `value / supply`.
pub fn operator_record(
    id: &str,
    owner: &str,
    supply: &str,
    value: &str,
    delegations: &[(&str, &str)],
) -> OperatorRecord {
    let rate = match (Decimal::from_str(value), Decimal::from_str(supply)) {
        (Ok(v), Ok(s)) => v.checked_div(s).unwrap_or_default(),
        _ => Decimal::ZERO,
    };
    OperatorRecord {
        id: id.to_string(),
        owner: owner.to_string(),
        operator_token_total_supply: supply.to_string(),
        exchange_rate: rate.to_string(),
        value_without_earnings: value.to_string(),
        delegations: delegations
            .iter()
            .map(|(delegator, balance)| DelegationRecord {
                id: format!("{}-{}", id, delegator),
                delegator: EntityRef {
                    id: delegator.to_string(),
                },
                operator_token_balance: balance.to_string(),
            })
            .collect(),
    }
}

pub fn slashing_event(id: &str, date: u64, amount: u64) -> SlashingEvent {
    SlashingEvent {
        id: id.to_string(),
        amount: BigUint::from(amount),
        date,
        operator_id: "0xop".to_string(),
    }
}
