use num_bigint::BigUint;
use num_traits::Zero;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{parse_rate, Delegation, OperatorRecord, OperatorSnapshot};
use super::StakingRegistrySource;
use crate::error::{ReimburseError, Result};
use crate::reimburse::parse_wei;

/// Reported and implied exchange rates further apart than this are logged.
const RATE_DIVERGENCE: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Canonical form of a registry id.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Reads point-in-time operator state from the staking registry.
pub struct SnapshotReader<S: ?Sized> {
    source: Arc<S>,
}

impl<S: StakingRegistrySource + ?Sized> SnapshotReader<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Operator state as of `block`. Callers pass the block before the
    /// slashing block so the snapshot predates the slash.
    pub async fn read_snapshot(&self, operator_id: &str, block: u64) -> Result<OperatorSnapshot> {
        let operator_id = normalize_id(operator_id);
        let record = self
            .source
            .operator_at_block(&operator_id, block)
            .await?
            .ok_or_else(|| ReimburseError::OperatorNotFound {
                operator_id: operator_id.clone(),
                block,
            })?;

        let snapshot = build_snapshot(operator_id, block, record)?;

        if let (Some(reported), Some(implied)) = (snapshot.exchange_rate, snapshot.implied_exchange_rate()) {
            if (implied - reported).abs() > RATE_DIVERGENCE {
                warn!(
                    operator = %snapshot.operator_id,
                    block,
                    reported = %reported,
                    implied = %implied,
                    "Reported exchange rate differs from value/supply"
                );
            }
        }

        debug!(
            operator = %snapshot.operator_id,
            block,
            supply = %snapshot.operator_token_total_supply,
            delegations = snapshot.delegations.len(),
            "Read operator snapshot"
        );
        Ok(snapshot)
    }
}

fn build_snapshot(operator_id: String, block: u64, record: OperatorRecord) -> Result<OperatorSnapshot> {
    let operator_token_total_supply = parse_wei(&record.operator_token_total_supply)?;
    let value_without_earnings = parse_wei(&record.value_without_earnings)?;
    if operator_token_total_supply.is_zero() {
        return Err(ReimburseError::InvalidData(format!(
            "operator {} has zero token supply at block {}",
            operator_id, block
        )));
    }
    if value_without_earnings.is_zero() {
        return Err(ReimburseError::InvalidData(format!(
            "operator {} has zero value at block {}",
            operator_id, block
        )));
    }

    let exchange_rate = match parse_rate(&record.exchange_rate) {
        Ok(rate) => Some(rate),
        Err(e) => {
            warn!(operator = %operator_id, block, error = %e, "Ignoring unparseable exchange rate");
            None
        }
    };

    let mut seen = HashSet::new();
    let mut delegated = BigUint::zero();
    let mut delegations = Vec::with_capacity(record.delegations.len());
    for d in record.delegations {
        let delegator_id = normalize_id(&d.delegator.id);
        if !seen.insert(delegator_id.clone()) {
            return Err(ReimburseError::InvalidData(format!(
                "operator {} lists delegator {} twice at block {}",
                operator_id, delegator_id, block
            )));
        }
        let operator_token_balance: BigUint = parse_wei(&d.operator_token_balance)?;
        delegated += &operator_token_balance;
        delegations.push(Delegation {
            delegator_id,
            operator_token_balance,
        });
    }

    // A partial delegator set would silently drop recipients downstream.
    if delegated != operator_token_total_supply {
        return Err(ReimburseError::InvalidData(format!(
            "operator {} delegations sum to {} but supply is {} at block {}",
            operator_id, delegated, operator_token_total_supply, block
        )));
    }

    Ok(OperatorSnapshot {
        operator_id,
        block,
        operator_token_total_supply,
        exchange_rate,
        owner: normalize_id(&record.owner),
        value_without_earnings,
        delegations,
    })
}
