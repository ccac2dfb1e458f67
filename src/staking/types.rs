//! Staking registry data model: slashing events and operator snapshots.

use num_bigint::BigUint;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ReimburseError, Result};
use crate::reimburse::parse_wei;

/// A slashing penalty applied to one operator at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashingEvent {
    /// Registry entity id, used as the pagination tie-breaker.
    pub id: String,
    /// Slashed value in wei.
    pub amount: BigUint,
    /// Unix timestamp in seconds.
    pub date: u64,
    pub operator_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub delegator_id: String,
    pub operator_token_balance: BigUint,
}

/// Operator state frozen at `block`. Built once by the snapshot reader and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorSnapshot {
    pub operator_id: String,
    pub block: u64,
    pub operator_token_total_supply: BigUint,
    /// Rate as reported by the registry, `None` when it did not parse.
    /// Informational only; allocation derives the rate from
    /// `value_without_earnings` and the supply.
    pub exchange_rate: Option<Decimal>,
    pub owner: String,
    pub value_without_earnings: BigUint,
    pub delegations: Vec<Delegation>,
}

impl OperatorSnapshot {
    pub fn owner_delegation(&self) -> Option<&Delegation> {
        self.delegations.iter().find(|d| d.delegator_id == self.owner)
    }

    /// `value_without_earnings / operator_token_total_supply` as a decimal,
    /// or `None` when either side does not fit a `Decimal`.
    pub fn implied_exchange_rate(&self) -> Option<Decimal> {
        let value = Decimal::from_str(&self.value_without_earnings.to_string()).ok()?;
        let supply = Decimal::from_str(&self.operator_token_total_supply.to_string()).ok()?;
        value.checked_div(supply)
    }
}

/// Reference to another registry entity, as nested in query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
}

/// Operator as returned by the registry, with numbers still in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRecord {
    pub id: String,
    pub owner: String,
    pub operator_token_total_supply: String,
    pub exchange_rate: String,
    pub value_without_earnings: String,
    #[serde(default)]
    pub delegations: Vec<DelegationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationRecord {
    /// Delegation entity id, the paging key for large operators.
    pub id: String,
    pub delegator: EntityRef,
    pub operator_token_balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingEventRecord {
    pub id: String,
    pub amount: String,
    pub date: String,
    pub operator: EntityRef,
}

impl TryFrom<SlashingEventRecord> for SlashingEvent {
    type Error = ReimburseError;

    fn try_from(record: SlashingEventRecord) -> Result<Self> {
        let date = record.date.parse::<u64>().map_err(|e| {
            ReimburseError::InvalidData(format!(
                "slashing event {} has invalid date {:?}: {}",
                record.id, record.date, e
            ))
        })?;
        Ok(SlashingEvent {
            amount: parse_wei(&record.amount)?,
            date,
            operator_id: record.operator.id,
            id: record.id,
        })
    }
}

/// Parses a registry decimal string. Fractional digits past what a
/// `Decimal` can hold are truncated.
pub fn parse_rate(s: &str) -> Result<Decimal> {
    let s = s.trim();
    if s.contains(['e', 'E']) {
        return Decimal::from_scientific(s)
            .map_err(|e| ReimburseError::InvalidData(format!("invalid rate {:?}: {}", s, e)));
    }
    let trimmed = match s.split_once('.') {
        Some((int, frac)) => {
            let int_digits = int.trim_start_matches(['-', '+']).trim_start_matches('0').len();
            let keep = 28usize.saturating_sub(int_digits).min(frac.len());
            if keep == 0 {
                int.to_string()
            } else {
                format!("{}.{}", int, &frac[..keep])
            }
        }
        None => s.to_string(),
    };
    Decimal::from_str(&trimmed)
        .map_err(|e| ReimburseError::InvalidData(format!("invalid rate {:?}: {}", s, e)))
}
