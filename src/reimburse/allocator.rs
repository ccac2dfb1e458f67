//! Splits a slashed amount between an operator's owner and its delegators.
//!
//! The owner absorbs the loss first. Only when the owner's whole stake is
//! worth less than the slash do the other delegators share the remainder,
//! pro rata to their operator-token balances.
//!
//! The exchange rate `value_without_earnings / operator_token_total_supply`
//! is never materialised as a rounded number. Every quantity is computed as
//! one big-integer product over one big-integer divisor, and integer
//! division truncates, so no share ever exceeds its exact entitlement.

use num_bigint::BigUint;
use num_traits::Zero;
use tracing::debug;

use super::Reimbursement;
use crate::error::{ReimburseError, Result};
use crate::staking::{OperatorSnapshot, SlashingEvent};

/// Default conservation tolerance in wei.
pub const DEFAULT_TOLERANCE_WEI: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct Allocator {
    tolerance: BigUint,
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new(BigUint::from(DEFAULT_TOLERANCE_WEI))
    }
}

impl Allocator {
    pub fn new(tolerance: BigUint) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> &BigUint {
        &self.tolerance
    }

    /// Reimbursements for `event`, sorted by recipient.
    ///
    /// `snapshot` must be the operator's state one block before the block
    /// the event landed in.
    pub fn allocate(
        &self,
        event: &SlashingEvent,
        snapshot: &OperatorSnapshot,
    ) -> Result<Vec<Reimbursement>> {
        let slashed = &event.amount;
        let supply = &snapshot.operator_token_total_supply;
        let value = &snapshot.value_without_earnings;
        if supply.is_zero() || value.is_zero() {
            return Err(ReimburseError::InvalidData(format!(
                "operator {} at block {} has supply {} and value {}",
                snapshot.operator_id, snapshot.block, supply, value
            )));
        }

        // slashed / (value / supply)
        let slashed_in_operator_tokens = (slashed * supply) / value;

        let owner = snapshot.owner_delegation().ok_or_else(|| {
            ReimburseError::OwnerDelegationMissing {
                operator_id: snapshot.operator_id.clone(),
                owner: snapshot.owner.clone(),
                block: snapshot.block,
                delegators: snapshot
                    .delegations
                    .iter()
                    .map(|d| d.delegator_id.clone())
                    .collect(),
            }
        })?;
        let owner_balance = &owner.operator_token_balance;

        let mut reimbursements = if *owner_balance >= slashed_in_operator_tokens {
            debug!(
                operator = %snapshot.operator_id,
                event = %event.id,
                "Owner absorbs the full slash"
            );
            vec![Reimbursement {
                recipient: snapshot.owner.clone(),
                amount: slashed.clone(),
            }]
        } else {
            self.share(slashed, owner_balance, snapshot)?
        };

        self.check_conservation(slashed, &reimbursements)?;
        reimbursements.sort_by(|a, b| a.recipient.cmp(&b.recipient));
        Ok(reimbursements)
    }

    fn share(
        &self,
        slashed: &BigUint,
        owner_balance: &BigUint,
        snapshot: &OperatorSnapshot,
    ) -> Result<Vec<Reimbursement>> {
        let supply = &snapshot.operator_token_total_supply;
        let value = &snapshot.value_without_earnings;
        if owner_balance > supply {
            return Err(ReimburseError::InvalidData(format!(
                "owner {} of operator {} holds {} of a {} token supply at block {}",
                snapshot.owner, snapshot.operator_id, owner_balance, supply, snapshot.block
            )));
        }

        // owner_balance * value / supply < slashed here, so this cannot underflow.
        let owner_amount = (owner_balance * value) / supply;
        let remaining_value = slashed - &owner_amount;
        let remaining_pool = supply - owner_balance;

        debug!(
            operator = %snapshot.operator_id,
            owner_amount = %owner_amount,
            remaining_value = %remaining_value,
            remaining_pool = %remaining_pool,
            "Owner stake insufficient, sharing remainder"
        );

        let mut reimbursements = Vec::with_capacity(snapshot.delegations.len());
        reimbursements.push(Reimbursement {
            recipient: snapshot.owner.clone(),
            amount: owner_amount,
        });
        for delegation in snapshot.delegations.iter().filter(|d| d.delegator_id != snapshot.owner) {
            let amount = if remaining_pool.is_zero() {
                BigUint::zero()
            } else {
                (&delegation.operator_token_balance * &remaining_value) / &remaining_pool
            };
            reimbursements.push(Reimbursement {
                recipient: delegation.delegator_id.clone(),
                amount,
            });
        }
        Ok(reimbursements)
    }

    fn check_conservation(&self, slashed: &BigUint, reimbursements: &[Reimbursement]) -> Result<()> {
        let total: BigUint = reimbursements.iter().map(|r| &r.amount).sum();
        let drift = if total > *slashed {
            &total - slashed
        } else {
            slashed - &total
        };
        if drift > self.tolerance {
            return Err(ReimburseError::ReimbursementMismatch {
                slashed: slashed.clone(),
                total,
                tolerance: self.tolerance.clone(),
                reimbursements: reimbursements.to_vec(),
            });
        }
        Ok(())
    }
}
