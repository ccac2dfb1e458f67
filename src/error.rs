use num_bigint::BigUint;
use thiserror::Error;

use crate::blocks::BlockRecord;
use crate::reimburse::Reimbursement;

#[derive(Error, Debug)]
pub enum ReimburseError {
    #[error("Ambiguous block for timestamp {timestamp}: expected exactly one, got {}: {blocks:?}", .blocks.len())]
    AmbiguousBlock {
        timestamp: u64,
        blocks: Vec<BlockRecord>,
    },
    #[error("Operator {operator_id} not found at block {block}")]
    OperatorNotFound { operator_id: String, block: u64 },
    #[error("Operator {operator_id} at block {block} has no delegation for its owner {owner} (delegators: {delegators:?})")]
    OwnerDelegationMissing {
        operator_id: String,
        owner: String,
        block: u64,
        delegators: Vec<String>,
    },
    #[error("Reimbursement mismatch: computed {total}, slashed {slashed}, tolerance {tolerance}: {reimbursements:?}")]
    ReimbursementMismatch {
        slashed: BigUint,
        total: BigUint,
        tolerance: BigUint,
        reimbursements: Vec<Reimbursement>,
    },
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReimburseError>;
