pub mod allocator;
pub mod report;

use num_bigint::BigUint;
use std::fmt;
use std::str::FromStr;

use crate::error::{ReimburseError, Result};

pub use allocator::{Allocator, DEFAULT_TOLERANCE_WEI};
pub use report::ReportWriter;

/// Amount owed to one recipient for one slashing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reimbursement {
    pub recipient: String,
    /// Wei.
    pub amount: BigUint,
}

impl fmt::Display for Reimbursement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.recipient, self.amount)
    }
}

/// Parses a base-10 unsigned integer such as a wei amount or token balance.
pub fn parse_wei(s: &str) -> Result<BigUint> {
    BigUint::from_str(s.trim())
        .map_err(|e| ReimburseError::InvalidData(format!("invalid unsigned integer {:?}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wei() {
        assert_eq!(
            parse_wei("123456789012345678901234567890").unwrap().to_string(),
            "123456789012345678901234567890"
        );
        assert_eq!(parse_wei(" 7 ").unwrap(), BigUint::from(7u32));
        assert!(parse_wei("-1").is_err());
        assert!(parse_wei("1.5").is_err());
        assert!(parse_wei("").is_err());
    }
}
