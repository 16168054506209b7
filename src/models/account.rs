use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A tracked deposit address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub address: String,
    /// Decimal string of wei
    pub balance: String,
    /// Identity of the account holder in the external payment system
    pub external_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// A stored ledger transaction. Its `tx_hash` is the idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransactionRecord {
    pub id: i64,
    pub tx_hash: String,
    pub confirmed: bool,
    pub direction: Direction,
    pub confirmation_count: u32,
    pub account_id: i64,
    pub created_at: i64,
}

/// Fields supplied when creating a ledger transaction record
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransactionRecord {
    pub tx_hash: String,
    pub confirmed: bool,
    pub direction: Direction,
    pub confirmation_count: u32,
    pub account_id: i64,
}

impl NewTransactionRecord {
    /// Record for a confirmed incoming deposit
    pub fn confirmed_deposit(tx_hash: &str, account_id: i64) -> Self {
        Self {
            tx_hash: tx_hash.to_string(),
            confirmed: true,
            direction: Direction::In,
            confirmation_count: 1,
            account_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trip_through_str() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!("out".parse::<Direction>().unwrap(), Direction::Out);
        assert!("inflow".parse::<Direction>().is_err());
        assert_eq!(Direction::In.to_string(), "in");
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(serde_json::to_string(&Direction::In).unwrap(), "\"in\"");
        assert_eq!(serde_json::to_string(&Direction::Out).unwrap(), "\"out\"");
    }

    #[test]
    fn test_confirmed_deposit_record() {
        let record = NewTransactionRecord::confirmed_deposit("0xabc", 7);
        assert!(record.confirmed);
        assert_eq!(record.direction, Direction::In);
        assert_eq!(record.confirmation_count, 1);
        assert_eq!(record.account_id, 7);
    }
}
