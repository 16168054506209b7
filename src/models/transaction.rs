use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ProcessingError;
use crate::models::wei::{parse_hex_biguint, WeiAmount};

/// Height of a block. Unbounded, so no node can report a number we cannot hold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockNumber(BigUint);

impl BlockNumber {
    /// Normalize the hex encoding used by subscription payloads and block headers
    pub fn from_hex(value: &str) -> Result<Self, ProcessingError> {
        parse_hex_biguint(value)
            .map(Self)
            .ok_or_else(|| ProcessingError::MalformedBlockNumber(value.to_string()))
    }

    /// JSON-RPC quantity encoding, e.g. `0x64` for block 100
    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl From<u64> for BlockNumber {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fetched block: header fields plus its ordered transactions
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub number: BlockNumber,
    /// Absent while the node is still assembling the block
    pub hash: Option<String>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub hash: String,
    pub value_wei: WeiAmount,
    /// `None` for contract creation
    pub to: Option<String>,
}

impl Transaction {
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// The part of a transaction needed to credit a deposit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub hash: String,
    pub value_wei: WeiAmount,
    pub to: String,
}
