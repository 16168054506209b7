use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ProcessingError;

/// Exact, arbitrary-precision amount of wei.
///
/// Ledger balances are kept as decimal strings; the node reports values as
/// `0x`-prefixed hex quantities. Both are parsed into the same integer so
/// crediting never loses precision.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeiAmount(BigUint);

impl WeiAmount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a base-10 string such as a stored account balance
    pub fn from_decimal_str(value: &str) -> Result<Self, ProcessingError> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProcessingError::AmountParsing(value.to_string()));
        }
        BigUint::parse_bytes(trimmed.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| ProcessingError::AmountParsing(value.to_string()))
    }

    /// Parse a JSON-RPC hex quantity (`0x` prefix optional, odd digit counts allowed)
    pub fn from_hex_quantity(value: &str) -> Result<Self, ProcessingError> {
        parse_hex_biguint(value)
            .map(Self)
            .ok_or_else(|| ProcessingError::AmountParsing(value.to_string()))
    }

    /// Balance after crediting `amount`
    pub fn credit(&self, amount: &WeiAmount) -> WeiAmount {
        WeiAmount(&self.0 + &amount.0)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl From<u64> for WeiAmount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for WeiAmount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl FromStr for WeiAmount {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal_str(s)
    }
}

impl fmt::Display for WeiAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for WeiAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for WeiAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_decimal_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parse `0x`-prefixed (or bare) hex digits into an unbounded integer.
pub(crate) fn parse_hex_biguint(value: &str) -> Option<BigUint> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    BigUint::parse_bytes(digits.as_bytes(), 16)
}
