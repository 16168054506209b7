use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::rpc_client::{RawBlock, RpcClient};
use crate::error::{FetchError, ProcessingError};
use crate::logging::LogContext;
use crate::models::{Block, BlockNumber, Transaction, WeiAmount};

/// Retrieves the full body of a block by number
#[async_trait]
pub trait BlockFetcher: Send + Sync {
    async fn fetch(&self, number: &BlockNumber) -> Result<Block, FetchError>;
}

/// Fetches blocks over JSON-RPC with a hard deadline per call. Never retries.
pub struct RpcBlockFetcher {
    rpc: RpcClient,
    deadline: Duration,
}

impl RpcBlockFetcher {
    pub fn new(rpc: RpcClient, deadline: Duration) -> Self {
        Self { rpc, deadline }
    }
}

#[async_trait]
impl BlockFetcher for RpcBlockFetcher {
    async fn fetch(&self, number: &BlockNumber) -> Result<Block, FetchError> {
        let raw = match timeout(self.deadline, self.rpc.get_block(number)).await {
            Ok(result) => result?,
            Err(_) => {
                LogContext::new("block_fetcher", "fetch")
                    .with_block_number(number)
                    .with_duration_ms(self.deadline.as_millis() as u64)
                    .warn("Block fetch deadline expired");
                return Err(FetchError::Timeout {
                    block: number.to_string(),
                    millis: self.deadline.as_millis() as u64,
                });
            }
        };

        Ok(decode_block(raw, number)?)
    }
}

/// Structural decoding only. A missing number falls back to the one requested.
pub fn decode_block(raw: RawBlock, requested: &BlockNumber) -> Result<Block, ProcessingError> {
    let number = match raw.number.as_deref() {
        Some(hex) => BlockNumber::from_hex(hex)?,
        None => requested.clone(),
    };

    let transactions = raw
        .transactions
        .into_iter()
        .map(|tx| {
            let value_wei = WeiAmount::from_hex_quantity(&tx.value)?;
            Ok(Transaction {
                hash: tx.hash,
                value_wei,
                to: tx.to,
            })
        })
        .collect::<Result<Vec<_>, ProcessingError>>()?;

    Ok(Block {
        number,
        hash: raw.hash,
        transactions,
    })
}
