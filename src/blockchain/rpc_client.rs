use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::blockchain::block_source::HeadNotification;
use crate::error::RpcError;
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{BlockNumber, WeiAmount};

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<Value>,
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    id: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Block as returned by `eth_getBlockByNumber` with full transactions.
/// Quantities stay hex strings until the fetcher decodes them.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub number: Option<String>,
    pub hash: Option<String>,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    pub value: String,
    pub to: Option<String>,
}

/// JSON-RPC client for the node's HTTP endpoint
#[derive(Clone)]
pub struct RpcClient {
    client: Client,
    endpoint: String,
}

impl RpcClient {
    pub fn new(endpoint: String, timeout_seconds: u64) -> Result<Self, RpcError> {
        let context = LogContext::new("rpc_client", "initialization")
            .with_metadata("endpoint", json!(endpoint))
            .with_metadata("timeout_seconds", json!(timeout_seconds));
        context.info("Initializing RPC client");

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn make_request(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let monitor = PerformanceMonitor::new("rpc_request").with_metadata("method", json!(method));

        let result = self.send(method, params).await;

        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_rpc_call(method, duration, result.is_ok());
        result
    }

    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        LogContext::new("rpc_client", "make_request")
            .with_metadata("method", json!(method))
            .trace(&format!("Sending RPC request: {}", method));

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }

        let rpc_response: JsonRpcResponse = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Method {
                code: error.code,
                message: error.message,
            });
        }

        // A JSON null result is meaningful (unknown block) and is passed on as Value::Null
        Ok(rpc_response.result.unwrap_or(Value::Null))
    }

    /// Block with full transaction objects. A null result means the node does not know the block.
    pub async fn get_block(&self, number: &BlockNumber) -> Result<RawBlock, RpcError> {
        let params = vec![json!(number.to_hex()), json!(true)];
        let result = self.make_request("eth_getBlockByNumber", params).await?;

        if result.is_null() {
            return Err(RpcError::BlockNotFound(number.to_string()));
        }

        let block: RawBlock = serde_json::from_value(result)?;

        LogContext::new("rpc_client", "get_block")
            .with_block_number(number)
            .with_metadata("transaction_count", json!(block.transactions.len()))
            .debug(&format!(
                "Retrieved block {} with {} transactions",
                number,
                block.transactions.len()
            ));

        Ok(block)
    }

    /// Header of the current chain head
    pub async fn get_latest_head(&self) -> Result<HeadNotification, RpcError> {
        let result = self
            .make_request("eth_getBlockByNumber", vec![json!("latest"), json!(false)])
            .await?;

        if result.is_null() {
            return Err(RpcError::BlockNotFound("latest".to_string()));
        }

        Ok(serde_json::from_value(result)?)
    }

    pub async fn get_block_number(&self) -> Result<BlockNumber, RpcError> {
        let result = self.make_request("eth_blockNumber", vec![]).await?;

        let hex_string = result
            .as_str()
            .ok_or_else(|| RpcError::InvalidResponse("Block number is not a string".to_string()))?;

        BlockNumber::from_hex(hex_string).map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }

    /// Current on-chain balance of an address at the latest block
    pub async fn get_balance(&self, address: &str) -> Result<WeiAmount, RpcError> {
        let result = self
            .make_request("eth_getBalance", vec![json!(address), json!("latest")])
            .await?;

        let hex_string = result
            .as_str()
            .ok_or_else(|| RpcError::InvalidResponse("Balance is not a string".to_string()))?;

        WeiAmount::from_hex_quantity(hex_string).map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }
}
