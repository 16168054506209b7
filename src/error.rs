use thiserror::Error;

use crate::database::DbError;
use crate::ledger::LedgerError;
use crate::logging::{ErrorLogger, LogContext};

/// Main error type for the deposit listener
#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Block source stopped: {0}")]
    SourceStopped(String),
}

/// JSON-RPC over HTTP errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC method error: code={code}, message={message}")]
    Method { code: i64, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Errors raised by the new-heads subscription transport
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Subscription rejected by node: {0}")]
    Rejected(String),

    #[error("Subscription setup timed out after {seconds} seconds")]
    SetupTimeout { seconds: u64 },

    #[error("Subscription stream ended")]
    StreamEnded,

    #[error("Could not fetch the current head: {0}")]
    Head(#[from] RpcError),
}

/// Errors returned by a block fetch
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Fetching block {block} timed out after {millis}ms")]
    Timeout { block: String, millis: u64 },

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Malformed block: {0}")]
    Malformed(#[from] ProcessingError),
}

/// Payload decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    #[error("Malformed block number: {0:?}")]
    MalformedBlockNumber(String),

    #[error("Amount parsing failed: {0:?}")]
    AmountParsing(String),

    #[error("Block parsing failed: {0}")]
    BlockParsing(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ListenerError>;

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The process cannot do useful work until an operator steps in
    Critical,
    /// A deposit may have been missed
    High,
    /// Transient; the listener recovers on its own
    Medium,
    /// Informational
    Low,
}

impl ListenerError {
    /// Get the severity level of an error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ListenerError::Config(_) => ErrorSeverity::Critical,
            ListenerError::SourceStopped(_) => ErrorSeverity::Critical,
            ListenerError::Database(DbError::Connection(_)) => ErrorSeverity::Critical,

            ListenerError::Ledger(_) => ErrorSeverity::High,
            ListenerError::Database(_) => ErrorSeverity::High,
            ListenerError::Fetch(_) => ErrorSeverity::High,

            ListenerError::Subscription(_) => ErrorSeverity::Medium,
            ListenerError::Rpc(_) => ErrorSeverity::Medium,

            ListenerError::Processing(ProcessingError::MalformedBlockNumber(_)) => ErrorSeverity::Low,
            ListenerError::Processing(_) => ErrorSeverity::Medium,
        }
    }

    /// Check if the listener keeps running after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ListenerError::Config(_) | ListenerError::SourceStopped(_)
        )
    }
}

/// Best-effort error tier.
///
/// Failures that must never stop the listener are logged at the point where
/// they occur and turned into `None`, so the caller decides explicitly to move
/// on instead of propagating.
pub trait BestEffort<T> {
    fn or_log(self, context: LogContext) -> Option<T>;
}

impl<T, E> BestEffort<T> for std::result::Result<T, E>
where
    E: Into<ListenerError>,
{
    fn or_log(self, context: LogContext) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                ErrorLogger::log_error(&e.into(), Some(context));
                None
            }
        }
    }
}
