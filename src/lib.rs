pub mod api;
pub mod blockchain;
pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod listener;
pub mod logging;
pub mod models;

pub use blockchain::{BlockSource, RpcBlockFetcher, RpcClient, WsHeadSubscriber};
pub use config::{AppConfig, DatabaseConfig, ListenerConfig, LoggingConfig, NodeConfig};
pub use error::{ListenerError, Result};
pub use ledger::{ApplyOutcome, LedgerUpdater};
pub use listener::{BlockReport, ListenerLoop};
pub use logging::{ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor, SessionEvent};
