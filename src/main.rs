use std::sync::Arc;

use deposit_listener::blockchain::{BlockSource, BlockSourceConfig, RpcBlockFetcher, RpcClient, WsHeadSubscriber};
use deposit_listener::config::AppConfig;
use deposit_listener::database::Database;
use deposit_listener::ledger::{LedgerUpdater, LogNotifier};
use deposit_listener::listener::ListenerLoop;
use deposit_listener::logging::{init_logging, ErrorLogger, LogContext};
use deposit_listener::ListenerError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging)?;

    let context = LogContext::new("main", "startup")
        .with_metadata("ws_endpoint", serde_json::json!(config.node.ws_endpoint))
        .with_metadata("http_endpoint", serde_json::json!(config.node.http_endpoint))
        .with_metadata("database", serde_json::json!(config.database.path));
    context.info("Starting deposit listener");

    let database = Arc::new(Database::open(&config.database).map_err(ListenerError::from)?);
    let rpc = RpcClient::new(config.node.http_endpoint.clone(), config.node.request_timeout_seconds)
        .map_err(ListenerError::from)?;

    let subscriber = Arc::new(WsHeadSubscriber::new(config.node.ws_endpoint.clone(), rpc.clone()));
    let source = Arc::new(BlockSource::new(subscriber, BlockSourceConfig::from(&config.node)));
    let fetcher = Arc::new(RpcBlockFetcher::new(rpc, config.node.fetch_timeout()));
    let updater = LedgerUpdater::new(database).with_notifier(Arc::new(LogNotifier));

    let listener = ListenerLoop::new(fetcher, updater);

    tokio::select! {
        result = listener.start(source, config.listener.queue_capacity) => {
            if let Err(e) = result {
                ErrorLogger::log_error(&e, Some(LogContext::new("main", "run")));
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            LogContext::new("main", "shutdown").info("Received shutdown signal, stopping");
        }
    }

    Ok(())
}
