use log::{debug, error, info, trace, warn, LevelFilter};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::config::LoggingConfig;
use crate::error::{ErrorSeverity, ListenerError};

/// Structured logging context for the listener
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Block numbers are unbounded, so they are logged as decimal strings
    pub fn with_block_number(self, block_number: &impl std::fmt::Display) -> Self {
        self.with_metadata("block_number", json!(block_number.to_string()))
    }

    pub fn with_transaction_hash(self, tx_hash: &str) -> Self {
        self.with_metadata("transaction_hash", json!(tx_hash))
    }

    pub fn with_address(self, address: &str) -> Self {
        self.with_metadata("address", json!(address))
    }

    pub fn with_amount(self, amount: &str) -> Self {
        self.with_metadata("amount", json!(amount))
    }

    pub fn with_duration_ms(self, duration_ms: u64) -> Self {
        self.with_metadata("duration_ms", json!(duration_ms))
    }

    pub fn with_attempt(self, attempt: u64) -> Self {
        self.with_metadata("attempt", json!(attempt))
    }

    fn format_message(&self, level: &str, message: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut log_entry = json!({
            "timestamp": timestamp,
            "level": level,
            "component": self.component,
            "operation": self.operation,
            "message": message,
        });

        for (key, value) in &self.metadata {
            log_entry[key] = value.clone();
        }

        log_entry.to_string()
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message("INFO", message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message("WARN", message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message("ERROR", message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message("DEBUG", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message("TRACE", message));
    }
}

/// Times an operation and logs its outcome
pub struct PerformanceMonitor {
    start: Instant,
    operation: String,
    metadata: HashMap<String, Value>,
}

impl PerformanceMonitor {
    pub fn new(operation: &str) -> Self {
        Self {
            start: Instant::now(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) -> u64
    where
        E: std::fmt::Display,
    {
        let duration = self.start.elapsed().as_millis() as u64;

        let mut context = LogContext::new("performance", &self.operation).with_duration_ms(duration);
        for (key, value) in self.metadata {
            context = context.with_metadata(&key, value);
        }

        match result {
            Ok(_) => context.debug(&format!("Operation completed in {}ms", duration)),
            Err(e) => {
                context = context.with_metadata("error", json!(e.to_string()));
                context.warn(&format!("Operation failed after {}ms: {}", duration, e));
            }
        }

        duration
    }
}

/// Error logging utilities
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &ListenerError, context: Option<LogContext>) {
        let severity = error.severity();

        let log_context = context
            .unwrap_or_else(|| LogContext::new("error", "unknown"))
            .with_metadata("error_type", json!(format!("{:?}", error)))
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("recoverable", json!(error.is_recoverable()));

        let message = format!("Error occurred: {}", error);

        match severity {
            ErrorSeverity::Critical | ErrorSeverity::High => log_context.error(&message),
            ErrorSeverity::Medium => log_context.warn(&message),
            ErrorSeverity::Low => log_context.info(&message),
        }
    }
}

/// Subscription session lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Established,
    Lost,
}

impl SessionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEvent::Established => "established",
            SessionEvent::Lost => "lost",
        }
    }
}

/// Operational metrics written to the log
pub struct MetricsLogger;

impl MetricsLogger {
    pub fn log_block_processed(
        block_number: &impl std::fmt::Display,
        block_hash: Option<&str>,
        transfer_count: usize,
        credited_count: usize,
        processing_time_ms: u64,
    ) {
        let context = LogContext::new("metrics", "block_processed")
            .with_block_number(block_number)
            .with_metadata("block_hash", json!(block_hash))
            .with_metadata("transfer_count", json!(transfer_count))
            .with_metadata("credited_count", json!(credited_count))
            .with_duration_ms(processing_time_ms);

        context.info(&format!(
            "Processed block {} with {} transfers, {} credited",
            block_number, transfer_count, credited_count
        ));
    }

    pub fn log_deposit_credited(address: &str, tx_hash: &str, amount: &str, new_balance: &str) {
        let context = LogContext::new("metrics", "deposit_credited")
            .with_address(address)
            .with_transaction_hash(tx_hash)
            .with_amount(amount)
            .with_metadata("new_balance", json!(new_balance));

        context.info(&format!("Increased balance for {} by {} wei", address, amount));
    }

    pub fn log_session_event(event: SessionEvent, attempt: u64, detail: &str) {
        let context = LogContext::new("metrics", "subscription_session")
            .with_metadata("event", json!(event.as_str()))
            .with_attempt(attempt);

        match event {
            SessionEvent::Established => context.info(detail),
            SessionEvent::Lost => context.warn(detail),
        }
    }

    pub fn log_rpc_call(method: &str, duration_ms: u64, success: bool) {
        let context = LogContext::new("metrics", "rpc_call")
            .with_metadata("method", json!(method))
            .with_duration_ms(duration_ms)
            .with_metadata("success", json!(success));

        if success {
            context.debug(&format!("RPC call {} completed in {}ms", method, duration_ms));
        } else {
            context.warn(&format!("RPC call {} failed after {}ms", method, duration_ms));
        }
    }
}

fn level_filter(level: &str) -> LevelFilter {
    match level {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize logging for the application.
///
/// `RUST_LOG` still wins over the configured level when set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), log::SetLoggerError> {
    let json_output = config.format == "json";

    env_logger::Builder::new()
        .filter_level(level_filter(&config.level))
        .parse_default_env()
        .format(move |buf, record| {
            use std::io::Write;

            let line = record.args().to_string();
            if let Ok(json_value) = serde_json::from_str::<Value>(&line) {
                if json_output {
                    writeln!(buf, "{}", json_value)
                } else {
                    writeln!(buf, "{}", serde_json::to_string_pretty(&json_value)?)
                }
            } else if json_output {
                writeln!(
                    buf,
                    "{}",
                    json!({
                        "timestamp": chrono::Utc::now().to_rfc3339(),
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "message": line,
                    })
                )
            } else {
                writeln!(
                    buf,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    line
                )
            }
        })
        .try_init()?;

    info!("Logging initialized at level {}", config.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, SubscriptionError};

    #[test]
    fn test_log_context_with_metadata() {
        let context = LogContext::new("test", "test")
            .with_block_number(&12345u64)
            .with_transaction_hash("0xabc123")
            .with_amount("1000000000000000000");

        assert_eq!(context.metadata.get("block_number"), Some(&json!("12345")));
        assert_eq!(context.metadata.get("transaction_hash"), Some(&json!("0xabc123")));
        assert_eq!(context.metadata.get("amount"), Some(&json!("1000000000000000000")));
    }

    #[test]
    fn test_log_context_format_message() {
        let context = LogContext::new("block_source", "reconnect").with_attempt(3);

        let message = context.format_message("WARN", "connection lost");

        let parsed: Value = serde_json::from_str(&message).expect("Should be valid JSON");
        assert_eq!(parsed["level"], "WARN");
        assert_eq!(parsed["component"], "block_source");
        assert_eq!(parsed["operation"], "reconnect");
        assert_eq!(parsed["message"], "connection lost");
        assert_eq!(parsed["attempt"], 3);
    }

    #[test]
    fn test_performance_monitor_reports_duration() {
        let monitor = PerformanceMonitor::new("test_operation").with_metadata("k", json!("v"));
        let result: Result<(), String> = Err("boom".to_string());
        let _duration = monitor.finish_with_result(&result);
    }

    #[test]
    fn test_error_and_metrics_logging_do_not_panic() {
        let error = ListenerError::Fetch(FetchError::Timeout { block: "9".to_string(), millis: 5000 });
        ErrorLogger::log_error(&error, Some(LogContext::new("test", "error_test")));
        ErrorLogger::log_error(&ListenerError::Subscription(SubscriptionError::StreamEnded), None);

        MetricsLogger::log_block_processed(&100u64, Some("0xblock"), 3, 1, 12);
        MetricsLogger::log_deposit_credited("0xacct1", "0xabc", "1", "1");
        MetricsLogger::log_session_event(SessionEvent::Established, 1, "subscribed");
        MetricsLogger::log_session_event(SessionEvent::Lost, 2, "connection lost");
        MetricsLogger::log_rpc_call("eth_getBlockByNumber", 250, true);
    }

    #[test]
    fn test_session_event_labels() {
        assert_eq!(SessionEvent::Established.as_str(), "established");
        assert_eq!(SessionEvent::Lost.as_str(), "lost");
    }

    #[test]
    fn test_level_filter_mapping() {
        assert_eq!(level_filter("debug"), LevelFilter::Debug);
        assert_eq!(level_filter("error"), LevelFilter::Error);
        assert_eq!(level_filter("unknown"), LevelFilter::Info);
    }
}
