use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use crate::config::NodeConfig;
use crate::error::{BestEffort, SubscriptionError};
use crate::logging::{LogContext, MetricsLogger, SessionEvent};
use crate::models::BlockNumber;

/// A new-head notification as sent by the node. Only the number is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeadNotification {
    pub number: String,
    #[serde(default)]
    pub hash: Option<String>,
}

pub type HeadStream = Pin<Box<dyn Stream<Item = Result<HeadNotification, SubscriptionError>> + Send>>;

/// Transport that can open a new-heads subscription and query the current head
#[async_trait]
pub trait HeadSubscriber: Send + Sync {
    /// Open a subscription. The stream ends or yields an error when the session is lost.
    async fn subscribe_new_heads(&self) -> Result<HeadStream, SubscriptionError>;

    async fn latest_head(&self) -> Result<HeadNotification, SubscriptionError>;
}

#[derive(Debug, Clone)]
pub struct BlockSourceConfig {
    /// Bound on opening the subscription and on the initial head query
    pub subscribe_timeout: Duration,
    /// Fixed pause between a lost session and the next attempt
    pub reconnect_delay: Duration,
}

impl Default for BlockSourceConfig {
    fn default() -> Self {
        Self {
            subscribe_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

impl From<&NodeConfig> for BlockSourceConfig {
    fn from(node: &NodeConfig) -> Self {
        Self {
            subscribe_timeout: node.subscribe_timeout(),
            reconnect_delay: node.reconnect_delay(),
        }
    }
}

enum SessionEnd {
    Lost(SubscriptionError),
    ReceiverClosed,
}

/// Keeps a new-heads subscription alive and hands block numbers to a consumer.
///
/// Within one session the numbers handed over never decrease. After a
/// reconnect the freshly queried head may repeat or skip ahead of the last
/// number delivered.
pub struct BlockSource {
    subscriber: Arc<dyn HeadSubscriber>,
    config: BlockSourceConfig,
}

impl BlockSource {
    pub fn new(subscriber: Arc<dyn HeadSubscriber>, config: BlockSourceConfig) -> Self {
        Self { subscriber, config }
    }

    /// Run sessions until the receiving side of `deliver` is dropped
    pub async fn run(&self, deliver: mpsc::Sender<BlockNumber>) {
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;

            match self.run_session(attempt, &deliver).await {
                SessionEnd::ReceiverClosed => {
                    LogContext::new("block_source", "run")
                        .with_attempt(attempt)
                        .info("Consumer gone, stopping block source");
                    return;
                }
                SessionEnd::Lost(e) => {
                    MetricsLogger::log_session_event(
                        SessionEvent::Lost,
                        attempt,
                        &format!("connection lost: {}", e),
                    );
                }
            }

            sleep(self.config.reconnect_delay).await;
        }
    }

    /// Spawn `run` on the runtime and return the consuming end of the hand-off queue
    pub fn spawn(self: Arc<Self>, capacity: usize) -> mpsc::Receiver<BlockNumber> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(async move { self.run(tx).await });
        rx
    }

    async fn run_session(&self, attempt: u64, deliver: &mpsc::Sender<BlockNumber>) -> SessionEnd {
        let setup_timeout = SubscriptionError::SetupTimeout {
            seconds: self.config.subscribe_timeout.as_secs(),
        };

        let mut stream = match timeout(self.config.subscribe_timeout, self.subscriber.subscribe_new_heads()).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return SessionEnd::Lost(e),
            Err(_) => return SessionEnd::Lost(setup_timeout),
        };

        // Seed with the current head so the consumer does not wait for the next block
        let head = match timeout(self.config.subscribe_timeout, self.subscriber.latest_head()).await {
            Ok(Ok(head)) => head,
            Ok(Err(e)) => return SessionEnd::Lost(e),
            Err(_) => return SessionEnd::Lost(setup_timeout),
        };

        MetricsLogger::log_session_event(SessionEvent::Established, attempt, "Subscribed to new heads");

        let mut last_delivered: Option<BlockNumber> = None;
        if let Some(end) = self.forward(&head, &mut last_delivered, deliver).await {
            return end;
        }

        while let Some(item) = stream.next().await {
            match item {
                Ok(head) => {
                    if let Some(end) = self.forward(&head, &mut last_delivered, deliver).await {
                        return end;
                    }
                }
                Err(e) => return SessionEnd::Lost(e),
            }
        }

        SessionEnd::Lost(SubscriptionError::StreamEnded)
    }

    async fn forward(
        &self,
        head: &HeadNotification,
        last_delivered: &mut Option<BlockNumber>,
        deliver: &mpsc::Sender<BlockNumber>,
    ) -> Option<SessionEnd> {
        let context = LogContext::new("block_source", "forward")
            .with_metadata("raw_number", json!(head.number))
            .with_metadata("block_hash", json!(head.hash));

        let number = BlockNumber::from_hex(&head.number).or_log(context)?;

        if let Some(previous) = last_delivered.as_ref() {
            if number < *previous {
                LogContext::new("block_source", "forward")
                    .with_block_number(&number)
                    .with_metadata("last_delivered", json!(previous.to_string()))
                    .warn(&format!("Dropping out-of-order head {}, block not fetched", number));
                return None;
            }
        }

        if deliver.send(number.clone()).await.is_err() {
            return Some(SessionEnd::ReceiverClosed);
        }

        *last_delivered = Some(number);
        None
    }
}
