use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::blockchain::{extract, BlockFetcher, BlockSource};
use crate::error::{BestEffort, ListenerError};
use crate::ledger::{ApplyOutcome, LedgerUpdater};
use crate::logging::{LogContext, MetricsLogger};
use crate::models::BlockNumber;

/// What happened to one delivered block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockReport {
    pub number: Option<BlockNumber>,
    pub block_hash: Option<String>,
    /// False when the block body could not be retrieved
    pub fetched: bool,
    pub transfers: usize,
    pub credited: usize,
    pub already_credited: usize,
    pub untracked: usize,
    pub failed: usize,
}

/// Consumes block numbers and credits deposits, one block at a time
pub struct ListenerLoop {
    fetcher: Arc<dyn BlockFetcher>,
    updater: LedgerUpdater,
}

impl ListenerLoop {
    pub fn new(fetcher: Arc<dyn BlockFetcher>, updater: LedgerUpdater) -> Self {
        Self { fetcher, updater }
    }

    /// Spawn the block source and consume its hand-off queue.
    ///
    /// Only returns if the source task goes away.
    pub async fn start(&self, source: Arc<BlockSource>, capacity: usize) -> Result<(), ListenerError> {
        LogContext::new("listener", "start")
            .with_metadata("queue_capacity", serde_json::json!(capacity))
            .info("Starting deposit listener");

        let rx = source.spawn(capacity);
        self.run(rx).await;

        Err(ListenerError::SourceStopped("hand-off queue closed".to_string()))
    }

    pub async fn run(&self, mut rx: mpsc::Receiver<BlockNumber>) {
        while let Some(number) = rx.recv().await {
            self.process_block(&number).await;
        }

        LogContext::new("listener", "run").warn("Block hand-off queue closed");
    }

    /// Fetch, extract and apply one block. Failures are logged and counted, never raised.
    pub async fn process_block(&self, number: &BlockNumber) -> BlockReport {
        let started = Instant::now();
        let mut report = BlockReport {
            number: Some(number.clone()),
            ..BlockReport::default()
        };

        let fetched = self
            .fetcher
            .fetch(number)
            .await
            .or_log(LogContext::new("listener", "fetch_block").with_block_number(number));
        let Some(block) = fetched else {
            return report;
        };

        report.fetched = true;
        report.block_hash = block.hash.clone();

        let transfers = extract(&block);
        report.transfers = transfers.len();

        for transfer in &transfers {
            let context = LogContext::new("listener", "apply_transfer")
                .with_block_number(number)
                .with_transaction_hash(&transfer.hash)
                .with_address(&transfer.to);

            match self.updater.apply(transfer).or_log(context) {
                Some(ApplyOutcome::Credited { .. }) => report.credited += 1,
                Some(ApplyOutcome::AlreadyCredited) => report.already_credited += 1,
                Some(ApplyOutcome::UntrackedAddress) => report.untracked += 1,
                None => report.failed += 1,
            }
        }

        MetricsLogger::log_block_processed(
            number,
            report.block_hash.as_deref(),
            report.transfers,
            report.credited,
            started.elapsed().as_millis() as u64,
        );

        report
    }
}
