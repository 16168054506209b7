use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deposit_listener::blockchain::{BlockFetcher, BlockSource, BlockSourceConfig, HeadNotification, HeadStream, HeadSubscriber};
use deposit_listener::database::{Database, DbError};
use deposit_listener::error::{FetchError, SubscriptionError};
use deposit_listener::ledger::{LedgerStore, LedgerUpdater};
use deposit_listener::listener::ListenerLoop;
use deposit_listener::models::{
    Account, Block, BlockNumber, LedgerTransactionRecord, NewTransactionRecord, Transaction, WeiAmount,
};
use futures::stream;
use futures::StreamExt;
use tokio::sync::mpsc;

const ONE_ETHER: u64 = 1_000_000_000_000_000_000;

/// Serves blocks from memory
#[derive(Default)]
struct StaticFetcher {
    blocks: HashMap<BlockNumber, Block>,
}

impl StaticFetcher {
    fn with_block(mut self, number: u64, transactions: Vec<Transaction>) -> Self {
        self.blocks.insert(
            BlockNumber::from(number),
            Block {
                number: BlockNumber::from(number),
                hash: Some(format!("0xblock{}", number)),
                transactions,
            },
        );
        self
    }
}

#[async_trait]
impl BlockFetcher for StaticFetcher {
    async fn fetch(&self, number: &BlockNumber) -> Result<Block, FetchError> {
        self.blocks.get(number).cloned().ok_or_else(|| FetchError::Timeout {
            block: number.to_string(),
            millis: 5000,
        })
    }
}

/// Wraps the SQLite store and remembers the order of committed credits
struct RecordingStore {
    inner: Database,
    commits: Mutex<Vec<String>>,
}

impl LedgerStore for RecordingStore {
    fn account_by_address(&self, address: &str) -> Result<Account, DbError> {
        self.inner.account_by_address(address)
    }

    fn update_account(&self, account: &Account) -> Result<(), DbError> {
        self.inner.update_account(account)
    }

    fn transaction_record_by_hash(&self, tx_hash: &str) -> Result<LedgerTransactionRecord, DbError> {
        self.inner.transaction_record_by_hash(tx_hash)
    }

    fn create_transaction_record(&self, record: &NewTransactionRecord) -> Result<(), DbError> {
        self.inner.create_transaction_record(record)
    }

    fn commit_credit(
        &self,
        account: &Account,
        amount: &WeiAmount,
        record: &NewTransactionRecord,
    ) -> Result<WeiAmount, DbError> {
        let balance = self.inner.commit_credit(account, amount, record)?;
        self.commits.lock().unwrap().push(record.tx_hash.clone());
        Ok(balance)
    }
}

fn tx(hash: &str, value: u64, to: Option<&str>) -> Transaction {
    Transaction {
        hash: hash.to_string(),
        value_wei: WeiAmount::from(value),
        to: to.map(str::to_string),
    }
}

#[tokio::test]
async fn test_block_100_deposit_and_redelivery() {
    let db = Arc::new(Database::new_in_memory().unwrap());
    let account = db.register_account("0xacct1", "user-1").unwrap();

    let fetcher = StaticFetcher::default().with_block(100, vec![tx("0xabc", ONE_ETHER, Some("0xacct1"))]);
    let listener = ListenerLoop::new(Arc::new(fetcher), LedgerUpdater::new(db.clone()));

    let first = listener.process_block(&BlockNumber::from(100u64)).await;
    assert_eq!(first.credited, 1);

    let account_after = db.account_by_address("0xacct1").unwrap();
    assert_eq!(account_after.balance, "1000000000000000000");

    let record = db.transaction_record_by_hash("0xabc").unwrap();
    assert!(record.confirmed);
    assert_eq!(record.direction.as_str(), "in");
    assert_eq!(record.confirmation_count, 1);
    assert_eq!(record.account_id, account.id);

    // Same block again after a reconnect
    let second = listener.process_block(&BlockNumber::from(100u64)).await;
    assert_eq!(second.credited, 0);
    assert_eq!(second.already_credited, 1);
    assert_eq!(db.account_by_address("0xacct1").unwrap().balance, "1000000000000000000");
    assert_eq!(db.ledger_record_count().unwrap(), 1);
}

#[tokio::test]
async fn test_transfers_applied_in_block_order() {
    let db = Database::new_in_memory().unwrap();
    db.register_account("0xa", "a").unwrap();
    db.register_account("0xb", "b").unwrap();
    let store = Arc::new(RecordingStore {
        inner: db,
        commits: Mutex::new(Vec::new()),
    });

    let fetcher = StaticFetcher::default().with_block(
        7,
        vec![
            tx("0xt1", 1, Some("0xa")),
            tx("0xdeploy", 9, None),
            tx("0xt2", 2, Some("0xb")),
            tx("0xt3", 3, Some("0xa")),
            tx("0xt4", 4, Some("0xstranger")),
        ],
    );
    let listener = ListenerLoop::new(Arc::new(fetcher), LedgerUpdater::new(store.clone()));

    let report = listener.process_block(&BlockNumber::from(7u64)).await;

    assert_eq!(report.transfers, 4);
    assert_eq!(report.credited, 3);
    assert_eq!(report.untracked, 1);
    assert_eq!(*store.commits.lock().unwrap(), vec!["0xt1", "0xt2", "0xt3"]);
    assert_eq!(store.inner.account_by_address("0xa").unwrap().balance, "4");
}

#[tokio::test]
async fn test_failed_fetch_does_not_stop_the_loop() {
    let db = Arc::new(Database::new_in_memory().unwrap());
    db.register_account("0xacct1", "user-1").unwrap();

    // Block 5 is unknown to the fetcher
    let fetcher = StaticFetcher::default().with_block(6, vec![tx("0xabc", 10, Some("0xacct1"))]);
    let listener = ListenerLoop::new(Arc::new(fetcher), LedgerUpdater::new(db.clone()));

    let (tx_numbers, rx) = mpsc::channel(4);
    tx_numbers.send(BlockNumber::from(5u64)).await.unwrap();
    tx_numbers.send(BlockNumber::from(6u64)).await.unwrap();
    drop(tx_numbers);

    listener.run(rx).await;

    assert_eq!(db.account_by_address("0xacct1").unwrap().balance, "10");
}

/// Seeds head 0x64, then announces 0x65 and stays quiet
struct TwoBlockSubscriber;

#[async_trait]
impl HeadSubscriber for TwoBlockSubscriber {
    async fn subscribe_new_heads(&self) -> Result<HeadStream, SubscriptionError> {
        let heads = vec![Ok(HeadNotification {
            number: "0x65".to_string(),
            hash: None,
        })];
        Ok(Box::pin(stream::iter(heads).chain(stream::pending())))
    }

    async fn latest_head(&self) -> Result<HeadNotification, SubscriptionError> {
        Ok(HeadNotification {
            number: "0x64".to_string(),
            hash: None,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_pipeline_from_subscription_to_ledger() {
    let db = Arc::new(Database::new_in_memory().unwrap());
    db.register_account("0xacct1", "user-1").unwrap();

    let fetcher = StaticFetcher::default()
        .with_block(100, vec![tx("0xabc", ONE_ETHER, Some("0xacct1"))])
        .with_block(101, vec![tx("0xdef", ONE_ETHER, Some("0xACCT1"))]);
    let listener = ListenerLoop::new(Arc::new(fetcher), LedgerUpdater::new(db.clone()));
    let source = Arc::new(BlockSource::new(Arc::new(TwoBlockSubscriber), BlockSourceConfig::default()));

    // The loop runs forever; stop looking once everything is idle
    let result = tokio::time::timeout(Duration::from_secs(30), listener.start(source, 1)).await;
    assert!(result.is_err());

    assert_eq!(db.account_by_address("0xacct1").unwrap().balance, "2000000000000000000");
    assert_eq!(db.ledger_record_count().unwrap(), 2);
}
