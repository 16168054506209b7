use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::database::DbError;
use crate::error::BestEffort;
use crate::ledger::{DepositNotifier, LedgerStore};
use crate::logging::{LogContext, MetricsLogger};
use crate::models::{NewTransactionRecord, TransferRecord, WeiAmount};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger store failed: {0}")]
    Store(#[from] DbError),

    #[error("Stored balance for {address} is not a decimal amount: {value:?}")]
    CorruptBalance { address: String, value: String },

    #[error("Ledger guard poisoned")]
    LockPoisoned,

    #[error("Deposit notification failed: {0}")]
    Notification(String),
}

/// Result of applying one transfer to the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Balance increased and a confirmed incoming record was written
    Credited { account_id: i64, balance: WeiAmount },
    /// A record for this transaction hash already exists
    AlreadyCredited,
    /// Nobody tracks the destination address
    UntrackedAddress,
}

/// Credits tracked accounts exactly once per transaction hash
pub struct LedgerUpdater {
    store: Arc<dyn LedgerStore>,
    notifier: Option<Arc<dyn DepositNotifier>>,
    // Serializes the lookup-then-commit sequence
    guard: Mutex<()>,
}

impl LedgerUpdater {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            notifier: None,
            guard: Mutex::new(()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn DepositNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn apply(&self, transfer: &TransferRecord) -> Result<ApplyOutcome, LedgerError> {
        let _guard = self.guard.lock().map_err(|_| LedgerError::LockPoisoned)?;

        let account = match self.store.account_by_address(&transfer.to) {
            Ok(account) => account,
            Err(DbError::NotFound) => {
                LogContext::new("ledger_updater", "apply")
                    .with_address(&transfer.to)
                    .with_transaction_hash(&transfer.hash)
                    .trace("Transfer to untracked address");
                return Ok(ApplyOutcome::UntrackedAddress);
            }
            Err(e) => return Err(e.into()),
        };

        match self.store.transaction_record_by_hash(&transfer.hash) {
            Ok(_) => {
                LogContext::new("ledger_updater", "apply")
                    .with_transaction_hash(&transfer.hash)
                    .debug("Transaction already credited");
                return Ok(ApplyOutcome::AlreadyCredited);
            }
            Err(DbError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let record = NewTransactionRecord::confirmed_deposit(&transfer.hash, account.id);

        let balance = match self.store.commit_credit(&account, &transfer.value_wei, &record) {
            Ok(balance) => balance,
            // Another writer got there first; the balance was not touched
            Err(DbError::Duplicate(_)) => return Ok(ApplyOutcome::AlreadyCredited),
            Err(DbError::CorruptBalance { address, value }) => {
                return Err(LedgerError::CorruptBalance { address, value })
            }
            Err(e) => return Err(e.into()),
        };

        let mut credited = account;
        credited.balance = balance.to_string();

        MetricsLogger::log_deposit_credited(
            &credited.address,
            &transfer.hash,
            &transfer.value_wei.to_string(),
            &credited.balance,
        );

        if let Some(notifier) = &self.notifier {
            notifier.deposit_credited(&credited, transfer).or_log(
                LogContext::new("ledger_updater", "notify").with_transaction_hash(&transfer.hash),
            );
        }

        Ok(ApplyOutcome::Credited {
            account_id: credited.id,
            balance,
        })
    }
}
