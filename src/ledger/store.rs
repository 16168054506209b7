use crate::database::DbError;
use crate::models::{Account, LedgerTransactionRecord, NewTransactionRecord, WeiAmount};

/// Account and transaction-record storage used by the ledger updater.
///
/// Lookups report absence as `DbError::NotFound`.
pub trait LedgerStore: Send + Sync {
    fn account_by_address(&self, address: &str) -> Result<Account, DbError>;

    /// Persist a changed account (matched by id)
    fn update_account(&self, account: &Account) -> Result<(), DbError>;

    fn transaction_record_by_hash(&self, tx_hash: &str) -> Result<LedgerTransactionRecord, DbError>;

    fn create_transaction_record(&self, record: &NewTransactionRecord) -> Result<(), DbError>;

    /// Add `amount` to the account's stored balance and persist its transaction record.
    /// Returns the new balance.
    ///
    /// The balance is re-read here rather than taken from `account`. Stores
    /// shared between writers should do the read and both writes atomically.
    fn commit_credit(
        &self,
        account: &Account,
        amount: &WeiAmount,
        record: &NewTransactionRecord,
    ) -> Result<WeiAmount, DbError> {
        let mut current = self.account_by_address(&account.address)?;
        let balance = stored_balance(&current.address, &current.balance)?.credit(amount);

        current.balance = balance.to_string();
        self.update_account(&current)?;
        self.create_transaction_record(record)?;
        Ok(balance)
    }
}

/// Parse a persisted decimal balance
pub fn stored_balance(address: &str, value: &str) -> Result<WeiAmount, DbError> {
    value.parse().map_err(|_| DbError::CorruptBalance {
        address: address.to_string(),
        value: value.to_string(),
    })
}
