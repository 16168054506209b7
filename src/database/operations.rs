use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::transfer_extractor::normalize_address;
use crate::config::DatabaseConfig;
use crate::database::schema::{initialize_schema, run_migrations};
use crate::ledger::store::{stored_balance, LedgerStore};
use crate::models::{Account, Direction, LedgerTransactionRecord, NewTransactionRecord, WeiAmount};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    Connection(#[from] rusqlite::Error),
    #[error("Database operation failed: {0}")]
    Operation(String),
    #[error("Record not found")]
    NotFound,
    #[error("Duplicate record: {0}")]
    Duplicate(String),
    #[error("Stored balance for {address} is not a decimal amount: {value:?}")]
    CorruptBalance { address: String, value: String },
}

impl FromSql for Direction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for Direction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        address: row.get(1)?,
        balance: row.get(2)?,
        external_id: row.get(3)?,
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerTransactionRecord> {
    Ok(LedgerTransactionRecord {
        id: row.get(0)?,
        tx_hash: row.get(1)?,
        confirmed: row.get(2)?,
        direction: row.get(3)?,
        confirmation_count: row.get(4)?,
        account_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn not_found(e: rusqlite::Error) -> DbError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound,
        other => DbError::Connection(other),
    }
}

/// Unique-key violations become `Duplicate`; everything else stays a driver error
fn unique_violation(e: rusqlite::Error, key: &str) -> DbError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            DbError::Duplicate(key.to_string())
        }
        other => DbError::Connection(other),
    }
}

fn insert_record(conn: &Connection, record: &NewTransactionRecord) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO ledger_transactions (tx_hash, confirmed, direction, confirmation_count, account_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.tx_hash,
            record.confirmed,
            record.direction,
            record.confirmation_count,
            record.account_id
        ],
    )
    .map_err(|e| unique_violation(e, &record.tx_hash))?;
    Ok(())
}

const ACCOUNT_COLUMNS: &str = "id, address, balance, external_id";
const RECORD_COLUMNS: &str =
    "id, tx_hash, confirmed, direction, confirmation_count, account_id, created_at";

/// SQLite-backed ledger store
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a database file and initialize the schema
    pub fn new(db_path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Open a database using the tuning options from configuration
    pub fn open(config: &DatabaseConfig) -> Result<Self, DbError> {
        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(Duration::from_millis(u64::from(config.busy_timeout_ms)))?;
        if config.enable_wal_mode {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            log::debug!("SQLite journal mode: {}", mode);
        }
        Self::from_connection(conn)
    }

    /// Create an in-memory database for testing
    pub fn new_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        initialize_schema(&conn)?;
        run_migrations(&conn)?;

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn
            .lock()
            .map_err(|_| DbError::Operation("Failed to acquire lock".to_string()))
    }

    /// Start tracking an address with a zero balance
    pub fn register_account(&self, address: &str, external_id: &str) -> Result<Account, DbError> {
        let address = normalize_address(address);
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO accounts (address, balance, external_id) VALUES (?1, '0', ?2)",
            params![address, external_id],
        )
        .map_err(|e| unique_violation(e, &address))?;

        Ok(Account {
            id: conn.last_insert_rowid(),
            address,
            balance: "0".to_string(),
            external_id: external_id.to_string(),
        })
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id"))?;
        let rows = stmt.query_map([], account_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Ledger records credited to one account, oldest first
    pub fn ledger_records_for_account(&self, account_id: i64) -> Result<Vec<LedgerTransactionRecord>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM ledger_transactions WHERE account_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![account_id], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn ledger_record_count(&self) -> Result<u64, DbError> {
        let conn = self.lock()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM ledger_transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Look up an account without treating absence as an error
    pub fn find_account(&self, address: &str) -> Result<Option<Account>, DbError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE address = ?1"),
            params![normalize_address(address)],
            account_from_row,
        )
        .optional()
        .map_err(DbError::from)
    }
}

impl LedgerStore for Database {
    fn account_by_address(&self, address: &str) -> Result<Account, DbError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE address = ?1"),
            params![normalize_address(address)],
            account_from_row,
        )
        .map_err(not_found)
    }

    fn update_account(&self, account: &Account) -> Result<(), DbError> {
        let conn = self.lock()?;
        let rows_affected = conn.execute(
            "UPDATE accounts SET balance = ?1, external_id = ?2 WHERE id = ?3",
            params![account.balance, account.external_id, account.id],
        )?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    fn transaction_record_by_hash(&self, tx_hash: &str) -> Result<LedgerTransactionRecord, DbError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM ledger_transactions WHERE tx_hash = ?1"),
            params![tx_hash],
            record_from_row,
        )
        .map_err(not_found)
    }

    fn create_transaction_record(&self, record: &NewTransactionRecord) -> Result<(), DbError> {
        let conn = self.lock()?;
        insert_record(&conn, record)
    }

    /// Record insert, balance read and balance update commit together or not at all.
    /// The record goes first so a duplicate hash aborts before the balance moves.
    fn commit_credit(
        &self,
        account: &Account,
        amount: &WeiAmount,
        record: &NewTransactionRecord,
    ) -> Result<WeiAmount, DbError> {
        let conn = self.lock()?;
        // Immediate: other connections on the same file wait until commit
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;

        insert_record(&tx, record)?;

        let (address, stored): (String, String) = tx
            .query_row(
                "SELECT address, balance FROM accounts WHERE id = ?1",
                params![account.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(not_found)?;
        let balance = stored_balance(&address, &stored)?.credit(amount);

        tx.execute(
            "UPDATE accounts SET balance = ?1 WHERE id = ?2",
            params![balance.to_string(), account.id],
        )?;

        tx.commit()?;
        Ok(balance)
    }
}
