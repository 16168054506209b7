use rusqlite::{Connection, Result};

/// Initialize the ledger schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    // Tracked deposit accounts. Balances are decimal strings of wei.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL UNIQUE,
            balance TEXT NOT NULL DEFAULT '0',
            external_id TEXT NOT NULL,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )",
        [],
    )?;

    // One row per credited chain transaction; tx_hash is the idempotency key
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ledger_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_hash TEXT NOT NULL UNIQUE,
            confirmed INTEGER NOT NULL,
            direction TEXT NOT NULL CHECK (direction IN ('in', 'out')),
            confirmation_count INTEGER NOT NULL DEFAULT 0,
            account_id INTEGER NOT NULL REFERENCES accounts(id),
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ledger_transactions_account ON ledger_transactions(account_id)",
        [],
    )?;

    Ok(())
}

/// Run database migrations (for future schema updates)
pub fn run_migrations(conn: &Connection) -> Result<()> {
    initialize_schema(conn)
}
