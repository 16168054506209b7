#[cfg(test)]
mod tests {
    use crate::config::DatabaseConfig;
    use crate::database::{Database, DbError};
    use crate::ledger::LedgerStore;
    use crate::models::{Direction, NewTransactionRecord, WeiAmount};
    use tempfile::TempDir;

    #[test]
    fn test_database_creation() {
        let db = Database::new_in_memory().expect("Failed to create in-memory database");

        assert_eq!(db.ledger_record_count().expect("count"), 0);
        assert!(db.list_accounts().expect("list").is_empty());
    }

    #[test]
    fn test_register_and_lookup_account() {
        let db = Database::new_in_memory().expect("Failed to create database");

        let account = db
            .register_account("0xACCT1", "user-42")
            .expect("Failed to register account");
        assert_eq!(account.address, "0xacct1");
        assert_eq!(account.balance, "0");

        let loaded = db.account_by_address("0xacct1").expect("lookup");
        assert_eq!(loaded, account);

        // Lookups are case-insensitive through normalization
        let loaded = db.account_by_address("0XACCT1").expect("lookup upper");
        assert_eq!(loaded.id, account.id);
    }

    #[test]
    fn test_register_duplicate_account() {
        let db = Database::new_in_memory().expect("Failed to create database");
        db.register_account("0xacct1", "a").expect("first");

        let result = db.register_account("0xacct1", "b");
        assert!(matches!(result, Err(DbError::Duplicate(_))));
    }

    #[test]
    fn test_unknown_account_is_not_found() {
        let db = Database::new_in_memory().expect("Failed to create database");

        assert!(matches!(db.account_by_address("0xnobody"), Err(DbError::NotFound)));
        assert!(db.find_account("0xnobody").expect("find").is_none());
    }

    #[test]
    fn test_transaction_record_lookup() {
        let db = Database::new_in_memory().expect("Failed to create database");
        let account = db.register_account("0xacct1", "u").expect("register");

        assert!(matches!(db.transaction_record_by_hash("0xabc"), Err(DbError::NotFound)));

        db.create_transaction_record(&NewTransactionRecord::confirmed_deposit("0xabc", account.id))
            .expect("create");

        let record = db.transaction_record_by_hash("0xabc").expect("lookup");
        assert_eq!(record.tx_hash, "0xabc");
        assert!(record.confirmed);
        assert_eq!(record.direction, Direction::In);
        assert_eq!(record.confirmation_count, 1);
        assert_eq!(record.account_id, account.id);
    }

    #[test]
    fn test_duplicate_transaction_record_rejected() {
        let db = Database::new_in_memory().expect("Failed to create database");
        let account = db.register_account("0xacct1", "u").expect("register");
        let record = NewTransactionRecord::confirmed_deposit("0xabc", account.id);

        db.create_transaction_record(&record).expect("first insert");
        let result = db.create_transaction_record(&record);

        assert!(matches!(result, Err(DbError::Duplicate(hash)) if hash == "0xabc"));
        assert_eq!(db.ledger_record_count().expect("count"), 1);
    }

    #[test]
    fn test_commit_credit_updates_balance_and_record() {
        let db = Database::new_in_memory().expect("Failed to create database");
        let account = db.register_account("0xacct1", "u").expect("register");

        let balance = db
            .commit_credit(
                &account,
                &WeiAmount::from(1_000_000_000_000_000_000u64),
                &NewTransactionRecord::confirmed_deposit("0xabc", account.id),
            )
            .expect("commit");
        assert_eq!(balance.to_string(), "1000000000000000000");

        let loaded = db.account_by_address("0xacct1").expect("lookup");
        assert_eq!(loaded.balance, "1000000000000000000");

        let records = db.ledger_records_for_account(account.id).expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tx_hash, "0xabc");
    }

    #[test]
    fn test_commit_credit_adds_to_stored_balance_not_caller_copy() {
        let db = Database::new_in_memory().expect("Failed to create database");
        let stale = db.register_account("0xacct1", "u").expect("register");

        db.commit_credit(&stale, &WeiAmount::from(5u64), &NewTransactionRecord::confirmed_deposit("0xa", stale.id))
            .expect("first commit");
        // `stale` still says "0"
        let balance = db
            .commit_credit(&stale, &WeiAmount::from(7u64), &NewTransactionRecord::confirmed_deposit("0xb", stale.id))
            .expect("second commit");

        assert_eq!(balance.to_string(), "12");
        assert_eq!(db.account_by_address("0xacct1").expect("lookup").balance, "12");
    }

    #[test]
    fn test_commit_credit_rolls_back_on_duplicate_hash() {
        let db = Database::new_in_memory().expect("Failed to create database");
        let account = db.register_account("0xacct1", "u").expect("register");
        let record = NewTransactionRecord::confirmed_deposit("0xabc", account.id);

        db.commit_credit(&account, &WeiAmount::from(5u64), &record).expect("first commit");

        let result = db.commit_credit(&account, &WeiAmount::from(5u64), &record);
        assert!(matches!(result, Err(DbError::Duplicate(_))));

        let loaded = db.account_by_address("0xacct1").expect("lookup");
        assert_eq!(loaded.balance, "5");
    }

    #[test]
    fn test_commit_credit_rolls_back_for_missing_account() {
        let db = Database::new_in_memory().expect("Failed to create database");
        let account = db.register_account("0xacct1", "u").expect("register");

        let mut ghost = account.clone();
        ghost.id = account.id + 100;

        let result = db.commit_credit(
            &ghost,
            &WeiAmount::from(7u64),
            &NewTransactionRecord::confirmed_deposit("0xabc", account.id),
        );
        assert!(matches!(result, Err(DbError::NotFound)));
        assert!(matches!(db.transaction_record_by_hash("0xabc"), Err(DbError::NotFound)));
    }

    #[test]
    fn test_commit_credit_rejects_corrupt_balance() {
        let db = Database::new_in_memory().expect("Failed to create database");
        let mut account = db.register_account("0xacct1", "u").expect("register");
        account.balance = "12abc".to_string();
        db.update_account(&account).expect("update");

        let result = db.commit_credit(
            &account,
            &WeiAmount::from(1u64),
            &NewTransactionRecord::confirmed_deposit("0xabc", account.id),
        );
        assert!(matches!(result, Err(DbError::CorruptBalance { .. })));
        assert_eq!(db.ledger_record_count().expect("count"), 0);
    }

    #[test]
    fn test_update_account_missing_row() {
        let db = Database::new_in_memory().expect("Failed to create database");
        let mut account = db.register_account("0xacct1", "u").expect("register");
        account.id += 1;

        assert!(matches!(db.update_account(&account), Err(DbError::NotFound)));
    }

    #[test]
    fn test_open_file_database_with_config() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("ledger.db");
        let config = DatabaseConfig {
            path: path.to_string_lossy().to_string(),
            enable_wal_mode: true,
            busy_timeout_ms: 1000,
        };

        {
            let db = Database::open(&config).expect("open");
            db.register_account("0xacct1", "u").expect("register");
        }

        // Data survives a reopen
        let db = Database::open(&config).expect("reopen");
        assert_eq!(db.list_accounts().expect("list").len(), 1);
    }
}
