use crate::ledger::LedgerError;
use crate::logging::LogContext;
use crate::models::{Account, TransferRecord};

/// Hook invoked after a deposit has been committed to the ledger
pub trait DepositNotifier: Send + Sync {
    fn deposit_credited(&self, account: &Account, transfer: &TransferRecord) -> Result<(), LedgerError>;
}

/// Notifier that only writes a log line. Stands in for the outbound payment integration.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl DepositNotifier for LogNotifier {
    fn deposit_credited(&self, account: &Account, transfer: &TransferRecord) -> Result<(), LedgerError> {
        LogContext::new("notifier", "deposit_credited")
            .with_address(&account.address)
            .with_transaction_hash(&transfer.hash)
            .with_amount(&transfer.value_wei.to_string())
            .with_metadata("external_id", serde_json::json!(account.external_id))
            .info("Deposit notification for external account");
        Ok(())
    }
}
