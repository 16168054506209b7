pub mod notifier;
pub mod store;
pub mod updater;

pub use notifier::{DepositNotifier, LogNotifier};
pub use store::LedgerStore;
pub use updater::{ApplyOutcome, LedgerError, LedgerUpdater};
