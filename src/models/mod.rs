pub mod account;
pub mod transaction;
pub mod wei;

pub use account::{Account, Direction, LedgerTransactionRecord, NewTransactionRecord};
pub use transaction::{Block, BlockNumber, Transaction, TransferRecord};
pub use wei::WeiAmount;
