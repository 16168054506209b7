pub mod block_fetcher;
pub mod block_source;
pub mod rpc_client;
pub mod subscription;
pub mod transfer_extractor;

pub use block_fetcher::{BlockFetcher, RpcBlockFetcher};
pub use block_source::{BlockSource, BlockSourceConfig, HeadNotification, HeadStream, HeadSubscriber};
pub use rpc_client::RpcClient;
pub use subscription::WsHeadSubscriber;
pub use transfer_extractor::{extract, normalize_address, validate_address};
