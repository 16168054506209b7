use crate::error::ProcessingError;
use crate::models::{Block, TransferRecord};

/// Turns a fetched block into the transfers that may credit an account.
///
/// Order follows the block's transaction order. Contract creations have no
/// destination and are dropped without a log line.
pub fn extract(block: &Block) -> Vec<TransferRecord> {
    block
        .transactions
        .iter()
        .filter_map(|tx| {
            let to = tx.to.as_deref()?;
            Some(TransferRecord {
                hash: tx.hash.clone(),
                value_wei: tx.value_wei.clone(),
                to: normalize_address(to),
            })
        })
        .collect()
}

/// Lowercase with a `0x` prefix, the form accounts are stored under
pub fn normalize_address(address: &str) -> String {
    let addr = address.trim();
    let body = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .unwrap_or(addr);
    format!("0x{}", body.to_lowercase())
}

/// Check for a 20-byte hex address
pub fn validate_address(address: &str) -> Result<(), ProcessingError> {
    let normalized = normalize_address(address);
    let body = &normalized[2..];

    if body.len() != 40 {
        return Err(ProcessingError::InvalidAddress(format!(
            "Address must be 40 hex characters long, got {}",
            body.len()
        )));
    }

    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ProcessingError::InvalidAddress(
            "Address contains non-hexadecimal characters".to_string(),
        ));
    }

    Ok(())
}
