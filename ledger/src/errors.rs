use containers::{Range, U256};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A write would make two stored ranges of one collection overlap.
    #[error("range {new} overlaps stored range {existing}")]
    Overlap { new: Range, existing: Range },

    /// Resolution could not cover the requested amount.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: U256, available: U256 },

    #[error("block {got} does not follow latest synced block {latest}")]
    NonSequentialBlock { latest: u64, got: u64 },

    #[error("corrupted entry: {0}")]
    Corrupted(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),
}
