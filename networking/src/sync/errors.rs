use containers::BlockNumber;
use ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Local history is ahead of the requested target.
    #[error("latest synced block {synced} is ahead of sync target {target}")]
    AheadOfTarget { synced: BlockNumber, target: BlockNumber },

    /// The commitment contract has no root for a block it reported.
    #[error("commitment contract has no root for block {0}")]
    MissingRoot(BlockNumber),

    #[error("commitment contract: {0:#}")]
    Contract(anyhow::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
