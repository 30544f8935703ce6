/// Block sync engine of the plasma light client.
///
/// Keeps the local state ledger in step with the blocks the operator commits
/// on chain:
///
/// - **Catch-up**: every block between the latest synced block and the
///   contract head is fetched from the aggregator in order
/// - **Live**: each block submission is synced as it arrives, then pending
///   state updates are re-checked against inclusion proofs
/// - **Checkpoints**: finalized checkpoints owned by this client are adopted
///   into the verified partition
///
/// ## State Machine
///
/// - **IDLE**: Not started
/// - **CATCHING_UP**: Replaying missed blocks
/// - **LIVE_VERIFYING**: Following submissions
pub mod config;
pub mod errors;
pub mod service;
pub mod states;

pub use config::*;
pub use errors::SyncError;
pub use service::{Collaborators, SyncEngine, SyncStats};
pub use states::SyncState;

#[cfg(test)]
mod tests;
