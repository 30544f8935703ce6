pub mod aggregator;
pub mod contract;
pub mod sync;
pub mod types;

pub use aggregator::{Aggregator, HttpAggregator};
pub use contract::{CommitmentContract, RpcCommitmentContract};
pub use sync::{Collaborators, SyncEngine, SyncError, SyncState, SyncStats};
pub use types::ContractEvent;
