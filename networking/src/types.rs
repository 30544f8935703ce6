use containers::{BlockNumber, Bytes32, Checkpoint, DepositContract};

/// Notification delivered by a [`CommitmentContract`](crate::contract::CommitmentContract)
/// subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractEvent {
    /// The operator committed `root` as the state of `block_number`.
    BlockSubmitted {
        block_number: BlockNumber,
        root: Bytes32,
    },
    /// A checkpoint of `deposit_contract` was claimed and awaits its
    /// challenge period.
    CheckpointClaimed {
        checkpoint_id: Bytes32,
        deposit_contract: DepositContract,
        block_number: BlockNumber,
        checkpoint: Checkpoint,
    },
    /// A checkpoint of `deposit_contract` has been finalized.
    CheckpointFinalized {
        checkpoint_id: Bytes32,
        deposit_contract: DepositContract,
        block_number: BlockNumber,
        checkpoint: Checkpoint,
    },
}

impl ContractEvent {
    /// Plasma block the event refers to.
    pub fn block_number(&self) -> BlockNumber {
        match self {
            ContractEvent::BlockSubmitted { block_number, .. }
            | ContractEvent::CheckpointClaimed { block_number, .. }
            | ContractEvent::CheckpointFinalized { block_number, .. } => *block_number,
        }
    }
}
