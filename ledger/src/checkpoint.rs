use crate::errors::Result;
use crate::kvs::{Bucket, KeyValueStore};
use containers::{Bytes32, Checkpoint, DepositContract};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointKind {
    Verified,
    Pending,
}

impl CheckpointKind {
    fn bucket_name(&self) -> &'static [u8] {
        match self {
            CheckpointKind::Verified => b"Verified",
            CheckpointKind::Pending => b"Pending",
        }
    }
}

/// Checkpoints keyed by their content id, per deposit contract.
#[derive(Clone)]
pub struct CheckpointRegistry {
    root: Bucket,
}

impl CheckpointRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            root: Bucket::root(store).bucket(b"Checkpoint"),
        }
    }

    fn bucket(&self, kind: CheckpointKind, deposit_contract: &DepositContract) -> Bucket {
        self.root
            .bucket(kind.bucket_name())
            .bucket(deposit_contract.as_slice())
    }

    pub fn insert(
        &self,
        kind: CheckpointKind,
        deposit_contract: &DepositContract,
        checkpoint: &Checkpoint,
    ) -> Result<Bytes32> {
        let id = checkpoint.id();
        self.bucket(kind, deposit_contract)
            .put(id.as_slice(), &serde_json::to_vec(checkpoint)?)?;
        Ok(id)
    }

    pub fn get(
        &self,
        kind: CheckpointKind,
        deposit_contract: &DepositContract,
        id: &Bytes32,
    ) -> Result<Option<Checkpoint>> {
        match self.bucket(kind, deposit_contract).get(id.as_slice())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn remove(
        &self,
        kind: CheckpointKind,
        deposit_contract: &DepositContract,
        id: &Bytes32,
    ) -> Result<()> {
        self.bucket(kind, deposit_contract).delete(id.as_slice())
    }
}
