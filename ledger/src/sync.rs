use crate::errors::{LedgerError, Result};
use crate::kvs::{Bucket, KeyValueStore, WriteBatch};
use containers::{BlockNumber, Bytes32};
use std::sync::Arc;
use tracing::info;

const LATEST_SYNCED_BLOCK: &[u8] = b"latest_synced_block";
const ROOT_PREFIX: &[u8] = b"root";

/// Persistent record of how far the client has synced and which block roots
/// it has seen on the commitment contract.
#[derive(Clone)]
pub struct SyncTracker {
    bucket: Bucket,
}

impl SyncTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_bucket(Bucket::root(store).bucket(b"Sync"))
    }

    pub fn with_bucket(bucket: Bucket) -> Self {
        Self { bucket }
    }

    fn root_key(block_number: BlockNumber) -> Vec<u8> {
        let mut key = ROOT_PREFIX.to_vec();
        key.extend_from_slice(&block_number.to_be_bytes());
        key
    }

    /// Highest block fully synced, `None` before the first block.
    pub fn latest_synced_block_number(&self) -> Result<Option<BlockNumber>> {
        let Some(bytes) = self.bucket.get(LATEST_SYNCED_BLOCK)? else {
            return Ok(None);
        };
        let bytes: [u8; 8] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| {
                LedgerError::Corrupted(format!("latest synced block of {} bytes", bytes.len()))
            })?;
        Ok(Some(BlockNumber::from_be_bytes(bytes)))
    }

    /// Root recorded for `block_number`, if that block has been synced.
    pub fn root_for(&self, block_number: BlockNumber) -> Result<Option<Bytes32>> {
        let Some(bytes) = self.bucket.get(&Self::root_key(block_number))? else {
            return Ok(None);
        };
        if bytes.len() != 32 {
            return Err(LedgerError::Corrupted(format!(
                "root of block {block_number} has {} bytes",
                bytes.len()
            )));
        }
        Ok(Some(Bytes32::from_slice(&bytes)))
    }

    /// Record `block_number` as synced with `root`. Both writes land in one
    /// batch. Once anything has been synced, only the direct successor of the
    /// latest synced block is accepted.
    pub fn advance(&self, block_number: BlockNumber, root: Bytes32) -> Result<()> {
        if let Some(latest) = self.latest_synced_block_number()? {
            if block_number != latest.next() {
                return Err(LedgerError::NonSequentialBlock {
                    latest: latest.0,
                    got: block_number.0,
                });
            }
        }

        let mut batch = WriteBatch::new();
        batch
            .put(self.bucket.key(&Self::root_key(block_number)), root.to_vec())
            .put(
                self.bucket.key(LATEST_SYNCED_BLOCK),
                block_number.to_be_bytes().to_vec(),
            );
        self.bucket.write_batch(batch)?;

        info!(block = block_number.0, root = %root, "Advanced synced block");
        Ok(())
    }
}
