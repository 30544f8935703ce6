//! Ordered key-value storage with nested buckets.

use crate::errors::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// A single write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Writes applied all-or-nothing by [`KeyValueStore::write_batch`].
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> &mut Self {
        self.ops.push(BatchOp::Put { key, value });
        self
    }

    pub fn delete(&mut self, key: Vec<u8>) -> &mut Self {
        self.ops.push(BatchOp::Delete { key });
        self
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Byte-ordered key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    fn write_batch(&self, batch: WriteBatch) -> Result<()>;

    /// Entries whose key starts with `prefix` and is `>= from`, ascending.
    fn scan(&self, prefix: &[u8], from: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        let mut entries = self.entries.write();
        for op in batch.ops {
            match op {
                BatchOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan(&self, prefix: &[u8], from: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let lower = if from < prefix { prefix } else { from };
        let entries = self.entries.read();
        Ok(entries
            .range::<[u8], _>((Bound::Included(lower), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// Namespaced view over a shared store.
///
/// Bucket names are length-prefixed so that nested buckets can never collide
/// with keys or with sibling buckets whose names share a prefix.
#[derive(Clone)]
pub struct Bucket {
    store: Arc<dyn KeyValueStore>,
    prefix: Vec<u8>,
}

impl Bucket {
    pub fn root(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            prefix: Vec::new(),
        }
    }

    pub fn bucket(&self, name: &[u8]) -> Bucket {
        let mut prefix = self.prefix.clone();
        prefix.extend_from_slice(&(name.len() as u32).to_be_bytes());
        prefix.extend_from_slice(name);
        prefix.push(0xff);
        Bucket {
            store: Arc::clone(&self.store),
            prefix,
        }
    }

    pub fn key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.get(&self.key(key))
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.store.put(&self.key(key), value)
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.store.delete(&self.key(key))
    }

    /// Apply a batch whose keys were built with [`Bucket::key`].
    pub fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        self.store.write_batch(batch)
    }

    /// Entries of this bucket with key `>= from`, keys returned without the
    /// bucket prefix.
    pub fn scan_from(&self, from: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let start = self.key(from);
        let prefix_len = self.prefix.len();
        Ok(self
            .store
            .scan(&self.prefix, &start)?
            .into_iter()
            .map(|(key, value)| (key[prefix_len..].to_vec(), value))
            .collect())
    }
}
