//! RocksDB-backed [`KeyValueStore`].

use crate::errors::{LedgerError, Result};
use crate::kvs::{BatchOp, KeyValueStore, WriteBatch};
use rocksdb::{Direction, IteratorMode, Options, DB};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn storage_error(err: rocksdb::Error) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

/// On-disk store. Keys are kept in RocksDB's default bytewise order, which
/// is the order [`KeyValueStore::scan`] promises.
#[derive(Clone)]
pub struct RocksKeyValueStore {
    db: Arc<DB>,
}

impl RocksKeyValueStore {
    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening RocksDB store");

        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path).map_err(storage_error)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl KeyValueStore for RocksKeyValueStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db.get(key).map_err(storage_error)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.put(key, value).map_err(storage_error)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db.delete(key).map_err(storage_error)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.ops() {
            match op {
                BatchOp::Put { key, value } => rocks_batch.put(key, value),
                BatchOp::Delete { key } => rocks_batch.delete(key),
            }
        }
        self.db.write(rocks_batch).map_err(storage_error)
    }

    fn scan(&self, prefix: &[u8], from: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let lower = if from < prefix { prefix } else { from };
        let mut entries = Vec::new();
        for item in self.db.iterator(IteratorMode::From(lower, Direction::Forward)) {
            let (key, value) = item.map_err(storage_error)?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kvs::Bucket;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_stays_within_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksKeyValueStore::open(dir.path()).unwrap();
        store.put(b"a1", b"x").unwrap();
        store.put(b"b1", b"y").unwrap();
        store.put(b"b2", b"z").unwrap();
        store.put(b"c1", b"w").unwrap();

        assert_eq!(
            store.scan(b"b", b"").unwrap(),
            vec![
                (b"b1".to_vec(), b"y".to_vec()),
                (b"b2".to_vec(), b"z".to_vec())
            ]
        );
        assert_eq!(
            store.scan(b"b", b"b2").unwrap(),
            vec![(b"b2".to_vec(), b"z".to_vec())]
        );
    }

    #[test]
    fn test_batch_applies_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksKeyValueStore::open(dir.path()).unwrap();
        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"1".to_vec()).delete(b"k".to_vec());
        batch.put(b"j".to_vec(), b"2".to_vec());
        store.write_batch(batch).unwrap();

        assert_eq!(store.get(b"k").unwrap(), None);
        assert_eq!(store.get(b"j").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RocksKeyValueStore::open(dir.path()).unwrap();
            let bucket = Bucket::root(Arc::new(store)).bucket(b"Sync");
            bucket.put(b"latest", b"7").unwrap();
        }

        let reopened = RocksKeyValueStore::open(dir.path()).unwrap();
        let bucket = Bucket::root(Arc::new(reopened)).bucket(b"Sync");
        assert_eq!(bucket.get(b"latest").unwrap(), Some(b"7".to_vec()));
    }
}
