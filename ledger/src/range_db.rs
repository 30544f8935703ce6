//! Range-keyed storage of non-overlapping half-open intervals.
//!
//! Each interval is stored under the big-endian encoding of its `end`, so an
//! ordered scan starting just above a coin ID yields every interval that may
//! contain that coin first.

use crate::errors::{LedgerError, Result};
use crate::kvs::{Bucket, WriteBatch};
use containers::types::{coin_from_key, coin_key};
use containers::{Range, U256};
use serde::{Deserialize, Serialize};

/// One stored interval and its opaque payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeRecord {
    pub range: Range,
    pub value: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct StoredRecord {
    start: U256,
    value: Vec<u8>,
}

pub struct RangeDb {
    bucket: Bucket,
}

impl RangeDb {
    pub fn new(bucket: Bucket) -> Self {
        Self { bucket }
    }

    fn decode(key: &[u8], bytes: &[u8]) -> Result<RangeRecord> {
        let end = coin_from_key(key)
            .ok_or_else(|| LedgerError::Corrupted(format!("range key of {} bytes", key.len())))?;
        let stored: StoredRecord = serde_json::from_slice(bytes)?;
        let range = Range::new(stored.start, end)
            .map_err(|err| LedgerError::Corrupted(err.to_string()))?;
        Ok(RangeRecord {
            range,
            value: stored.value,
        })
    }

    fn encode_into(
        batch: &mut WriteBatch,
        bucket: &Bucket,
        range: &Range,
        value: &[u8],
    ) -> Result<()> {
        let stored = StoredRecord {
            start: range.start(),
            value: value.to_vec(),
        };
        batch.put(bucket.key(&coin_key(range.end())), serde_json::to_vec(&stored)?);
        Ok(())
    }

    /// Records in ascending order whose end lies above `coin`.
    pub fn iter_from(&self, coin: U256) -> Result<Vec<RangeRecord>> {
        let Some(first_end) = coin.checked_add(U256::from(1u64)) else {
            return Ok(Vec::new());
        };
        self.bucket
            .scan_from(&coin_key(first_end))?
            .iter()
            .map(|(key, value)| Self::decode(key, value))
            .collect()
    }

    /// All records intersecting `range`, ascending.
    pub fn get(&self, range: &Range) -> Result<Vec<RangeRecord>> {
        let mut hits = Vec::new();
        for record in self.iter_from(range.start())? {
            if record.range.start() >= range.end() {
                break;
            }
            hits.push(record);
        }
        Ok(hits)
    }

    /// Store `value` at `range`. Fails if any stored interval overlaps.
    pub fn put(&self, range: &Range, value: &[u8]) -> Result<()> {
        if let Some(existing) = self.get(range)?.into_iter().next() {
            return Err(LedgerError::Overlap {
                new: *range,
                existing: existing.range,
            });
        }
        let mut batch = WriteBatch::new();
        Self::encode_into(&mut batch, &self.bucket, range, value)?;
        self.bucket.write_batch(batch)
    }

    /// Remove exactly `range` from the collection.
    ///
    /// Intervals partially covered by `range` are split: the parts outside
    /// `range` are written back with their original payload in the same
    /// batch. Removing a range with nothing stored is a no-op.
    pub fn del(&self, range: &Range) -> Result<()> {
        let affected = self.get(range)?;
        if affected.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::new();
        for record in &affected {
            batch.delete(self.bucket.key(&coin_key(record.range.end())));
        }
        for record in &affected {
            let (below, above) = record.range.subtract(range);
            for remainder in [below, above].into_iter().flatten() {
                Self::encode_into(&mut batch, &self.bucket, &remainder, &record.value)?;
            }
        }
        self.bucket.write_batch(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kvs::InMemoryKeyValueStore;
    use std::sync::Arc;

    fn db() -> RangeDb {
        RangeDb::new(Bucket::root(Arc::new(InMemoryKeyValueStore::new())).bucket(b"ranges"))
    }

    fn range(start: u64, end: u64) -> Range {
        Range::from_u64(start, end).unwrap()
    }

    fn ranges(records: &[RangeRecord]) -> Vec<Range> {
        records.iter().map(|record| record.range).collect()
    }

    #[test]
    fn test_get_returns_intersecting_records() {
        let db = db();
        db.put(&range(0, 10), b"a").unwrap();
        db.put(&range(10, 20), b"b").unwrap();
        db.put(&range(30, 40), b"c").unwrap();

        assert_eq!(ranges(&db.get(&range(5, 15)).unwrap()), vec![range(0, 10), range(10, 20)]);
        assert_eq!(ranges(&db.get(&range(20, 30)).unwrap()), vec![]);
        assert_eq!(ranges(&db.get(&range(10, 11)).unwrap()), vec![range(10, 20)]);
    }

    #[test]
    fn test_put_rejects_overlap() {
        let db = db();
        db.put(&range(0, 10), b"a").unwrap();

        let err = db.put(&range(9, 12), b"b").unwrap_err();
        assert!(matches!(err, LedgerError::Overlap { existing, .. } if existing == range(0, 10)));
        db.put(&range(10, 12), b"b").unwrap();
    }

    #[test]
    fn test_del_splits_partial_overlap() {
        let db = db();
        db.put(&range(0, 10), b"a").unwrap();
        db.put(&range(10, 20), b"b").unwrap();

        db.del(&range(5, 15)).unwrap();

        let left = db.get(&range(0, 100)).unwrap();
        assert_eq!(ranges(&left), vec![range(0, 5), range(15, 20)]);
        assert_eq!(left[0].value, b"a".to_vec());
        assert_eq!(left[1].value, b"b".to_vec());
    }

    #[test]
    fn test_del_inner_hole_keeps_both_sides() {
        let db = db();
        db.put(&range(0, 30), b"a").unwrap();
        db.del(&range(10, 20)).unwrap();

        assert_eq!(ranges(&db.get(&range(0, 30)).unwrap()), vec![range(0, 10), range(20, 30)]);
    }

    #[test]
    fn test_del_of_empty_range_is_noop() {
        let db = db();
        db.put(&range(0, 10), b"a").unwrap();
        db.del(&range(50, 60)).unwrap();

        assert_eq!(ranges(&db.get(&range(0, 100)).unwrap()), vec![range(0, 10)]);
    }

    #[test]
    fn test_iter_from_handles_max_coin() {
        let db = db();
        assert!(db.iter_from(U256::MAX).unwrap().is_empty());
    }
}
