pub mod checkpoint;
pub mod errors;
pub mod kvs;
pub mod range_db;
pub mod rocks;
pub mod state;
pub mod sync;
pub mod tokens;

pub use checkpoint::{CheckpointKind, CheckpointRegistry};
pub use errors::{LedgerError, Result};
pub use kvs::{Bucket, InMemoryKeyValueStore, KeyValueStore, WriteBatch};
pub use range_db::{RangeDb, RangeRecord};
pub use rocks::RocksKeyValueStore;
pub use state::{StateKind, StateLedger};
pub use sync::SyncTracker;
pub use tokens::TokenRegistry;
