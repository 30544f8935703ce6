use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Plasma block number as assigned by the commitment contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockNumber(pub u64);

impl PartialOrd for BlockNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BlockNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl BlockNumber {
    /// The block directly after this one. Saturates at `u64::MAX`.
    pub fn next(self) -> BlockNumber {
        BlockNumber(self.0.saturating_add(1))
    }

    /// The block directly before this one, or `None` for block zero.
    pub fn prev(self) -> Option<BlockNumber> {
        self.0.checked_sub(1).map(BlockNumber)
    }

    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        BlockNumber(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockNumber {
    fn from(value: u64) -> Self {
        BlockNumber(value)
    }
}
