use crate::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid range [{start}, {end}): start must be lower than end")]
pub struct InvalidRange {
    pub start: U256,
    pub end: U256,
}

/// Half-open interval `[start, end)` over the coin-ID space of one deposit
/// contract.
///
/// A `Range` is never empty: construction rejects `start >= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct Range {
    start: U256,
    end: U256,
}

#[derive(Serialize, Deserialize)]
struct RawRange {
    start: U256,
    end: U256,
}

impl TryFrom<RawRange> for Range {
    type Error = InvalidRange;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Range::new(raw.start, raw.end)
    }
}

impl From<Range> for RawRange {
    fn from(range: Range) -> Self {
        RawRange {
            start: range.start,
            end: range.end,
        }
    }
}

impl Range {
    pub fn new(start: U256, end: U256) -> Result<Self, InvalidRange> {
        if start >= end {
            return Err(InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn from_u64(start: u64, end: u64) -> Result<Self, InvalidRange> {
        Self::new(U256::from(start), U256::from(end))
    }

    pub fn start(&self) -> U256 {
        self.start
    }

    pub fn end(&self) -> U256 {
        self.end
    }

    pub fn amount(&self) -> U256 {
        self.end - self.start
    }

    pub fn contains(&self, coin: U256) -> bool {
        self.start <= coin && coin < self.end
    }

    pub fn intersects(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Overlapping part of both ranges, if any.
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        Range::new(start, end).ok()
    }

    /// Sub-range holding the lowest `amount` coins of this range.
    ///
    /// Returns `None` when `amount` is zero or larger than the range.
    pub fn take_lowest(&self, amount: U256) -> Option<Range> {
        if amount.is_zero() || amount > self.amount() {
            return None;
        }
        Range::new(self.start, self.start + amount).ok()
    }

    /// Parts of `self` left after cutting `other` out: the piece below
    /// `other.start` and the piece above `other.end`.
    pub fn subtract(&self, other: &Range) -> (Option<Range>, Option<Range>) {
        if !self.intersects(other) {
            return (Some(*self), None);
        }
        let below = Range::new(self.start, other.start).ok();
        let above = Range::new(other.end, self.end).ok();
        (below, above)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, end: u64) -> Range {
        Range::from_u64(start, end).unwrap()
    }

    #[test]
    fn test_rejects_empty_and_inverted() {
        assert!(Range::from_u64(5, 5).is_err());
        assert!(Range::from_u64(6, 5).is_err());
        assert_eq!(range(0, 10).amount(), U256::from(10u64));
    }

    #[test]
    fn test_half_open_intersection() {
        assert!(!range(0, 10).intersects(&range(10, 20)));
        assert!(range(0, 11).intersects(&range(10, 20)));
        assert_eq!(range(0, 15).intersection(&range(10, 20)), Some(range(10, 15)));
        assert_eq!(range(0, 10).intersection(&range(10, 20)), None);
    }

    #[test]
    fn test_take_lowest() {
        assert_eq!(range(10, 20).take_lowest(U256::from(5u64)), Some(range(10, 15)));
        assert_eq!(range(10, 20).take_lowest(U256::from(10u64)), Some(range(10, 20)));
        assert_eq!(range(10, 20).take_lowest(U256::from(11u64)), None);
        assert_eq!(range(10, 20).take_lowest(U256::ZERO), None);
    }

    #[test]
    fn test_subtract_splits_around_hole() {
        assert_eq!(
            range(0, 20).subtract(&range(5, 10)),
            (Some(range(0, 5)), Some(range(10, 20)))
        );
        assert_eq!(range(0, 20).subtract(&range(0, 20)), (None, None));
        assert_eq!(range(5, 10).subtract(&range(0, 7)), (None, Some(range(7, 10))));
        assert_eq!(range(5, 10).subtract(&range(20, 30)), (Some(range(5, 10)), None));
    }

    #[test]
    fn test_deserialize_rejects_invalid_range() {
        let json = serde_json::json!({ "start": "0xa", "end": "0x5" });
        assert!(serde_json::from_value::<Range>(json).is_err());
    }
}
