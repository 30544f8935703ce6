pub use alloy_primitives::{keccak256, Address, Bytes, B256, U256};

/// 32-byte hash as committed by the commitment contract (block roots,
/// checkpoint ids).
pub type Bytes32 = B256;

/// Identity of a deposit contract. Each deposit contract owns one coin-ID
/// space, so ranges are only comparable within the same deposit contract.
pub type DepositContract = Address;

/// Big-endian 32-byte encoding of a coin ID, used as an ordered storage key.
pub fn coin_key(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

/// Inverse of [`coin_key`]. Returns `None` when the slice is not 32 bytes.
pub fn coin_from_key(key: &[u8]) -> Option<U256> {
    let bytes: [u8; 32] = key.try_into().ok()?;
    Some(U256::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_key_preserves_ordering() {
        let small = coin_key(U256::from(255u64));
        let large = coin_key(U256::from(256u64));
        assert!(small < large);
    }

    #[test]
    fn coin_key_round_trips() {
        let value = U256::from(123_456_789u64);
        assert_eq!(coin_from_key(&coin_key(value)), Some(value));
        assert_eq!(coin_from_key(&[0u8; 31]), None);
    }
}
