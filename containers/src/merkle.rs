//! Inclusion proofs for state updates committed in a block root.
//!
//! The sync engine treats verification as a black box behind
//! [`MerkleVerifier`]. [`KeccakMerkleVerifier`] is the default binary-tree
//! verifier used by the binary.

use crate::range::Range;
use crate::types::{coin_key, keccak256, Bytes32};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    /// Position of the leaf among the block's leaves.
    pub leaf_index: u64,
    /// Sibling hashes from the leaf level up to the root.
    pub siblings: Vec<Bytes32>,
}

pub trait MerkleVerifier: Send + Sync {
    /// Check that `leaf`, committed for `range`, is included under `root`.
    fn verify(&self, leaf: &[u8], range: &Range, root: &Bytes32, proof: &InclusionProof) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct KeccakMerkleVerifier;

impl KeccakMerkleVerifier {
    /// Leaf hash binding the encoded state update to its range.
    pub fn leaf_hash(leaf: &[u8], range: &Range) -> Bytes32 {
        let mut preimage = Vec::with_capacity(leaf.len() + 64);
        preimage.extend_from_slice(leaf);
        preimage.extend_from_slice(&coin_key(range.start()));
        preimage.extend_from_slice(&coin_key(range.end()));
        keccak256(preimage)
    }

    pub fn parent_hash(left: &Bytes32, right: &Bytes32) -> Bytes32 {
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(left.as_slice());
        preimage[32..].copy_from_slice(right.as_slice());
        keccak256(preimage)
    }

    /// Root obtained by folding `proof` over the leaf hash.
    pub fn compute_root(leaf: &[u8], range: &Range, proof: &InclusionProof) -> Bytes32 {
        let mut node = Self::leaf_hash(leaf, range);
        let mut index = proof.leaf_index;
        for sibling in &proof.siblings {
            node = if index & 1 == 0 {
                Self::parent_hash(&node, sibling)
            } else {
                Self::parent_hash(sibling, &node)
            };
            index >>= 1;
        }
        node
    }
}

impl MerkleVerifier for KeccakMerkleVerifier {
    fn verify(&self, leaf: &[u8], range: &Range, root: &Bytes32, proof: &InclusionProof) -> bool {
        if proof.siblings.len() < 64 && proof.leaf_index >> proof.siblings.len() != 0 {
            return false;
        }
        Self::compute_root(leaf, range, proof) == *root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, end: u64) -> Range {
        Range::from_u64(start, end).unwrap()
    }

    #[test]
    fn test_verifies_two_leaf_tree() {
        let left = KeccakMerkleVerifier::leaf_hash(b"alice", &range(0, 10));
        let right = KeccakMerkleVerifier::leaf_hash(b"bob", &range(10, 20));
        let root = KeccakMerkleVerifier::parent_hash(&left, &right);

        let proof = InclusionProof {
            leaf_index: 1,
            siblings: vec![left],
        };
        assert!(KeccakMerkleVerifier.verify(b"bob", &range(10, 20), &root, &proof));
    }

    #[test]
    fn test_rejects_wrong_range_or_index() {
        let left = KeccakMerkleVerifier::leaf_hash(b"alice", &range(0, 10));
        let right = KeccakMerkleVerifier::leaf_hash(b"bob", &range(10, 20));
        let root = KeccakMerkleVerifier::parent_hash(&left, &right);

        let proof = InclusionProof {
            leaf_index: 1,
            siblings: vec![left],
        };
        assert!(!KeccakMerkleVerifier.verify(b"bob", &range(10, 21), &root, &proof));

        let out_of_tree = InclusionProof {
            leaf_index: 3,
            siblings: vec![left],
        };
        assert!(!KeccakMerkleVerifier.verify(b"bob", &range(10, 20), &root, &out_of_tree));
    }
}
