use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::utils::{sha256_pair, Hash, ZERO_HASH};
use serde::{Deserialize, Serialize};

/// Merkle tree over transaction ids
///
/// Every level is kept so inclusion proofs can be read straight off the tree.
/// An odd level pairs its last node with itself. The root of an empty tree is
/// the zero sentinel and the root of a single leaf is that leaf.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerkleTree {
    // levels[0] holds the leaves, the last level holds the root
    levels: Vec<Vec<Hash>>,
}

/// Merkle proof for transaction verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Transaction hash being proven
    pub transaction_hash: Hash,
    /// Merkle root hash
    pub merkle_root: Hash,
    /// Proof path (sibling hashes and directions), leaf level first
    pub proof_path: Vec<ProofElement>,
    /// Index of the transaction in the block
    pub transaction_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofElement {
    /// Sibling hash
    pub hash: Hash,
    /// Direction: true if sibling is on the right, false if on the left
    pub is_right: bool,
}

impl MerkleTree {
    pub fn new() -> MerkleTree {
        MerkleTree::default()
    }

    /// Build a tree over the ids of `transactions`, in order
    pub fn from_transactions(transactions: &[Transaction]) -> MerkleTree {
        let leaves: Vec<Hash> = transactions.iter().map(|tx| tx.hash()).collect();
        MerkleTree::from_leaves(&leaves)
    }

    /// Build the whole tree once from a batch of leaves
    pub fn from_leaves(leaves: &[Hash]) -> MerkleTree {
        let mut tree = MerkleTree {
            levels: vec![leaves.to_vec()],
        };
        tree.rebuild();
        tree
    }

    /// Append a leaf and rebuild every level above it
    pub fn add_leaf(&mut self, hash: Hash) {
        match self.levels.first_mut() {
            Some(leaves) => leaves.push(hash),
            None => self.levels.push(vec![hash]),
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.levels.truncate(1);
        let mut current = match self.levels.first() {
            Some(leaves) if !leaves.is_empty() => leaves.clone(),
            _ => return,
        };

        while current.len() > 1 {
            current = Self::next_level(&current);
            self.levels.push(current.clone());
        }
    }

    fn next_level(level: &[Hash]) -> Vec<Hash> {
        level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => sha256_pair(left, right),
                [single] => sha256_pair(single, single),
                _ => ZERO_HASH,
            })
            .collect()
    }

    /// Current root; the zero sentinel while the tree has no leaves
    pub fn root(&self) -> Hash {
        match self.levels.last() {
            Some(level) if !level.is_empty() => level[0],
            _ => ZERO_HASH,
        }
    }

    pub fn leaves(&self) -> &[Hash] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Get the number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Check if the tree is empty
    pub fn is_empty(&self) -> bool {
        self.leaf_count() == 0
    }

    /// Generate a Merkle proof for a transaction at the given index
    pub fn generate_proof(&self, transaction_index: usize) -> Result<MerkleProof> {
        let leaf_count = self.leaf_count();
        if transaction_index >= leaf_count {
            return Err(BlockchainError::InvalidBlock(format!(
                "Transaction index {transaction_index} out of bounds ({leaf_count} leaves)"
            )));
        }

        let mut proof_path = Vec::new();
        let mut index = transaction_index;

        // Skip the root level, it has no siblings
        for level in &self.levels[..self.levels.len() - 1] {
            let proof_element = if index % 2 == 0 {
                // Sibling is on the right; an unpaired last node pairs with itself
                let sibling = level.get(index + 1).unwrap_or(&level[index]);
                ProofElement {
                    hash: *sibling,
                    is_right: true,
                }
            } else {
                ProofElement {
                    hash: level[index - 1],
                    is_right: false,
                }
            };
            proof_path.push(proof_element);
            index /= 2;
        }

        Ok(MerkleProof {
            transaction_hash: self.leaves()[transaction_index],
            merkle_root: self.root(),
            proof_path,
            transaction_index,
        })
    }

    /// Verify a Merkle proof
    pub fn verify_proof(proof: &MerkleProof) -> bool {
        let mut current_hash = proof.transaction_hash;

        for element in &proof.proof_path {
            current_hash = if element.is_right {
                sha256_pair(&current_hash, &element.hash)
            } else {
                sha256_pair(&element.hash, &current_hash)
            };
        }

        current_hash == proof.merkle_root
    }

    /// Calculate the Merkle root from a list of transaction hashes
    /// without keeping the intermediate levels
    pub fn calculate_merkle_root(hashes: &[Hash]) -> Hash {
        if hashes.is_empty() {
            return ZERO_HASH;
        }

        let mut current_level = hashes.to_vec();
        while current_level.len() > 1 {
            current_level = Self::next_level(&current_level);
        }
        current_level[0]
    }

    /// Verify that a list of transactions produces the expected Merkle root
    pub fn verify_transactions(transactions: &[Transaction], expected_root: &Hash) -> bool {
        let hashes: Vec<Hash> = transactions.iter().map(|tx| tx.hash()).collect();
        Self::calculate_merkle_root(&hashes) == *expected_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sha256_digest;

    fn leaf(n: u8) -> Hash {
        sha256_digest(&[n])
    }

    #[test]
    fn test_empty_root_is_zero_sentinel() {
        assert_eq!(MerkleTree::calculate_merkle_root(&[]), ZERO_HASH);
        assert_eq!(MerkleTree::new().root(), ZERO_HASH);
        assert_eq!(MerkleTree::new().root(), [0u8; 32]);
    }

    #[test]
    fn test_single_leaf_is_root() {
        let mut tree = MerkleTree::new();
        tree.add_leaf(leaf(1));

        assert_eq!(tree.root(), leaf(1));
        assert_eq!(tree.root(), tree.root());
    }

    #[test]
    fn test_odd_level_duplicates_last() {
        let hashes = vec![leaf(1), leaf(2), leaf(3)];

        let left = sha256_pair(&leaf(1), &leaf(2));
        let right = sha256_pair(&leaf(3), &leaf(3));
        let expected = sha256_pair(&left, &right);

        assert_eq!(MerkleTree::calculate_merkle_root(&hashes), expected);
    }

    #[test]
    fn test_incremental_matches_batch() {
        let hashes: Vec<Hash> = (0..7).map(leaf).collect();

        let mut tree = MerkleTree::new();
        for hash in &hashes {
            tree.add_leaf(*hash);
        }

        assert_eq!(tree.root(), MerkleTree::from_leaves(&hashes).root());
        assert_eq!(tree.root(), MerkleTree::calculate_merkle_root(&hashes));
        assert_eq!(tree.leaf_count(), 7);
    }

    #[test]
    fn test_reordering_changes_root() {
        let ordered = vec![leaf(1), leaf(2), leaf(3), leaf(4)];
        let swapped = vec![leaf(2), leaf(1), leaf(3), leaf(4)];

        assert_eq!(
            MerkleTree::calculate_merkle_root(&ordered),
            MerkleTree::calculate_merkle_root(&ordered)
        );
        assert_ne!(
            MerkleTree::calculate_merkle_root(&ordered),
            MerkleTree::calculate_merkle_root(&swapped)
        );
    }

    #[test]
    fn test_proofs_verify_for_every_leaf() {
        for count in 1..=9u8 {
            let hashes: Vec<Hash> = (0..count).map(leaf).collect();
            let tree = MerkleTree::from_leaves(&hashes);

            for index in 0..hashes.len() {
                let proof = tree.generate_proof(index).unwrap();
                assert_eq!(proof.merkle_root, tree.root());
                assert!(MerkleTree::verify_proof(&proof), "leaf {index} of {count}");
            }
        }
    }

    #[test]
    fn test_tampered_proof_fails() {
        let hashes: Vec<Hash> = (0..4).map(leaf).collect();
        let tree = MerkleTree::from_leaves(&hashes);

        let mut proof = tree.generate_proof(2).unwrap();
        proof.transaction_hash = leaf(99);
        assert!(!MerkleTree::verify_proof(&proof));
    }

    #[test]
    fn test_proof_index_out_of_bounds() {
        let tree = MerkleTree::from_leaves(&[leaf(1)]);
        assert!(tree.generate_proof(1).is_err());
        assert!(MerkleTree::new().generate_proof(0).is_err());
    }
}
