use crate::core::monetary::{MAX_TRANSACTIONS_PER_BLOCK, PROTOCOL_VERSION};
use crate::core::{DifficultyAdjustment, MerkleProof, MerkleTree, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize, sha256_digest, Hash, ZERO_HASH};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct BlockHeader {
    version: u32,
    prev_hash: Hash,
    merkle_root: Hash, // Stale between add_transaction and finalize
    timestamp: i64,
    difficulty: u32,
    nonce: u64,
    height: u64,
}

impl BlockHeader {
    /// Header fields laid out big-endian, with `nonce` in place of the stored one
    pub fn to_bytes_with_nonce(&self, nonce: u64) -> Vec<u8> {
        let mut data_bytes = Vec::with_capacity(100);
        data_bytes.extend(self.version.to_be_bytes());
        data_bytes.extend_from_slice(&self.prev_hash);
        data_bytes.extend_from_slice(&self.merkle_root);
        data_bytes.extend(self.timestamp.to_be_bytes());
        data_bytes.extend(self.difficulty.to_be_bytes());
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes.extend(self.height.to_be_bytes());
        data_bytes
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_bytes_with_nonce(self.nonce)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    header: BlockHeader,
    transactions: Vec<Transaction>,
}

impl Block {
    /// An empty block on top of `prev_hash`
    pub fn new(prev_hash: Hash, height: u64, difficulty: u32, timestamp: i64) -> Block {
        Block {
            header: BlockHeader {
                version: PROTOCOL_VERSION,
                prev_hash,
                merkle_root: ZERO_HASH,
                timestamp,
                difficulty,
                nonce: 0,
                height,
            },
            transactions: vec![],
        }
    }

    /// The root of every chain: zero previous hash, height 0, one coinbase
    pub fn genesis(timestamp: i64) -> Block {
        let mut block = Block::new(
            ZERO_HASH,
            0,
            DifficultyAdjustment::get_initial_difficulty(),
            timestamp,
        );
        block
            .transactions
            .push(Transaction::new_coinbase(0, &[], timestamp));
        block.finalize();
        block
    }

    /// Append a transaction. The header's Merkle root is stale until [`Block::finalize`]
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<()> {
        if self.is_full() {
            return Err(BlockchainError::BlockFull {
                capacity: MAX_TRANSACTIONS_PER_BLOCK,
            });
        }
        self.transactions.push(tx);
        Ok(())
    }

    /// Commit the header to the current transaction list
    pub fn finalize(&mut self) {
        self.header.merkle_root = Self::merkle_root_of(&self.transactions);
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.header.nonce = nonce;
    }

    /// Merkle root of `transactions` in order; the zero sentinel when empty
    pub fn merkle_root_of(transactions: &[Transaction]) -> Hash {
        let hashes: Vec<Hash> = transactions.iter().map(|tx| tx.hash()).collect();
        MerkleTree::calculate_merkle_root(&hashes)
    }

    /// SHA-256 over the header bytes followed by every transaction's canonical bytes
    pub fn hash(&self) -> Hash {
        let mut data = self.header.to_bytes();
        for tx in &self.transactions {
            data.extend(tx.canonical_bytes());
        }
        sha256_digest(&data)
    }

    pub fn hash_hex(&self) -> String {
        HEXLOWER.encode(&self.hash())
    }

    /// Check capacity, the Merkle commitment, id uniqueness and every
    /// transaction, reporting the first failure
    pub fn validate_content(&self) -> Result<()> {
        if self.transactions.len() > MAX_TRANSACTIONS_PER_BLOCK {
            return Err(BlockchainError::InvalidBlock(format!(
                "block holds {} transactions, capacity is {}",
                self.transactions.len(),
                MAX_TRANSACTIONS_PER_BLOCK
            )));
        }

        if !MerkleTree::verify_transactions(&self.transactions, &self.header.merkle_root) {
            return Err(BlockchainError::InvalidBlock(
                "merkle root does not match transactions".to_string(),
            ));
        }

        // Odd Merkle levels pair their last node with itself, so a repeated
        // trailing transaction would leave the root unchanged
        let mut seen = HashSet::with_capacity(self.transactions.len());
        let mut coinbase_count = 0;
        for tx in &self.transactions {
            if !seen.insert(tx.hash()) {
                return Err(BlockchainError::InvalidBlock(format!(
                    "transaction {} appears more than once",
                    tx.id_hex()
                )));
            }
            if let Some(height) = tx.coinbase_height() {
                coinbase_count += 1;
                if height != self.header.height {
                    return Err(BlockchainError::InvalidBlock(format!(
                        "coinbase claims height {height} inside block {}",
                        self.header.height
                    )));
                }
            }
            tx.validate().map_err(|e| {
                BlockchainError::InvalidBlock(format!("transaction {}: {e}", tx.id_hex()))
            })?;
        }
        if coinbase_count > 1 {
            return Err(BlockchainError::InvalidBlock(
                "more than one coinbase transaction".to_string(),
            ));
        }
        Ok(())
    }

    pub fn has_valid_content(&self) -> bool {
        self.validate_content().is_ok()
    }

    /// Generate a Merkle proof for a transaction in this block
    pub fn generate_merkle_proof(&self, transaction_index: usize) -> Result<MerkleProof> {
        MerkleTree::from_transactions(&self.transactions).generate_proof(transaction_index)
    }

    /// Verify a Merkle proof against this block's Merkle root
    pub fn verify_merkle_proof(&self, proof: &MerkleProof) -> bool {
        proof.merkle_root == self.header.merkle_root && MerkleTree::verify_proof(proof)
    }

    pub fn is_full(&self) -> bool {
        self.transactions.len() >= MAX_TRANSACTIONS_PER_BLOCK
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_prev_hash(&self) -> &Hash {
        &self.header.prev_hash
    }

    pub fn get_merkle_root(&self) -> &Hash {
        &self.header.merkle_root
    }

    pub fn get_timestamp(&self) -> i64 {
        self.header.timestamp
    }

    pub fn get_height(&self) -> u64 {
        self.header.height
    }

    pub fn get_difficulty(&self) -> u32 {
        self.header.difficulty
    }

    pub fn get_nonce(&self) -> u64 {
        self.header.nonce
    }

    pub fn get_version(&self) -> u32 {
        self.header.version
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for Block {}
