//! Core chain functionality
//!
//! This module contains the consensus-critical components: transactions,
//! blocks and their Merkle commitment, the chain with its fork rules, the
//! shared ledger, and the miner.

pub mod block;
pub mod blockchain;
pub mod difficulty;
pub mod ledger;
pub mod merkle;
pub mod miner;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, BlockHeader};
pub use blockchain::{BlockOutcome, Chain};
pub use difficulty::DifficultyAdjustment;
pub use ledger::{Ledger, SharedLedger};
pub use merkle::{MerkleProof, MerkleTree, ProofElement};
pub use miner::{
    BlockTemplate, BroadcastFn, FeePriorityStrategy, Miner, MinerHandle, MiningStrategy,
};
pub use monetary::{block_subsidy, COIN, MAX_TRANSACTIONS_PER_BLOCK, PROTOCOL_VERSION};
pub use proof_of_work::ProofOfWork;
pub use transaction::{Transaction, TxInput, TxOutput};
