//! # Skynet Chain - consensus core of the Skynet node
//!
//! A linear chain of hash-linked blocks, each committing to its transactions
//! through a Merkle root, fed by a mempool and extended by a miner.
//!
//! ## How the code is organized
//! - `core/`: transactions, blocks, Merkle trees, the chain with its fork
//!   rules, the shared ledger, and the miner
//! - `storage/`: the mempool and the sled chain store
//! - `telemetry/`: the event sink the chain and miner report through
//! - `config/`: TOML configuration with environment overrides
//! - `utils/`: hashing, signing, the injected clock, persistence encoding
//! - `cli/`: command-line parsing for the node binary
//!
//! ## Where to start
//! 1. `core/blockchain.rs` for what an incoming block does to the chain
//! 2. `core/miner.rs` for how a block is produced
//! 3. `core/transaction.rs` and `core/block.rs` for the hashed encodings

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod telemetry;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    Block, BlockOutcome, Chain, FeePriorityStrategy, Ledger, MerkleTree, Miner, MiningStrategy,
    ProofOfWork, SharedLedger, Transaction, TxInput, TxOutput,
};
pub use error::{BlockchainError, Result};
pub use storage::{ChainStore, MemPool};
pub use telemetry::{ChainEvent, LogTelemetry, NullTelemetry, Telemetry};
pub use utils::{
    base58_encode, current_timestamp, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, new_key_pair, sha256_digest, Clock, FixedClock, Hash,
    SystemClock, ZERO_HASH,
};
