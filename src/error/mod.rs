//! Error handling for the chain core
//!
//! Every rejection the core can produce maps onto one variant here, so the
//! transport layer can tell an invalid signature apart from a full block or
//! a block that does not extend the chain.

use std::fmt;

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error kinds produced by the chain core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Signature failure or amount out of the allowed range
    InvalidTransaction(String),
    /// Attempted to append a transaction to a block that is at capacity
    BlockFull { capacity: usize },
    /// Block failed height, previous-hash or content checks
    InvalidBlock(String),
    /// Mempool lookup or removal of an unknown transaction id (hex)
    TransactionNotFound(String),
    /// A single mining attempt failed or was abandoned
    Mining(String),
    /// A shared lock was poisoned by a panicking holder
    LockPoisoned(String),
    /// Database-related errors
    Database(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl BlockchainError {
    /// Stable machine-readable reason, suitable for reporting to peers
    pub fn reason(&self) -> &'static str {
        match self {
            BlockchainError::InvalidTransaction(_) => "invalid-transaction",
            BlockchainError::BlockFull { .. } => "block-full",
            BlockchainError::InvalidBlock(_) => "invalid-block",
            BlockchainError::TransactionNotFound(_) => "transaction-not-found",
            BlockchainError::Mining(_) => "mining-failed",
            BlockchainError::LockPoisoned(_) => "lock-poisoned",
            BlockchainError::Database(_) => "database",
            BlockchainError::Serialization(_) => "serialization",
            BlockchainError::Crypto(_) => "crypto",
            BlockchainError::Config(_) => "config",
            BlockchainError::Io(_) => "io",
        }
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            BlockchainError::BlockFull { capacity } => {
                write!(f, "Block is full ({capacity} transactions)")
            }
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::TransactionNotFound(id) => write!(f, "Transaction not found: {id}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::LockPoisoned(what) => write!(f, "Lock poisoned: {what}"),
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}
