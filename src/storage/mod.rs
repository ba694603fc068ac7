//! Data storage and persistence
//!
//! The in-memory pool of pending transactions and the sled store that
//! persists the main chain between runs.

pub mod chain_store;
pub mod memory_pool;

pub use chain_store::ChainStore;
pub use memory_pool::MemPool;
