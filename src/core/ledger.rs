//! The chain and its mempool behind one lock
//!
//! Fork resolution reads and writes both structures, so they share a single
//! writer lock. Queries take the read side and see a consistent snapshot.

use crate::core::{Block, BlockOutcome, Chain, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::MemPool;
use crate::telemetry::Telemetry;
use crate::utils::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct Ledger {
    pub chain: Chain,
    pub mempool: MemPool,
}

impl Ledger {
    pub fn new(chain: Chain, mempool: MemPool) -> Ledger {
        Ledger { chain, mempool }
    }

    pub fn add_block(&mut self, block: Block) -> Result<BlockOutcome> {
        self.chain.add_block(block, &mut self.mempool)
    }

    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<bool> {
        self.mempool.submit(tx)
    }
}

/// Cloneable handle to a [`Ledger`] shared by miners and the block-acceptance path
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> SharedLedger {
        SharedLedger {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// A ledger holding an empty chain and an empty pool
    pub fn empty(telemetry: Arc<dyn Telemetry>) -> SharedLedger {
        SharedLedger::new(Ledger::new(Chain::new(telemetry), MemPool::new()))
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, Ledger>> {
        self.inner
            .read()
            .map_err(|e| BlockchainError::LockPoisoned(format!("ledger read lock: {e}")))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Ledger>> {
        self.inner
            .write()
            .map_err(|e| BlockchainError::LockPoisoned(format!("ledger write lock: {e}")))
    }

    pub fn add_block(&self, block: Block) -> Result<BlockOutcome> {
        self.write()?.add_block(block)
    }

    pub fn submit_transaction(&self, tx: Transaction) -> Result<bool> {
        self.write()?.submit_transaction(tx)
    }

    /// Hash of the current head, if any
    pub fn head_hash(&self) -> Result<Option<Hash>> {
        Ok(self.read()?.chain.get_last_block().map(Block::hash))
    }

    /// Number of blocks on the main chain
    pub fn chain_size(&self) -> Result<usize> {
        Ok(self.read()?.chain.size())
    }

    pub fn mempool_len(&self) -> Result<usize> {
        Ok(self.read()?.mempool.len())
    }
}
