//! Block production
//!
//! One call to [`Miner::mine`] runs a single attempt: select from the pool,
//! assemble on the current head, search for a nonce without holding the
//! ledger lock, hand the block to the broadcast callback, then drain the pool.

use crate::core::monetary::MAX_TRANSACTIONS_PER_BLOCK;
use crate::core::{Block, DifficultyAdjustment, ProofOfWork, SharedLedger, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::MemPool;
use crate::telemetry::{ChainEvent, Telemetry};
use crate::utils::{Clock, Hash};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives every block a successful attempt produces
pub type BroadcastFn = Box<dyn Fn(Block) + Send + Sync>;

/// Everything a strategy needs to build on the current head
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub prev_hash: Hash,
    pub height: u64,
    pub difficulty: u32,
    pub timestamp: i64,
    pub reward_recipient: Vec<u8>,
}

/// Pluggable selection and assembly policy
pub trait MiningStrategy: Send + Sync {
    /// Choose pool transactions eligible at `now`, in inclusion order
    fn select_transactions(&self, mempool: &MemPool, now: i64) -> Vec<Transaction>;

    /// Build a finalized block from the template and the selection
    fn assemble_block(&self, template: &BlockTemplate, selected: &[Transaction]) -> Result<Block>;
}

/// Highest fee first, ties in pool order; coinbase last
#[derive(Debug, Default, Clone, Copy)]
pub struct FeePriorityStrategy;

impl MiningStrategy for FeePriorityStrategy {
    fn select_transactions(&self, mempool: &MemPool, now: i64) -> Vec<Transaction> {
        let mut candidates = mempool.transactions();
        // sort_by is stable, so equal fees keep their pool order
        candidates.sort_by(|a, b| b.fee_earnings().cmp(&a.fee_earnings()));
        candidates.retain(|tx| tx.get_locktime() <= now);
        candidates
    }

    fn assemble_block(&self, template: &BlockTemplate, selected: &[Transaction]) -> Result<Block> {
        let mut block = Block::new(
            template.prev_hash,
            template.height,
            template.difficulty,
            template.timestamp,
        );

        // One slot stays free for the coinbase; the overflow waits for a later round
        for tx in selected.iter().take(MAX_TRANSACTIONS_PER_BLOCK - 1) {
            block.add_transaction(tx.clone())?;
        }
        block.add_transaction(Transaction::new_coinbase(
            template.height,
            &template.reward_recipient,
            template.timestamp,
        ))?;

        block.finalize();
        Ok(block)
    }
}

/// Cancels the attempt a [`Miner`] is running, or its next one
#[derive(Clone)]
pub struct MinerHandle {
    cancelled: Arc<AtomicBool>,
}

impl MinerHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

pub struct Miner {
    ledger: SharedLedger,
    strategy: Box<dyn MiningStrategy>,
    clock: Arc<dyn Clock>,
    broadcast: BroadcastFn,
    reward_recipient: Vec<u8>,
    telemetry: Arc<dyn Telemetry>,
    cancelled: Arc<AtomicBool>,
}

impl Miner {
    pub fn new(
        ledger: SharedLedger,
        clock: Arc<dyn Clock>,
        broadcast: BroadcastFn,
        reward_recipient: &[u8],
        telemetry: Arc<dyn Telemetry>,
    ) -> Miner {
        Miner {
            ledger,
            strategy: Box::new(FeePriorityStrategy),
            clock,
            broadcast,
            reward_recipient: reward_recipient.to_vec(),
            telemetry,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn MiningStrategy>) -> Miner {
        self.strategy = strategy;
        self
    }

    pub fn handle(&self) -> MinerHandle {
        MinerHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Run one mining attempt and return the broadcast block
    pub fn mine(&self) -> Result<Block> {
        let (mut block, prev_hash) = self.assemble()?;
        let height = block.get_height();

        let pow = ProofOfWork::new_proof_of_work(&block);
        let stop = || self.cancelled.swap(false, Ordering::SeqCst) || self.head_moved(&prev_hash);
        let (nonce, _) = match pow.run(&stop) {
            Some(found) => found,
            None => return Err(self.abandon(height, "cancelled or head moved")),
        };
        block.set_nonce(nonce);

        // The head may have moved after the last poll inside the search
        if self.head_moved(&prev_hash) {
            return Err(self.abandon(height, "head moved before broadcast"));
        }

        self.telemetry.record(&ChainEvent::BlockMined {
            height,
            hash: block.hash(),
            transactions: block.get_transactions().len(),
        });

        // Outside every lock: the callback may take the write lock itself
        (self.broadcast)(block.clone());

        let mut ledger = self.ledger.write()?;
        for tx in block.get_transactions().iter().filter(|tx| !tx.is_coinbase()) {
            ledger.mempool.discard(&tx.hash());
        }
        Ok(block)
    }

    // Select and assemble under the read lock
    fn assemble(&self) -> Result<(Block, Hash)> {
        let ledger = self.ledger.read()?;
        let head = ledger
            .chain
            .get_last_block()
            .ok_or_else(|| BlockchainError::Mining("chain has no head to build on".to_string()))?;

        let now = self.clock.now()?;
        let template = BlockTemplate {
            prev_hash: head.hash(),
            height: head.get_height() + 1,
            difficulty: DifficultyAdjustment::next_difficulty(head, now),
            timestamp: now,
            reward_recipient: self.reward_recipient.clone(),
        };

        let selected = self.strategy.select_transactions(&ledger.mempool, now);
        let block = self.strategy.assemble_block(&template, &selected)?;
        Ok((block, template.prev_hash))
    }

    fn head_moved(&self, prev_hash: &Hash) -> bool {
        match self.ledger.head_hash() {
            Ok(head) => head.as_ref() != Some(prev_hash),
            Err(_) => true,
        }
    }

    fn abandon(&self, height: u64, reason: &str) -> BlockchainError {
        self.telemetry.record(&ChainEvent::MiningAbandoned {
            height,
            reason: reason.to_string(),
        });
        BlockchainError::Mining(format!("attempt at height {height} abandoned: {reason}"))
    }
}
