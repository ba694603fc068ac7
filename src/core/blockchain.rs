// This is the chain itself: the ordered blocks, the orphan set, and the rules
// that decide what an incoming block does to them.
// Storage lives elsewhere (storage::chain_store); this type is pure in-memory state.

use crate::core::{Block, DifficultyAdjustment, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::MemPool;
use crate::telemetry::{ChainEvent, Telemetry};
use crate::utils::{Hash, ZERO_HASH};
use data_encoding::HEXLOWER;
use std::sync::Arc;

/// What `add_block` did with an accepted block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The block became `blocks[0]`
    Genesis,
    /// The block was appended on top of the head
    Extended,
    /// The block displaced the head by carrying a higher difficulty
    Replaced,
    /// The block ties the head and waits in the orphan set
    Orphaned,
    /// The block extended an orphan, so the orphan and then the block replaced the head
    Reorganized,
}

pub struct Chain {
    blocks: Vec<Block>,  // blocks[i] has height i
    orphans: Vec<Block>, // Competitors of the head at the head's height
    telemetry: Arc<dyn Telemetry>,
}

impl Chain {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Chain {
        Chain {
            blocks: vec![],
            orphans: vec![],
            telemetry,
        }
    }

    /// Rebuild a chain from a stored block sequence, re-checking every rule
    pub fn from_blocks(blocks: Vec<Block>, telemetry: Arc<dyn Telemetry>) -> Result<Chain> {
        let mut chain = Chain::new(telemetry);
        // Scratch pool: replaying a linear chain never requeues anything
        let mut scratch = MemPool::new();

        for block in blocks {
            let height = block.get_height();
            match chain.add_block(block, &mut scratch)? {
                BlockOutcome::Genesis | BlockOutcome::Extended => {}
                outcome => {
                    return Err(BlockchainError::InvalidBlock(format!(
                        "stored block at height {height} is not linear ({outcome:?})"
                    )))
                }
            }
        }
        Ok(chain)
    }

    /// Offer a block to the chain
    ///
    /// Rejections leave the chain, the orphan set and `mempool` untouched.
    pub fn add_block(&mut self, block: Block, mempool: &mut MemPool) -> Result<BlockOutcome> {
        let height = block.get_height();
        let result = self.try_add_block(block, mempool);

        if let Err(e) = &result {
            self.telemetry.record(&ChainEvent::BlockRejected {
                height,
                reason: e.to_string(),
            });
        }
        result
    }

    fn try_add_block(&mut self, block: Block, mempool: &mut MemPool) -> Result<BlockOutcome> {
        let (head_height, head_hash) = match self.blocks.last() {
            Some(head) => (head.get_height(), head.hash()),
            None => return self.accept_genesis(block, mempool),
        };

        if block.get_height() == head_height + 1 {
            if *block.get_prev_hash() == head_hash {
                return self.extend(block, mempool);
            }
            if let Some(idx) = self
                .orphans
                .iter()
                .position(|orphan| orphan.hash() == *block.get_prev_hash())
            {
                return self.adopt_orphan_branch(idx, block, mempool);
            }
            return Err(BlockchainError::InvalidBlock(format!(
                "previous hash {} does not match the head",
                HEXLOWER.encode(block.get_prev_hash())
            )));
        }

        if block.get_height() == head_height {
            return self.resolve_fork(block, mempool);
        }

        Err(BlockchainError::InvalidBlock(format!(
            "height {} does not follow head height {head_height}",
            block.get_height()
        )))
    }

    fn accept_genesis(&mut self, block: Block, mempool: &mut MemPool) -> Result<BlockOutcome> {
        if block.get_height() != 0 {
            return Err(BlockchainError::InvalidBlock(format!(
                "empty chain needs a genesis block, got height {}",
                block.get_height()
            )));
        }
        if *block.get_prev_hash() != ZERO_HASH {
            return Err(BlockchainError::InvalidBlock(
                "genesis block must have a zero previous hash".to_string(),
            ));
        }
        Self::check_block(&block)?;

        let hash = block.hash();
        Self::drain_included(&block, mempool);
        self.blocks.push(block);
        self.telemetry.record(&ChainEvent::GenesisAccepted { hash });
        Ok(BlockOutcome::Genesis)
    }

    fn extend(&mut self, block: Block, mempool: &mut MemPool) -> Result<BlockOutcome> {
        Self::check_block(&block)?;

        let height = block.get_height();
        let hash = block.hash();
        Self::drain_included(&block, mempool);
        self.blocks.push(block);
        self.telemetry
            .record(&ChainEvent::BlockAppended { height, hash });

        // Orphans now sit below the head and can never win
        self.prune_orphans();
        Ok(BlockOutcome::Extended)
    }

    // A competitor at the head's height: the harder block wins, a tie waits
    fn resolve_fork(&mut self, block: Block, mempool: &mut MemPool) -> Result<BlockOutcome> {
        let hash = block.hash();
        let height = block.get_height();
        let head = self.head()?;

        if hash == head.hash() {
            return Err(BlockchainError::InvalidBlock(
                "block is already the head".to_string(),
            ));
        }
        if height == 0 {
            return Err(BlockchainError::InvalidBlock(
                "genesis block cannot be replaced".to_string(),
            ));
        }
        Self::check_block(&block)?;

        // The competitor must share the head's parent so the link invariant survives
        let parent_hash = self.blocks[self.blocks.len() - 2].hash();
        if *block.get_prev_hash() != parent_hash {
            return Err(BlockchainError::InvalidBlock(format!(
                "fork at height {height} does not build on block {}",
                HEXLOWER.encode(&parent_hash)
            )));
        }

        let head_difficulty = head.get_difficulty();
        if block.get_difficulty() > head_difficulty {
            let displaced = self.replace_head(vec![block], mempool)?;
            self.telemetry.record(&ChainEvent::HeadReplaced {
                height,
                old: displaced,
                new: hash,
            });
            self.prune_orphans();
            return Ok(BlockOutcome::Replaced);
        }

        if block.get_difficulty() < head_difficulty {
            return Err(BlockchainError::InvalidBlock(format!(
                "fork difficulty {} is below head difficulty {head_difficulty}",
                block.get_difficulty()
            )));
        }

        if !self.orphans.iter().any(|orphan| orphan.hash() == hash) {
            self.orphans.push(block);
            self.telemetry
                .record(&ChainEvent::OrphanFiled { height, hash });
        }
        Ok(BlockOutcome::Orphaned)
    }

    // Tie-break: the first orphan to gain a child takes over the head
    fn adopt_orphan_branch(
        &mut self,
        orphan_idx: usize,
        block: Block,
        mempool: &mut MemPool,
    ) -> Result<BlockOutcome> {
        Self::check_block(&block)?;

        let orphan = &self.orphans[orphan_idx];
        let parent_hash = self.blocks[self.blocks.len() - 2].hash();
        if *orphan.get_prev_hash() != parent_hash {
            return Err(BlockchainError::InvalidBlock(
                "orphan no longer builds on the head's parent".to_string(),
            ));
        }

        let height = orphan.get_height();
        let orphan_hash = orphan.hash();
        let tip = block.hash();

        let orphan = self.orphans.remove(orphan_idx);
        self.replace_head(vec![orphan, block], mempool)?;
        self.telemetry.record(&ChainEvent::Reorganized {
            height,
            orphan: orphan_hash,
            tip,
        });
        self.prune_orphans();
        Ok(BlockOutcome::Reorganized)
    }

    // Swap the head for `branch`, returning the displaced head's hash. The
    // displaced block's transactions go back to the pool before the branch's
    // own transactions are drained, so a transaction both blocks share stays out.
    fn replace_head(&mut self, branch: Vec<Block>, mempool: &mut MemPool) -> Result<Hash> {
        let displaced = self.blocks.pop().ok_or_else(|| {
            BlockchainError::InvalidBlock("no head to replace".to_string())
        })?;

        let mut requeued = 0;
        for tx in displaced.get_transactions() {
            if !tx.is_coinbase() && mempool.add_transaction(tx.clone()) {
                requeued += 1;
            }
        }

        for block in branch {
            Self::drain_included(&block, mempool);
            self.blocks.push(block);
        }

        if requeued > 0 {
            self.telemetry
                .record(&ChainEvent::TransactionsRequeued { count: requeued });
        }
        Ok(displaced.hash())
    }

    fn drain_included(block: &Block, mempool: &mut MemPool) {
        block
            .get_transactions()
            .iter()
            .filter(|tx| !tx.is_coinbase())
            .for_each(|tx| {
                mempool.discard(&tx.hash());
            });
    }

    fn prune_orphans(&mut self) {
        let head_height = match self.blocks.last() {
            Some(head) => head.get_height(),
            None => return,
        };

        let before = self.orphans.len();
        self.orphans
            .retain(|orphan| orphan.get_height() >= head_height);
        // Anything at the head's height that the head outranks is dead too
        if let Some(head) = self.blocks.last() {
            let head_difficulty = head.get_difficulty();
            self.orphans
                .retain(|orphan| orphan.get_difficulty() >= head_difficulty);
        }

        let pruned = before - self.orphans.len();
        if pruned > 0 {
            self.telemetry
                .record(&ChainEvent::OrphansPruned { count: pruned });
        }
    }

    fn check_block(block: &Block) -> Result<()> {
        DifficultyAdjustment::validate_difficulty(block.get_difficulty())?;
        block.validate_content()
    }

    fn head(&self) -> Result<&Block> {
        self.blocks
            .last()
            .ok_or_else(|| BlockchainError::InvalidBlock("chain has no head".to_string()))
    }

    pub fn get_last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Number of blocks on the main chain
    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Height of the head, if there is one
    pub fn height(&self) -> Option<u64> {
        self.blocks.last().map(Block::get_height)
    }

    pub fn blocks(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    pub fn block_at(&self, height: u64) -> Option<&Block> {
        usize::try_from(height)
            .ok()
            .and_then(|idx| self.blocks.get(idx))
    }

    pub fn orphans(&self) -> &[Block] {
        self.orphans.as_slice()
    }

    /// Find a transaction on the main chain, with the height of its block
    pub fn find_transaction(&self, txid: &Hash) -> Option<(u64, &Transaction)> {
        self.blocks.iter().rev().find_map(|block| {
            block
                .get_transactions()
                .iter()
                .find(|tx| tx.hash() == *txid)
                .map(|tx| (block.get_height(), tx))
        })
    }

    /// Re-verify the whole main chain from genesis
    pub fn is_valid(&self) -> bool {
        self.blocks.iter().enumerate().all(|(idx, block)| {
            let linked = match idx {
                0 => *block.get_prev_hash() == ZERO_HASH,
                _ => *block.get_prev_hash() == self.blocks[idx - 1].hash(),
            };
            linked && block.get_height() == idx as u64 && block.has_valid_content()
        })
    }
}
