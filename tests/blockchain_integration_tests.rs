//! Chain integration tests
//!
//! Drives the public API end to end: submission, mining through the broadcast
//! callback, fork resolution across the shared ledger, and persistence.

use skynet_chain::core::monetary::MAX_TRANSACTIONS_PER_BLOCK;
use skynet_chain::core::{
    Block, BlockOutcome, Chain, Ledger, MerkleTree, Miner, ProofOfWork, SharedLedger,
    Transaction, TxInput, TxOutput,
};
use skynet_chain::storage::{ChainStore, MemPool};
use skynet_chain::telemetry::null_telemetry;
use skynet_chain::utils::{new_key_pair, sha256_digest, FixedClock, Hash, ZERO_HASH};
use skynet_chain::BlockchainError;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn transfer(pkcs8: &[u8], input_value: u64, output_value: u64, locktime: i64) -> Transaction {
    Transaction::new_transfer(
        TxInput::new([1u8; 32], 0, input_value),
        TxOutput::new(output_value, b"recipient"),
        0,
        locktime,
        pkcs8,
    )
    .unwrap()
}

fn child_of(parent: &Block, difficulty: u32, transactions: Vec<Transaction>) -> Block {
    let height = parent.get_height() + 1;
    let timestamp = parent.get_timestamp() + 60_000;
    let mut block = Block::new(parent.hash(), height, difficulty, timestamp);
    for tx in transactions {
        block.add_transaction(tx).unwrap();
    }
    block
        .add_transaction(Transaction::new_coinbase(height, b"miner", timestamp))
        .unwrap();
    block.finalize();
    block
}

fn genesis_ledger() -> SharedLedger {
    let ledger = SharedLedger::empty(null_telemetry());
    assert_eq!(
        ledger.add_block(Block::genesis(0)).unwrap(),
        BlockOutcome::Genesis
    );
    ledger
}

#[test]
fn test_merkle_root_is_deterministic_and_order_sensitive() {
    let leaves: Vec<Hash> = (0u8..5).map(|i| sha256_digest(&[i])).collect();
    let mut reordered = leaves.clone();
    reordered.swap(0, 1);

    let root = MerkleTree::calculate_merkle_root(&leaves);
    assert_eq!(root, MerkleTree::calculate_merkle_root(&leaves));
    assert_eq!(root, MerkleTree::from_leaves(&leaves).root());
    assert_ne!(root, MerkleTree::calculate_merkle_root(&reordered));
    assert_eq!(MerkleTree::calculate_merkle_root(&[]), [0u8; 32]);
}

#[test]
fn test_block_capacity_fails_on_the_extra_append_only() {
    let mut block = Block::new(ZERO_HASH, 1, 1, 0);
    let filler = Transaction::new_coinbase(1, b"filler", 0);

    let failures = (0..=MAX_TRANSACTIONS_PER_BLOCK)
        .filter(|_| block.add_transaction(filler.clone()).is_err())
        .count();

    assert_eq!(failures, 1);
    assert_eq!(block.get_transactions().len(), MAX_TRANSACTIONS_PER_BLOCK);
}

#[test]
fn test_genesis_then_linear_extension() {
    let mut chain = Chain::new(null_telemetry());
    let mut pool = MemPool::new();

    let not_genesis = child_of(&Block::genesis(0), 5, vec![]);
    assert!(chain.add_block(not_genesis, &mut pool).is_err());
    assert_eq!(chain.size(), 0);

    let genesis = Block::genesis(0);
    chain.add_block(genesis.clone(), &mut pool).unwrap();
    let b1 = child_of(&genesis, 5, vec![]);
    chain.add_block(b1.clone(), &mut pool).unwrap();

    assert_eq!(chain.size(), 2);
    assert_eq!(chain.get_last_block(), Some(&b1));
}

#[test]
fn test_wrong_prev_hash_is_an_invalid_block() {
    let ledger = genesis_ledger();

    let mut b1 = Block::new([0xAB; 32], 1, 5, 60_000);
    b1.add_transaction(Transaction::new_coinbase(1, b"m", 60_000))
        .unwrap();
    b1.finalize();

    let err = ledger.add_block(b1).unwrap_err();
    assert!(matches!(err, BlockchainError::InvalidBlock(_)));
    assert_eq!(ledger.chain_size().unwrap(), 1);
}

#[test]
fn test_harder_fork_returns_displaced_transactions() {
    let pkcs8 = new_key_pair().unwrap();
    let ledger = genesis_ledger();
    let genesis = ledger.read().unwrap().chain.get_last_block().unwrap().clone();

    let txs = vec![transfer(&pkcs8, 100, 90, 0), transfer(&pkcs8, 100, 80, 0)];
    for tx in &txs {
        ledger.submit_transaction(tx.clone()).unwrap();
    }
    let head = child_of(&genesis, 5, txs.clone());
    ledger.add_block(head).unwrap();
    assert_eq!(ledger.mempool_len().unwrap(), 0);

    let harder = child_of(&genesis, 6, vec![]);
    assert_eq!(
        ledger.add_block(harder.clone()).unwrap(),
        BlockOutcome::Replaced
    );

    let state = ledger.read().unwrap();
    assert_eq!(state.chain.get_last_block(), Some(&harder));
    for tx in &txs {
        assert_eq!(state.mempool.get_transaction(&tx.hash()).unwrap(), *tx);
    }
}

#[test]
fn test_mempool_round_trip() {
    let pkcs8 = new_key_pair().unwrap();
    let tx = transfer(&pkcs8, 10, 7, 0);
    let mut pool = MemPool::new();

    pool.add_transaction(tx.clone());
    assert_eq!(pool.get_transaction(&tx.hash()).unwrap(), tx);
    pool.remove_transaction(&tx.hash()).unwrap();
    assert!(matches!(
        pool.get_transaction(&tx.hash()),
        Err(BlockchainError::TransactionNotFound(_))
    ));
}

#[test]
fn test_miner_orders_by_fee_drains_and_extends_the_chain() {
    let pkcs8 = new_key_pair().unwrap();
    let ledger = genesis_ledger();
    let fees = [5u64, 1, 3];
    for fee in fees {
        ledger
            .submit_transaction(transfer(&pkcs8, 100, 100 - fee, 0))
            .unwrap();
    }

    let sink = ledger.clone();
    let outcomes = Arc::new(Mutex::new(vec![]));
    let seen = Arc::clone(&outcomes);
    let miner = Miner::new(
        ledger.clone(),
        Arc::new(FixedClock::new(1_000)),
        Box::new(move |block: Block| seen.lock().unwrap().push(sink.add_block(block))),
        b"miner",
        null_telemetry(),
    );

    let block = miner.mine().unwrap();
    let included: Vec<u64> = block
        .get_transactions()
        .iter()
        .filter(|tx| !tx.is_coinbase())
        .map(Transaction::fee_earnings)
        .collect();

    assert_eq!(included, vec![5, 3, 1]);
    assert!(block.get_transactions().last().unwrap().is_coinbase());
    assert!(ProofOfWork::validate(&block));
    assert_eq!(ledger.mempool_len().unwrap(), 0);
    assert_eq!(ledger.chain_size().unwrap(), 2);
    assert_eq!(
        outcomes.lock().unwrap().as_slice(),
        &[Ok(BlockOutcome::Extended)]
    );
}

#[test]
fn test_locktime_holds_transaction_until_its_time() {
    let pkcs8 = new_key_pair().unwrap();
    let ledger = genesis_ledger();
    let locked = transfer(&pkcs8, 100, 50, 10_000);
    ledger.submit_transaction(locked.clone()).unwrap();

    let clock = Arc::new(FixedClock::new(1_000));
    let sink = ledger.clone();
    let miner = Miner::new(
        ledger.clone(),
        clock.clone(),
        Box::new(move |block: Block| {
            sink.add_block(block).unwrap();
        }),
        b"miner",
        null_telemetry(),
    );

    let early = miner.mine().unwrap();
    assert!(!early.get_transactions().contains(&locked));
    assert_eq!(ledger.mempool_len().unwrap(), 1);

    clock.set(70_000);
    let later = miner.mine().unwrap();
    assert!(later.get_transactions().contains(&locked));
    assert_eq!(ledger.mempool_len().unwrap(), 0);
}

#[test]
fn test_equal_difficulty_tie_resolved_by_first_descendant() {
    let ledger = genesis_ledger();
    let genesis = ledger.read().unwrap().chain.get_last_block().unwrap().clone();

    let head = child_of(&genesis, 5, vec![]);
    ledger.add_block(head.clone()).unwrap();

    let mut rival = Block::new(genesis.hash(), 1, 5, 61_000);
    rival
        .add_transaction(Transaction::new_coinbase(1, b"rival", 61_000))
        .unwrap();
    rival.finalize();
    assert_eq!(
        ledger.add_block(rival.clone()).unwrap(),
        BlockOutcome::Orphaned
    );

    let descendant = child_of(&rival, 5, vec![]);
    assert_eq!(
        ledger.add_block(descendant.clone()).unwrap(),
        BlockOutcome::Reorganized
    );

    let state = ledger.read().unwrap();
    assert_eq!(state.chain.block_at(1), Some(&rival));
    assert_eq!(state.chain.get_last_block(), Some(&descendant));
    assert!(state.chain.is_valid());
}

#[test]
fn test_chain_survives_a_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("chain");

    let ledger = genesis_ledger();
    let sink = ledger.clone();
    let miner = Miner::new(
        ledger.clone(),
        Arc::new(FixedClock::new(1_000)),
        Box::new(move |block: Block| {
            sink.add_block(block).unwrap();
        }),
        b"miner",
        null_telemetry(),
    );
    miner.mine().unwrap();
    miner.mine().unwrap();

    {
        let store = ChainStore::open(&db_path).unwrap();
        store.save_chain(&ledger.read().unwrap().chain).unwrap();
    }

    let store = ChainStore::open(&db_path).unwrap();
    let loaded = store.load_chain(null_telemetry()).unwrap();
    assert_eq!(loaded.size(), 3);
    assert_eq!(loaded.blocks(), ledger.read().unwrap().chain.blocks());

    // The reloaded chain keeps accepting blocks
    let reopened = SharedLedger::new(Ledger::new(loaded, MemPool::new()));
    let tip = reopened.read().unwrap().chain.get_last_block().unwrap().clone();
    assert_eq!(
        reopened.add_block(child_of(&tip, tip.get_difficulty(), vec![])).unwrap(),
        BlockOutcome::Extended
    );
}
