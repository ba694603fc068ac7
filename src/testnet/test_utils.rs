//! Test utilities for chain testing

use crate::core::{Block, Chain, Transaction, TxInput, TxOutput};
use crate::error::Result;
use crate::storage::ChainStore;
use crate::telemetry::{ChainEvent, Telemetry};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Telemetry sink that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<ChainEvent>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<ChainEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, event: &ChainEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Create a temporary directory for testing
pub fn create_temp_dir() -> Result<TempDir> {
    tempfile::tempdir().map_err(|e| crate::error::BlockchainError::Io(e.to_string()))
}

/// Open a chain store in a fresh temporary directory
pub fn create_test_store() -> Result<(ChainStore, TempDir)> {
    let temp_dir = create_temp_dir()?;
    let store = ChainStore::open(temp_dir.path().join("test_chain"))?;
    Ok((store, temp_dir))
}

/// A signed transfer paying `fee = input_value - output_value`
pub fn signed_transfer(
    pkcs8: &[u8],
    input_value: u64,
    output_value: u64,
    locktime: i64,
) -> Transaction {
    Transaction::new_transfer(
        TxInput::new([7u8; 32], 0, input_value),
        TxOutput::new(output_value, b"recipient"),
        0,
        locktime,
        pkcs8,
    )
    .expect("test transfer should be valid")
}

/// A finalized block on top of `parent` holding `transactions` and a coinbase
pub fn block_on(parent: &Block, difficulty: u32, transactions: Vec<Transaction>) -> Block {
    let height = parent.get_height() + 1;
    let timestamp = parent.get_timestamp() + 60_000;
    let mut block = Block::new(parent.hash(), height, difficulty, timestamp);

    for tx in transactions {
        block.add_transaction(tx).expect("test block has room");
    }
    block
        .add_transaction(Transaction::new_coinbase(height, b"miner", timestamp))
        .expect("test block has room");
    block.finalize();
    block
}

/// A chain holding only a genesis block, with its recording telemetry
pub fn genesis_chain(timestamp: i64) -> (Chain, Arc<RecordingTelemetry>) {
    let recorder = Arc::new(RecordingTelemetry::default());
    let mut chain = Chain::new(recorder.clone());
    let mut pool = crate::storage::MemPool::new();
    chain
        .add_block(Block::genesis(timestamp), &mut pool)
        .expect("genesis should be accepted");
    (chain, recorder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::new_key_pair;

    #[test]
    fn test_block_on_links_to_parent() {
        let genesis = Block::genesis(0);
        let child = block_on(&genesis, 5, vec![]);

        assert_eq!(child.get_prev_hash(), &genesis.hash());
        assert_eq!(child.get_height(), 1);
        assert!(child.has_valid_content());
    }

    #[test]
    fn test_signed_transfer_fee() {
        let pkcs8 = new_key_pair().unwrap();
        assert_eq!(signed_transfer(&pkcs8, 10, 4, 0).fee_earnings(), 6);
    }

    #[test]
    fn test_genesis_chain_records_genesis() {
        let (chain, recorder) = genesis_chain(0);
        assert_eq!(chain.size(), 1);
        assert!(matches!(
            recorder.events().as_slice(),
            [ChainEvent::GenesisAccepted { .. }]
        ));
    }
}
