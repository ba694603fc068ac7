// Sled-backed persistence for the main chain.
// Blocks live in the `blocks` tree keyed by big-endian height, next to a
// `tip_height` entry. Loading replays every block through Chain::add_block.

use crate::core::{Block, Chain};
use crate::error::{BlockchainError, Result};
use crate::telemetry::Telemetry;
use log::info;
use sled::Db;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TIP_HEIGHT_KEY: &str = "tip_height";
const BLOCKS_TREE: &str = "blocks";

pub struct ChainStore {
    db: Db,
    path: PathBuf,
}

fn height_key(height: u64) -> Vec<u8> {
    height.to_be_bytes().to_vec()
}

impl ChainStore {
    pub fn open(path: impl AsRef<Path>) -> Result<ChainStore> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        Ok(ChainStore { db, path })
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    fn blocks_tree(&self) -> Result<sled::Tree> {
        self.db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))
    }

    /// Height of the stored head, or `None` for an empty store
    pub fn tip_height(&self) -> Result<Option<u64>> {
        let bytes = self
            .blocks_tree()?
            .get(TIP_HEIGHT_KEY)
            .map_err(|e| BlockchainError::Database(format!("Failed to get tip height: {e}")))?;

        match bytes {
            None => Ok(None),
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    BlockchainError::Database("Invalid tip height format".to_string())
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
        }
    }

    pub fn has_chain(&self) -> Result<bool> {
        Ok(self.tip_height()?.is_some())
    }

    /// Write the main chain atomically, replacing whatever was stored
    pub fn save_chain(&self, chain: &Chain) -> Result<()> {
        let blocks_tree = self.blocks_tree()?;
        let stored_tip = self.tip_height()?;

        let encoded = chain
            .blocks()
            .iter()
            .map(|block| Ok((block.get_height(), block.serialize()?)))
            .collect::<Result<Vec<(u64, Vec<u8>)>>>()?;
        let new_len = encoded.len() as u64;

        blocks_tree
            .transaction(|tx_db| {
                for (height, data) in &encoded {
                    tx_db.insert(height_key(*height), data.as_slice())?;
                }
                if let Some(old_tip) = stored_tip {
                    for height in new_len..=old_tip {
                        tx_db.remove(height_key(height))?;
                    }
                }
                match encoded.last() {
                    Some((height, _)) => {
                        tx_db.insert(TIP_HEIGHT_KEY, height_key(*height))?;
                    }
                    None => {
                        tx_db.remove(TIP_HEIGHT_KEY)?;
                    }
                }
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError| {
                BlockchainError::Database(format!("Failed to save chain: {e}"))
            })?;

        self.db.flush()?;
        info!("Saved {} blocks to {}", encoded.len(), self.path.display());
        Ok(())
    }

    /// Read the stored chain back, re-checking every chain rule on the way
    pub fn load_chain(&self, telemetry: Arc<dyn Telemetry>) -> Result<Chain> {
        let tip = match self.tip_height()? {
            Some(tip) => tip,
            None => return Ok(Chain::new(telemetry)),
        };

        let blocks_tree = self.blocks_tree()?;
        let mut blocks = Vec::new();
        for height in 0..=tip {
            let bytes = blocks_tree
                .get(height_key(height))
                .map_err(|e| BlockchainError::Database(format!("Failed to get block: {e}")))?
                .ok_or_else(|| {
                    BlockchainError::Database(format!("Missing stored block at height {height}"))
                })?;
            blocks.push(Block::deserialize(bytes.as_ref())?);
        }

        Chain::from_blocks(blocks, telemetry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemPool;
    use crate::telemetry::null_telemetry;
    use crate::testnet::test_utils::{block_on, create_test_store, genesis_chain};

    #[test]
    fn test_empty_store_loads_empty_chain() {
        let (store, _dir) = create_test_store().unwrap();

        assert!(!store.has_chain().unwrap());
        assert!(store.load_chain(null_telemetry()).unwrap().is_empty());
    }

    #[test]
    fn test_saved_chain_loads_identically() {
        let (store, _dir) = create_test_store().unwrap();
        let (mut chain, _) = genesis_chain(0);
        let mut pool = MemPool::new();
        let b1 = block_on(chain.get_last_block().unwrap(), 5, vec![]);
        chain.add_block(b1.clone(), &mut pool).unwrap();
        chain
            .add_block(block_on(&b1, 5, vec![]), &mut pool)
            .unwrap();

        store.save_chain(&chain).unwrap();
        assert_eq!(store.tip_height().unwrap(), Some(2));

        let loaded = store.load_chain(null_telemetry()).unwrap();
        assert_eq!(loaded.blocks(), chain.blocks());
        assert!(loaded.is_valid());
    }

    #[test]
    fn test_broken_link_is_refused_on_load() {
        let (store, _dir) = create_test_store().unwrap();
        let (chain, _) = genesis_chain(0);
        store.save_chain(&chain).unwrap();

        // Splice in a block that does not link to genesis
        let stray = block_on(&Block::genesis(12345), 5, vec![]);
        let tree = store.blocks_tree().unwrap();
        tree.insert(height_key(1), stray.serialize().unwrap()).unwrap();
        tree.insert(TIP_HEIGHT_KEY, height_key(1)).unwrap();

        assert!(matches!(
            store.load_chain(null_telemetry()),
            Err(BlockchainError::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_missing_block_is_reported() {
        let (store, _dir) = create_test_store().unwrap();
        let (chain, _) = genesis_chain(0);
        store.save_chain(&chain).unwrap();

        store
            .blocks_tree()
            .unwrap()
            .insert(TIP_HEIGHT_KEY, height_key(3))
            .unwrap();

        assert!(matches!(
            store.load_chain(null_telemetry()),
            Err(BlockchainError::Database(_))
        ));
    }
}
