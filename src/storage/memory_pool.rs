use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::utils::Hash;
use data_encoding::HEXLOWER;
use std::collections::{BTreeMap, HashMap};

/// Pending transactions in arrival order, at most one per id
///
/// Entries are keyed by an arrival sequence number, with an id index beside
/// them, so lookups and removals never rehash pooled transactions.
/// The pool holds no lock of its own; it lives beside the chain inside a
/// [`crate::core::Ledger`] and is guarded by the ledger's lock.
#[derive(Debug, Default, Clone)]
pub struct MemPool {
    entries: BTreeMap<u64, Transaction>, // arrival sequence -> transaction
    index: HashMap<Hash, u64>,           // id -> arrival sequence
    next_seq: u64,
}

impl MemPool {
    pub fn new() -> MemPool {
        MemPool::default()
    }

    /// Append `tx`. A transaction whose id is already pooled is ignored and
    /// `false` is returned.
    pub fn add_transaction(&mut self, tx: Transaction) -> bool {
        let id = tx.hash();
        if self.index.contains_key(&id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(id, seq);
        self.entries.insert(seq, tx);
        true
    }

    /// Validate `tx` and pool it. An invalid transaction leaves the pool untouched.
    pub fn submit(&mut self, tx: Transaction) -> Result<bool> {
        tx.validate()?;
        if tx.is_coinbase() {
            return Err(BlockchainError::InvalidTransaction(
                "coinbase transactions cannot be submitted".to_string(),
            ));
        }
        Ok(self.add_transaction(tx))
    }

    /// Remove the entry with `txid`, failing when it is not pooled
    pub fn remove_transaction(&mut self, txid: &Hash) -> Result<Transaction> {
        self.discard(txid)
            .ok_or_else(|| BlockchainError::TransactionNotFound(HEXLOWER.encode(txid)))
    }

    /// Remove the entry with `txid` if present
    pub fn discard(&mut self, txid: &Hash) -> Option<Transaction> {
        let seq = self.index.remove(txid)?;
        self.entries.remove(&seq)
    }

    pub fn get_transaction(&self, txid: &Hash) -> Result<Transaction> {
        self.index
            .get(txid)
            .and_then(|seq| self.entries.get(seq))
            .cloned()
            .ok_or_else(|| BlockchainError::TransactionNotFound(HEXLOWER.encode(txid)))
    }

    pub fn contains(&self, txid: &Hash) -> bool {
        self.index.contains_key(txid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.values()
    }

    /// Snapshot of every pooled transaction in arrival order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.entries.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}
