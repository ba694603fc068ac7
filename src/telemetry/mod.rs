//! Injected telemetry
//!
//! The chain and the miner report what they do as [`ChainEvent`]s through a
//! [`Telemetry`] handle passed in at construction. The binary wires
//! [`LogTelemetry`]; tests use a recording sink or [`NullTelemetry`].

use crate::utils::Hash;
use data_encoding::HEXLOWER;
use log::{debug, info, warn};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    GenesisAccepted { hash: Hash },
    BlockAppended { height: u64, hash: Hash },
    /// The head was displaced by a competing block at the same height
    HeadReplaced { height: u64, old: Hash, new: Hash },
    OrphanFiled { height: u64, hash: Hash },
    /// The branch rooted at an orphan won by gaining the first descendant
    Reorganized { height: u64, orphan: Hash, tip: Hash },
    OrphansPruned { count: usize },
    TransactionsRequeued { count: usize },
    BlockRejected { height: u64, reason: String },
    BlockMined { height: u64, hash: Hash, transactions: usize },
    MiningAbandoned { height: u64, reason: String },
}

/// Sink for chain events
pub trait Telemetry: Send + Sync {
    fn record(&self, event: &ChainEvent);
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn record(&self, event: &ChainEvent) {
        match event {
            ChainEvent::GenesisAccepted { hash } => {
                info!("Genesis block accepted: {}", HEXLOWER.encode(hash))
            }
            ChainEvent::BlockAppended { height, hash } => {
                info!("Block {} appended at height {height}", HEXLOWER.encode(hash))
            }
            ChainEvent::HeadReplaced { height, old, new } => info!(
                "Fork at height {height}: {} replaced by {}",
                HEXLOWER.encode(old),
                HEXLOWER.encode(new)
            ),
            ChainEvent::OrphanFiled { height, hash } => {
                info!("Block {} filed as orphan at height {height}", HEXLOWER.encode(hash))
            }
            ChainEvent::Reorganized {
                height,
                orphan,
                tip,
            } => info!(
                "Orphan {} adopted at height {height}, new tip {}",
                HEXLOWER.encode(orphan),
                HEXLOWER.encode(tip)
            ),
            ChainEvent::OrphansPruned { count } => debug!("Pruned {count} stale orphans"),
            ChainEvent::TransactionsRequeued { count } => {
                info!("Returned {count} transactions to the mempool")
            }
            ChainEvent::BlockRejected { height, reason } => {
                warn!("Rejected block at height {height}: {reason}")
            }
            ChainEvent::BlockMined {
                height,
                hash,
                transactions,
            } => info!(
                "Mined block {} at height {height} with {transactions} transactions",
                HEXLOWER.encode(hash)
            ),
            ChainEvent::MiningAbandoned { height, reason } => {
                warn!("Abandoned mining at height {height}: {reason}")
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn record(&self, _event: &ChainEvent) {}
}

pub fn log_telemetry() -> Arc<dyn Telemetry> {
    Arc::new(LogTelemetry)
}

pub fn null_telemetry() -> Arc<dyn Telemetry> {
    Arc::new(NullTelemetry)
}
