use crate::core::Block;
use crate::utils::base58_encode;
use clap::{Parser, Subcommand};
use data_encoding::HEXLOWER;
use serde::Serialize;
use std::path::PathBuf;

// The node has no transaction intake, so a local run only mines coinbase blocks
const MINE_ABOUT: &str = "Mine coinbase-only blocks onto the stored chain";

#[derive(Debug, Parser)]
#[command(name = "skynet-chain")]
pub struct Opt {
    #[arg(
        long = "config",
        default_value = "skynet.toml",
        help = "Path to the TOML configuration file"
    )]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createchain", about = "Create a new chain holding only the genesis block")]
    Createchain,
    #[command(name = "keygen", about = "Generate a PKCS#8 key pair file")]
    Keygen {
        #[arg(help = "Where to write the key file")]
        out: PathBuf,
    },
    #[command(name = "mine", about = MINE_ABOUT)]
    Mine {
        #[arg(long = "rounds", help = "Number of blocks to mine (defaults to mining.rounds)")]
        rounds: Option<u32>,
        #[arg(
            long = "key",
            help = "Key file receiving the rewards (defaults to mining.reward_key_file)"
        )]
        key: Option<PathBuf>,
    },
    #[command(name = "printchain", about = "Print all blocks in the chain")]
    Printchain {
        #[arg(long = "json", help = "Print as JSON")]
        json: bool,
    },
}

/// Display form of one transaction
#[derive(Debug, Serialize)]
pub struct TransactionSummary {
    pub id: String,
    pub coinbase: bool,
    pub sender: String,
    pub recipient: String,
    pub value: u64,
    pub fee: u64,
    pub locktime: i64,
}

/// Display form of one block
#[derive(Debug, Serialize)]
pub struct BlockSummary {
    pub height: u64,
    pub hash: String,
    pub prev_hash: String,
    pub merkle_root: String,
    pub timestamp: i64,
    pub difficulty: u32,
    pub nonce: u64,
    pub transactions: Vec<TransactionSummary>,
}

impl BlockSummary {
    pub fn from_block(block: &Block) -> BlockSummary {
        let transactions = block
            .get_transactions()
            .iter()
            .map(|tx| TransactionSummary {
                id: tx.id_hex(),
                coinbase: tx.is_coinbase(),
                sender: base58_encode(tx.get_input().get_sender()),
                recipient: base58_encode(tx.get_output().get_recipient()),
                value: tx.get_output().get_value(),
                fee: tx.fee_earnings(),
                locktime: tx.get_locktime(),
            })
            .collect();

        BlockSummary {
            height: block.get_height(),
            hash: block.hash_hex(),
            prev_hash: HEXLOWER.encode(block.get_prev_hash()),
            merkle_root: HEXLOWER.encode(block.get_merkle_root()),
            timestamp: block.get_timestamp(),
            difficulty: block.get_difficulty(),
            nonce: block.get_nonce(),
            transactions,
        }
    }
}
