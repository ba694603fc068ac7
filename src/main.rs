// Entry point for the node CLI
// Every command opens the sled store from the configured data directory,
// does its work on an in-memory chain, and writes the chain back if it changed.
use clap::Parser;
use log::{error, LevelFilter};
use skynet_chain::cli::BlockSummary;
use skynet_chain::core::{Block, Chain, Ledger, Miner, SharedLedger};
use skynet_chain::storage::{ChainStore, MemPool};
use skynet_chain::telemetry::log_telemetry;
use skynet_chain::utils::{
    base58_encode, current_timestamp, new_key_pair, public_key_from_pkcs8, SystemClock,
};
use skynet_chain::{Command, Config, Opt};
use std::fs;
use std::process;
use std::str::FromStr;
use std::sync::Arc;

fn main() {
    let opt = Opt::parse();

    // Logging is configured from the file, so the config has to load first
    let config = match Config::load(&opt.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let level = LevelFilter::from_str(&config.node.log_level).unwrap_or(LevelFilter::Info);
    env_logger::builder().filter_level(level).init();

    if let Err(e) = run_command(opt.command, &config) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Createchain => {
            let store = ChainStore::open(config.chain_db_path())?;
            if store.has_chain()? {
                return Err(format!(
                    "A chain already exists at {}",
                    store.get_path().display()
                )
                .into());
            }

            let mut chain = Chain::new(log_telemetry());
            let mut mempool = MemPool::new();
            chain.add_block(Block::genesis(current_timestamp()?), &mut mempool)?;
            store.save_chain(&chain)?;
            println!("Done!");
        }
        Command::Keygen { out } => {
            let pkcs8 = new_key_pair()?;
            fs::write(&out, &pkcs8)?;
            let public_key = public_key_from_pkcs8(&pkcs8)?;
            println!("Your new public key: {}", base58_encode(&public_key));
        }
        Command::Mine { rounds, key } => {
            if !config.mining.enabled {
                return Err("Mining is disabled in the configuration".into());
            }
            let key_file = key
                .or_else(|| config.mining.reward_key_file.clone())
                .ok_or("No reward key: pass --key or set mining.reward_key_file")?;
            let reward_key = public_key_from_pkcs8(&fs::read(&key_file)?)?;

            let store = ChainStore::open(config.chain_db_path())?;
            let telemetry = log_telemetry();
            let chain = store.load_chain(telemetry.clone())?;
            let ledger = SharedLedger::new(Ledger::new(chain, MemPool::new()));

            // Without a network nothing feeds the pool, and the broadcast goes
            // straight back into the local ledger
            let sink = ledger.clone();
            let broadcast = Box::new(move |block: Block| {
                if let Err(e) = sink.add_block(block) {
                    error!("Mined block was rejected: {e}");
                }
            });
            let miner = Miner::new(
                ledger.clone(),
                Arc::new(SystemClock),
                broadcast,
                &reward_key,
                telemetry,
            );

            for _ in 0..rounds.unwrap_or(config.mining.rounds) {
                miner.mine()?;
            }

            store.save_chain(&ledger.read()?.chain)?;
            println!("Done! The chain now holds {} blocks", ledger.chain_size()?);
        }
        Command::Printchain { json } => {
            let store = ChainStore::open(config.chain_db_path())?;
            let chain = store.load_chain(log_telemetry())?;
            // Newest first
            let summaries: Vec<BlockSummary> = chain
                .blocks()
                .iter()
                .rev()
                .map(BlockSummary::from_block)
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
                return Ok(());
            }

            for block in summaries {
                println!("Height: {}", block.height);
                println!("Pre block hash: {}", block.prev_hash);
                println!("Cur block hash: {}", block.hash);
                println!("Merkle root: {}", block.merkle_root);
                println!("Timestamp: {}", block.timestamp);
                println!("Difficulty: {}, nonce: {}", block.difficulty, block.nonce);
                for tx in block.transactions {
                    println!("- Transaction txid_hex: {}", tx.id);
                    if !tx.coinbase {
                        println!("-- Input from = {}, fee = {}", tx.sender, tx.fee);
                    }
                    println!("-- Output value = {}, to = {}", tx.value, tx.recipient);
                }
                println!()
            }
        }
    }
    Ok(())
}
