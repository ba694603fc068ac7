//! Consensus constants of the Skynet chain
//!
//! Amounts are integers in base units. One coin is 100,000,000 units and the
//! block subsidy halves every [`SUBSIDY_HALVING_INTERVAL`] blocks.

/// Protocol version stamped into every block header and transaction
pub const PROTOCOL_VERSION: u32 = 1;

/// Number of base units in one coin
pub const COIN: u64 = 100_000_000;

/// Subsidy of the first halving era, in coins
pub const INITIAL_SUBSIDY: u64 = 50;

/// Blocks between subsidy halvings
pub const SUBSIDY_HALVING_INTERVAL: u64 = 2016;

/// Largest amount, in coins, a single transaction may move
pub const MAX_COIN_TRANSFER: u64 = 21_000_000;

/// Largest amount, in base units, any input or output may carry
pub const MAX_MONEY: u64 = MAX_COIN_TRANSFER * COIN;

/// Maximum number of transactions in a block, coinbase included
pub const MAX_TRANSACTIONS_PER_BLOCK: usize = 6000;

/// Block subsidy, in base units, for a block at `height`
pub fn block_subsidy(height: u64) -> u64 {
    let halvings = height / SUBSIDY_HALVING_INTERVAL;
    if halvings >= 64 {
        return 0;
    }
    (INITIAL_SUBSIDY * COIN) >> halvings
}

/// Utility functions for monetary conversions
pub mod conversions {
    use super::*;

    /// Convert base units to coins, for display only
    ///
    /// # Examples
    /// ```
    /// use skynet_chain::core::monetary::conversions::units_to_coins;
    /// assert_eq!(units_to_coins(100_000_000), 1.0);
    /// assert_eq!(units_to_coins(50_000_000), 0.5);
    /// ```
    pub fn units_to_coins(units: u64) -> f64 {
        units as f64 / COIN as f64
    }
}
