use crate::core::Block;
use crate::error::{BlockchainError, Result};
use log::debug;

// Difficulty adjustment constants
const TARGET_BLOCK_TIME: i64 = 60_000; // 1 minute in milliseconds
const INITIAL_DIFFICULTY: u32 = 5; // Genesis difficulty
const MIN_DIFFICULTY: u32 = 1; // Minimum difficulty
const MAX_DIFFICULTY: u32 = 32; // Maximum difficulty

/// Per-block difficulty retargeting
///
/// The next block is one step harder when the head arrived in under half the
/// target block time, and one step easier when it took more than twice as long.
pub struct DifficultyAdjustment;

impl DifficultyAdjustment {
    /// Difficulty for a block built on `head` at time `now` (ms)
    pub fn next_difficulty(head: &Block, now: i64) -> u32 {
        let elapsed = now.saturating_sub(head.get_timestamp());
        let new_difficulty = Self::adjust_difficulty(head.get_difficulty(), elapsed);

        if new_difficulty != head.get_difficulty() {
            debug!(
                "Difficulty at height {}: {} -> {} ({elapsed}ms since head)",
                head.get_height() + 1,
                head.get_difficulty(),
                new_difficulty
            );
        }
        new_difficulty
    }

    fn adjust_difficulty(current_difficulty: u32, elapsed: i64) -> u32 {
        let new_difficulty = if elapsed < TARGET_BLOCK_TIME / 2 {
            current_difficulty.saturating_add(1)
        } else if elapsed > TARGET_BLOCK_TIME * 2 {
            current_difficulty.saturating_sub(1)
        } else {
            current_difficulty
        };

        new_difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    }

    /// Get the initial difficulty for genesis block
    pub fn get_initial_difficulty() -> u32 {
        INITIAL_DIFFICULTY
    }

    /// Get the target block time in milliseconds
    pub fn get_target_block_time() -> i64 {
        TARGET_BLOCK_TIME
    }

    /// Validate that a difficulty value is within acceptable bounds
    pub fn validate_difficulty(difficulty: u32) -> Result<()> {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
            return Err(BlockchainError::InvalidBlock(format!(
                "Difficulty {difficulty} is outside valid range [{MIN_DIFFICULTY}, {MAX_DIFFICULTY}]"
            )));
        }
        Ok(())
    }
}
