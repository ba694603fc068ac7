use crate::core::{Block, BlockHeader};
use crate::utils::{sha256_digest, Hash};
use num_bigint::{BigInt, Sign};
use std::borrow::Borrow;
use std::ops::ShlAssign;

/// Nonces tried between two cancellation checks
const CANCEL_CHECK_INTERVAL: u64 = 1024;

const MAX_NONCE: u64 = u64::MAX;

/// Nonce search over a block header
///
/// A header hash wins when, read as a big-endian integer, it is below
/// `2^(256 - difficulty)`. The chain itself never checks this; the search
/// only gives mined blocks a realistic cost.
pub struct ProofOfWork {
    header: BlockHeader,
    target: BigInt,
}

impl ProofOfWork {
    pub fn new_proof_of_work(block: &Block) -> ProofOfWork {
        let difficulty = block.get_difficulty().min(255);
        let mut target = BigInt::from(1);
        target.shl_assign(256 - difficulty);
        ProofOfWork {
            header: block.get_header().clone(),
            target,
        }
    }

    /// Validate proof-of-work for a block
    pub fn validate(block: &Block) -> bool {
        let pow = ProofOfWork::new_proof_of_work(block);
        pow.meets_target(&pow.hash_with_nonce(block.get_nonce()))
    }

    fn hash_with_nonce(&self, nonce: u64) -> Hash {
        sha256_digest(&self.header.to_bytes_with_nonce(nonce))
    }

    fn meets_target(&self, hash: &Hash) -> bool {
        let hash_int = BigInt::from_bytes_be(Sign::Plus, hash);
        hash_int.lt(self.target.borrow())
    }

    /// Search for a winning nonce, polling `cancelled` every few thousand tries.
    /// Returns `None` when cancelled or the nonce space is exhausted.
    pub fn run(&self, cancelled: &dyn Fn() -> bool) -> Option<(u64, Hash)> {
        let mut nonce = 0;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
                return None;
            }

            let hash = self.hash_with_nonce(nonce);
            if self.meets_target(&hash) {
                return Some((nonce, hash));
            }

            if nonce == MAX_NONCE {
                return None;
            }
            nonce += 1;
        }
    }
}
