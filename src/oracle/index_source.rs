use rand::Rng;
use rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::ledger::{AccountId, BlockContext};

/// Source of pseudo-random oracle indexes.
///
/// Index draws only need to spread oracles across the index space; they carry no security
/// weight, so implementations are free to be deterministic.
#[cfg_attr(test, mockall::automock)]
pub trait IndexSource: Send {
    /// Draw an index in `0..index_space` for `caller` during `block`
    fn draw(&mut self, caller: &AccountId, block: &BlockContext, index_space: u8) -> u8;
}

/// Seedable ChaCha-backed source; reproducible when seeded
pub struct ChaChaIndexSource {
    rng: ChaCha20Rng,
}

impl ChaChaIndexSource {
    pub fn from_seed(seed: u64) -> Self {
        ChaChaIndexSource {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl IndexSource for ChaChaIndexSource {
    fn draw(&mut self, _caller: &AccountId, _block: &BlockContext, index_space: u8) -> u8 {
        if index_space == 0 {
            return 0;
        }
        self.rng.gen_range(0..index_space)
    }
}

/// Derives indexes by hashing the caller with the block context and a running nonce,
/// the way an on-chain contract would. Needs no state beyond the nonce, so it survives
/// process restarts.
#[derive(Debug, Default)]
pub struct ChainHashIndexSource {
    nonce: u64,
}

impl ChainHashIndexSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexSource for ChainHashIndexSource {
    fn draw(&mut self, caller: &AccountId, block: &BlockContext, index_space: u8) -> u8 {
        if index_space == 0 {
            return 0;
        }
        let mut hasher = Sha256::new();
        hasher.update(caller.as_str().as_bytes());
        hasher.update(block.height.to_be_bytes());
        hasher.update(block.timestamp.to_be_bytes());
        hasher.update(self.nonce.to_be_bytes());
        self.nonce = self.nonce.wrapping_add(1);

        let digest = hasher.finalize();
        let word = u64::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]);
        (word % index_space as u64) as u8
    }
}

/// Draw `count` distinct indexes. Collisions probe forward to the next free slot, so this
/// terminates for any source as long as `count <= index_space`.
pub fn draw_distinct(
    source: &mut dyn IndexSource,
    caller: &AccountId,
    block: &BlockContext,
    index_space: u8,
    count: usize,
) -> Vec<u8> {
    let count = count.min(index_space as usize);
    let mut indexes: Vec<u8> = Vec::with_capacity(count);
    while indexes.len() < count {
        let mut candidate = source.draw(caller, block, index_space) % index_space;
        while indexes.contains(&candidate) {
            candidate = ((candidate as u16 + 1) % index_space as u16) as u8;
        }
        indexes.push(candidate);
    }
    indexes
}
