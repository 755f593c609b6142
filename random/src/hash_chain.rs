//! Deterministic hash-chain randomness.
//!
//! Each draw is `SHA-256(seed || context || round)`. Given the seed, every
//! draw can be recomputed and audited after the fact; without it the outputs
//! are unpredictable. The seed must be kept secret until the draws it covers
//! are resolved.

use crate::{RandomError, RandomOutput, RandomnessSource};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// A seeded SHA-256 hash chain.
pub struct HashChainSource {
    seed: [u8; 32],
    round: AtomicU64,
}

impl HashChainSource {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            round: AtomicU64::new(0),
        }
    }

    /// Build from a 64-character hex seed.
    pub fn from_hex_seed(seed_hex: &str) -> Result<Self, RandomError> {
        let bytes = hex::decode(seed_hex.trim())
            .map_err(|e| RandomError::InvalidSeed(e.to_string()))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            RandomError::InvalidSeed(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self::new(seed))
    }

    /// Number of draws served so far.
    pub fn rounds(&self) -> u64 {
        self.round.load(Ordering::SeqCst)
    }

    /// Recompute the value a given round produced for `context`.
    pub fn value_at(&self, context: &[u8], round: u64) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(context);
        hasher.update(round.to_be_bytes());
        hasher.finalize().into()
    }
}

impl RandomnessSource for HashChainSource {
    fn draw(&self, context: &[u8]) -> Result<RandomOutput, RandomError> {
        let round = self.round.fetch_add(1, Ordering::SeqCst);
        let value = self.value_at(context, round);
        tracing::trace!(round, value = %hex::encode(value), "hash-chain draw");
        Ok(RandomOutput { value, round })
    }

    fn name(&self) -> &str {
        "hash-chain"
    }
}
