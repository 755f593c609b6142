//! Randomness for reward draws.
//!
//! The engine consumes randomness through [`RandomnessSource`] and treats every
//! failure as fatal to the claim in progress. Implementations:
//! - [`HashChainSource`]: deterministic SHA-256 chain keyed by an operator seed
//! - `NullRandom` in `drawpool-nullables`: scripted values for tests

pub mod error;
pub mod hash_chain;

pub use error::RandomError;
pub use hash_chain::HashChainSource;

use serde::{Deserialize, Serialize};

/// A single synchronous source of draw randomness.
pub trait RandomnessSource: Send + Sync {
    /// Produce a fresh random value bound to `context` (e.g. user id + epoch).
    fn draw(&self, context: &[u8]) -> Result<RandomOutput, RandomError>;

    /// Human-readable name of this source.
    fn name(&self) -> &str;
}

/// The output of one draw.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomOutput {
    /// The random bytes, read as a big-endian 256-bit integer.
    pub value: [u8; 32],
    /// Sequence number of the draw within its source.
    pub round: u64,
}

impl RandomOutput {
    /// Exact `value mod modulus` of the 256-bit big-endian value.
    ///
    /// Returns 0 for a zero modulus.
    pub fn reduce(&self, modulus: u64) -> u64 {
        if modulus == 0 {
            return 0;
        }
        let m = modulus as u128;
        let rem = self
            .value
            .iter()
            .fold(0u128, |acc, &b| (acc * 256 + b as u128) % m);
        rem as u64
    }
}
