//! Nullable randomness: scripted draws for testing.

use drawpool_random::{RandomError, RandomOutput, RandomnessSource};
use std::sync::Mutex;

/// A deterministic randomness source for testing.
///
/// Returns pre-configured values in order, cycling when exhausted. Can be
/// switched into a failing mode to exercise unavailable-oracle paths.
pub struct NullRandom {
    outputs: Mutex<Vec<[u8; 32]>>,
    index: Mutex<usize>,
    failing: Mutex<bool>,
}

impl NullRandom {
    /// Create with a sequence of deterministic random values.
    pub fn new(outputs: Vec<[u8; 32]>) -> Self {
        Self {
            outputs: Mutex::new(outputs),
            index: Mutex::new(0),
            failing: Mutex::new(false),
        }
    }

    /// Create returning the given rolls, each an integer below 2^64.
    pub fn rolls(values: &[u64]) -> Self {
        Self::new(values.iter().map(|&v| Self::value_of(v)).collect())
    }

    /// A source whose every draw fails.
    pub fn unavailable() -> Self {
        let source = Self::new(Vec::new());
        source.set_failing(true);
        source
    }

    /// Encode `v` as a big-endian 256-bit value.
    pub fn value_of(v: u64) -> [u8; 32] {
        let mut value = [0u8; 32];
        value[24..].copy_from_slice(&v.to_be_bytes());
        value
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Number of successful draws served.
    pub fn draws(&self) -> usize {
        *self.index.lock().unwrap()
    }
}

impl RandomnessSource for NullRandom {
    fn draw(&self, _context: &[u8]) -> Result<RandomOutput, RandomError> {
        if *self.failing.lock().unwrap() {
            return Err(RandomError::Unavailable("null-random set to fail".into()));
        }
        let outputs = self.outputs.lock().unwrap();
        if outputs.is_empty() {
            return Err(RandomError::Unavailable("no scripted outputs".into()));
        }
        let mut idx = self.index.lock().unwrap();
        let round = *idx;
        *idx += 1;
        Ok(RandomOutput {
            value: outputs[round % outputs.len()],
            round: round as u64,
        })
    }

    fn name(&self) -> &str {
        "null-random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_count_draws_while_values_cycle() {
        let source = NullRandom::rolls(&[1, 2]);
        let draws: Vec<RandomOutput> = (0..3).map(|_| source.draw(b"ctx").unwrap()).collect();
        assert_eq!(draws.iter().map(|d| d.round).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(draws[2].value, NullRandom::value_of(1));
        assert_eq!(source.draws(), 3);
    }

    #[test]
    fn failing_source_serves_nothing() {
        let source = NullRandom::unavailable();
        assert!(matches!(source.draw(b"ctx"), Err(RandomError::Unavailable(_))));
        assert_eq!(source.draws(), 0);
    }
}
