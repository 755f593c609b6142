//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the engine (clock, randomness, storage) has
//! a test-friendly implementation here that:
//! - Returns deterministic values
//! - Can be controlled programmatically
//! - Never touches the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod random;
pub mod store;

pub use clock::NullClock;
pub use random::NullRandom;
pub use store::NullStore;
