//! Fundamental types for the drawpool reward engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! user identifiers, amounts, timestamps, risk levels and engine parameters.

pub mod amount;
pub mod error;
pub mod params;
pub mod risk;
pub mod time;
pub mod user;

pub use amount::{Amount, AMOUNT_UNIT};
pub use error::TypeError;
pub use params::{EngineParams, RiskParams, RiskTable};
pub use risk::RiskLevel;
pub use time::Timestamp;
pub use user::UserId;

/// Sequential epoch identifier. Epoch 1 is opened at genesis.
pub type EpochNumber = u64;

/// A ratio on the 10,000 scale: 10_000 = 100%.
pub type BasisPoints = u32;

/// Denominator for every basis-point quantity (probabilities, multipliers).
pub const BASIS_POINTS: u128 = 10_000;

/// Hard ceiling on any user's win probability, in basis points (50%).
pub const MAX_PROBABILITY_BPS: BasisPoints = 5_000;

/// Scale that converts a total weight into basis points of win probability.
pub const WEIGHT_SCALE: u128 = 1_000_000_000_000_000_000;

/// Number of epochs between a deposit and the epoch it grants eligibility for.
pub const ELIGIBILITY_LAG: u64 = 2;
