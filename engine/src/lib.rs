//! Epoch-based randomized yield distribution.
//!
//! Depositors accrue time-weighted balance over discrete epochs. Each deposit
//! pre-registers the depositor for the draw two epochs ahead; once that epoch
//! closes, the depositor may claim exactly once and win a risk-weighted share
//! of that epoch's yield pool.
//!
//! This crate handles:
//! - Epoch lifecycle (scheduled and manual advance, finalization)
//! - Deposit/withdrawal recording with lazy time-weight accrual
//! - Reward weight, win probability and payout computation
//! - Claim resolution against a depletable pool, at most once per user per epoch
//!
//! Token custody stays with the vault; the engine only reports amounts.

pub mod claim;
pub mod config;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod ledger;
pub mod math;
pub mod reward;
pub mod shared;
pub mod state;

pub use claim::ClaimOutcome;
pub use config::EngineConfig;
pub use engine::{EpochStatus, UserSnapshot, YieldEngine};
pub use epoch::{EpochManager, EpochTransition};
pub use error::EngineError;
pub use ledger::{DepositReceipt, UserLedger};
pub use reward::RewardCalculation;
pub use shared::SharedEngine;
pub use state::{Epoch, EpochPhase, PoolTotals, UserPosition};
