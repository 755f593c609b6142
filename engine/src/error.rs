//! Engine errors. Every variant is a synchronous rejection that leaves the
//! ledger unchanged.

use drawpool_random::RandomError;
use drawpool_store::StoreError;
use drawpool_types::{EpochNumber, TypeError, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("epoch {epoch} is not completed (current epoch is {current})")]
    EpochNotCompleted {
        epoch: EpochNumber,
        current: EpochNumber,
    },

    #[error("not eligible for epoch {epoch}: {reason}")]
    NotEligible { epoch: EpochNumber, reason: String },

    #[error("epoch {epoch} already claimed")]
    AlreadyClaimed { epoch: EpochNumber },

    #[error("randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    #[error("unknown user {0}")]
    UnknownUser(UserId),

    #[error("arithmetic overflow in reward computation")]
    Overflow,

    #[error("engine is busy with another transaction")]
    Reentrant,

    #[error("engine state poisoned by a panicked transaction")]
    Poisoned,

    #[error("storage error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<RandomError> for EngineError {
    fn from(e: RandomError) -> Self {
        EngineError::RandomnessUnavailable(e.to_string())
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e.to_string())
    }
}

impl From<TypeError> for EngineError {
    fn from(e: TypeError) -> Self {
        EngineError::InvalidArgument(e.to_string())
    }
}
