//! Errors raised while constructing or parsing shared types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown risk level: {0}")]
    UnknownRiskLevel(String),

    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),
}
