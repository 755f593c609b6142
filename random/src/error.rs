use thiserror::Error;

#[derive(Debug, Error)]
pub enum RandomError {
    #[error("randomness source unavailable: {0}")]
    Unavailable(String),

    #[error("invalid seed: {0}")]
    InvalidSeed(String),
}
