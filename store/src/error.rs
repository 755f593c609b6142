use thiserror::Error;

/// Failures surfaced by a [`crate::LedgerStore`] or while decoding its records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record the ledger cannot start without is absent.
    #[error("ledger record missing: {0}")]
    NotFound(String),

    #[error("ledger backend failure: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("ledger record encoding: {0}")]
    Serialization(String),

    /// Records decode but contradict each other.
    #[error("inconsistent ledger: {0}")]
    Corruption(String),
}
