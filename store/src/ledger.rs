use crate::StoreError;
use drawpool_types::{EpochNumber, UserId};

/// Store trait for persisting the reward ledger to durable storage.
///
/// Uses opaque `Vec<u8>` so the store doesn't depend on `drawpool-engine`.
/// The engine serializes and deserializes its own records.
///
/// Epoch records are append-only: the engine never deletes one.
pub trait LedgerStore {
    fn put_epoch(&self, epoch: EpochNumber, record: &[u8]) -> Result<(), StoreError>;
    /// All epoch records, in ascending epoch order.
    fn iter_epochs(&self) -> Result<Vec<(EpochNumber, Vec<u8>)>, StoreError>;

    fn put_position(&self, user: &UserId, position: &[u8]) -> Result<(), StoreError>;
    fn iter_positions(&self) -> Result<Vec<(UserId, Vec<u8>)>, StoreError>;

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
}
