//! Nullable store: thread-safe in-memory ledger storage for testing.

use drawpool_store::{LedgerStore, StoreError};
use drawpool_types::{EpochNumber, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// An in-memory [`LedgerStore`].
///
/// Writes can be switched to fail, to exercise a backend that goes away
/// mid-save.
#[derive(Default)]
pub struct NullStore {
    epochs: Mutex<BTreeMap<EpochNumber, Vec<u8>>>,
    positions: Mutex<HashMap<UserId, Vec<u8>>>,
    meta: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    failing_writes: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch_count(&self) -> usize {
        self.epochs.lock().unwrap().len()
    }

    pub fn position_count(&self) -> usize {
        self.positions.lock().unwrap().len()
    }

    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null-store set to fail writes".into()));
        }
        Ok(())
    }
}

impl LedgerStore for NullStore {
    fn put_epoch(&self, epoch: EpochNumber, record: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.epochs.lock().unwrap().insert(epoch, record.to_vec());
        Ok(())
    }

    fn iter_epochs(&self) -> Result<Vec<(EpochNumber, Vec<u8>)>, StoreError> {
        Ok(self
            .epochs
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }

    fn put_position(&self, user: &UserId, position: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.positions
            .lock()
            .unwrap()
            .insert(user.clone(), position.to_vec());
        Ok(())
    }

    fn iter_positions(&self) -> Result<Vec<(UserId, Vec<u8>)>, StoreError> {
        Ok(self
            .positions
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().unwrap().get(key).cloned())
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.meta.lock().unwrap().insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}
