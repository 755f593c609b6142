//! Shared access to one engine from several callers.
//!
//! Each closure runs under a lock taken with `try_lock`. A call that arrives
//! while another closure is still running, including a nested call made from
//! inside one, is rejected with [`EngineError::Reentrant`] instead of waiting
//! or observing partial state.

use crate::engine::YieldEngine;
use crate::error::EngineError;
use std::sync::{Arc, Mutex, TryLockError};

#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<YieldEngine>>,
}

impl SharedEngine {
    pub fn new(engine: YieldEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` with exclusive access to the engine.
    ///
    /// Each engine call inside `f` commits or aborts on its own. A closure that
    /// makes two mutating calls keeps the first one's effects if the second
    /// fails; nothing is rolled back across calls.
    pub fn transact<T>(
        &self,
        f: impl FnOnce(&mut YieldEngine) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                tracing::warn!("rejected call into an in-flight transaction");
                return Err(EngineError::Reentrant);
            }
            Err(TryLockError::Poisoned(_)) => return Err(EngineError::Poisoned),
        };
        f(&mut *guard)
    }

    /// Run a read-only query.
    ///
    /// Readers take the same lock as writers, so a read that overlaps any
    /// other call, including another read, is rejected with
    /// [`EngineError::Reentrant`] rather than waiting.
    pub fn read<T>(&self, f: impl FnOnce(&YieldEngine) -> T) -> Result<T, EngineError> {
        self.transact(|engine| Ok(f(engine)))
    }
}
