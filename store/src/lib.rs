//! Abstract storage traits for the drawpool ledger.
//!
//! Every storage backend (embedded database, in-memory for testing) implements
//! these traits. The engine depends only on the traits.

pub mod error;
pub mod ledger;

pub use error::StoreError;
pub use ledger::LedgerStore;
