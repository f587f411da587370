//! Tenant-isolated state stores: snapshots, the submission ledger and bank files.

pub mod bank_files;
pub mod snapshots;
pub mod submissions;

use thiserror::Error;

pub use bank_files::{BankFileStore, InMemoryBankFileStore};
pub use snapshots::{InMemorySnapshotStore, SnapshotStore};
pub use submissions::{InMemorySubmissionLedger, LedgerAppend, SubmissionLedger};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}
