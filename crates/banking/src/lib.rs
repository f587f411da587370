//! `paybook-banking`: salary transfer batches built from payroll snapshots.
//!
//! Pure transformation: the batch never changes amounts, it only flags
//! records the bank is likely to reject.

pub mod batch;
pub mod file;
pub mod iban;

pub use batch::{BankPaymentBatch, PaymentRecord, PaymentWarning, build_batch};
pub use file::{BankPaymentFile, BankingError, render_csv};
