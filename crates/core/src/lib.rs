//! `paybook-core`: domain foundation building blocks.
//!
//! Identifiers, money, pay periods and the error taxonomy shared by every
//! payroll crate. No infrastructure concerns live here.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;
pub mod period;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{EmployeeId, SubmissionId, TenantId};
pub use money::Money;
pub use period::{DateRange, PayPeriod};
